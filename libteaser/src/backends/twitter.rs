//! Twitter backend
//!
//! Posts a single `status` made of the title, one space, and the short link.
//! The status is never truncated here; length limits are the API's call.

use async_trait::async_trait;
use serde_json::Value;

use crate::backends::{Backend, RequestDraft, ServiceClient};
use crate::pipeline::StageContext;
use crate::types::{Credential, JsonMap, PublishRequest, PublishResult};

pub const NAME: &str = "twitter";

pub struct TwitterBackend {
    client: ServiceClient,
    endpoint: String,
}

impl TwitterBackend {
    pub fn new(client: ServiceClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// `"<title> <short link>"`, or empty when no subject is attached
    pub fn status_text(request: &PublishRequest) -> String {
        if !request.has_subject() {
            return String::new();
        }
        format!("{} {}", request.title, request.short_link_or_empty())
    }

    /// Default body before the `twitter_body` stage
    pub fn default_body(request: &PublishRequest) -> JsonMap {
        let mut body = JsonMap::new();
        body.insert("status".to_string(), Value::String(Self::status_text(request)));
        body
    }
}

#[async_trait]
impl Backend for TwitterBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn label(&self) -> &str {
        "Twitter"
    }

    async fn publish(&self, credential: &Credential, request: &PublishRequest) -> PublishResult {
        let args = request.args();
        let ctx = StageContext {
            request,
            credential,
            args: &args,
        };

        let draft = RequestDraft {
            url: self.endpoint.clone(),
            body: Self::default_body(request),
        };

        self.client.send(NAME, draft, &ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TWITTER_UPDATE_ENDPOINT;
    use crate::error::{PublishError, TransportError};
    use crate::pipeline::RequestPipeline;
    use crate::transport::mock::MockTransport;
    use std::sync::Arc;
    use std::time::Duration;

    fn backend(transport: Arc<MockTransport>) -> TwitterBackend {
        let client = ServiceClient::new(
            transport,
            Arc::new(RequestPipeline::empty()),
            Duration::from_secs(100),
        );
        TwitterBackend::new(client, TWITTER_UPDATE_ENDPOINT)
    }

    #[test]
    fn test_status_is_title_space_short_link() {
        let request =
            PublishRequest::new("1", "Hello", "http://x/hello").with_short_link("http://x/1");
        assert_eq!(TwitterBackend::status_text(&request), "Hello http://x/1");
    }

    #[test]
    fn test_status_is_not_truncated() {
        let title = "a".repeat(400);
        let request = PublishRequest::new("1", title.clone(), "http://x/hello")
            .with_short_link("http://x/1");
        let status = TwitterBackend::status_text(&request);
        assert_eq!(status.len(), 400 + 1 + "http://x/1".len());
        assert!(status.starts_with(&title));
    }

    #[test]
    fn test_status_falls_back_to_canonical_link() {
        let request = PublishRequest::new("1", "Hello", "http://x/hello");
        assert_eq!(TwitterBackend::status_text(&request), "Hello http://x/hello");
    }

    #[test]
    fn test_status_empty_without_subject() {
        let request = PublishRequest {
            subject_id: None,
            title: "Hello".to_string(),
            short_link: Some("http://x/1".to_string()),
            ..PublishRequest::default()
        };
        assert_eq!(TwitterBackend::status_text(&request), "");
    }

    #[tokio::test]
    async fn test_publish_sends_status_only() {
        let transport = Arc::new(MockTransport::new());
        let twitter = backend(Arc::clone(&transport));
        let credential = Credential::new("3", NAME, "alice", "@alice", "tok");
        let request =
            PublishRequest::new("1", "Hello", "http://x/hello").with_short_link("http://x/1");

        twitter.publish(&credential, &request).await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].url, TWITTER_UPDATE_ENDPOINT);
        let body = sent[0].body.clone().unwrap();
        assert_eq!(body.len(), 1);
        assert_eq!(body["status"], "Hello http://x/1");
    }

    #[tokio::test]
    async fn test_network_failure_is_transport_error() {
        let transport = Arc::new(MockTransport::new().fail(
            TWITTER_UPDATE_ENDPOINT,
            TransportError::Timeout {
                message: "100s elapsed".to_string(),
            },
        ));
        let twitter = backend(transport);
        let credential = Credential::new("3", NAME, "alice", "@alice", "tok");
        let request = PublishRequest::new("1", "Hello", "http://x/hello");

        let result = twitter.publish(&credential, &request).await;
        assert!(matches!(
            result,
            Err(PublishError::Transport(TransportError::Timeout { .. }))
        ));
    }
}
