//! Tumblr backend
//!
//! Tumblr posts go to a specific blog, so publishing starts with an
//! auxiliary `user/info` lookup that lists the blogs the token can post to.
//! Only the first blog is used. When the lookup finds nothing (or fails) the
//! endpoint stays empty and the publish ends with `EmptyEndpoint`, without a
//! POST.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::backends::{Backend, RequestDraft, ServiceClient};
use crate::pipeline::StageContext;
use crate::types::{Credential, JsonMap, PublishRequest, PublishResult};

pub const NAME: &str = "tumblr";

/// Key under which the pre-transform endpoint is exposed to URL transforms
pub const BASE_URL_ARG: &str = "tumblr_base_url";

pub struct TumblrBackend {
    client: ServiceClient,
    post_endpoint: String,
    user_info_endpoint: String,
}

impl TumblrBackend {
    pub fn new(
        client: ServiceClient,
        post_endpoint: impl Into<String>,
        user_info_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client,
            post_endpoint: post_endpoint.into(),
            user_info_endpoint: user_info_endpoint.into(),
        }
    }

    /// Post endpoint for `blog`, or empty when there is no blog
    pub fn post_url(&self, blog: Option<&str>) -> String {
        match blog {
            Some(host) => self.post_endpoint.replace("{blog}", host),
            None => String::new(),
        }
    }

    pub fn default_body(request: &PublishRequest) -> JsonMap {
        let mut body = JsonMap::new();
        body.insert("type".to_string(), Value::String("link".to_string()));
        body.insert(
            "title".to_string(),
            Value::String(request.title_or_empty().to_string()),
        );
        body.insert(
            "url".to_string(),
            Value::String(request.link_or_empty().to_string()),
        );
        body
    }
}

/// Hosts of `response.user.blogs[].url`, skipping entries without a host
fn blog_hosts(info: &Value) -> Vec<String> {
    info.pointer("/response/user/blogs")
        .and_then(Value::as_array)
        .map(|blogs| {
            blogs
                .iter()
                .filter_map(|blog| blog.get("url").and_then(Value::as_str))
                .filter_map(|raw| Url::parse(raw).ok())
                .filter_map(|url| url.host_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl Backend for TumblrBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn label(&self) -> &str {
        "Tumblr"
    }

    async fn list_destinations(
        &self,
        credential: &Credential,
        request: &PublishRequest,
    ) -> Vec<String> {
        let hosts = match self
            .client
            .fetch_json(&self.user_info_endpoint, credential)
            .await
        {
            Ok(info) => blog_hosts(&info),
            Err(e) => {
                warn!(
                    "Blog lookup for tumblr account {} failed: {}",
                    credential.id, e
                );
                Vec::new()
            }
        };

        let args = request.args();
        let ctx = StageContext {
            request,
            credential,
            args: &args,
        };
        self.client.pipeline().apply_destinations(NAME, hosts, &ctx)
    }

    async fn publish(&self, credential: &Credential, request: &PublishRequest) -> PublishResult {
        let blogs = self.list_destinations(credential, request).await;
        debug!("Tumblr account {} has {} blog(s)", credential.id, blogs.len());

        let url = self.post_url(blogs.first().map(String::as_str));

        let mut args = request.args();
        args.insert(BASE_URL_ARG.to_string(), Value::String(url.clone()));
        let ctx = StageContext {
            request,
            credential,
            args: &args,
        };

        let draft = RequestDraft {
            url,
            body: Self::default_body(request),
        };

        self.client.send(NAME, draft, &ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TUMBLR_POST_ENDPOINT, TUMBLR_USER_INFO_ENDPOINT};
    use crate::error::{PublishError, TransportError};
    use crate::pipeline::RequestPipeline;
    use crate::transport::mock::MockTransport;
    use crate::transport::Method;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    const TWO_BLOGS: &str = r#"{"response":{"user":{"blogs":[
        {"url":"https://first.tumblr.com/"},
        {"url":"https://second.tumblr.com/"}
    ]}}}"#;

    fn backend(transport: Arc<MockTransport>, pipeline: RequestPipeline) -> TumblrBackend {
        let client = ServiceClient::new(transport, Arc::new(pipeline), Duration::from_secs(100));
        TumblrBackend::new(client, TUMBLR_POST_ENDPOINT, TUMBLR_USER_INFO_ENDPOINT)
    }

    fn credential() -> Credential {
        Credential::new("5", NAME, "alice", "alice", "tt")
    }

    #[test]
    fn test_blog_hosts() {
        let info: Value = serde_json::from_str(TWO_BLOGS).unwrap();
        assert_eq!(blog_hosts(&info), vec!["first.tumblr.com", "second.tumblr.com"]);

        assert!(blog_hosts(&json!({"response": {}})).is_empty());
        let bad_url = json!({"response": {"user": {"blogs": [{"url": "not a url"}]}}});
        assert!(blog_hosts(&bad_url).is_empty());
    }

    #[tokio::test]
    async fn test_publish_uses_first_blog() {
        let transport = Arc::new(
            MockTransport::new().respond_to(Method::Get, TUMBLR_USER_INFO_ENDPOINT, 200, TWO_BLOGS),
        );
        let tumblr = backend(Arc::clone(&transport), RequestPipeline::empty());
        let request = PublishRequest::new("1", "Hello", "http://x/hello");

        tumblr.publish(&credential(), &request).await.unwrap();

        let posts = transport.requests_with(Method::Post);
        assert_eq!(posts.len(), 1);
        assert_eq!(
            posts[0].url,
            "https://api.tumblr.com/v2/blog/first.tumblr.com/post"
        );
        assert_eq!(
            posts[0].body,
            Some(
                json!({"type": "link", "title": "Hello", "url": "http://x/hello"})
                    .as_object()
                    .unwrap()
                    .clone()
            )
        );
    }

    #[tokio::test]
    async fn test_publish_without_subject_sends_empty_fields() {
        let transport = Arc::new(
            MockTransport::new().respond_to(Method::Get, TUMBLR_USER_INFO_ENDPOINT, 200, TWO_BLOGS),
        );
        let tumblr = backend(Arc::clone(&transport), RequestPipeline::empty());
        let request = PublishRequest {
            subject_id: None,
            title: "Ignored".to_string(),
            link: "https://ignored".to_string(),
            ..PublishRequest::default()
        };

        let result = tumblr.publish(&credential(), &request).await;
        assert!(result.is_ok());

        let posts = transport.requests_with(Method::Post);
        assert_eq!(posts.len(), 1);
        assert_eq!(
            posts[0].url,
            "https://api.tumblr.com/v2/blog/first.tumblr.com/post"
        );
        assert_eq!(
            posts[0].body,
            Some(
                json!({"type": "link", "title": "", "url": ""})
                    .as_object()
                    .unwrap()
                    .clone()
            )
        );
    }

    #[tokio::test]
    async fn test_no_blogs_is_empty_endpoint_without_post() {
        let transport = Arc::new(MockTransport::new().respond(
            TUMBLR_USER_INFO_ENDPOINT,
            200,
            r#"{"response":{"user":{"blogs":[]}}}"#,
        ));
        let tumblr = backend(Arc::clone(&transport), RequestPipeline::empty());
        let request = PublishRequest::new("1", "Hello", "http://x/hello");

        let result = tumblr.publish(&credential(), &request).await;
        assert_eq!(
            result,
            Err(PublishError::EmptyEndpoint {
                platform: NAME.to_string()
            })
        );
        assert!(transport.requests_with(Method::Post).is_empty());
    }

    #[tokio::test]
    async fn test_failed_lookup_is_empty_endpoint() {
        let transport = Arc::new(MockTransport::new().fail(
            TUMBLR_USER_INFO_ENDPOINT,
            TransportError::Network {
                message: "connection refused".to_string(),
            },
        ));
        let tumblr = backend(Arc::clone(&transport), RequestPipeline::empty());
        let request = PublishRequest::new("1", "Hello", "http://x/hello");

        assert!(tumblr.list_destinations(&credential(), &request).await.is_empty());

        let result = tumblr.publish(&credential(), &request).await;
        assert!(matches!(result, Err(PublishError::EmptyEndpoint { .. })));
        assert!(transport.requests_with(Method::Post).is_empty());
    }

    #[tokio::test]
    async fn test_destinations_transform_can_pick_blog() {
        let transport = Arc::new(
            MockTransport::new().respond_to(Method::Get, TUMBLR_USER_INFO_ENDPOINT, 200, TWO_BLOGS),
        );
        let pipeline = RequestPipeline::builder()
            .destinations(NAME, |blogs, _| blogs.into_iter().rev().collect())
            .build();
        let tumblr = backend(Arc::clone(&transport), pipeline);
        let request = PublishRequest::new("1", "Hello", "http://x/hello");

        tumblr.publish(&credential(), &request).await.unwrap();

        let posts = transport.requests_with(Method::Post);
        assert_eq!(
            posts[0].url,
            "https://api.tumblr.com/v2/blog/second.tumblr.com/post"
        );
    }

    #[tokio::test]
    async fn test_url_transform_sees_base_url() {
        let transport = Arc::new(
            MockTransport::new().respond_to(Method::Get, TUMBLR_USER_INFO_ENDPOINT, 200, TWO_BLOGS),
        );
        let pipeline = RequestPipeline::builder()
            .url(NAME, |_, ctx| {
                let base = ctx.args[BASE_URL_ARG].as_str().unwrap_or_default();
                format!("{}?native_inline_images=true", base)
            })
            .build();
        let tumblr = backend(Arc::clone(&transport), pipeline);
        let request = PublishRequest::new("1", "Hello", "http://x/hello");

        tumblr.publish(&credential(), &request).await.unwrap();

        let posts = transport.requests_with(Method::Post);
        assert_eq!(
            posts[0].url,
            "https://api.tumblr.com/v2/blog/first.tumblr.com/post?native_inline_images=true"
        );
    }
}
