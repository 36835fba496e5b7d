//! Facebook backend
//!
//! Posts `{message, link}` to the Graph API feed of the account owning the
//! token. The link is the subject's canonical link.

use async_trait::async_trait;
use serde_json::Value;

use crate::backends::{Backend, RequestDraft, ServiceClient};
use crate::pipeline::StageContext;
use crate::types::{Credential, JsonMap, PublishRequest, PublishResult};

pub const NAME: &str = "facebook";

pub struct FacebookBackend {
    client: ServiceClient,
    endpoint: String,
}

impl FacebookBackend {
    pub fn new(client: ServiceClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Default body before the `facebook_body` stage
    pub fn default_body(request: &PublishRequest) -> JsonMap {
        let mut body = JsonMap::new();
        body.insert(
            "message".to_string(),
            Value::String(request.title_or_empty().to_string()),
        );
        body.insert(
            "link".to_string(),
            Value::String(request.link_or_empty().to_string()),
        );
        body
    }
}

#[async_trait]
impl Backend for FacebookBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn label(&self) -> &str {
        "Facebook"
    }

    fn required_scopes(&self) -> &[&str] {
        &["publish_actions"]
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
