//! Publishing backends
//!
//! One [`Backend`] per social platform. Each backend turns a
//! [`PublishRequest`] and a [`Credential`] into a platform-specific HTTP call
//! and reports the outcome as a [`PublishResult`] value. Backends never panic
//! or return early with `?` across this contract: every failure comes back
//! as `Err(PublishError)` so the dispatcher can record it.
//!
//! The request-building steps shared by all platforms live in
//! [`ServiceClient`]: run the pipeline stages, refuse empty endpoints, send
//! through the transport, classify the response.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use libteaser::backends::{facebook::FacebookBackend, Backend, ServiceClient};
//! use libteaser::pipeline::RequestPipeline;
//! use libteaser::transport::ReqwestTransport;
//! use libteaser::types::{Credential, PublishRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ServiceClient::new(
//!     Arc::new(ReqwestTransport::new()?),
//!     Arc::new(RequestPipeline::empty()),
//!     Duration::from_secs(100),
//! );
//! let facebook = FacebookBackend::new(client, "https://graph.facebook.com/me/feed");
//!
//! let credential = Credential::new("12", "facebook", "alice", "Alice", "EAAB...");
//! let request = PublishRequest::new("42", "Hello world", "https://blog.example/hello");
//!
//! match facebook.publish(&credential, &request).await {
//!     Ok(response) => println!("Posted: {}", response.body),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{PublishError, TransportError};
use crate::pipeline::{RequestPipeline, StageContext};
use crate::transport::{HttpTransport, Method, OutboundRequest, RequestParams};
use crate::types::{Credential, JsonMap, PublishRequest, PublishResult};

pub mod facebook;
pub mod tumblr;
pub mod twitter;

// Mock backend is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Adapter for one social platform.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Lowercase platform identifier, the registry key (e.g., "facebook")
    fn name(&self) -> &str;

    /// Human-readable platform name (e.g., "Facebook")
    fn label(&self) -> &str;

    /// OAuth scopes the credential must have been granted for posting.
    ///
    /// The core does not acquire credentials; hosts read this when they do.
    fn required_scopes(&self) -> &[&str] {
        &[]
    }

    /// Sub-destinations (blogs, pages) the credential can post to.
    ///
    /// Platforms without sub-destinations keep the default empty list.
    /// Lookup failures also yield an empty list, never an error.
    async fn list_destinations(
        &self,
        _credential: &Credential,
        _request: &PublishRequest,
    ) -> Vec<String> {
        Vec::new()
    }

    /// Publish `request` using `credential`.
    async fn publish(&self, credential: &Credential, request: &PublishRequest) -> PublishResult;
}

/// Default URL and body a backend computed before the pipeline runs.
#[derive(Debug, Clone)]
pub struct RequestDraft {
    pub url: String,
    pub body: JsonMap,
}

/// Shared request runner handed to every backend at construction.
#[derive(Clone)]
pub struct ServiceClient {
    transport: Arc<dyn HttpTransport>,
    pipeline: Arc<RequestPipeline>,
    timeout: Duration,
}

impl ServiceClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        pipeline: Arc<RequestPipeline>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            pipeline,
            timeout,
        }
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    /// Default parameters: `method`, the configured timeout, and the
    /// credential's token as a bearer `Authorization` header
    pub fn default_params(&self, method: Method, credential: &Credential) -> RequestParams {
        RequestParams {
            method,
            timeout: self.timeout,
            ..RequestParams::default()
        }
        .with_header(
            "Authorization",
            format!("Bearer {}", credential.token.expose_secret()),
        )
    }

    /// Run the URL, body and parameter stages for `platform`, then send.
    ///
    /// An empty URL after the URL stage fails with
    /// [`PublishError::EmptyEndpoint`] before anything else runs.
    pub async fn send(
        &self,
        platform: &str,
        draft: RequestDraft,
        ctx: &StageContext<'_>,
    ) -> PublishResult {
        let url = self.pipeline.apply_url(platform, draft.url, ctx);
        if url.trim().is_empty() {
            warn!("Refusing to publish to {}: endpoint is empty", platform);
            return Err(PublishError::EmptyEndpoint {
                platform: platform.to_string(),
            });
        }

        let body = self.pipeline.apply_body(platform, draft.body, ctx);
        let params = self.pipeline.apply_request_params(
            platform,
            self.default_params(Method::Post, ctx.credential),
            ctx,
        );

        let request = OutboundRequest {
            url,
            params,
            body: Some(body),
        };

        debug!(
            "Sending {} request for {} to {}",
            request.params.method, platform, request.url
        );

        let raw = self.transport.request(&request).await?;
        let response = raw.into_publish_response()?;

        info!(
            "Published to {} account {} (HTTP {})",
            platform, ctx.credential.id, response.status
        );
        Ok(response)
    }

    /// Auxiliary GET with the credential, returning the JSON body.
    ///
    /// No pipeline stages run for auxiliary lookups.
    pub async fn fetch_json(
        &self,
        url: &str,
        credential: &Credential,
    ) -> Result<Value, TransportError> {
        let request = OutboundRequest {
            url: url.to_string(),
            params: self.default_params(Method::Get, credential),
            body: None,
        };

        let raw = self.transport.request(&request).await?;
        Ok(raw.into_publish_response()?.body)
    }
}
