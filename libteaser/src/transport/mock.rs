//! Scripted transport for testing
//!
//! `MockTransport` answers requests from a list of routes matched by URL
//! prefix and records every request it sees, so tests can assert on exactly
//! what a backend put on the wire without network access.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::error::TransportError;
use crate::transport::{HttpTransport, Method, OutboundRequest, RawResponse};

#[derive(Debug, Clone)]
enum Reply {
    Respond(RawResponse),
    Fail(TransportError),
}

#[derive(Debug, Clone)]
struct Route {
    url_prefix: String,
    method: Option<Method>,
    reply: Reply,
}

/// Mock HTTP transport
///
/// Unmatched requests get `200 {"id": "mock-<uuid>"}`. The first matching
/// route wins.
#[derive(Clone, Default)]
pub struct MockTransport {
    routes: Vec<Route>,
    delay: Duration,
    requests: Arc<Mutex<Vec<OutboundRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests whose URL starts with `url_prefix`
    pub fn respond(mut self, url_prefix: &str, status: u16, body: &str) -> Self {
        self.routes.push(Route {
            url_prefix: url_prefix.to_string(),
            method: None,
            reply: Reply::Respond(RawResponse::new(status, body)),
        });
        self
    }

    /// Like [`respond`](Self::respond) but only for one method
    pub fn respond_to(mut self, method: Method, url_prefix: &str, status: u16, body: &str) -> Self {
        self.routes.push(Route {
            url_prefix: url_prefix.to_string(),
            method: Some(method),
            reply: Reply::Respond(RawResponse::new(status, body)),
        });
        self
    }

    /// Fail requests whose URL starts with `url_prefix`
    pub fn fail(mut self, url_prefix: &str, error: TransportError) -> Self {
        self.routes.push(Route {
            url_prefix: url_prefix.to_string(),
            method: None,
            reply: Reply::Fail(error),
        });
        self
    }

    /// Simulate network latency on every request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn recorded(&self) -> MutexGuard<'_, Vec<OutboundRequest>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All requests seen so far, in order
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.recorded().clone()
    }

    pub fn request_count(&self) -> usize {
        self.recorded().len()
    }

    /// Requests sent with `method`
    pub fn requests_with(&self, method: Method) -> Vec<OutboundRequest> {
        self.recorded()
            .iter()
            .filter(|request| request.params.method == method)
            .cloned()
            .collect()
    }

    fn reply_for(&self, request: &OutboundRequest) -> Reply {
        self.routes
            .iter()
            .find(|route| {
                request.url.starts_with(&route.url_prefix)
                    && route.method.map_or(true, |m| m == request.params.method)
            })
            .map(|route| route.reply.clone())
            .unwrap_or_else(|| {
                let body = format!(r#"{{"id":"mock-{}"}}"#, uuid::Uuid::new_v4());
                Reply::Respond(RawResponse::new(200, body))
            })
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn request(&self, request: &OutboundRequest) -> Result<RawResponse, TransportError> {
        self.recorded().push(request.clone());

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        match self.reply_for(request) {
            Reply::Respond(response) => Ok(response),
            Reply::Fail(error) => Err(error),
        }
    }
}
