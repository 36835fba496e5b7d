//! HTTP transport abstraction
//!
//! Backends never talk to the network directly. They build an
//! [`OutboundRequest`] and hand it to an [`HttpTransport`], which lets hosts
//! swap in their own client (request signing, proxies) and lets tests script
//! responses with [`mock::MockTransport`].

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::error::TransportError;
use crate::types::{JsonMap, PublishResponse};

pub mod http;
pub mod mock;

pub use http::ReqwestTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a request body is put on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    /// `application/x-www-form-urlencoded`
    Form,
    Json,
}

/// Method, timeout and headers of an outbound request.
#[derive(Clone, PartialEq)]
pub struct RequestParams {
    pub method: Method,
    pub timeout: Duration,
    pub headers: BTreeMap<String, String>,
    pub body_format: BodyFormat,
}

impl Default for RequestParams {
    fn default() -> Self {
        Self {
            method: Method::Post,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            headers: BTreeMap::new(),
            body_format: BodyFormat::Form,
        }
    }
}

impl RequestParams {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

// Authorization headers carry tokens and must stay out of logs.
impl fmt::Debug for RequestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: BTreeMap<&str, &str> = self
            .headers
            .iter()
            .map(|(name, value)| {
                if name.eq_ignore_ascii_case("authorization") {
                    (name.as_str(), "[REDACTED]")
                } else {
                    (name.as_str(), value.as_str())
                }
            })
            .collect();

        f.debug_struct("RequestParams")
            .field("method", &self.method)
            .field("timeout", &self.timeout)
            .field("headers", &headers)
            .field("body_format", &self.body_format)
            .finish()
    }
}

/// A fully built request, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub url: String,
    pub params: RequestParams,
    pub body: Option<JsonMap>,
}

/// Status and body of any response the remote side sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as JSON, or as a JSON string when it does not parse
    pub fn json_body(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|_| Value::String(self.body.clone()))
    }

    /// Non-2xx responses become `TransportError::Status`
    pub fn into_publish_response(self) -> Result<PublishResponse, TransportError> {
        if !self.is_success() {
            return Err(TransportError::Status {
                status: self.status,
                body: self.body,
            });
        }

        Ok(PublishResponse {
            status: self.status,
            body: self.json_body(),
        })
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return whatever the remote side answered.
    ///
    /// Only failures to obtain a response (connection, timeout, malformed
    /// request) are errors here; status classification happens in
    /// [`RawResponse::into_publish_response`].
    async fn request(&self, request: &OutboundRequest) -> Result<RawResponse, TransportError>;
}

/// Encode a body map as `application/x-www-form-urlencoded`.
///
/// Strings go out verbatim, `null` as an empty value, and anything else as
/// its JSON text.
pub fn encode_form(body: &JsonMap) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in body {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        serializer.append_pair(key, &text);
    }
    serializer.finish()
}
