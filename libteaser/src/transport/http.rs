use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use crate::error::TransportError;
use crate::transport::{
    encode_form, BodyFormat, HttpTransport, Method, OutboundRequest, RawResponse,
};

/// [`HttpTransport`] backed by a shared `reqwest` client.
///
/// Timeouts are applied per request from [`crate::transport::RequestParams`].
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(concat!("social-teaser/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn request(&self, request: &OutboundRequest) -> Result<RawResponse, TransportError> {
        let params = &request.params;
        debug!("{} {}", params.method, request.url);

        let mut builder = self
            .client
            .request(to_reqwest_method(params.method), &request.url)
            .timeout(params.timeout);

        for (name, value) in &params.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            builder = match params.body_format {
                BodyFormat::Form => builder
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(encode_form(body)),
                BodyFormat::Json => builder.json(body),
            };
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }
}
