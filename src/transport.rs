use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::Result;

/// Status and body of an HTTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Bytes,
}

/// Sends one POST and returns the full reply.
///
/// Implementations report network failures as `TsdbError::Transport`. Non-2xx
/// statuses are not errors at this level.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> Result<HttpReply>;
}

/// [`Transport`] backed by a shared `reqwest::Client` with its default
/// timeouts and redirect policy.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> Result<HttpReply> {
        debug!(url, bytes = body.len(), "POST");
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        debug!(url, status, bytes = body.len(), "reply received");

        Ok(HttpReply { status, body })
    }
}
