//! [`BulkTransport`] over HTTP using `reqwest`.
//!
//! Targets are `index` or `index/type` paths relative to the node URL:
//! batches go to `POST {node}/{target}/_bulk`, refreshes to
//! `POST {node}/{target}/_refresh`.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use tracing::debug;

use super::BulkTransport;

const NDJSON: &str = "application/x-ndjson";

/// Longest response body excerpt carried in an error message.
const ERROR_BODY_LIMIT: usize = 512;

/// HTTP transport bound to a single node URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    node: String,
}

impl HttpTransport {
    /// Builds a transport for `node` (e.g. `http://localhost:9200`).
    ///
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(node: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            node: node.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn node(&self) -> &str {
        &self.node
    }

    fn endpoint(&self, target: &str, action: &str) -> String {
        format!("{}/{}/{action}", self.node, target.trim_matches('/'))
    }
}

#[async_trait]
impl BulkTransport for HttpTransport {
    async fn bulk(&self, target: &str, payload: &[u8]) -> anyhow::Result<()> {
        let url = self.endpoint(target, "_bulk");
        debug!(url = %url, bytes = payload.len(), "sending bulk request");
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, NDJSON)
            .body(Bytes::copy_from_slice(payload))
            .send()
            .await
            .with_context(|| format!("bulk request to {url} failed"))?;
        ensure_success(response, &url).await
    }

    async fn refresh(&self, target: &str) -> anyhow::Result<()> {
        let url = self.endpoint(target, "_refresh");
        debug!(url = %url, "sending refresh request");
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .with_context(|| format!("refresh request to {url} failed"))?;
        ensure_success(response, &url).await
    }

    async fn close(&self) -> anyhow::Result<()> {
        // reqwest releases pooled connections when the client is dropped.
        Ok(())
    }
}

async fn ensure_success(response: Response, url: &str) -> anyhow::Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    anyhow::bail!("{url} returned {status}: {}", excerpt(&body))
}

fn excerpt(body: &str) -> &str {
    if body.len() <= ERROR_BODY_LIMIT {
        return body;
    }
    let mut end = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_node_and_target() {
        let transport = HttpTransport::new("http://es:9200/", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.node(), "http://es:9200");
        assert_eq!(transport.endpoint("logs", "_bulk"), "http://es:9200/logs/_bulk");
        assert_eq!(
            transport.endpoint("/logs/event/", "_refresh"),
            "http://es:9200/logs/event/_refresh"
        );
    }

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        let short = "not found";
        assert_eq!(excerpt(short), short);

        let long = "é".repeat(ERROR_BODY_LIMIT);
        let cut = excerpt(&long);
        assert!(cut.len() <= ERROR_BODY_LIMIT);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[tokio::test]
    async fn close_is_a_no_op() {
        let transport = HttpTransport::new("http://es:9200", Duration::from_secs(5)).unwrap();
        assert!(transport.close().await.is_ok());
    }
}
