// HTTP transport for csrf-audit
// Uses reqwest and tokio; everything above this layer talks to the Transport trait

use crate::errors::{AuditError, AuditResult};
use crate::models::HttpResponse;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Sends one form submission and returns status plus body text.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        url: &str,
        data: &BTreeMap<String, String>,
        headers: &BTreeMap<String, String>,
        use_get: bool,
        delay_ms: u64,
    ) -> AuditResult<HttpResponse>;
}

pub struct HttpTransport {
    pub client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> AuditResult<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .cookie_store(true)
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| AuditError::transport("<client>", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        url: &str,
        data: &BTreeMap<String, String>,
        headers: &BTreeMap<String, String>,
        use_get: bool,
        delay_ms: u64,
    ) -> AuditResult<HttpResponse> {
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        let mut req = if use_get {
            self.client.get(url).query(data)
        } else {
            self.client.post(url).form(data)
        };
        for (name, value) in headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let resp = req.send().await.map_err(|e| AuditError::transport(url, e))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| AuditError::transport(url, e))?;
        debug!("{} {} -> {} ({} bytes)", if use_get { "GET" } else { "POST" }, url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}
