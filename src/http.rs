use crate::error::{ProviderError, ProviderResult};
use reqwest::{
    Client, StatusCode,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use std::time::Duration;
use tracing::{debug, warn};

/// Body of a successful response plus its declared content type.
#[derive(Debug)]
pub struct RawResponse {
    pub content_type: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_json(&self) -> bool {
        self.content_type.contains("application/json")
    }

    pub fn text(&self) -> ProviderResult<&str> {
        std::str::from_utf8(&self.body)
            .map_err(|e| ProviderError::parse(format!("response is not UTF-8: {e}")))
    }
}

/// Single-shot HTTP client. Every request is sent once with a bounded timeout;
/// fallbacks between endpoints are the caller's business.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ProviderError::http(e.to_string()))?;
        Ok(Self { client })
    }

    /// Build a client that attaches `headers` to every request.
    ///
    /// Fails if any header name or value is not representable on the wire.
    pub fn with_default_headers(
        user_agent: &str,
        timeout: Duration,
        headers: &[(&str, &str)],
    ) -> ProviderResult<Self> {
        let mut map = HeaderMap::new();
        for (k, v) in headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|e| ProviderError::http(format!("invalid header name {k}: {e}")))?;
            let mut value = HeaderValue::from_str(v)
                .map_err(|e| ProviderError::http(format!("invalid value for header {k}: {e}")))?;
            if name == header::AUTHORIZATION {
                value.set_sensitive(true);
            }
            map.insert(name, value);
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(map)
            .build()
            .map_err(|e| ProviderError::http(e.to_string()))?;
        Ok(Self { client })
    }

    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(&str, &str)],
    ) -> ProviderResult<RawResponse> {
        let mut req = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.to_string());
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        self.send(req).await
    }

    pub async fn get_bytes(&self, url: &str) -> ProviderResult<Vec<u8>> {
        Ok(self.send(self.client.get(url)).await?.body)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> ProviderResult<RawResponse> {
        match req.send().await {
            Ok(resp) => self.handle_response(resp).await,
            Err(e) => {
                if e.is_timeout() {
                    warn!("request timed out");
                }
                Err(ProviderError::http(e.to_string()))
            }
        }
    }

    async fn handle_response(&self, resp: reqwest::Response) -> ProviderResult<RawResponse> {
        let status = resp.status();
        let url = resp.url().to_string();
        debug!(status = status.as_u16(), host = %extract_domain(&url), "response received");

        if status.is_success() {
            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let body = resp
                .bytes()
                .await
                .map_err(|e| ProviderError::http(e.to_string()))?;
            return Ok(RawResponse {
                content_type,
                body: body.to_vec(),
            });
        }

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = resp
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                Err(ProviderError::RateLimit {
                    provider: extract_domain(&url),
                    retry_after_secs: retry_after,
                })
            }
            _ => {
                let body = resp.text().await.unwrap_or_default();
                Err(ProviderError::api_with_status(
                    extract_domain(&url),
                    body,
                    status.as_u16(),
                ))
            }
        }
    }
}

fn extract_domain(url: &str) -> String {
    url.split("//")
        .nth(1)
        .and_then(|s| s.split('/').next())
        .unwrap_or("unknown")
        .to_string()
}
