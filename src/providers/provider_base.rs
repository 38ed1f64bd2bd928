use reqwest::{Client, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use super::{ProviderError, ProviderResult};

/// Shared HTTP plumbing for card providers
pub struct BaseProvider {
    pub class_id: String,
    pub client: Client,
    pub headers: HashMap<String, String>,
}

impl BaseProvider {
    /// Create a new base provider
    pub fn new(class_id: String, headers: HashMap<String, String>, timeout: Duration) -> Self {
        let mut default_headers = reqwest::header::HeaderMap::new();
        for (key, value) in &headers {
            if let (Ok(name), Ok(val)) = (
                reqwest::header::HeaderName::from_bytes(key.as_bytes()),
                reqwest::header::HeaderValue::from_str(value),
            ) {
                default_headers.insert(name, val);
            } else {
                log::warn!("{}: dropping invalid header {}", class_id, key);
            }
        }

        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            class_id,
            client,
            headers,
        }
    }

    /// Make an HTTP GET request
    pub async fn get_request(
        &self,
        url: &str,
        params: Option<&[(&str, &str)]>,
    ) -> ProviderResult<Response> {
        let mut request = self.client.get(url);

        if let Some(p) = params {
            request = request.query(p);
        }

        request
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(format!("Request failed: {}", e)))
    }

    /// Download JSON content.
    ///
    /// Non-2xx responses whose body is still JSON are returned as-is so the
    /// caller can read the API's own error object.
    pub async fn download_json(
        &self,
        url: &str,
        params: Option<&[(&str, &str)]>,
    ) -> ProviderResult<Value> {
        let response = self.get_request(url, params).await?;
        self.log_download(&response);

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError(format!("Body download error: {}", e)))?;

        match serde_json::from_str::<Value>(&body) {
            Ok(value) => Ok(value),
            Err(_) if !status.is_success() => Err(ProviderError::NetworkError(format!(
                "HTTP error {}: {}",
                status, body
            ))),
            Err(e) => Err(ProviderError::ParseError(format!("JSON parse error: {}", e))),
        }
    }

    pub fn log_download(&self, response: &Response) {
        log::debug!(
            "{}: downloaded {} (status: {})",
            self.class_id,
            response.url(),
            response.status()
        );
    }
}
