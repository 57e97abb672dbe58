//! HTTP client for the managed rendering-proxy service.

use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::error::ExtractError;

const SERVICE: &str = "rendering proxy";

/// Fetches fully rendered HTML through a ScrapingBee-style API:
/// JavaScript rendering on, premium (residential) egress, a fixed settle wait,
/// and a caller-chosen session id so consecutive calls do not share an exit IP.
pub struct RenderingProxyClient {
    client: Client,
    base_url: reqwest::Url,
    api_key: String,
    wait_ms: u64,
    timeout_secs: u64,
}

impl RenderingProxyClient {
    /// # Errors
    ///
    /// - [`ExtractError::InvalidUrl`] if `base_url` does not parse.
    /// - [`ExtractError::Http`] if the underlying `reqwest::Client` cannot be
    ///   constructed.
    pub fn new(
        base_url: &str,
        api_key: &str,
        wait_ms: u64,
        timeout_secs: u64,
    ) -> Result<Self, ExtractError> {
        let base_url = reqwest::Url::parse(base_url).map_err(|e| ExtractError::InvalidUrl {
            url: base_url.to_string(),
            reason: format!("rendering proxy base URL is not valid: {e}"),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            wait_ms,
            timeout_secs,
        })
    }

    /// Builds a client from application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::NotConfigured`] when no proxy API key is set.
    pub fn from_config(config: &saledesk_core::AppConfig) -> Result<Self, ExtractError> {
        let api_key = config
            .proxy_api_key
            .as_deref()
            .ok_or(ExtractError::NotConfigured("SALEDESK_PROXY_API_KEY"))?;
        Self::new(
            &config.proxy_base_url,
            api_key,
            config.proxy_wait_ms,
            config.proxy_timeout_secs,
        )
    }

    #[must_use]
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Fetches `target_url` rendered, tagged with `session_id`.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::RenderTimeout`] if the service does not answer in time.
    /// - [`ExtractError::UpstreamAuth`] for 401/403.
    /// - [`ExtractError::RateLimited`] for 429.
    /// - [`ExtractError::UnexpectedStatus`] for any other non-2xx status.
    pub async fn fetch(&self, target_url: &str, session_id: u32) -> Result<String, ExtractError> {
        let request_url = self.request_url(target_url, session_id);

        let response = self
            .client
            .get(request_url)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ExtractError::UpstreamAuth {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ExtractError::RateLimited {
                service: SERVICE,
                retry_after_secs,
            });
        }

        if !status.is_success() {
            return Err(ExtractError::UnexpectedStatus {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| self.map_transport_error(e))
    }

    fn request_url(&self, target_url: &str, session_id: u32) -> reqwest::Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("api_key", &self.api_key)
            .append_pair("url", target_url)
            .append_pair("render_js", "true")
            .append_pair("premium_proxy", "true")
            .append_pair("wait", &self.wait_ms.to_string())
            .append_pair("session_id", &session_id.to_string());
        url
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ExtractError {
        if err.is_timeout() {
            ExtractError::RenderTimeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            ExtractError::Http(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RenderingProxyClient {
        RenderingProxyClient::new("https://proxy.test/api/v1/", "key-123", 5000, 90).unwrap()
    }

    #[test]
    fn request_url_carries_rendering_options() {
        let url = client().request_url("https://shop.test/p/boot?color=black", 4242);
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["api_key"], "key-123");
        assert_eq!(pairs["url"], "https://shop.test/p/boot?color=black");
        assert_eq!(pairs["render_js"], "true");
        assert_eq!(pairs["premium_proxy"], "true");
        assert_eq!(pairs["wait"], "5000");
        assert_eq!(pairs["session_id"], "4242");
        assert_eq!(url.path(), "/api/v1/");
    }

    #[test]
    fn new_rejects_bad_base_url() {
        assert!(matches!(
            RenderingProxyClient::new("not a url", "k", 0, 1),
            Err(ExtractError::InvalidUrl { .. })
        ));
    }
}
