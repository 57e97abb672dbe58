use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl Environment {
    /// Production emits one JSON object per log line; other environments
    /// keep the human-readable format.
    #[must_use]
    pub fn structured_logs(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub model_api_key: Option<String>,
    pub model_name: String,
    pub model_base_url: String,
    pub model_timeout_secs: u64,
    pub model_max_retries: u32,
    pub model_backoff_base_ms: u64,
    pub proxy_api_key: Option<String>,
    pub proxy_base_url: String,
    pub proxy_timeout_secs: u64,
    pub proxy_wait_ms: u64,
    pub browser_path: Option<PathBuf>,
    pub browser_nav_timeout_secs: u64,
    pub browser_settle_ms: u64,
    pub price_bands_path: Option<PathBuf>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field(
                "model_api_key",
                &self.model_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("model_name", &self.model_name)
            .field("model_base_url", &self.model_base_url)
            .field("model_timeout_secs", &self.model_timeout_secs)
            .field("model_max_retries", &self.model_max_retries)
            .field("model_backoff_base_ms", &self.model_backoff_base_ms)
            .field(
                "proxy_api_key",
                &self.proxy_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("proxy_base_url", &self.proxy_base_url)
            .field("proxy_timeout_secs", &self.proxy_timeout_secs)
            .field("proxy_wait_ms", &self.proxy_wait_ms)
            .field("browser_path", &self.browser_path)
            .field("browser_nav_timeout_secs", &self.browser_nav_timeout_secs)
            .field("browser_settle_ms", &self.browser_settle_ms)
            .field("price_bands_path", &self.price_bands_path)
            .finish()
    }
}
