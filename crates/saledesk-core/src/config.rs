use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a
/// `HashMap` lookup instead of `set_var`/`remove_var`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_secs = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        let value = raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    };

    let parse_ms = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("SALEDESK_ENV", "development"))?;
    let log_level = or_default("SALEDESK_LOG_LEVEL", "info");

    let model_api_key = optional("OPENAI_API_KEY");
    let model_name = or_default("SALEDESK_MODEL", "gpt-4o-mini");
    let model_base_url = or_default("SALEDESK_MODEL_BASE_URL", "https://api.openai.com/v1");
    let model_timeout_secs = parse_secs("SALEDESK_MODEL_TIMEOUT_SECS", "60")?;
    let model_max_retries = parse_u32("SALEDESK_MODEL_MAX_RETRIES", "2")?;
    let model_backoff_base_ms = parse_ms("SALEDESK_MODEL_BACKOFF_BASE_MS", "1000")?;

    let proxy_api_key = optional("SALEDESK_PROXY_API_KEY");
    let proxy_base_url = or_default(
        "SALEDESK_PROXY_BASE_URL",
        "https://app.scrapingbee.com/api/v1/",
    );
    let proxy_timeout_secs = parse_secs("SALEDESK_PROXY_TIMEOUT_SECS", "90")?;
    let proxy_wait_ms = parse_ms("SALEDESK_PROXY_WAIT_MS", "5000")?;

    let browser_path = optional("SALEDESK_BROWSER_PATH").map(PathBuf::from);
    let browser_nav_timeout_secs = parse_secs("SALEDESK_BROWSER_NAV_TIMEOUT_SECS", "30")?;
    let browser_settle_ms = parse_ms("SALEDESK_BROWSER_SETTLE_MS", "2000")?;

    let price_bands_path = optional("SALEDESK_PRICE_BANDS_PATH").map(PathBuf::from);

    Ok(AppConfig {
        env,
        log_level,
        model_api_key,
        model_name,
        model_base_url,
        model_timeout_secs,
        model_max_retries,
        model_backoff_base_ms,
        proxy_api_key,
        proxy_base_url,
        proxy_timeout_secs,
        proxy_wait_ms,
        browser_path,
        browser_nav_timeout_secs,
        browser_settle_ms,
        price_bands_path,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SALEDESK_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
