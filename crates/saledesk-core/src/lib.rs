//! Shared types and configuration for the saledesk offer-extraction pipeline.

pub mod app_config;
pub mod config;
pub mod offer;
pub mod price_bands;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use offer::{
    percent_off, Confidence, ErrorKind, Extraction, ExtractionOutcome, ProductOffer,
    CONFIDENCE_FLOOR,
};
pub use price_bands::{load_price_bands, parse_price_bands, PriceBand, PriceBands};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read price bands file {path}: {source}")]
    PriceBandsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse price bands file: {0}")]
    PriceBandsFileParse(#[from] serde_yaml::Error),

    #[error("invalid price band for {domain}: {reason}")]
    InvalidPriceBand { domain: String, reason: String },
}
