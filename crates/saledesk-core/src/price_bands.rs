//! Per-domain plausible price bands.
//!
//! Acceptable price ranges vary by use case, so they are configuration rather
//! than code. The file looks like:
//!
//! ```yaml
//! default:
//!   min: 5
//!   max: 15000
//! domains:
//!   - domain: nordstrom.com
//!     min: 10
//!     max: 20000
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    pub min: f64,
    pub max: f64,
}

impl PriceBand {
    #[must_use]
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainPriceBand {
    pub domain: String,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceBands {
    #[serde(default)]
    pub default: Option<PriceBand>,
    #[serde(default)]
    pub domains: Vec<DomainPriceBand>,
}

impl PriceBands {
    /// Returns the band for `host`, matching the configured domain itself or
    /// any subdomain of it, falling back to the default band.
    #[must_use]
    pub fn band_for(&self, host: &str) -> Option<PriceBand> {
        let host = host.trim_start_matches("www.").to_ascii_lowercase();
        self.domains
            .iter()
            .filter(|b| {
                let domain = b.domain.to_ascii_lowercase();
                host == domain || host.ends_with(&format!(".{domain}"))
            })
            .max_by_key(|b| b.domain.len())
            .map(|b| PriceBand {
                min: b.min,
                max: b.max,
            })
            .or(self.default)
    }
}

/// Load and validate price bands from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_price_bands(path: &Path) -> Result<PriceBands, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::PriceBandsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_price_bands(&content)
}

/// Parse and validate price bands from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or a band is invalid.
pub fn parse_price_bands(content: &str) -> Result<PriceBands, ConfigError> {
    let bands: PriceBands = serde_yaml::from_str(content)?;
    validate_price_bands(&bands)?;
    Ok(bands)
}

fn validate_price_bands(bands: &PriceBands) -> Result<(), ConfigError> {
    if let Some(default) = bands.default {
        validate_band("default", default.min, default.max)?;
    }

    let mut seen = HashSet::new();
    for band in &bands.domains {
        let domain = band.domain.trim();
        if domain.is_empty() {
            return Err(ConfigError::InvalidPriceBand {
                domain: band.domain.clone(),
                reason: "domain must not be empty".to_string(),
            });
        }
        if !seen.insert(domain.to_ascii_lowercase()) {
            return Err(ConfigError::InvalidPriceBand {
                domain: band.domain.clone(),
                reason: "duplicate domain".to_string(),
            });
        }
        validate_band(domain, band.min, band.max)?;
    }

    Ok(())
}

fn validate_band(domain: &str, min: f64, max: f64) -> Result<(), ConfigError> {
    if !min.is_finite() || !max.is_finite() || min < 0.0 {
        return Err(ConfigError::InvalidPriceBand {
            domain: domain.to_string(),
            reason: format!("bounds must be finite and non-negative (min={min}, max={max})"),
        });
    }
    if min >= max {
        return Err(ConfigError::InvalidPriceBand {
            domain: domain.to_string(),
            reason: format!("min ({min}) must be less than max ({max})"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
default:
  min: 5
  max: 15000
domains:
  - domain: nordstrom.com
    min: 10
    max: 20000
  - domain: shop.example.com
    min: 1
    max: 50
";

    #[test]
    fn parses_default_and_domains() {
        let bands = parse_price_bands(SAMPLE).unwrap();
        assert_eq!(bands.default, Some(PriceBand { min: 5.0, max: 15000.0 }));
        assert_eq!(bands.domains.len(), 2);
    }

    #[test]
    fn band_for_matches_exact_domain_and_strips_www() {
        let bands = parse_price_bands(SAMPLE).unwrap();
        assert_eq!(
            bands.band_for("www.nordstrom.com"),
            Some(PriceBand { min: 10.0, max: 20000.0 })
        );
    }

    #[test]
    fn band_for_matches_subdomain() {
        let bands = parse_price_bands(SAMPLE).unwrap();
        assert_eq!(
            bands.band_for("m.nordstrom.com"),
            Some(PriceBand { min: 10.0, max: 20000.0 })
        );
    }

    #[test]
    fn band_for_does_not_match_suffix_without_dot() {
        let bands = parse_price_bands(SAMPLE).unwrap();
        // "notnordstrom.com" must fall through to the default band.
        assert_eq!(
            bands.band_for("notnordstrom.com"),
            Some(PriceBand { min: 5.0, max: 15000.0 })
        );
    }

    #[test]
    fn band_for_without_default_returns_none() {
        let bands = parse_price_bands("domains: []").unwrap();
        assert!(bands.band_for("anything.com").is_none());
    }

    #[test]
    fn rejects_inverted_band() {
        let err = parse_price_bands("default:\n  min: 100\n  max: 10\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPriceBand { ref domain, .. } if domain == "default"));
    }

    #[test]
    fn rejects_duplicate_domain() {
        let yaml = r"
domains:
  - domain: a.com
    min: 1
    max: 2
  - domain: A.com
    min: 1
    max: 3
";
        let err = parse_price_bands(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPriceBand { ref reason, .. } if reason == "duplicate domain"));
    }

    #[test]
    fn rejects_malformed_yaml() {
        let err = parse_price_bands("domains: [").unwrap_err();
        assert!(matches!(err, ConfigError::PriceBandsFileParse(_)));
    }

    #[test]
    fn contains_is_inclusive() {
        let band = PriceBand { min: 5.0, max: 10.0 };
        assert!(band.contains(5.0));
        assert!(band.contains(10.0));
        assert!(!band.contains(10.01));
    }

    #[test]
    fn shipped_config_parses() {
        let bands = parse_price_bands(include_str!("../../../config/price_bands.yaml")).unwrap();
        assert!(bands.default.is_some());
        let band = bands.band_for("shop.nordstrom.com").unwrap();
        assert!(band.contains(20_000.0));
    }
}
