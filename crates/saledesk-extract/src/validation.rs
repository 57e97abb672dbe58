//! Confidence and validation rules shared by every strategy.
//!
//! A strategy hands the engine a [`CandidateOffer`] plus its own base
//! confidence. The engine applies the placeholder, price-order, price-band
//! and floor rules exactly once and either returns a finished
//! [`ProductOffer`] or the reason it was rejected.

use saledesk_core::{Confidence, PriceBands, ProductOffer, CONFIDENCE_FLOOR};
use serde::Serialize;

use crate::error::ExtractError;
use crate::url::normalize_host;

/// Hosts that serve stock or demo imagery rather than real product photos.
const PLACEHOLDER_HOSTS: &[&str] = &[
    "placehold.co",
    "placehold.it",
    "placeholder.com",
    "via.placeholder.com",
    "placekitten.com",
    "placeimg.com",
    "picsum.photos",
    "dummyimage.com",
    "fakeimg.pl",
    "lorempixel.com",
    "example.com",
    "example.org",
    "example.net",
];

pub(crate) const PLACEHOLDER_PENALTY: i32 = 20;
pub(crate) const PRICE_ORDER_PENALTY: i32 = 10;
pub(crate) const PRICE_BAND_PENALTY: i32 = 10;

/// Fields a strategy managed to pull out of a page, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateOffer {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub original_price: Option<f64>,
    pub sale_price: Option<f64>,
    pub source_url: String,
}

/// One confidence change applied by the engine, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Adjustment {
    pub rule: &'static str,
    pub delta: i32,
}

#[derive(Debug, Clone)]
pub struct Validated {
    pub offer: ProductOffer,
    pub confidence: Confidence,
    pub adjustments: Vec<Adjustment>,
}

/// Returns `true` for inline `data:` images and images served from a known
/// placeholder host (or any subdomain of one).
#[must_use]
pub fn is_placeholder_image(url: &str) -> bool {
    let trimmed = url.trim();
    if trimmed
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
    {
        return true;
    }
    let Some(host) = normalize_host(trimmed) else {
        return false;
    };
    PLACEHOLDER_HOSTS
        .iter()
        .any(|p| host == *p || host.ends_with(&format!(".{p}")))
}

#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    price_bands: PriceBands,
}

impl ValidationEngine {
    #[must_use]
    pub fn new(price_bands: PriceBands) -> Self {
        Self { price_bands }
    }

    /// Applies the shared rules to `candidate`, starting from `base_confidence`.
    ///
    /// Order of evaluation:
    /// 1. placeholder image: treated as no image, `-20`
    /// 2. price order: original not above sale is nulled, `-10`
    /// 3. price band: an out-of-band original is nulled, `-10`
    /// 4. confidence floor
    /// 5. required fields (name, real image, non-zero sale price)
    /// 6. price band on the sale price
    ///
    /// # Errors
    ///
    /// - [`ExtractError::LowConfidence`] when the adjusted score is below the floor.
    /// - [`ExtractError::Validation`] when a required field is missing, the image
    ///   is a placeholder, or the sale price falls outside the domain's band.
    pub fn validate(
        &self,
        candidate: CandidateOffer,
        base_confidence: i32,
    ) -> Result<Validated, ExtractError> {
        let mut score = base_confidence;
        let mut adjustments = Vec::new();
        let mut adjust = |rule: &'static str, delta: i32, score: &mut i32| {
            *score += delta;
            adjustments.push(Adjustment { rule, delta });
        };

        let placeholder = candidate
            .image_url
            .as_deref()
            .is_some_and(is_placeholder_image);
        if placeholder {
            adjust("placeholder_image", -PLACEHOLDER_PENALTY, &mut score);
        }

        let sale_price = candidate.sale_price.filter(|p| p.is_finite() && *p > 0.0);
        let mut original_price = candidate.original_price.filter(|p| p.is_finite());

        if let (Some(original), Some(sale)) = (original_price, sale_price) {
            if original <= sale {
                tracing::debug!(
                    url = %candidate.source_url,
                    original,
                    sale,
                    "original price does not exceed sale price, discarding original"
                );
                original_price = None;
                adjust("price_order", -PRICE_ORDER_PENALTY, &mut score);
            }
        }

        let band = normalize_host(&candidate.source_url).and_then(|h| self.price_bands.band_for(&h));
        if let (Some(band), Some(original)) = (band, original_price) {
            if !band.contains(original) {
                original_price = None;
                adjust("original_price_band", -PRICE_BAND_PENALTY, &mut score);
            }
        }

        let confidence = Confidence::clamped(score);
        if !confidence.meets_floor() {
            return Err(ExtractError::LowConfidence {
                confidence: confidence.value(),
                floor: CONFIDENCE_FLOOR,
            });
        }

        let name = candidate
            .name
            .map(|n| n.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ExtractError::Validation("product name not found".to_string()))?;

        if placeholder {
            return Err(ExtractError::Validation(format!(
                "image URL is a placeholder: {}",
                candidate.image_url.unwrap_or_default()
            )));
        }
        let image_url = candidate
            .image_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ExtractError::Validation("product image not found".to_string()))?;

        let sale_price = sale_price
            .ok_or_else(|| ExtractError::Validation("sale price missing or zero".to_string()))?;

        if let Some(band) = band {
            if !band.contains(sale_price) {
                return Err(ExtractError::Validation(format!(
                    "sale price {sale_price:.2} outside plausible range {:.2}..={:.2}",
                    band.min, band.max
                )));
            }
        }

        let brand = candidate
            .brand
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());

        Ok(Validated {
            offer: ProductOffer::new(
                name,
                brand,
                image_url,
                original_price,
                sale_price,
                candidate.source_url,
            ),
            confidence,
            adjustments,
        })
    }
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;
