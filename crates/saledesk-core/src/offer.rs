//! Offer and outcome types shared by every extraction strategy.
//!
//! [`ProductOffer`] and [`ExtractionOutcome`] keep their fields private so the
//! price-order and confidence-floor invariants can only be established through
//! their constructors.

use serde::Serialize;

/// Minimum confidence for an outcome to be reported as a success.
pub const CONFIDENCE_FLOOR: u8 = 50;

/// Extraction reliability estimate, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Confidence(u8);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0);

    /// Clamps an arbitrary score into `0..=100`.
    #[must_use]
    pub fn clamped(raw: i32) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = raw.clamp(0, 100) as u8;
        Self(value)
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn meets_floor(self) -> bool {
        self.0 >= CONFIDENCE_FLOOR
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discount percentage for a price pair.
///
/// `round((original - sale) / original * 100)` when an original price is
/// present and strictly greater than the sale price, otherwise `0`.
#[must_use]
pub fn percent_off(original: Option<f64>, sale: f64) -> u32 {
    match original {
        Some(o) if o.is_finite() && sale.is_finite() && o > sale && o > 0.0 => {
            let pct = ((o - sale) / o * 100.0).round();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let pct = pct.clamp(0.0, 100.0) as u32;
            pct
        }
        _ => 0,
    }
}

/// A structured offer extracted from one product page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductOffer {
    name: String,
    brand: Option<String>,
    image_url: String,
    original_price: Option<f64>,
    sale_price: f64,
    percent_off: u32,
    source_url: String,
}

impl ProductOffer {
    /// Builds an offer, nulling an original price that does not exceed the
    /// sale price and deriving the discount from what remains.
    #[must_use]
    pub fn new(
        name: String,
        brand: Option<String>,
        image_url: String,
        original_price: Option<f64>,
        sale_price: f64,
        source_url: String,
    ) -> Self {
        let original_price = original_price.filter(|o| *o > sale_price);
        Self {
            name,
            brand,
            image_url,
            original_price,
            sale_price,
            percent_off: percent_off(original_price, sale_price),
            source_url,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn brand(&self) -> Option<&str> {
        self.brand.as_deref()
    }

    #[must_use]
    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    #[must_use]
    pub fn original_price(&self) -> Option<f64> {
        self.original_price
    }

    #[must_use]
    pub fn sale_price(&self) -> f64 {
        self.sale_price
    }

    #[must_use]
    pub fn percent_off(&self) -> u32 {
        self.percent_off
    }

    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }
}

/// Failure taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NavigationTimeout,
    RenderTimeout,
    ParseFailure,
    ValidationFailure,
    LowConfidence,
    UpstreamAuth,
    UpstreamRateLimited,
    UpstreamError,
    Cancelled,
    /// Not attempted: an earlier URL on the same domain failed in this batch.
    Skipped,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::NavigationTimeout => "navigation_timeout",
            ErrorKind::RenderTimeout => "render_timeout",
            ErrorKind::ParseFailure => "parse_failure",
            ErrorKind::ValidationFailure => "validation_failure",
            ErrorKind::LowConfidence => "low_confidence",
            ErrorKind::UpstreamAuth => "upstream_auth",
            ErrorKind::UpstreamRateLimited => "upstream_rate_limited",
            ErrorKind::UpstreamError => "upstream_error",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Extraction {
    Success {
        offer: ProductOffer,
    },
    Failure {
        error_kind: ErrorKind,
        message: String,
        skipped: bool,
    },
}

/// What a strategy returns for one URL.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOutcome {
    url: String,
    strategy_name: String,
    elapsed_ms: u64,
    confidence: Confidence,
    #[serde(flatten)]
    result: Extraction,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<serde_json::Value>,
}

impl ExtractionOutcome {
    /// A successful outcome, coerced to [`ErrorKind::LowConfidence`] when
    /// `confidence` is below [`CONFIDENCE_FLOOR`].
    #[must_use]
    pub fn success(
        url: impl Into<String>,
        strategy_name: impl Into<String>,
        elapsed_ms: u64,
        offer: ProductOffer,
        confidence: Confidence,
    ) -> Self {
        if !confidence.meets_floor() {
            return Self::failure(
                url,
                strategy_name,
                elapsed_ms,
                ErrorKind::LowConfidence,
                format!("confidence too low ({confidence} < {CONFIDENCE_FLOOR})"),
            );
        }
        Self {
            url: url.into(),
            strategy_name: strategy_name.into(),
            elapsed_ms,
            confidence,
            result: Extraction::Success { offer },
            diagnostics: None,
        }
    }

    #[must_use]
    pub fn failure(
        url: impl Into<String>,
        strategy_name: impl Into<String>,
        elapsed_ms: u64,
        error_kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            strategy_name: strategy_name.into(),
            elapsed_ms,
            confidence: Confidence::ZERO,
            result: Extraction::Failure {
                error_kind,
                message: message.into(),
                skipped: false,
            },
            diagnostics: None,
        }
    }

    /// A failure recorded without invoking any strategy because `domain`
    /// already failed earlier in the batch.
    #[must_use]
    pub fn skipped(url: impl Into<String>, domain: &str) -> Self {
        Self {
            url: url.into(),
            strategy_name: "circuit_breaker".to_string(),
            elapsed_ms: 0,
            confidence: Confidence::ZERO,
            result: Extraction::Failure {
                error_kind: ErrorKind::Skipped,
                message: format!(
                    "skipped: an earlier URL on {domain} already failed in this batch"
                ),
                skipped: true,
            },
            diagnostics: None,
        }
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: serde_json::Value) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn strategy_name(&self) -> &str {
        &self.strategy_name
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    #[must_use]
    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    #[must_use]
    pub fn result(&self) -> &Extraction {
        &self.result
    }

    #[must_use]
    pub fn diagnostics(&self) -> Option<&serde_json::Value> {
        self.diagnostics.as_ref()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.result, Extraction::Success { .. })
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self.result, Extraction::Failure { skipped: true, .. })
    }

    #[must_use]
    pub fn offer(&self) -> Option<&ProductOffer> {
        match &self.result {
            Extraction::Success { offer } => Some(offer),
            Extraction::Failure { .. } => None,
        }
    }

    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.result {
            Extraction::Success { .. } => None,
            Extraction::Failure { error_kind, .. } => Some(*error_kind),
        }
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match &self.result {
            Extraction::Success { .. } => None,
            Extraction::Failure { message, .. } => Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(original: Option<f64>, sale: f64) -> ProductOffer {
        ProductOffer::new(
            "Ankle Boot".to_string(),
            None,
            "https://cdn.shop.test/boot.jpg".to_string(),
            original,
            sale,
            "https://shop.test/p/boot".to_string(),
        )
    }

    #[test]
    fn percent_off_rounds_to_nearest() {
        assert_eq!(percent_off(Some(400.0), 200.0), 50);
        assert_eq!(percent_off(Some(3.0), 2.0), 33);
        assert_eq!(percent_off(Some(129.99), 89.99), 31);
    }

    #[test]
    fn percent_off_is_zero_without_original() {
        assert_eq!(percent_off(None, 128.0), 0);
    }

    #[test]
    fn percent_off_is_zero_when_original_not_greater() {
        assert_eq!(percent_off(Some(300.0), 300.0), 0);
        assert_eq!(percent_off(Some(100.0), 150.0), 0);
    }

    #[test]
    fn offer_nulls_original_not_above_sale() {
        let o = offer(Some(300.0), 300.0);
        assert_eq!(o.original_price(), None);
        assert_eq!(o.percent_off(), 0);
    }

    #[test]
    fn offer_keeps_valid_original_and_derives_discount() {
        let o = offer(Some(400.0), 200.0);
        assert_eq!(o.original_price(), Some(400.0));
        assert_eq!(o.percent_off(), 50);
    }

    #[test]
    fn confidence_clamps_into_range() {
        assert_eq!(Confidence::clamped(-40).value(), 0);
        assert_eq!(Confidence::clamped(140).value(), 100);
        assert_eq!(Confidence::clamped(72).value(), 72);
    }

    #[test]
    fn success_below_floor_becomes_low_confidence_failure() {
        let outcome = ExtractionOutcome::success(
            "https://shop.test/p/boot",
            "browser",
            10,
            offer(None, 128.0),
            Confidence::clamped(49),
        );
        assert!(!outcome.is_success());
        assert_eq!(outcome.error_kind(), Some(ErrorKind::LowConfidence));
        assert_eq!(outcome.confidence(), Confidence::ZERO);
        assert!(outcome.message().unwrap().contains("confidence too low"));
    }

    #[test]
    fn success_at_floor_is_kept() {
        let outcome = ExtractionOutcome::success(
            "https://shop.test/p/boot",
            "browser",
            10,
            offer(None, 128.0),
            Confidence::clamped(50),
        );
        assert!(outcome.is_success());
        assert_eq!(outcome.confidence().value(), 50);
    }

    #[test]
    fn skipped_outcome_names_domain() {
        let outcome = ExtractionOutcome::skipped("https://example-store.com/b", "example-store.com");
        assert!(outcome.is_skipped());
        assert_eq!(outcome.error_kind(), Some(ErrorKind::Skipped));
        assert!(outcome.message().unwrap().contains("example-store.com"));
    }

    #[test]
    fn outcome_serializes_flat_shape() {
        let outcome = ExtractionOutcome::success(
            "https://shop.test/p/boot",
            "browser",
            1200,
            offer(Some(400.0), 200.0),
            Confidence::clamped(80),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["strategyName"], "browser");
        assert_eq!(json["confidence"], 80);
        assert_eq!(json["offer"]["percentOff"], 50);
        assert_eq!(json["offer"]["originalPrice"], 400.0);
        assert!(json.get("diagnostics").is_none());
    }

    #[test]
    fn failure_serializes_error_kind() {
        let outcome = ExtractionOutcome::failure(
            "https://shop.test/p/boot",
            "proxy",
            90_000,
            ErrorKind::RenderTimeout,
            "rendering proxy did not respond within 90s",
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["errorKind"], "render_timeout");
        assert_eq!(json["skipped"], false);
        assert_eq!(json["confidence"], 0);
    }
}
