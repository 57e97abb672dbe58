//! Structured field extraction from a reduced page excerpt.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::ExtractError;
use crate::model::{first_json_object, CompletionRequest};
use crate::price::price_from_json;
use crate::strategy::ExtractionContext;

/// The reduced page handed to a [`FieldExtractor`].
#[derive(Debug, Clone)]
pub struct PageExcerpt {
    pub url: String,
    pub excerpt: String,
    pub image_hint: Option<String>,
}

/// Offer fields as reported by an extractor, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub original_price: Option<f64>,
    pub sale_price: Option<f64>,
    pub confidence: i32,
}

/// Turns a page excerpt into offer fields.
///
/// The rendering-proxy strategy is agnostic to how this happens; a
/// deterministic parser for a known storefront can replace the model-backed
/// implementation without any other change.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// # Errors
    ///
    /// - [`ExtractError::Parse`] when the extractor's output has no usable shape.
    /// - [`ExtractError::Validation`] when the extractor reports the required
    ///   fields are not present on the page.
    async fn extract(
        &self,
        page: &PageExcerpt,
        ctx: &ExtractionContext,
    ) -> Result<ExtractedFields, ExtractError>;
}

const SYSTEM_PROMPT: &str = r#"You extract a single retail product offer from an HTML excerpt of a product page. Respond with one JSON object and nothing else.

Output shape on success:
{"name": string, "brand": string|null, "imageUrl": string|null, "originalPrice": number|null, "salePrice": number, "confidence": integer 0-100}

Price rules:
- salePrice is the price the shopper pays now. originalPrice is the higher reference price: "was", "reg.", "orig.", "compare at", "list", "MSRP", or any struck-through value (<s>, <del>, <strike>, line-through styling).
- Department stores mark prices with attributes such as data-testid="current-price"/"original-price", data-auto-id, itemprop="price"/"highPrice", classes like price-sale, price--reduced, price-was, price-standard, regular-price, compare-at-price, markdown-price. Use these markers together with the visible text.
- If only one price is shown, it is salePrice and originalPrice is null. Never invent an originalPrice.
- Prices are plain numbers without currency symbols or thousands separators.

Image rules:
- imageUrl must be the main product photo URL that appears in the excerpt. If an image hint is supplied and it is a product photo, prefer it.
- Never return placeholder or demo images (placehold.co, via.placeholder.com, placekitten.com, dummyimage.com, picsum.photos, example.com, data: URLs). Use null instead.

Confidence: your own 0-100 estimate that every returned field is correct.

If the product name or the sale price is not visibly present in the excerpt, do not guess. Return {"error": {"reason": "<what is missing>"}} instead."#;

/// [`FieldExtractor`] backed by the context's language-model client.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModelFieldExtractor;

#[async_trait]
impl FieldExtractor for ModelFieldExtractor {
    fn name(&self) -> &'static str {
        "model"
    }

    async fn extract(
        &self,
        page: &PageExcerpt,
        ctx: &ExtractionContext,
    ) -> Result<ExtractedFields, ExtractError> {
        let model = ctx
            .model
            .as_ref()
            .ok_or(ExtractError::NotConfigured("language model client"))?;

        let request = CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: user_prompt(page),
        };
        let raw = model.complete(&request).await?;
        tracing::debug!(url = %page.url, response_len = raw.len(), "model response received");
        parse_fields(&raw)
    }
}

fn user_prompt(page: &PageExcerpt) -> String {
    let hint = page.image_hint.as_deref().unwrap_or("none");
    format!(
        "Page URL: {}\nImage hint (og:image): {hint}\n\nHTML excerpt:\n{}",
        page.url, page.excerpt
    )
}

/// Interprets a model response as [`ExtractedFields`].
///
/// # Errors
///
/// - [`ExtractError::Parse`] when no JSON object can be found.
/// - [`ExtractError::Validation`] when the model returned an error object.
pub fn parse_fields(raw: &str) -> Result<ExtractedFields, ExtractError> {
    let obj = first_json_object(raw)
        .ok_or_else(|| ExtractError::Parse("no JSON object in model response".to_string()))?;

    if let Some(err) = obj.get("error").filter(|v| !v.is_null()) {
        let reason = err
            .get("reason")
            .and_then(Value::as_str)
            .or_else(|| err.as_str())
            .unwrap_or("fields not present");
        return Err(ExtractError::Validation(format!(
            "model declined extraction: {reason}"
        )));
    }

    let confidence = obj
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .ok_or_else(|| ExtractError::Parse("model response has no numeric confidence".to_string()))?;
    #[allow(clippy::cast_possible_truncation)]
    let confidence = confidence.round().clamp(-1000.0, 1000.0) as i32;

    Ok(ExtractedFields {
        name: string_field(&obj, &["name", "productName", "title"]),
        brand: string_field(&obj, &["brand", "brandName"]),
        image_url: string_field(&obj, &["imageUrl", "image_url", "image"]),
        original_price: price_field(&obj, &["originalPrice", "original_price", "wasPrice"]),
        sale_price: price_field(&obj, &["salePrice", "sale_price", "price"]),
        confidence,
    })
}

fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        .map(str::to_string)
}

fn price_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| obj.get(*k).and_then(price_from_json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_response() {
        let raw = r#"{"name":"Ankle Boot","brand":"Sam Edelman","imageUrl":"https://cdn.shop.test/boot.jpg","originalPrice":400,"salePrice":"$200.00","confidence":88}"#;
        let fields = parse_fields(raw).unwrap();
        assert_eq!(fields.name.as_deref(), Some("Ankle Boot"));
        assert_eq!(fields.brand.as_deref(), Some("Sam Edelman"));
        assert_eq!(fields.original_price, Some(400.0));
        assert_eq!(fields.sale_price, Some(200.0));
        assert_eq!(fields.confidence, 88);
    }

    #[test]
    fn error_object_is_a_validation_failure() {
        let raw = r#"{"error": {"reason": "sale price not visible"}}"#;
        let err = parse_fields(raw).unwrap_err();
        assert!(matches!(err, ExtractError::Validation(ref m) if m.contains("sale price not visible")));
    }

    #[test]
    fn prose_without_object_is_a_parse_failure() {
        let err = parse_fields("I could not find a product on this page.").unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
    }

    #[test]
    fn missing_confidence_is_a_parse_failure() {
        let err = parse_fields(r#"{"name":"Boot","salePrice":10}"#).unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
    }

    #[test]
    fn null_fields_stay_absent() {
        let raw = r#"{"name":"Boot","brand":null,"imageUrl":null,"originalPrice":null,"salePrice":10,"confidence":70}"#;
        let fields = parse_fields(raw).unwrap();
        assert!(fields.brand.is_none());
        assert!(fields.image_url.is_none());
        assert!(fields.original_price.is_none());
    }

    #[test]
    fn user_prompt_includes_hint_and_excerpt() {
        let page = PageExcerpt {
            url: "https://shop.test/p/1".to_string(),
            excerpt: "<h1>Boot</h1>".to_string(),
            image_hint: Some("https://cdn.shop.test/a.jpg".to_string()),
        };
        let prompt = user_prompt(&page);
        assert!(prompt.contains("https://cdn.shop.test/a.jpg"));
        assert!(prompt.contains("<h1>Boot</h1>"));
    }
}
