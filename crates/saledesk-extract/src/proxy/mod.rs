//! Rendering-proxy strategy: fetch through a managed rendering service, reduce
//! the HTML, and let a [`FieldExtractor`] read the offer fields.

mod client;
mod excerpt;
mod fields;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::error::ExtractError;
use crate::strategy::{cancellable, Extracted, ExtractionContext, ExtractionRequest, Strategy};
use crate::validation::{is_placeholder_image, CandidateOffer};

pub use client::RenderingProxyClient;
pub use excerpt::{build_excerpt, find_image_hint, MAX_EXCERPT_CHARS};
pub use fields::{parse_fields, ExtractedFields, FieldExtractor, ModelFieldExtractor, PageExcerpt};

/// Extra time allowed beyond the client timeout before the fetch is abandoned.
const FETCH_GRACE_SECS: u64 = 5;

pub struct RenderingProxyStrategy {
    client: RenderingProxyClient,
    extractor: Arc<dyn FieldExtractor>,
}

impl RenderingProxyStrategy {
    /// Uses the language model carried by the extraction context.
    #[must_use]
    pub fn new(client: RenderingProxyClient) -> Self {
        Self::with_extractor(client, Arc::new(ModelFieldExtractor))
    }

    #[must_use]
    pub fn with_extractor(client: RenderingProxyClient, extractor: Arc<dyn FieldExtractor>) -> Self {
        Self { client, extractor }
    }
}

#[async_trait]
impl Strategy for RenderingProxyStrategy {
    fn name(&self) -> &'static str {
        "proxy"
    }

    async fn run(
        &self,
        request: &ExtractionRequest,
        ctx: &ExtractionContext,
    ) -> Result<Extracted, ExtractError> {
        let session_id: u32 = rand::random_range(1..10_000_000);
        let timeout_secs = self.client.timeout_secs();

        tracing::debug!(
            parent: &request.span,
            session_id,
            "fetching through rendering proxy"
        );

        let fetch = async {
            tokio::time::timeout(
                Duration::from_secs(timeout_secs + FETCH_GRACE_SECS),
                self.client.fetch(&request.url, session_id),
            )
            .await
            .unwrap_or(Err(ExtractError::RenderTimeout { timeout_secs }))
        };
        let html = cancellable(&ctx.cancel, fetch).await?;

        let page = PageExcerpt {
            url: request.url.clone(),
            excerpt: build_excerpt(&html, MAX_EXCERPT_CHARS),
            image_hint: find_image_hint(&html, &request.url),
        };
        tracing::debug!(
            parent: &request.span,
            html_len = html.len(),
            excerpt_len = page.excerpt.len(),
            has_image_hint = page.image_hint.is_some(),
            "page reduced"
        );

        let fields = cancellable(&ctx.cancel, self.extractor.extract(&page, ctx)).await?;

        // The pattern-matched og:image is preferred over whatever the model chose,
        // unless the hint itself is a placeholder.
        let image_url = page
            .image_hint
            .clone()
            .filter(|hint| !is_placeholder_image(hint))
            .or_else(|| {
                fields
                    .image_url
                    .as_deref()
                    .and_then(|u| crate::url::absolutize_url(&request.url, u))
            });

        let candidate = CandidateOffer {
            name: fields.name,
            brand: fields.brand,
            image_url,
            original_price: fields.original_price,
            sale_price: fields.sale_price,
            source_url: request.url.clone(),
        };
        let validated = ctx.validation.validate(candidate, fields.confidence)?;

        let diagnostics = json!({
            "sessionId": session_id,
            "fieldExtractor": self.extractor.name(),
            "htmlLength": html.len(),
            "excerptLength": page.excerpt.len(),
            "imageHint": page.image_hint,
            "reportedConfidence": fields.confidence,
            "adjustments": validated.adjustments,
        });

        Ok(Extracted {
            offer: validated.offer,
            confidence: validated.confidence,
            diagnostics: Some(diagnostics),
        })
    }
}
