//! Headless-browser strategy: render the page in a fresh browser and read the
//! offer fields from the live DOM.

mod dom;
mod session;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::error::ExtractError;
use crate::strategy::{cancellable, Extracted, ExtractionContext, ExtractionRequest, Strategy};
use crate::url::absolutize_url;
use crate::validation::CandidateOffer;

pub use dom::{probe, MatchedSelector, ProbedPage};
pub use session::{BrowserLauncher, ChromiumLauncher, PageSession};

const BASE_CONFIDENCE: i32 = 70;
const MISSING_NAME_PENALTY: i32 = 30;
const MISSING_IMAGE_PENALTY: i32 = 20;
const MISSING_SALE_PRICE_PENALTY: i32 = 20;

/// Timeouts for one browser extraction.
#[derive(Debug, Clone, Copy)]
pub struct BrowserTimings {
    pub launch_timeout: Duration,
    pub navigation_timeout: Duration,
    pub settle: Duration,
}

impl Default for BrowserTimings {
    fn default() -> Self {
        Self {
            launch_timeout: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(30),
            settle: Duration::from_secs(2),
        }
    }
}

impl BrowserTimings {
    #[must_use]
    pub fn from_config(config: &saledesk_core::AppConfig) -> Self {
        Self {
            navigation_timeout: Duration::from_secs(config.browser_nav_timeout_secs),
            settle: Duration::from_millis(config.browser_settle_ms),
            ..Self::default()
        }
    }
}

pub struct BrowserStrategy {
    launcher: Arc<dyn BrowserLauncher>,
    timings: BrowserTimings,
}

impl BrowserStrategy {
    #[must_use]
    pub fn new(launcher: Arc<dyn BrowserLauncher>, timings: BrowserTimings) -> Self {
        Self { launcher, timings }
    }

    /// Navigates, waits out the settle delay, and returns the rendered HTML
    /// with the final URL.
    async fn render(
        &self,
        session: &mut dyn PageSession,
        request: &ExtractionRequest,
        ctx: &ExtractionContext,
    ) -> Result<(String, String), ExtractError> {
        let nav_timeout = self.timings.navigation_timeout;
        let navigate = async {
            tokio::time::timeout(nav_timeout, session.navigate(&request.url))
                .await
                .unwrap_or(Err(ExtractError::NavigationTimeout {
                    url: request.url.clone(),
                    timeout_secs: nav_timeout.as_secs(),
                }))
        };
        cancellable(&ctx.cancel, navigate).await?;

        let settle = self.timings.settle;
        cancellable(&ctx.cancel, async {
            tokio::time::sleep(settle).await;
            Ok(())
        })
        .await?;

        let read = async {
            tokio::time::timeout(nav_timeout, session.content())
                .await
                .unwrap_or(Err(ExtractError::Browser(
                    "timed out serializing the rendered page".to_string(),
                )))
        };
        let html = cancellable(&ctx.cancel, read).await?;

        let final_url = match tokio::time::timeout(nav_timeout, session.final_url()).await {
            Ok(Ok(Some(url))) if !url.is_empty() => url,
            _ => request.url.clone(),
        };

        Ok((html, final_url))
    }
}

/// Starting confidence from field presence alone.
fn presence_confidence(page: &ProbedPage) -> i32 {
    let mut confidence = BASE_CONFIDENCE;
    if page.name.is_none() {
        confidence -= MISSING_NAME_PENALTY;
    }
    if page.image_url.is_none() {
        confidence -= MISSING_IMAGE_PENALTY;
    }
    if page.sale_price.is_none_or(|p| p <= 0.0) {
        confidence -= MISSING_SALE_PRICE_PENALTY;
    }
    confidence
}

#[async_trait]
impl Strategy for BrowserStrategy {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn run(
        &self,
        request: &ExtractionRequest,
        ctx: &ExtractionContext,
    ) -> Result<Extracted, ExtractError> {
        let launch_timeout = self.timings.launch_timeout;
        let launch = async {
            tokio::time::timeout(launch_timeout, self.launcher.launch())
                .await
                .unwrap_or(Err(ExtractError::Browser(format!(
                    "browser did not start within {}s",
                    launch_timeout.as_secs()
                ))))
        };
        let mut session = cancellable(&ctx.cancel, launch).await?;

        let rendered = self.render(session.as_mut(), request, ctx).await;
        session.close().await;
        let (html, final_url) = rendered?;

        let page = probe(&html);
        let confidence = presence_confidence(&page);
        tracing::debug!(
            parent: &request.span,
            final_url = %final_url,
            html_len = html.len(),
            confidence,
            "page probed"
        );

        let candidate = CandidateOffer {
            name: page.name.clone(),
            brand: page.brand.clone(),
            image_url: page
                .image_url
                .as_deref()
                .and_then(|u| absolutize_url(&final_url, u)),
            original_price: page.original_price,
            sale_price: page.sale_price,
            source_url: request.url.clone(),
        };
        let validated = ctx.validation.validate(candidate, confidence)?;

        let diagnostics = json!({
            "finalUrl": final_url,
            "htmlLength": html.len(),
            "baseConfidence": confidence,
            "matchedSelectors": page.matched,
            "adjustments": validated.adjustments,
        });

        Ok(Extracted {
            offer: validated.offer,
            confidence: validated.confidence,
            diagnostics: Some(diagnostics),
        })
    }
}

#[cfg(test)]
#[path = "../browser_test.rs"]
mod tests;
