//! The contract every extraction technique implements.
//!
//! Implementors provide [`Strategy::run`], a plain fallible method. Callers use
//! [`Strategy::extract`], which never fails: it times the call, turns every
//! error and panic into a failure outcome, and applies the confidence floor.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;
use saledesk_core::{Confidence, ErrorKind, ExtractionOutcome, ProductOffer};
use tokio_util::sync::CancellationToken;

use crate::error::ExtractError;
use crate::model::ModelClient;
use crate::validation::ValidationEngine;

/// One URL to extract. `span` is the logging sink for everything done on
/// behalf of this request.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub url: String,
    pub diagnostics: bool,
    pub span: tracing::Span,
}

impl ExtractionRequest {
    #[must_use]
    pub fn new(url: impl Into<String>, diagnostics: bool) -> Self {
        let url = url.into();
        let span = tracing::info_span!("extract", url = %url);
        Self {
            url,
            diagnostics,
            span,
        }
    }
}

/// Shared handles passed to every strategy call.
#[derive(Clone)]
pub struct ExtractionContext {
    pub model: Option<Arc<dyn ModelClient>>,
    pub validation: Arc<ValidationEngine>,
    pub cancel: CancellationToken,
}

impl ExtractionContext {
    #[must_use]
    pub fn new(model: Option<Arc<dyn ModelClient>>, validation: ValidationEngine) -> Self {
        Self {
            model,
            validation: Arc::new(validation),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl std::fmt::Debug for ExtractionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionContext")
            .field("model", &self.model.as_ref().map(|_| "ModelClient"))
            .field("validation", &self.validation)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// A validated offer returned by [`Strategy::run`].
#[derive(Debug, Clone)]
pub struct Extracted {
    pub offer: ProductOffer,
    pub confidence: Confidence,
    pub diagnostics: Option<serde_json::Value>,
}

#[async_trait]
pub trait Strategy: Send + Sync {
    /// Short identifier reported in outcomes and logs.
    fn name(&self) -> &'static str;

    /// Performs the extraction. Resources acquired here must be released
    /// before returning, on success and on error alike.
    async fn run(
        &self,
        request: &ExtractionRequest,
        ctx: &ExtractionContext,
    ) -> Result<Extracted, ExtractError>;

    /// Runs the strategy and normalizes whatever happens into an outcome.
    async fn extract(
        &self,
        request: &ExtractionRequest,
        ctx: &ExtractionContext,
    ) -> ExtractionOutcome {
        let started = Instant::now();
        let result = AssertUnwindSafe(self.run(request, ctx)).catch_unwind().await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let name = self.name();

        match result {
            Ok(Ok(extracted)) => {
                let outcome = ExtractionOutcome::success(
                    &request.url,
                    name,
                    elapsed_ms,
                    extracted.offer,
                    extracted.confidence,
                );
                let outcome = match extracted.diagnostics {
                    Some(d) if request.diagnostics => outcome.with_diagnostics(d),
                    _ => outcome,
                };
                tracing::info!(
                    parent: &request.span,
                    strategy = name,
                    elapsed_ms,
                    confidence = outcome.confidence().value(),
                    success = outcome.is_success(),
                    "strategy finished"
                );
                outcome
            }
            Ok(Err(err)) => {
                let kind = err.kind();
                tracing::warn!(
                    parent: &request.span,
                    strategy = name,
                    elapsed_ms,
                    error_kind = %kind,
                    error = %err,
                    "strategy failed"
                );
                ExtractionOutcome::failure(&request.url, name, elapsed_ms, kind, err.to_string())
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(
                    parent: &request.span,
                    strategy = name,
                    elapsed_ms,
                    panic = %message,
                    "strategy panicked"
                );
                ExtractionOutcome::failure(
                    &request.url,
                    name,
                    elapsed_ms,
                    ErrorKind::UpstreamError,
                    format!("strategy panicked: {message}"),
                )
            }
        }
    }
}

/// Races `work` against cancellation of `cancel`.
///
/// Dropping the losing future aborts any in-flight navigation or HTTP request;
/// callers run their cleanup after this returns.
pub(crate) async fn cancellable<T, F>(
    cancel: &CancellationToken,
    work: F,
) -> Result<T, ExtractError>
where
    F: std::future::Future<Output = Result<T, ExtractError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ExtractError::Cancelled),
        result = work => result,
    }
}
