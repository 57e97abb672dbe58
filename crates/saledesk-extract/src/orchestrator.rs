//! Runs strategies over URLs and aggregates the outcomes.

use std::sync::Arc;

use saledesk_core::{ErrorKind, ExtractionOutcome};
use serde::Serialize;
use tracing::Instrument;

use crate::breaker::DomainFailureSet;
use crate::strategy::{ExtractionContext, ExtractionRequest, Strategy};
use crate::url::normalize_host;

const PIPELINE: &str = "pipeline";

/// Outcomes of one batch, partitioned by result. Every input URL appears in
/// exactly one of the two lists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub successes: Vec<ExtractionOutcome>,
    pub failures: Vec<ExtractionOutcome>,
    pub total: usize,
}

impl BatchResult {
    /// Failures recorded by the circuit breaker without running a strategy.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.failures.iter().filter(|o| o.is_skipped()).count()
    }
}

/// An ordered chain of strategies. For each URL the first success wins; if
/// every strategy fails, the last failure is reported.
#[derive(Clone)]
pub struct Pipeline {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl Pipeline {
    #[must_use]
    pub fn new(strategies: Vec<Arc<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    #[must_use]
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Extracts a single URL through the strategy chain.
    pub async fn extract_product(
        &self,
        url: &str,
        ctx: &ExtractionContext,
        diagnostics: bool,
    ) -> ExtractionOutcome {
        if normalize_host(url).is_none() {
            return invalid_url(url);
        }
        self.run_chain(url, ctx, diagnostics).await
    }

    /// Extracts `urls` sequentially, in order.
    ///
    /// After the first failure on a host, every later URL on that host is
    /// recorded as skipped without invoking any strategy. Breaker state lives
    /// only for this call.
    pub async fn extract_batch(
        &self,
        urls: &[String],
        ctx: &ExtractionContext,
        diagnostics: bool,
    ) -> BatchResult {
        let mut breaker = DomainFailureSet::new();
        let mut successes = Vec::new();
        let mut failures = Vec::new();

        for url in urls {
            if ctx.cancel.is_cancelled() {
                failures.push(ExtractionOutcome::failure(
                    url.as_str(),
                    PIPELINE,
                    0,
                    ErrorKind::Cancelled,
                    "batch cancelled before this URL was attempted",
                ));
                continue;
            }

            let Some(host) = normalize_host(url) else {
                tracing::warn!(url = %url, "skipping unparsable URL");
                failures.push(invalid_url(url));
                continue;
            };

            if breaker.is_open(&host) {
                tracing::info!(url = %url, domain = %host, "domain already failed in this batch, skipping");
                failures.push(ExtractionOutcome::skipped(url.as_str(), &host));
                continue;
            }

            let outcome = self.run_chain(url, ctx, diagnostics).await;
            if outcome.is_success() {
                successes.push(outcome);
            } else {
                if breaker.record_failure(&host) {
                    tracing::info!(domain = %host, "circuit opened for domain");
                }
                failures.push(outcome);
            }
        }

        let result = BatchResult {
            successes,
            failures,
            total: urls.len(),
        };
        tracing::info!(
            total = result.total,
            succeeded = result.successes.len(),
            failed = result.failures.len(),
            skipped = result.skipped_count(),
            tripped_domains = breaker.len(),
            "batch finished"
        );
        result
    }

    async fn run_chain(
        &self,
        url: &str,
        ctx: &ExtractionContext,
        diagnostics: bool,
    ) -> ExtractionOutcome {
        let request = ExtractionRequest::new(url, diagnostics);
        let span = request.span.clone();

        async {
            let mut last_failure = None;
            for strategy in &self.strategies {
                let outcome = strategy.extract(&request, ctx).await;
                if outcome.is_success() || outcome.error_kind() == Some(ErrorKind::Cancelled) {
                    return outcome;
                }
                last_failure = Some(outcome);
            }
            last_failure.unwrap_or_else(|| {
                ExtractionOutcome::failure(
                    url,
                    PIPELINE,
                    0,
                    ErrorKind::UpstreamError,
                    "no extraction strategies configured",
                )
            })
        }
        .instrument(span)
        .await
    }
}

fn invalid_url(url: &str) -> ExtractionOutcome {
    ExtractionOutcome::failure(
        url,
        PIPELINE,
        0,
        ErrorKind::ValidationFailure,
        format!("invalid URL: {url}"),
    )
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
