//! `extract` command: build the strategy chain from configuration, run the
//! batch, and print the result as JSON on stdout.

use std::sync::Arc;

use anyhow::Context;
use clap::ValueEnum;
use saledesk_core::{load_price_bands, AppConfig, PriceBands};
use saledesk_extract::{
    BrowserStrategy, BrowserTimings, ChromiumLauncher, ExtractionContext, ModelClient,
    OpenAiClient, Pipeline, RenderingProxyClient, RenderingProxyStrategy, Strategy,
    ValidationEngine,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum StrategyKind {
    /// Render in a fresh headless Chromium and probe the DOM
    Browser,
    /// Fetch through the rendering proxy and extract fields with the language model
    Proxy,
}

#[derive(Debug)]
pub(crate) struct ExtractArgs {
    pub urls: Vec<String>,
    pub strategies: Vec<StrategyKind>,
    pub diagnostics: bool,
    pub compact: bool,
}

/// Strategy order with duplicates removed; browser only when none was given.
pub(crate) fn strategy_chain(requested: &[StrategyKind]) -> Vec<StrategyKind> {
    let mut chain = Vec::new();
    for kind in requested {
        if !chain.contains(kind) {
            chain.push(*kind);
        }
    }
    if chain.is_empty() {
        chain.push(StrategyKind::Browser);
    }
    chain
}

fn build_pipeline(config: &AppConfig, chain: &[StrategyKind]) -> anyhow::Result<Pipeline> {
    let mut strategies: Vec<Arc<dyn Strategy>> = Vec::with_capacity(chain.len());
    for kind in chain {
        match kind {
            StrategyKind::Browser => {
                let launcher = ChromiumLauncher::new(config.browser_path.clone());
                strategies.push(Arc::new(BrowserStrategy::new(
                    Arc::new(launcher),
                    BrowserTimings::from_config(config),
                )));
            }
            StrategyKind::Proxy => {
                let client = RenderingProxyClient::from_config(config)
                    .context("the proxy strategy needs a rendering proxy client")?;
                strategies.push(Arc::new(RenderingProxyStrategy::new(client)));
            }
        }
    }
    Ok(Pipeline::new(strategies))
}

fn build_context(config: &AppConfig, chain: &[StrategyKind]) -> anyhow::Result<ExtractionContext> {
    let price_bands = match &config.price_bands_path {
        Some(path) => load_price_bands(path)
            .with_context(|| format!("failed to load price bands from {}", path.display()))?,
        None => PriceBands::default(),
    };

    let model: Option<Arc<dyn ModelClient>> = if chain.contains(&StrategyKind::Proxy) {
        let client = OpenAiClient::from_config(config)
            .context("the proxy strategy needs a language model client")?;
        Some(Arc::new(client))
    } else {
        None
    };

    Ok(ExtractionContext::new(model, ValidationEngine::new(price_bands)))
}

pub(crate) async fn run_extract(config: &AppConfig, args: ExtractArgs) -> anyhow::Result<()> {
    let chain = strategy_chain(&args.strategies);
    let pipeline = build_pipeline(config, &chain)?;
    let ctx = build_context(config, &chain)?;

    tracing::info!(
        urls = args.urls.len(),
        strategies = ?pipeline.strategy_names(),
        "starting extraction"
    );

    let cancel = ctx.cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling remaining extractions");
            cancel.cancel();
        }
    });

    let result = pipeline
        .extract_batch(&args.urls, &ctx, args.diagnostics)
        .await;
    interrupt.abort();

    let rendered = if args.compact {
        serde_json::to_string(&result)?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    println!("{rendered}");

    tracing::info!(
        succeeded = result.successes.len(),
        failed = result.failures.len() - result.skipped_count(),
        skipped = result.skipped_count(),
        "extraction complete"
    );
    Ok(())
}
