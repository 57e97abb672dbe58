mod extract;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::extract::{ExtractArgs, StrategyKind};

#[derive(Debug, Parser)]
#[command(name = "saledesk-cli")]
#[command(about = "Extract structured sale offers from retail product pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract offers from one or more product page URLs
    Extract {
        /// Product page URLs, processed in the order given
        #[arg(required = true)]
        urls: Vec<String>,
        /// Strategy to try; repeat to build a fallback chain (default: browser)
        #[arg(long = "strategy", value_enum)]
        strategies: Vec<StrategyKind>,
        /// Include per-strategy diagnostics in the output
        #[arg(long)]
        diagnostics: bool,
        /// Print single-line JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = saledesk_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    if config.env.structured_logs() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Extract {
            urls,
            strategies,
            diagnostics,
            compact,
        } => {
            let args = ExtractArgs {
                urls,
                strategies,
                diagnostics,
                compact,
            };
            extract::run_extract(&config, args).await
        }
    }
}
