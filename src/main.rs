//! StockCast forecasting service
//!
//! Serves the forecast API, or runs one-off registry and forecast commands.

use clap::{Parser, Subcommand};
use stockcast::{
    api::{self, PredictRequest},
    artifacts::{ArtifactCache, ArtifactLayout, ArtifactSource, HubSource, LocalSource},
    config::Config,
    forecast::ForecastService,
    model::loader_for,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stockcast")]
#[command(about = "Multi-horizon stock price forecasting service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (default)
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List trading codes with per-instrument models
    Codes {
        /// Number of codes to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Forecast from a JSON request file and print the response
    Predict {
        /// Request body as sent to /api/predict
        #[arg(short, long)]
        input: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Codes { limit } => show_codes(config, limit).await,
        Commands::Predict { input } => predict_file(config, &input).await,
    }
}

fn build_service(config: &Config) -> anyhow::Result<Arc<ForecastService>> {
    let source: Arc<dyn ArtifactSource> = match config.registry.local_path() {
        Some(root) => {
            tracing::info!("Serving artifacts from {}", root.display());
            Arc::new(LocalSource::new(root))
        }
        None => Arc::new(HubSource::new(&config.registry)?),
    };
    let loader = loader_for(config.registry.model_format)?;
    let layout = ArtifactLayout::new(&config.registry, config.forecast.window_length);
    let cache = Arc::new(ArtifactCache::new(source, loader, layout));

    Ok(Arc::new(ForecastService::new(cache, config.forecast.clone())))
}

async fn serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    tracing::info!("Starting StockCast forecasting service");
    let service = build_service(&config)?;
    let port = port.unwrap_or(config.server.port);
    api::serve(service, &config.server.host, port).await?;
    Ok(())
}

async fn show_codes(config: Config, limit: Option<usize>) -> anyhow::Result<()> {
    let service = build_service(&config)?;
    let codes = service.list_trading_codes(limit).await;

    if codes.is_empty() {
        println!("No trading codes found in {}", config.registry.separate_repo);
    }
    for code in codes {
        println!("{}", code);
    }
    Ok(())
}

async fn predict_file(config: Config, input: &str) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(input).await?;
    let request: PredictRequest = serde_json::from_str(&raw)?;

    let service = build_service(&config)?;
    let response = api::predict(&service, request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
