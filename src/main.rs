mod analyzer;
mod caption;
mod chart;
mod config;
mod enrichment;
mod fetcher;
mod model;
mod notifier;
mod pipeline;
mod resolver;
mod sources;
mod utils;

use chrono::Utc;
use config::{load_config_or_default, Credentials};
use chart::SvgChartRenderer;
use enrichment::NewsEnricher;
use fetcher::{HttpFetch, ReqwestFetcher};
use notifier::build_publishers;
use pipeline::Pipeline;
use sources::SourceRegistry;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config.json";

#[tokio::main]
async fn main() -> ExitCode {
    // Credentials may come from a local .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = match load_config_or_default(&config_path) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("Config load error: {}", e);
            return ExitCode::from(2);
        }
    };
    let creds = Credentials::from_env();

    let fetcher: Arc<dyn HttpFetch> = match ReqwestFetcher::new(config.pacing.request_timeout()) {
        Ok(f) => Arc::new(f),
        Err(e) => {
            error!("Failed to initialize HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let registry = SourceRegistry::from_config(&config, &creds, fetcher.clone());
    let enricher = Arc::new(NewsEnricher::new(
        fetcher,
        creds.gnews_api_key.clone(),
        creds.groq_api_key.clone(),
        config.dry_run,
    ));
    let renderer = Arc::new(SvgChartRenderer::new(config.output_dir.clone()));
    let publishers = if config.dry_run {
        Vec::new()
    } else {
        build_publishers(&config.publish, &creds, config.pacing.request_timeout())
    };

    let pipeline = Pipeline::new(config, registry, enricher, renderer, publishers);
    match pipeline.run(Utc::now().date_naive()).await {
        Ok(outcome) => {
            if outcome.failed.is_empty() {
                info!("🏁 Done: {}", outcome.summary());
            } else {
                warn!("🏁 Done with failed sinks: {}", outcome.summary());
            }
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    }
}
