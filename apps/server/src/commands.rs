//! CLI definition, tracing setup, and server startup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;

use paperdigest_catalog::ArxivCatalog;
use paperdigest_core::{InProgress, PipelineDeps, orchestrator, pdf::PdfFetcher};
use paperdigest_oracle::OpenAiOracle;
use paperdigest_shared::{api_key, expand_home, load_config, load_config_from, today_utc};
use paperdigest_storage::Storage;

use crate::routes::{AppState, build_router};

/// Papers per category for the bulk pre-generation pass.
const BULK_MAX_PAPERS: usize = 50;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// paperdigest — daily arXiv paper digests with LLM ranking and enrichment.
#[derive(Parser)]
#[command(
    name = "paperdigest",
    version,
    about = "Serve daily LLM-curated arXiv paper digests.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Host to bind (overrides config).
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (overrides config).
    #[arg(long)]
    pub port: Option<u16>,

    /// Path to a config file (defaults to ~/.paperdigest/paperdigest.toml).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Generate a bulk batch for every category before serving.
    #[arg(long)]
    pub generate_bulk: bool,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "paperdigest=info",
        1 => "paperdigest=debug",
        _ => "paperdigest=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

/// Build collaborators from config and serve.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    // Missing credentials are fatal at startup.
    let key = api_key(&config)?;

    let data_dir = expand_home(&config.defaults.data_dir);
    let storage = Storage::open(&data_dir.join("paperdigest.db")).await?;
    let catalog = ArxivCatalog::new(config.defaults.fetch_days_back)?;
    let oracle = OpenAiOracle::new(&key, &config.openai.model, &config.openai.base_url);
    let pdf_fetcher = PdfFetcher::new(data_dir.join("paper_downloads"))?;

    let deps = Arc::new(PipelineDeps {
        storage: Arc::new(storage),
        source: Arc::new(catalog),
        oracle: Arc::new(oracle),
        tracker: Arc::new(InProgress::new()),
        pdf_fetcher: Some(Arc::new(pdf_fetcher)),
        // Text extraction is an injected collaborator; none ships by default.
        pdf_extractor: None,
        category_concurrency: config.defaults.category_concurrency as usize,
    });

    let categories = config.categories();

    if cli.generate_bulk {
        info!(
            categories = categories.len(),
            max_papers = BULK_MAX_PAPERS,
            "starting bulk generation"
        );
        let claimed: Vec<_> = categories
            .iter()
            .filter(|category| deps.tracker.try_begin(&category.code))
            .cloned()
            .collect();
        let records = orchestrator::run(
            Arc::clone(&deps),
            today_utc(),
            claimed,
            BULK_MAX_PAPERS,
        )
        .await;
        info!(records = records.len(), "bulk generation complete");
    }

    let state = AppState {
        deps,
        categories,
        default_max_papers: config.defaults.max_papers_per_category as usize,
    };

    let host = cli.host.unwrap_or_else(|| config.server.host.clone());
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, build_router(state)).await?;

    Ok(())
}
