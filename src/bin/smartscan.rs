//! Server binary for smartscan-auditor.
//!
//! A thin shim over the library crate: loads `.env`, reads the environment
//! into an `AuditorConfig`, applies CLI overrides, installs logging and serves.

use anyhow::{Context, Result};
use clap::Parser;
use smartscan_auditor::{serve, AppState, AuditorConfig, ReceiptAnalyzer};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default address with a Gemini key
  GEMINI_API_KEY=... smartscan

  # Try the UI without calling any model
  smartscan --demo

  # Analyse a receipt
  curl -F "file=@receipt.jpg" http://127.0.0.1:8000/api/analyze

ENVIRONMENT VARIABLES (also read from ./.env):
  GEMINI_API_KEY          Gemini credential (required unless demo mode)
  DEMO_MODE               1 / true / yes: return a canned result, no AI call
  SMARTSCAN_PROVIDER      Provider name (default: gemini); others read their
                          own key, e.g. OPENAI_API_KEY
  SMARTSCAN_MODEL         Model ID (default: gemini-3-flash-preview)
  SMARTSCAN_RENDER_WIDTH  Pixel width for rasterised PDF pages (default: 2000)
  SMARTSCAN_STATIC_DIR    Directory with index.html and assets (default: static)
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory) for PDF uploads
"#;

/// Categorise expense receipts with a Vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "smartscan",
    version,
    about = "Receipt upload service that categorises expenses using a Vision LLM",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "SMARTSCAN_HOST", default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to listen on.
    #[arg(short, long, env = "SMARTSCAN_PORT", default_value_t = 8000)]
    port: u16,

    /// Directory holding index.html and static assets.
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Vision model ID (overrides SMARTSCAN_MODEL).
    #[arg(long)]
    model: Option<String>,

    /// Provider name (overrides SMARTSCAN_PROVIDER).
    #[arg(long)]
    provider: Option<String>,

    /// Force demo mode: canned results, no provider calls.
    #[arg(long)]
    demo: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Real environment variables win over .env entries.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli).context("Invalid configuration")?;
    info!("Configuration: {:?}", config);

    let analyzer =
        ReceiptAnalyzer::from_config(config).context("Failed to initialise the LLM provider")?;

    if analyzer.config().demo_mode {
        info!("Demo mode enabled: no AI calls will be made");
    } else if !analyzer.provider_ready() {
        warn!("No provider credential; /api/analyze will answer 500 until one is set");
    }

    // ── Serve ────────────────────────────────────────────────────────────
    let addr = SocketAddr::new(cli.host, cli.port);
    serve(addr, AppState::new(analyzer))
        .await
        .with_context(|| format!("Server on {} failed", addr))?;

    Ok(())
}

/// Read the environment, then apply CLI overrides.
fn build_config(cli: &Cli) -> Result<AuditorConfig> {
    let base = AuditorConfig::from_env()?;

    let mut builder = AuditorConfig::builder()
        .demo_mode(base.demo_mode || cli.demo)
        .provider_name(cli.provider.clone().unwrap_or(base.provider_name))
        .model(cli.model.clone().unwrap_or(base.model))
        .temperature(base.temperature)
        .max_tokens(base.max_tokens)
        .render_width(base.render_width)
        .static_dir(cli.static_dir.clone().unwrap_or(base.static_dir));

    if let Some(key) = base.api_key {
        builder = builder.api_key(key);
    }
    if let Some(path) = base.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path);
    }

    Ok(builder.build()?)
}
