//! elmenu CLI - Menu tree builder.
//!
//! Provides commands for:
//! - `render`: Print a menu tree (or flat link list) as JSON
//! - `generate`: Bootstrap menus from an upstream navigation tree
//! - `clear-cache`: Drop cached menus

mod commands;
mod context;
mod error;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use elmenu_config::{CacheBackend, CliSettings, Config};
use elmenu_ratelimit::{DedupFilter, RateLimitFilter};
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use commands::{ClearCacheArgs, GenerateArgs, RenderArgs};
use context::AppContext;
use error::CliError;
use output::Output;

/// elmenu - Menu tree builder.
#[derive(Parser)]
#[command(name = "elmenu", version, about)]
struct Cli {
    /// Path to configuration file (default: auto-discover elmenu.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Menu store file (overrides config).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Disable caching.
    #[arg(long, global = true)]
    no_cache: bool,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a menu as JSON.
    Render(RenderArgs),
    /// Replace all menu items with menus generated from a navigation tree.
    Generate(GenerateArgs),
    /// Drop cached menus.
    ClearCache(ClearCacheArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    if let Err(err) = run(cli) {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let cli_settings = CliSettings {
        store_path: cli.store,
        cache_backend: cli.no_cache.then_some(CacheBackend::None),
    };
    let config = Config::load(cli.config.as_deref(), Some(&cli_settings))?;
    let cache = context::open_cache(&config);

    // --verbose enables INFO level, otherwise use RUST_LOG
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    let limiter = Arc::new(context::rate_limiter(&config, cache.as_ref()));
    tracing_subscriber::registry()
        .with(filter)
        .with(log_layer(std::io::stderr, limiter))
        .init();

    let context = AppContext::open(config, cache)?;
    match cli.command {
        Commands::Render(args) => args.execute(&context),
        Commands::Generate(args) => args.execute(&context),
        Commands::ClearCache(args) => args.execute(&context),
    }
}

/// Log output written to `writer`, with repeated ERROR events suppressed.
fn log_layer<S, W>(writer: W, limiter: Arc<RateLimitFilter>) -> impl Layer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_filter(DedupFilter::new(limiter))
}
