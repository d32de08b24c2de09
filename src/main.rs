use anyhow::{Context, Result};
use avcap::{
    config::AppConfig,
    logging,
    scraper::{
        CategoryRouter, DiskStore, HttpClient, Parser as NameParser, PluginRegistry, Scanner,
        ScraperCache,
    },
    services::{Capture, JsonLinesSink},
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "avcap")]
#[command(about = "Identify video releases from file names and scrape their metadata")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a directory and print one JSON line per verified record
    Scan {
        /// Configuration file (TOML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory to scan, overrides `scan_dir`
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Print the identities extracted from file names
    Parse {
        /// Configuration file, for noise rules
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Scan { config, dir } => scan(config, dir).await,
        Command::Parse { config, names } => parse(config, &names),
    }
}

async fn scan(config: Option<PathBuf>, dir: Option<PathBuf>) -> Result<()> {
    let mut config = AppConfig::load(config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = dir {
        config.scan_dir = dir;
    }
    let _guard = logging::init(&config.log).context("Failed to initialize logging")?;

    let transport = Arc::new(
        HttpClient::new(config.network.timeout(), config.network.proxy.as_deref())
            .context("Failed to build HTTP client")?,
    );
    let cache = Arc::new(
        ScraperCache::new(Arc::new(DiskStore::new(config.cache_dir())))
            .with_page_cache(config.cache.enable_page_cache)
            .with_page_ttl(config.cache.page_ttl()),
    );
    let router = CategoryRouter::from_config(
        &PluginRegistry::with_defaults(),
        &config.plugins,
        &config.category_chains(),
        &config.plugin_config,
        cache,
        transport,
    )
    .context("Invalid plugin configuration")?;

    let capture = Capture::new(
        Scanner::new().with_extra_extensions(&config.extra_media_exts),
        NameParser::new(config.noise_rules()?),
        Arc::new(router),
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current request");
            on_signal.cancel();
        }
    });

    info!(dir = %config.scan_dir.display(), "starting capture");
    let mut sink = JsonLinesSink::new(std::io::stdout());
    let summary = capture
        .run(&config.scan_dir, &mut sink, &cancel)
        .await
        .with_context(|| format!("Capture failed in {}", config.scan_dir.display()))?;

    eprintln!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn parse(config: Option<PathBuf>, names: &[String]) -> Result<()> {
    let config = AppConfig::load(config.as_deref()).context("Failed to load configuration")?;
    let parser = NameParser::new(config.noise_rules()?);

    for name in names {
        let line = match parser.parse(name) {
            Ok(identity) => serde_json::json!({
                "name": name,
                "identity": identity,
                "file_name_base": identity.file_name_base(),
                "tags": identity.tags(),
            }),
            Err(e) => serde_json::json!({ "name": name, "error": e.to_string() }),
        };
        println!("{line}");
    }
    Ok(())
}
