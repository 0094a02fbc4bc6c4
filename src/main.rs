//! Novelsmith main entry point
//!
//! This is the command-line interface for the Novelsmith novel crawler.

use anyhow::{bail, Context};
use clap::Parser;
use novelsmith::config::{load_config_with_hash, Config};
use novelsmith::crawler::{discover, run_crawl};
use novelsmith::output::{print_report, CrawlReport, DocumentSink, EpubSink};
use novelsmith::{NovelError, NovelSource, SourceKind};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Novelsmith: a polite serialized-fiction crawler
///
/// Novelsmith downloads a novel chapter by chapter from a supported site,
/// normalizes every chapter into clean paragraphs and packages the result
/// as an EPUB e-book.
#[derive(Parser, Debug)]
#[command(name = "novelsmith")]
#[command(version = "1.0.0")]
#[command(about = "Downloads web novels into EPUB e-books", long_about = None)]
struct Cli {
    /// Novel landing-page URL
    #[arg(value_name = "URL", required_unless_present = "list_sources")]
    url: Option<String>,

    /// Source key, host or menu number (detected from the URL by default)
    #[arg(short, long, value_name = "KEY")]
    source: Option<String>,

    /// First chapter to download (1-based, inclusive)
    #[arg(long, value_name = "N")]
    from: Option<usize>,

    /// Last chapter to download (1-based, inclusive)
    #[arg(long, value_name = "N")]
    to: Option<usize>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output directory (overrides the config file)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Parse metadata and list chapters without fetching content
    #[arg(long)]
    dry_run: bool,

    /// List supported sources and exit
    #[arg(long, conflicts_with = "dry_run")]
    list_sources: bool,

    /// Write an e-book from the chapters fetched before an interruption
    #[arg(long, conflicts_with = "dry_run")]
    keep_partial: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    if cli.list_sources {
        handle_list_sources();
        return Ok(());
    }

    let Some(url) = cli.url.as_deref() else {
        bail!("a novel URL is required");
    };

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };
    if let Some(dir) = &cli.output {
        config.output.directory = dir.display().to_string();
    }

    let kind = select_source(cli.source.as_deref(), url)?;
    tracing::info!("Using source {} ({})", kind, kind.description());
    let source = kind.build(&config).context("failed to set up HTTP session")?;

    if cli.dry_run {
        handle_dry_run(source.as_ref(), url, &cli, &config).await
    } else {
        handle_crawl(source.as_ref(), url, &cli, &config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("novelsmith=info,warn"),
            1 => EnvFilter::new("novelsmith=debug,info"),
            2 => EnvFilter::new("novelsmith=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Picks the source from `--source`, else from the URL host
fn select_source(key: Option<&str>, url: &str) -> anyhow::Result<SourceKind> {
    match key {
        Some(key) => Ok(key.parse::<SourceKind>()?),
        None => SourceKind::detect(url).with_context(|| {
            format!(
                "cannot detect the source for {}; pass --source (see --list-sources)",
                url
            )
        }),
    }
}

fn handle_list_sources() {
    println!("Supported sources:\n");
    for (index, kind) in SourceKind::all().iter().enumerate() {
        println!(
            "  {}. {:<12} {:<20} {}",
            index + 1,
            kind.key(),
            kind.host(),
            kind.description()
        );
    }
}

/// Handles --dry-run: shows what would be downloaded without fetching content
async fn handle_dry_run(source: &dyn NovelSource, url: &str, cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let discovery = discover(source, url, cli.from, cli.to, config).await?;
    let metadata = &discovery.metadata;

    println!("=== Novelsmith Dry Run ===\n");

    println!("Novel:");
    println!("  Title: {}", metadata.title);
    println!("  Author: {}", metadata.author);
    println!("  ID: {}", metadata.id);
    if let Some(total) = metadata.total_chapters {
        println!("  Announced chapters: {}", total);
    }
    if let Some(pages) = metadata.max_listing_pages {
        println!("  Listing pages: {}", pages);
    }
    println!(
        "  Cover: {}",
        if metadata.cover_image.is_some() { "yes" } else { "no" }
    );

    println!("\nChapters:");
    println!("  Listed: {}", discovery.listed);
    println!(
        "  Selected: {}-{} ({})",
        discovery.range.start,
        discovery.range.end,
        discovery.chapters.len()
    );
    if let Some(first) = discovery.chapters.first() {
        println!("  First: {} ({})", first.title, first.url);
    }
    if let Some(last) = discovery.chapters.last() {
        println!("  Last: {} ({})", last.title, last.url);
    }

    let sink = EpubSink::from_config(&config.output);
    println!("\n✓ Would write {}", sink.output_path(&metadata.title).display());

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(source: &dyn NovelSource, url: &str, cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current request");
            signal_token.cancel();
        }
    });

    let result = match run_crawl(source, url, cli.from, cli.to, config, cancel).await {
        Ok(result) => result,
        Err(NovelError::Interrupted) => {
            tracing::warn!("Interrupted before any chapter was fetched, nothing written");
            return Ok(());
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    let mut report = CrawlReport::new(&result.metadata, &result.outcome);

    let should_write = !result.outcome.records.is_empty() && (!result.outcome.interrupted || cli.keep_partial);
    if should_write {
        let sink = EpubSink::from_config(&config.output);
        let path = sink
            .write(&result.metadata, &result.outcome.records)
            .context("failed to write e-book")?;
        report = report.with_output(&path);
    } else if result.outcome.interrupted {
        tracing::warn!("Run interrupted, no e-book written (use --keep-partial to keep fetched chapters)");
    }

    print_report(&report);
    Ok(())
}
