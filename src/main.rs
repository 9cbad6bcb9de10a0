//! Site-Mirror main entry point
//!
//! This is the command-line interface for the Site-Mirror static site mirroring tool.

use anyhow::Context;
use clap::Parser;
use site_mirror::config::{load_config_with_hash, load_seed_list, Config};
use site_mirror::crawler::mirror_site;
use site_mirror::output::print_statistics;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Site-Mirror: downloads a site's pages and same-domain assets
///
/// Site-Mirror reads a list of seed pages, downloads each one along with the
/// scripts, images and stylesheets it references on the target domain, and
/// writes everything into a local directory that mirrors the URL paths.
#[derive(Parser, Debug)]
#[command(name = "site-mirror")]
#[command(version)]
#[command(about = "A same-domain static site mirroring tool", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and list the seed pages without downloading anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else {
        handle_mirror(&config, cli.quiet).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_mirror=info,warn"),
            1 => EnvFilter::new("site_mirror=debug,info"),
            2 => EnvFilter::new("site_mirror=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be mirrored
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let seeds = load_seed_list(&config.input.pages_file).with_context(|| {
        format!(
            "failed to read seed list {}",
            config.input.pages_file.display()
        )
    })?;

    println!("=== Site-Mirror Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Target domain: {}", config.crawler.target_domain);
    println!(
        "  Max concurrent downloads: {}",
        config.crawler.max_concurrent_downloads
    );
    println!("  Download timeout: {}ms", config.crawler.download_timeout_ms);
    println!("  Follow HTML links: {}", config.crawler.follow_html_links);

    println!("\nRetry:");
    println!("  Strategy: {:?}", config.retry.strategy);
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!(
        "  Backoff: {}ms .. {}ms (x{})",
        config.retry.base_delay_ms, config.retry.max_delay_ms, config.retry.backoff_multiplier
    );

    println!("\nOutput:");
    println!("  Mirror directory: {}", config.output.mirror_dir.display());
    println!("  Clean before crawl: {}", config.output.clean_before_crawl);

    println!("\nSeed Pages ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start mirroring with {} seed pages", seeds.len());

    Ok(())
}

/// Handles the main mirror operation
async fn handle_mirror(config: &Config, quiet: bool) -> anyhow::Result<()> {
    let stats = mirror_site(config).await.with_context(|| {
        format!("failed to mirror {}", config.input.pages_file.display())
    })?;

    if !quiet {
        print_statistics(&stats);
    }

    if stats.failed > 0 {
        tracing::warn!("{} URLs could not be mirrored", stats.failed);
    }

    Ok(())
}
