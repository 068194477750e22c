// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging
// 3. Dispatch to the appropriate subcommand handler
// 4. Print the report and exit with a proper code
//    (0 = every page mirrored completely, 1 = some page did not, 2 = error)
//
// Rust concepts:
// - #[tokio::main]: turns main into an async runtime entry point
// - Pattern matching: one arm per subcommand
// - tokio::spawn: the Ctrl-C listener runs beside the batch
// =============================================================================

mod cancel;
mod cli;
mod config;
mod crawl;
mod error;
mod http;
mod logging;
mod mirror;
mod urls;

use anyhow::Result;
use clap::Parser;
use reqwest::Client;
use std::path::PathBuf;
use tracing::warn;

use cancel::Cancellation;
use cli::{Cli, Commands, MirrorArgs};
use config::MirrorConfig;
use mirror::{BatchReport, PageMirror, PageOutcome, PageReport};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    // Parse command-line arguments (clap handles --help, --version, errors)
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    // Dispatch to the right handler based on subcommand

    match cli.command {
        Commands::Discover {
            seed,
            output,
            config,
        } => {
            let config = cli::load_config(config.as_ref())?;
            handle_discover(&seed, output, &config).await
        }
        Commands::Mirror {
            urls,
            input,
            options,
        } => handle_mirror(urls, input, &options).await,
        Commands::Clone {
            seed,
            frontier,
            options,
        } => handle_clone(&seed, frontier, &options).await,
    }
}

// Handles the 'discover' subcommand
async fn handle_discover(seed: &str, output: Option<PathBuf>, config: &MirrorConfig) -> Result<i32> {
    let client = http::build_client(config)?;
    let (frontier, path) = discover(&client, seed, output).await?;

    println!("📄 {} URL(s) saved to {}", frontier.len(), path.display());
    Ok(0)
}

// Handles the 'mirror' subcommand
async fn handle_mirror(urls: Vec<String>, input: Option<PathBuf>, options: &MirrorArgs) -> Result<i32> {
    let config = options.resolve_config()?;

    // URLs on the command line come first, then the list file
    let mut urls = urls;
    if urls.is_empty() || input.is_some() {
        let input = input.unwrap_or_else(|| PathBuf::from("urls.txt"));
        urls.extend(mirror::read_url_list(&input)?);
    }

    if urls.is_empty() {
        println!("⚠️  No URLs to mirror");
        return Ok(0);
    }

    let client = http::build_client(&config)?;
    run_batch(client, &urls, &config, options.json).await
}

// Handles the 'clone' subcommand: discover + mirror
async fn handle_clone(seed: &str, frontier: Option<PathBuf>, options: &MirrorArgs) -> Result<i32> {
    let config = options.resolve_config()?;
    let client = http::build_client(&config)?;

    let (urls, path) = discover(&client, seed, frontier).await?;
    println!("📄 {} URL(s) saved to {}", urls.len(), path.display());

    run_batch(client, &urls, &config, options.json).await
}

async fn discover(
    client: &Client,
    seed: &str,
    output: Option<PathBuf>,
) -> Result<(Vec<String>, PathBuf)> {
    println!("🔍 Discovering pages linked from {}", seed);

    let frontier = crawl::build_frontier(client, seed).await?;
    let path = match output {
        Some(path) => path,
        None => crawl::frontier_file_name(seed)?,
    };
    crawl::write_frontier(&path, &frontier).await?;

    Ok((frontier, path))
}

async fn run_batch(client: Client, urls: &[String], config: &MirrorConfig, json: bool) -> Result<i32> {
    // Ctrl-C raises the shared flag; the batch notices between downloads
    let cancel = Cancellation::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, letting in-flight downloads finish");
            on_interrupt.cancel();
        }
    });

    println!("🌐 Mirroring {} page(s)...\n", urls.len());

    let page_mirror = PageMirror::new(client, config.output_dir.clone(), config.concurrency());
    let report = mirror::mirror_all(&page_mirror, urls, &cancel, config.page_timeout()).await;

    print_report(&report, json)?;

    // Exit code 1 if any page is not complete (useful for scripts)
    if report.all_complete() {
        Ok(0)
    } else {
        Ok(1)
    }
}

// Prints the report either as a table or JSON
fn print_report(report: &BatchReport, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(report)?;
        println!("{}", json_output);
    } else {
        print_table(report);
    }
    Ok(())
}

fn print_table(report: &BatchReport) {
    println!(
        "{:<60} {:<14} {:>5} {:>5} {:>5} {:>5}",
        "URL", "STATUS", "CSS", "JS", "IMG", "FONT"
    );
    println!("{}", "=".repeat(99));

    for page in &report.pages {
        let url_display = if page.url.chars().count() > 57 {
            format!("{}...", page.url.chars().take(57).collect::<String>())
        } else {
            page.url.clone()
        };

        println!(
            "{:<60} {:<14} {:>5} {:>5} {:>5} {:>5}",
            url_display,
            format_outcome(&page.outcome),
            page.counts.css,
            page.counts.js,
            page.counts.images,
            page.counts.fonts
        );
    }

    let failures: Vec<&PageReport> = report
        .pages
        .iter()
        .filter(|p| matches!(p.outcome, PageOutcome::Failed { .. }))
        .collect();
    if !failures.is_empty() {
        println!();
        for page in failures {
            if let PageOutcome::Failed { reason, .. } = &page.outcome {
                println!("❌ {}: {}", page.url, reason);
            }
        }
    }

    let stats = &report.statistics;
    println!();
    println!("📊 Mirror statistics:");
    println!("   CSS files:  {}", stats.counts.css);
    println!("   JS files:   {}", stats.counts.js);
    println!("   Images:     {}", stats.counts.images);
    println!("   Font files: {}", stats.counts.fonts);
    println!("   Total:      {}", stats.counts.total());
    println!(
        "   Pages: {} complete, {} partial, {} failed, {} cancelled",
        stats.pages_complete, stats.pages_partial, stats.pages_failed, stats.pages_cancelled
    );
    println!("⏱️  Completed in {:.2?}", report.elapsed);
}

fn format_outcome(outcome: &PageOutcome) -> String {
    match outcome {
        PageOutcome::Complete => "✅ COMPLETE".to_string(),
        PageOutcome::Partial { failed_assets } => format!("⚠️  PARTIAL ({})", failed_assets),
        PageOutcome::Failed { status: Some(code), .. } => format!("❌ FAILED ({})", code),
        PageOutcome::Failed { .. } => "❌ FAILED".to_string(),
        PageOutcome::Cancelled => "⏹️  CANCELLED".to_string(),
    }
}
