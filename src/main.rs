#![allow(clippy::uninlined_format_args)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courtgrid::driver::GLOBAL_DRIVER_MANAGER;
use courtgrid::{BrowserType, CourtgridError, Portal, TextSink, TraversalReport, gate, traverse};

// Exit codes
const EXIT_SUCCESS: i32 = 0;

#[derive(Parser)]
#[command(name = "courtgrid")]
#[command(
    about = "Search an Odyssey court-records portal by name and save case results",
    long_about = None
)]
struct Cli {
    /// Party name to search for (prompted interactively when omitted)
    name: Option<String>,

    /// Browser to use
    #[arg(short, long, default_value = "firefox")]
    browser: String,

    /// Run the browser headless (the CAPTCHA step needs a visible window)
    #[arg(long)]
    headless: bool,

    /// Portal front page to start from
    #[arg(long, default_value = courtgrid::DEFAULT_PORTAL_URL)]
    portal_url: String,

    /// Bounded wait budget for page conditions, in seconds
    #[arg(long, default_value = "20")]
    wait_timeout: u64,

    /// Directory for the results file
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    let result = run().await;

    // Always clean up spawned WebDriver processes before exiting
    GLOBAL_DRIVER_MANAGER.stop_all();

    // Handle exit codes based on error type
    match result {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(err) => {
            let err: CourtgridError = err.into();

            // Output JSON error to stdout for programmatic consumption
            let error_json = json!({
                "error": true,
                "message": err.to_string(),
                "exit_code": err.exit_code()
            });
            println!(
                "{}",
                serde_json::to_string(&error_json).unwrap_or_else(|_| "{}".to_string())
            );

            // Also log to stderr for human reading
            eprintln!("Error: {}", err);
            std::process::exit(err.exit_code());
        }
    }
}

async fn run() -> Result<()> {
    // Logs go to stderr so stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courtgrid=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let cli = Cli::parse();

    let portal_url = url::Url::parse(&cli.portal_url).context("Invalid portal URL")?;
    let browser_type: BrowserType = cli.browser.parse()?;

    let search_name = match cli.name {
        Some(name) => name,
        None => gate::prompt_line("Enter the name to search for: ").await?,
    };
    let search_name = search_name.trim().to_string();
    if search_name.is_empty() {
        anyhow::bail!("Search name must not be empty");
    }

    let portal = Portal::open(
        browser_type,
        cli.headless,
        Duration::from_secs(cli.wait_timeout),
    )
    .await?;

    // The browser session is released on every exit path of the scrape;
    // only afterwards does a scrape error propagate.
    let outcome = scrape(&portal, portal_url.as_str(), &search_name).await;
    if let Err(e) = portal.close().await {
        warn!("Failed to close browser session: {e:#}");
    }
    let report = outcome?;

    let sink = TextSink::new(&cli.output_dir);
    match sink.write(&search_name, &report.records)? {
        Some(path) => info!(
            "Finished: {} record(s) across {} page(s), saved to {}",
            report.records.len(),
            report.pages_visited,
            path.display()
        ),
        None => info!(
            "Finished: no records after {} page(s); no file written",
            report.pages_visited
        ),
    }
    Ok(())
}

async fn scrape(portal: &Portal, portal_url: &str, search_name: &str) -> Result<TraversalReport> {
    portal.begin_search(portal_url, search_name).await?;
    gate::await_operator("Please solve the CAPTCHA in the browser.").await?;
    portal.shrink_window().await;
    portal.submit_search().await?;
    Ok(traverse(portal).await)
}
