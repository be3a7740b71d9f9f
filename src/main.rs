//! # Deep-Sea Trends
//!
//! Watches social media for a fixed set of keywords ("deep sea creature",
//! "rare jellyfish", ...), appends every match to a Google Sheet and emails
//! a plaintext digest.
//!
//! ## Usage
//!
//! ```sh
//! TWITTER_BEARER_TOKEN=... EMAIL_ADDRESS=... EMAIL_PASSWORD=... \
//! EMAIL_RECEIVER=... GOOGLE_SHEET_NAME="Deep Sea Trends" deepsea_trends
//! ```
//!
//! ## Architecture
//!
//! Each collection run is a three-stage pipeline:
//! 1. **Fetch**: search every keyword in order, normalizing posts into records
//! 2. **Append**: one spreadsheet row per record
//! 3. **Notify**: one digest email for the whole batch
//!
//! Runs are triggered hourly by the scheduler and on demand via
//! `GET /run-now`; a single-flight guard keeps them from overlapping.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod collector;
mod config;
mod error;
mod models;
mod outputs;
mod scheduler;
mod scrapers;
mod server;
#[cfg(test)]
mod testing;
mod utils;

use cli::Cli;
use collector::{Collector, RunOutcome, Trigger};
use outputs::email::{NotificationSink, SmtpMailer};
use outputs::google_sheets::{GoogleSheets, ServiceAccountKey};
use outputs::sheet::SheetSink;
use scrapers::twitter::TwitterScraper;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), local_date = %Local::now().date_naive(), "deepsea_trends starting up");

    let args = Cli::parse();
    args.log_redacted();

    let profile = config::load_profile(args.config.as_deref()).await?;

    // ---- Wire the pipeline ----
    let scraper = Arc::new(TwitterScraper::new(args.twitter_bearer_token.clone()));

    let key = ServiceAccountKey::from_file(&args.credentials_file).await?;
    let mut sheets = GoogleSheets::new(key, args.sheet_name.clone());
    if let Some(id) = args.spreadsheet_id.clone() {
        sheets = sheets.with_spreadsheet_id(id);
    }

    let mailer = SmtpMailer::new(
        &args.smtp_host,
        &args.email_address,
        &args.email_password,
        &args.email_receiver,
    )?;

    let collector = Arc::new(Collector::new(
        scraper,
        SheetSink::new(Arc::new(sheets)),
        NotificationSink::new(Arc::new(mailer), profile.subject.clone()),
        profile,
    ));

    // ---- One-shot mode ----
    if args.once {
        return match collector.try_run(Trigger::Once).await? {
            RunOutcome::Completed(report) => {
                info!(
                    collected = report.collected,
                    rows_appended = report.rows_appended,
                    notified = report.notified,
                    skipped = ?report.skipped_keywords,
                    "Single run complete"
                );
                Ok(())
            }
            RunOutcome::Busy => Ok(()),
        };
    }

    // ---- Scheduler + HTTP triggers ----
    let schedule = scheduler::start(collector.clone(), scheduler::COLLECTION_INTERVAL);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let served = server::serve(listener, server::router(collector), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal; serving until killed");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    })
    .await;

    schedule.stop().await;
    served?;

    info!("deepsea_trends stopped");
    Ok(())
}
