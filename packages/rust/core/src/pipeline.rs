//! End-to-end crawl run: listing → identifiers → crawl pool → index.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use roomscout_catalog::ListingOptions;
use roomscout_crawler::HttpFetcher;
use roomscout_index::IndexWriter;
use roomscout_shared::{CrawlConfig, Identifier, Result, RoomscoutError};
use tracing::{info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::scheduler::{CrawlOutcome, CrawlStream, Scheduler, SchedulerOptions};

/// Counters accumulated while draining a crawl stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    /// Identifiers with at least one record.
    pub assembled: usize,
    /// Assembled identifiers missing one or more locales.
    pub partial: usize,
    /// Identifiers with no record at all.
    pub failed: usize,
    pub records_written: usize,
    pub write_failures: usize,
}

/// Result of one [`run`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Distinct identifiers submitted to the crawl.
    pub identifiers: usize,
    pub tally: Tally,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once per identifier as its outcome is consumed.
    fn identifier_done(&self, id: &Identifier, ok: bool, done: usize);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn identifier_done(&self, _id: &Identifier, _ok: bool, _done: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Run a full crawl with the given configuration.
///
/// Only configuration-level problems (bad URLs, unreachable or empty
/// listing) are returned as errors. Per-identifier and per-record failures
/// are logged and counted in the summary.
#[instrument(skip_all, fields(listing = %config.listing_url))]
pub async fn run(
    config: &CrawlConfig,
    writer: &IndexWriter,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let start = Instant::now();
    let run_id = Uuid::now_v7();
    let started_at = Utc::now();
    info!(%run_id, locales = config.locales.len(), "starting crawl run");

    let concurrency = NonZeroUsize::new(config.concurrency)
        .ok_or_else(|| RoomscoutError::config("concurrency must be at least 1"))?;
    if config.fetch_timeout.is_zero() {
        return Err(RoomscoutError::config("fetch timeout must be positive"));
    }
    let listing = Url::parse(&config.listing_url)
        .map_err(|e| RoomscoutError::config(format!("invalid listing_url: {e}")))?;

    // --- Phase 1: Identifiers ---
    progress.phase("Reading listing");
    let opts = ListingOptions {
        timeout_secs: config.fetch_timeout.as_secs().max(1),
    };
    let found = roomscout_catalog::discover(&listing, &opts).await?;
    let listed = found.len();
    let ids = dedup(found);
    if ids.len() < listed {
        info!(listed, distinct = ids.len(), "dropped repeated identifiers");
    }

    // --- Phase 2: Crawl + index ---
    progress.phase("Crawling");
    let fetcher = HttpFetcher::new(config)?;
    let scheduler = Scheduler::new(
        fetcher,
        config.locales.clone(),
        SchedulerOptions::from(config),
    )?;

    let identifiers = ids.len();
    let stream = scheduler.run(ids, concurrency);
    let tally = drain(stream, writer, progress).await;

    let summary = RunSummary {
        run_id,
        started_at,
        identifiers,
        tally,
        elapsed: start.elapsed(),
    };

    info!(
        %run_id,
        assembled = summary.tally.assembled,
        partial = summary.tally.partial,
        failed = summary.tally.failed,
        written = summary.tally.records_written,
        write_failures = summary.tally.write_failures,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "crawl run complete"
    );
    progress.done(&summary);
    Ok(summary)
}

/// Consume every outcome, writing each assembled record.
///
/// Never stops early: a failed identifier or a rejected write is logged,
/// counted, and the next outcome is processed.
pub async fn drain(
    mut stream: CrawlStream,
    writer: &IndexWriter,
    progress: &dyn ProgressReporter,
) -> Tally {
    let mut tally = Tally::default();
    let mut done = 0;

    while let Some(outcome) = stream.next().await {
        done += 1;

        for failure in outcome.failures() {
            warn!(
                id = %outcome.id(),
                locale = failure.locale.as_ref().map(|l| l.as_str()).unwrap_or("-"),
                error = %failure.message,
                "crawl failure"
            );
        }

        match &outcome {
            CrawlOutcome::Assembled { records, .. } => {
                tally.assembled += 1;
                if outcome.is_partial() {
                    tally.partial += 1;
                }

                for record in records.values() {
                    match writer.upsert(record).await {
                        Ok(()) => tally.records_written += 1,
                        Err(e) => {
                            warn!(id = %record.id, locale = %record.locale, error = %e, "index write failed");
                            tally.write_failures += 1;
                        }
                    }
                }
            }
            CrawlOutcome::Failed { .. } => tally.failed += 1,
        }

        progress.identifier_done(
            outcome.id(),
            matches!(outcome, CrawlOutcome::Assembled { .. }),
            done,
        );
    }

    tally
}

/// Drop repeated identifiers, keeping first-seen order.
fn dedup(ids: Vec<Identifier>) -> Vec<Identifier> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
