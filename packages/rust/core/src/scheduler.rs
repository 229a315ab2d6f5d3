//! Bounded worker pool that crawls identifiers across every locale.
//!
//! A fixed number of workers share one bounded work queue and one bounded
//! output channel. Each identifier yields exactly one [`CrawlOutcome`]; the
//! output channel closes when the last worker drops its sender, which happens
//! only after the work queue is closed and drained.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use roomscout_crawler::{CoordinateCache, DocumentFetcher};
use roomscout_shared::{
    CrawlConfig, GeoPolicy, Identifier, Locale, LocalePolicy, Record, Result, RoomscoutError,
};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, instrument, warn};

use crate::assembler;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// One failed step while crawling an identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlFailure {
    /// `None` for identifier-level failures (assembly rejection, crashed task).
    pub locale: Option<Locale>,
    pub message: String,
}

impl CrawlFailure {
    fn locale(locale: &Locale, message: impl Into<String>) -> Self {
        Self {
            locale: Some(locale.clone()),
            message: message.into(),
        }
    }

    fn identifier(message: impl Into<String>) -> Self {
        Self {
            locale: None,
            message: message.into(),
        }
    }
}

/// Result of crawling one identifier.
#[derive(Debug, Clone)]
pub enum CrawlOutcome {
    /// At least one locale produced a record. `failures` lists the locales
    /// that did not.
    Assembled {
        id: Identifier,
        records: BTreeMap<Locale, Record>,
        failures: Vec<CrawlFailure>,
    },
    /// Nothing indexable was produced for this identifier.
    Failed {
        id: Identifier,
        failures: Vec<CrawlFailure>,
    },
}

impl CrawlOutcome {
    pub fn id(&self) -> &Identifier {
        match self {
            Self::Assembled { id, .. } | Self::Failed { id, .. } => id,
        }
    }

    /// Assembled, but some locales are missing.
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Assembled { failures, .. } if !failures.is_empty())
    }

    pub fn failures(&self) -> &[CrawlFailure] {
        match self {
            Self::Assembled { failures, .. } | Self::Failed { failures, .. } => failures,
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Tuning knobs for a [`Scheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Capacity of both the work queue and the output channel.
    pub queue_capacity: usize,
    /// Deadline for a single (identifier, locale) fetch.
    pub fetch_timeout: Duration,
    pub locale_policy: LocalePolicy,
    pub geo_policy: GeoPolicy,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 16,
            fetch_timeout: Duration::from_secs(30),
            locale_policy: LocalePolicy::default(),
            geo_policy: GeoPolicy::default(),
        }
    }
}

impl From<&CrawlConfig> for SchedulerOptions {
    fn from(config: &CrawlConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity,
            fetch_timeout: config.fetch_timeout,
            locale_policy: config.locale_policy,
            geo_policy: config.geo_policy,
        }
    }
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Feeds identifiers into a running pool.
///
/// Dropping every `Submitter` closes the work queue; workers finish what is
/// queued and exit.
#[derive(Clone)]
pub struct Submitter {
    tx: mpsc::Sender<Identifier>,
}

impl Submitter {
    /// Queue one identifier, waiting while the queue is full.
    pub async fn submit(&self, id: Identifier) -> Result<()> {
        self.tx
            .send(id)
            .await
            .map_err(|e| RoomscoutError::PoolClosed { id: e.0.to_string() })
    }
}

/// Receiving end of the outcome channel.
pub struct CrawlStream {
    rx: mpsc::Receiver<CrawlOutcome>,
}

impl CrawlStream {
    /// Next outcome, or `None` once every submitted identifier was reported.
    /// Keeps returning `None` after that.
    pub async fn next(&mut self) -> Option<CrawlOutcome> {
        self.rx.recv().await
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

struct Job<F> {
    fetcher: Arc<F>,
    locales: Arc<[Locale]>,
    options: SchedulerOptions,
}

/// Crawls identifiers with a fixed pool of workers.
pub struct Scheduler<F> {
    fetcher: Arc<F>,
    locales: Arc<[Locale]>,
    options: SchedulerOptions,
}

impl<F: DocumentFetcher> Scheduler<F> {
    /// Locales are fetched in the given order; the first one is fetched first
    /// for every identifier.
    pub fn new(fetcher: F, locales: Vec<Locale>, options: SchedulerOptions) -> Result<Self> {
        if locales.is_empty() {
            return Err(RoomscoutError::config("at least one locale is required"));
        }

        Ok(Self {
            fetcher: Arc::new(fetcher),
            locales: locales.into(),
            options,
        })
    }

    /// Start `concurrency` workers and return the queue and outcome handles.
    pub fn spawn(&self, concurrency: NonZeroUsize) -> (Submitter, CrawlStream) {
        let capacity = self.options.queue_capacity.max(1);
        let (work_tx, work_rx) = mpsc::channel::<Identifier>(capacity);
        let (out_tx, out_rx) = mpsc::channel::<CrawlOutcome>(capacity);
        let queue = Arc::new(Mutex::new(work_rx));

        let job = Arc::new(Job {
            fetcher: Arc::clone(&self.fetcher),
            locales: Arc::clone(&self.locales),
            options: self.options.clone(),
        });

        for worker in 0..concurrency.get() {
            tokio::spawn(worker_loop(
                worker,
                Arc::clone(&queue),
                out_tx.clone(),
                Arc::clone(&job),
            ));
        }

        debug!(workers = concurrency.get(), capacity, "crawl pool started");
        (Submitter { tx: work_tx }, CrawlStream { rx: out_rx })
    }

    /// Crawl every identifier in `ids`.
    ///
    /// Submission runs on its own task, so the returned stream must be
    /// consumed for the run to make progress.
    pub fn run(&self, ids: Vec<Identifier>, concurrency: NonZeroUsize) -> CrawlStream {
        let (submitter, stream) = self.spawn(concurrency);

        tokio::spawn(async move {
            for id in ids {
                if let Err(e) = submitter.submit(id).await {
                    warn!(error = %e, "stopping submission");
                    break;
                }
            }
        });

        stream
    }
}

async fn worker_loop<F: DocumentFetcher>(
    worker: usize,
    queue: Arc<Mutex<mpsc::Receiver<Identifier>>>,
    out: mpsc::Sender<CrawlOutcome>,
    job: Arc<Job<F>>,
) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(id) = next else {
            break;
        };

        let task = tokio::spawn(crawl_identifier(Arc::clone(&job), id.clone()));
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(worker, %id, error = %e, "crawl task aborted");
                CrawlOutcome::Failed {
                    id,
                    failures: vec![CrawlFailure::identifier(format!("crawl task aborted: {e}"))],
                }
            }
        };

        if out.send(outcome).await.is_err() {
            debug!(worker, "outcome receiver dropped");
            break;
        }
    }
    debug!(worker, "worker exiting");
}

#[instrument(skip_all, fields(id = %id))]
async fn crawl_identifier<F: DocumentFetcher>(job: Arc<Job<F>>, id: Identifier) -> CrawlOutcome {
    let geo = CoordinateCache::new();
    let deadline = job.options.fetch_timeout;
    let mut documents = BTreeMap::new();
    let mut failures = Vec::new();

    for locale in job.locales.iter() {
        let fetched = tokio::time::timeout(deadline, job.fetcher.fetch(&id, locale, &geo))
            .await
            .unwrap_or_else(|_| {
                Err(RoomscoutError::fetch(
                    &id,
                    locale,
                    format!("timed out after {}s", deadline.as_secs_f64()),
                ))
            });

        match fetched {
            Ok(document) => {
                documents.insert(locale.clone(), document);
            }
            Err(e) => {
                warn!(%locale, error = %e, "locale fetch failed");
                failures.push(CrawlFailure::locale(locale, e.to_string()));
                if job.options.locale_policy == LocalePolicy::Strict {
                    return CrawlOutcome::Failed { id, failures };
                }
            }
        }
    }

    if documents.is_empty() {
        return CrawlOutcome::Failed { id, failures };
    }

    match assembler::assemble_with(&id, documents, job.options.geo_policy) {
        Ok(records) => {
            debug!(records = records.len(), failed = failures.len(), "identifier assembled");
            CrawlOutcome::Assembled {
                id,
                records,
                failures,
            }
        }
        Err(e) => {
            warn!(error = %e, "identifier rejected");
            failures.push(CrawlFailure::identifier(e.to_string()));
            CrawlOutcome::Failed { id, failures }
        }
    }
}
