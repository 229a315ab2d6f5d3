//! Crawl orchestration for roomscout.
//!
//! Ties the listing extractor, the detail fetcher and the index writer into
//! one run: [`scheduler`] owns the worker pool, [`assembler`] merges locales
//! into records, and [`pipeline`] drives a whole run end to end.

pub mod assembler;
pub mod pipeline;
pub mod scheduler;

pub use pipeline::{ProgressReporter, RunSummary, SilentProgress, Tally, drain, run};
pub use scheduler::{CrawlFailure, CrawlOutcome, CrawlStream, Scheduler, SchedulerOptions, Submitter};
