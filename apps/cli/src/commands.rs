//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use roomscout_core::pipeline::{ProgressReporter, RunSummary};
use roomscout_index::{ElasticIndex, IndexWriter, LocalIndex};
use roomscout_shared::{
    AppConfig, CrawlConfig, Identifier, IndexBackend, Locale, LocalePolicy, init_config,
    load_config, load_config_from,
};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// roomscout: crawl hotel listings into a multi-locale search index.
#[derive(Parser)]
#[command(
    name = "roomscout",
    version,
    about = "Crawl hotel listings and detail pages into a per-locale search index.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.roomscout/roomscout.toml).
    #[arg(long, global = true, env = "ROOMSCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Index backend selectable on the command line.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum BackendArg {
    Elastic,
    Local,
}

impl From<BackendArg> for IndexBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Elastic => IndexBackend::Elastic,
            BackendArg::Local => IndexBackend::Local,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl the listing and index every hotel in every locale.
    Run {
        /// Listing page to read identifiers from.
        #[arg(long)]
        listing_url: Option<String>,

        /// Number of crawl workers.
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,

        /// Index backend.
        #[arg(long)]
        backend: Option<BackendArg>,

        /// Database file for the local backend.
        #[arg(long)]
        local_path: Option<String>,

        /// Fail a hotel entirely when any locale fails.
        #[arg(long)]
        strict: bool,
    },

    /// Print the identifiers found on the listing page.
    Ids {
        /// Listing page to read identifiers from.
        #[arg(long)]
        listing_url: Option<String>,
    },

    /// Create the per-locale indices on the search cluster.
    Bootstrap {
        /// Delete existing indices first.
        #[arg(long)]
        drop: bool,
    },

    /// Print one indexed record as JSON.
    Get {
        /// Hotel identifier.
        id: String,

        /// Locale of the record.
        #[arg(short, long, default_value = "en")]
        locale: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "roomscout=info",
        1 => "roomscout=debug",
        _ => "roomscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;

    match cli.command {
        Command::Run {
            listing_url,
            concurrency,
            backend,
            local_path,
            strict,
        } => {
            let mut config = resolve_config(config_path.as_deref())?;
            if let Some(url) = listing_url {
                config.source.listing_url = url;
            }
            if let Some(n) = concurrency {
                config.crawl.concurrency = n;
            }
            if let Some(backend) = backend {
                config.index.backend = backend.into();
            }
            if let Some(path) = local_path {
                config.index.local_path = path;
            }
            if strict {
                config.crawl.locale_policy = LocalePolicy::Strict;
            }
            cmd_run(&config).await
        }
        Command::Ids { listing_url } => {
            let mut config = resolve_config(config_path.as_deref())?;
            if let Some(url) = listing_url {
                config.source.listing_url = url;
            }
            cmd_ids(&config).await
        }
        Command::Bootstrap { drop } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_bootstrap(&config, drop || config.index.drop_on_startup).await
        }
        Command::Get { id, locale } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_get(&config, &id, &locale).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

/// Load the config file (explicit path or the default location).
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: &AppConfig) -> Result<()> {
    config.verify()?;
    let crawl = CrawlConfig::from(config);

    info!(
        listing = %crawl.listing_url,
        concurrency = crawl.concurrency,
        backend = ?config.index.backend,
        "starting crawl"
    );

    let writer = open_writer(config, true).await?;
    let reporter = CliProgress::new();
    let summary = roomscout_core::pipeline::run(&crawl, &writer, &reporter).await?;

    let tally = &summary.tally;
    println!();
    println!("  Crawl finished");
    println!("  Run:         {}", summary.run_id);
    println!("  Started:     {}", summary.started_at.to_rfc3339());
    println!("  Hotels:      {}", summary.identifiers);
    println!("  Assembled:   {} ({} partial)", tally.assembled, tally.partial);
    println!("  Failed:      {}", tally.failed);
    println!("  Written:     {}", tally.records_written);
    println!("  Write fails: {}", tally.write_failures);
    println!("  Time:        {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_ids(config: &AppConfig) -> Result<()> {
    config.verify()?;
    let listing = Url::parse(&config.source.listing_url)
        .map_err(|e| eyre!("invalid listing URL '{}': {e}", config.source.listing_url))?;
    let opts = roomscout_catalog::ListingOptions {
        timeout_secs: config.crawl.fetch_timeout_secs,
    };

    for id in roomscout_catalog::discover(&listing, &opts).await? {
        println!("{id}");
    }
    Ok(())
}

async fn cmd_bootstrap(config: &AppConfig, drop: bool) -> Result<()> {
    if config.index.backend != IndexBackend::Elastic {
        return Err(eyre!("bootstrap applies to the elastic backend only"));
    }
    config.verify()?;

    let index = ElasticIndex::connect(&config.index.nodes, &config.index.name)?;
    index.bootstrap(&config.source.locales, drop).await?;

    for locale in &config.source.locales {
        println!("{}", index.index_name(&locale.partition()));
    }
    Ok(())
}

async fn cmd_get(config: &AppConfig, id: &str, locale: &str) -> Result<()> {
    let writer = open_writer(config, false).await?;

    match writer.get(&Identifier::new(id), &Locale::new(locale)).await? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("not found: {id} ({locale})"),
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

/// Open the configured index. With `prepare`, the elastic indices are
/// bootstrapped and `drop_on_startup` is honored for either backend.
async fn open_writer(config: &AppConfig, prepare: bool) -> Result<IndexWriter> {
    let section = &config.index;

    let writer = match section.backend {
        IndexBackend::Elastic => {
            let index = ElasticIndex::connect(&section.nodes, &section.name)?;
            if prepare {
                index
                    .bootstrap(&config.source.locales, section.drop_on_startup)
                    .await?;
            }
            IndexWriter::new(Arc::new(index))
        }
        IndexBackend::Local => {
            let index = LocalIndex::open(Path::new(&section.local_path)).await?;
            if prepare && section.drop_on_startup {
                index.clear().await?;
            }
            IndexWriter::new(Arc::new(index))
        }
    };
    Ok(writer)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn identifier_done(&self, id: &Identifier, ok: bool, done: usize) {
        let mark = if ok { "ok" } else { "failed" };
        self.spinner
            .set_message(format!("Crawled [{done}] {id} ({mark})"));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}
