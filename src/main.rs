//! Gleaner main entry point
//!
//! This is the command-line interface for the Gleaner site crawler.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use gleaner::config::{load_config_with_hash, Config};
use gleaner::crawler::{
    scrape_url, scrape_urls, Controller, CrawlReport, Decision, FixedOperator, Operator,
    ScrapeOptions, Session, Threshold,
};
use gleaner::output::{
    ensure_supported, export_search_results, list_crawled_files, read_crawled_urls,
    search_results, OutputFormat, RawHtmlConverter,
};
use gleaner::storage::{open_store, CheckpointHandle, CheckpointStore};
use gleaner::CrawlPhase;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Gleaner: a polite single-domain web crawler
///
/// Gleaner crawls one site breadth-first from a seed URL while respecting
/// robots.txt and a politeness delay. Crawls can be paused and resumed from
/// checkpoints.
#[derive(Parser, Debug)]
#[command(name = "gleaner")]
#[command(version = "1.0.0")]
#[command(about = "A polite single-domain web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (created with defaults if missing)
    #[arg(short, long, value_name = "CONFIG", default_value = "settings.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a site starting from URL
    Crawl {
        url: String,

        /// What to do at page-count thresholds
        #[arg(long, value_enum, default_value_t = OnThreshold::Prompt)]
        on_threshold: OnThreshold,
    },

    /// Resume a paused crawl from a checkpoint
    Resume {
        /// Checkpoint id (omit to choose from a list)
        id: Option<i64>,

        /// What to do at page-count thresholds
        #[arg(long, value_enum, default_value_t = OnThreshold::Prompt)]
        on_threshold: OnThreshold,
    },

    /// List saved checkpoints
    Checkpoints,

    /// Fetch a single page and save it
    Scrape {
        url: String,

        /// Output format (only html with the built-in converter)
        #[arg(long, default_value = "html")]
        format: String,
    },

    /// Fetch every URL in a crawled list and save the pages
    ScrapeAll {
        /// A file written by a finished crawl (defaults to the newest one)
        file: Option<PathBuf>,

        /// Output format (only html with the built-in converter)
        #[arg(long, default_value = "html")]
        format: String,
    },

    /// Search scraped pages for a term
    Search {
        term: String,

        /// Also write the matches to the exports directory as JSON
        #[arg(long)]
        export: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OnThreshold {
    Prompt,
    Continue,
    Pause,
    Stop,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::debug!("Configuration loaded (hash: {})", config_hash);
    let config = Arc::new(config);

    match cli.command {
        Command::Crawl { url, on_threshold } => {
            handle_crawl(&url, config, config_hash, on_threshold).await
        }
        Command::Resume { id, on_threshold } => {
            handle_resume(id, config, config_hash, on_threshold).await
        }
        Command::Checkpoints => handle_checkpoints(&config),
        Command::Scrape { url, format } => handle_scrape(&url, &format, &config).await,
        Command::ScrapeAll { file, format } => {
            handle_scrape_all(file, &format, &config).await
        }
        Command::Search { term, export } => handle_search(&term, export, &config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("gleaner=info,warn"),
            1 => EnvFilter::new("gleaner=debug,info"),
            2 => EnvFilter::new("gleaner=trace,debug"),
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

/// Asks on the terminal at every decision point
struct TerminalOperator;

impl TerminalOperator {
    fn ask(question: &str) -> Option<String> {
        print!("{} ", question);
        io::stdout().flush().ok()?;

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

impl Operator for TerminalOperator {
    fn on_threshold(&mut self, threshold: &Threshold) -> Decision {
        loop {
            let Some(answer) = Self::ask(&threshold_prompt(threshold)) else {
                // No terminal to ask; keep the crawl resumable
                return Decision::Pause;
            };
            if answer.is_empty() {
                return Decision::Continue;
            }
            match answer.parse::<Decision>() {
                Ok(decision) => return decision,
                Err(e) => println!("{}", e),
            }
        }
    }

    fn override_robots(&mut self, seed: &Url) -> bool {
        let question = format!(
            "robots.txt disallows crawling {}. Continue anyway? [y/N]",
            seed
        );
        matches!(
            Self::ask(&question).as_deref().map(str::to_lowercase).as_deref(),
            Some("y") | Some("yes")
        )
    }
}

/// Prompt shown at a threshold
///
/// Stdin blocks while it waits, so an interrupt only takes effect once the
/// prompt is answered; a second Ctrl-C exits at once.
fn threshold_prompt(threshold: &Threshold) -> String {
    format!(
        "\nCrawl {}. [c]ontinue, [p]ause or [s]top? (Ctrl-C twice quits without saving)",
        threshold
    )
}

fn make_operator(on_threshold: OnThreshold) -> Box<dyn Operator + Send> {
    match on_threshold {
        OnThreshold::Prompt => Box::new(TerminalOperator),
        OnThreshold::Continue => Box::new(FixedOperator::new(Decision::Continue)),
        OnThreshold::Pause => Box::new(FixedOperator::new(Decision::Pause)),
        OnThreshold::Stop => Box::new(FixedOperator::new(Decision::Stop)),
    }
}

fn open_checkpoints(config: &Config) -> anyhow::Result<Box<dyn CheckpointStore + Send>> {
    let path = Path::new(&config.output.checkpoint_database);
    let store = open_store(path)
        .with_context(|| format!("Failed to open checkpoint database {}", path.display()))?;
    Ok(Box::new(store))
}

/// Exit status for a second Ctrl-C (128 + SIGINT)
const FORCED_EXIT_CODE: i32 = 130;

/// Runs a controller with Ctrl-C wired to its interrupt flag
///
/// The first Ctrl-C asks the crawl to checkpoint and stop after the current
/// page. A second one exits immediately, without a checkpoint.
async fn drive(mut controller: Controller) -> anyhow::Result<()> {
    let interrupt = controller.interrupt_handle();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!(
            "Interrupt received, stopping after the current page (Ctrl-C again to quit now)"
        );
        interrupt.store(true, Ordering::SeqCst);

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::error!("Second interrupt, exiting without a checkpoint");
            std::process::exit(FORCED_EXIT_CODE);
        }
    });

    let result = controller.run().await;
    watcher.abort();

    let report = result.context("Crawl failed")?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &CrawlReport) {
    println!();
    match report.phase {
        CrawlPhase::Paused => {
            println!(
                "Crawl of {} paused after {} pages.",
                report.state.domain, report.state.page_count
            );
            match report.checkpoint {
                Some(handle) => println!(
                    "Checkpoint {} saved. Resume with: gleaner resume {}",
                    handle.id, handle.id
                ),
                None => println!("No checkpoint was saved; this crawl cannot be resumed."),
            }
        }
        phase => {
            println!(
                "Crawl of {} {}: {} URLs found.",
                report.state.domain,
                phase,
                report.state.discovered().len()
            );
            if let Some(path) = &report.crawled_file {
                println!("Crawled URLs saved to: {}", path.display());
            }
            for path in &report.exports {
                println!("Exported: {}", path.display());
            }
        }
    }
}

/// Handles `gleaner crawl`
async fn handle_crawl(
    url: &str,
    config: Arc<Config>,
    config_hash: String,
    on_threshold: OnThreshold,
) -> anyhow::Result<()> {
    let store = open_checkpoints(&config)?;
    let controller = Controller::start(url, config, store, make_operator(on_threshold))
        .await
        .with_context(|| format!("Cannot crawl {}", url))?
        .with_config_hash(config_hash);

    drive(controller).await
}

/// Handles `gleaner resume`
async fn handle_resume(
    id: Option<i64>,
    config: Arc<Config>,
    config_hash: String,
    on_threshold: OnThreshold,
) -> anyhow::Result<()> {
    let store = open_checkpoints(&config)?;
    let summaries = store.list().context("Failed to list checkpoints")?;

    let id = match id {
        Some(id) => id,
        None => {
            if summaries.is_empty() {
                bail!("No saved crawls found");
            }
            print_checkpoints(&summaries);
            let answer = TerminalOperator::ask("Checkpoint id to resume:")
                .context("No checkpoint selected")?;
            answer
                .parse::<i64>()
                .with_context(|| format!("Not a checkpoint id: {}", answer))?
        }
    };

    let handle = CheckpointHandle { id };
    if let Some(summary) = summaries.iter().find(|s| s.handle == handle) {
        if summary.config_hash.as_deref().map_or(false, |h| h != config_hash) {
            tracing::warn!("Configuration changed since checkpoint {} was saved", id);
        }
    }

    let state = store
        .load(&handle)
        .with_context(|| format!("Cannot resume checkpoint {}", id))?;
    let controller = Controller::resume(state, config, store, make_operator(on_threshold))?
        .with_config_hash(config_hash);

    drive(controller).await
}

fn print_checkpoints(summaries: &[gleaner::storage::CheckpointSummary]) {
    println!("{:>5}  {:<30}  {:<19}  {:>6}", "ID", "DOMAIN", "DATE", "PAGES");
    for summary in summaries {
        println!(
            "{:>5}  {:<30}  {:<19}  {:>6}",
            summary.handle.id,
            summary.domain,
            summary
                .created_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S"),
            summary.page_count
        );
    }
}

/// Handles `gleaner checkpoints`
fn handle_checkpoints(config: &Config) -> anyhow::Result<()> {
    let store = open_checkpoints(config)?;
    let summaries = store.list().context("Failed to list checkpoints")?;

    if summaries.is_empty() {
        println!("No saved crawls found.");
    } else {
        print_checkpoints(&summaries);
    }
    Ok(())
}

/// Parses `--format` and checks the built-in converter can produce it
fn scrape_format(format: &str) -> anyhow::Result<OutputFormat> {
    let format: OutputFormat = format.parse()?;
    ensure_supported(&RawHtmlConverter, format)?;
    Ok(format)
}

/// Handles `gleaner scrape`
async fn handle_scrape(url: &str, format: &str, config: &Config) -> anyhow::Result<()> {
    let format = scrape_format(format)?;
    let session = Session::from_config(&config.session)?;
    let options = ScrapeOptions::from_config(config, format);

    let page = scrape_url(url, &session, &RawHtmlConverter, &options)
        .await
        .with_context(|| format!("Failed to scrape {}", url))?;

    println!("Scraping completed.");
    println!("  Images:     {}", page.summary.images);
    println!("  Paragraphs: {}", page.summary.paragraphs);
    println!("  Headings:   {}", page.summary.headings);
    println!("Results saved to: {}", page.path.display());
    Ok(())
}

/// Handles `gleaner search`
fn handle_search(term: &str, export: bool, config: &Config) -> anyhow::Result<()> {
    let results_dir = Path::new(&config.output.results_dir);
    let hits = search_results(results_dir, term)
        .with_context(|| format!("Failed to search {}", results_dir.display()))?;

    if hits.is_empty() {
        println!("No matches found.");
        return Ok(());
    }

    println!("Found {} matches:", hits.len());
    for hit in &hits {
        let name = Path::new(&hit.file)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| hit.file.clone());
        println!("  {}: {}", name, hit.snippet);
    }

    if export {
        let dir = Path::new(&config.output.exports_dir);
        if let Some(path) = export_search_results(dir, term, &hits)
            .with_context(|| format!("Failed to export search results to {}", dir.display()))?
        {
            println!("Search results exported to: {}", path.display());
        }
    }
    Ok(())
}

/// Handles `gleaner scrape-all`
async fn handle_scrape_all(
    file: Option<PathBuf>,
    format: &str,
    config: &Config,
) -> anyhow::Result<()> {
    let format = scrape_format(format)?;
    let file = match file {
        Some(file) => file,
        None => {
            let dir = Path::new(&config.output.crawled_dir);
            let newest = list_crawled_files(dir)
                .with_context(|| format!("Failed to list {}", dir.display()))?
                .into_iter()
                .next();
            match newest {
                Some(file) => file,
                None => bail!("No crawled URL files found in {}", dir.display()),
            }
        }
    };
    tracing::info!("Reading crawled URLs from {}", file.display());

    let urls = read_crawled_urls(&file)
        .with_context(|| format!("Failed to read crawled list {}", file.display()))?;

    if urls.is_empty() {
        println!("No URLs found in {}.", file.display());
        return Ok(());
    }

    let session = Session::from_config(&config.session)?;
    let options = ScrapeOptions::from_config(config, format);
    tracing::info!("Scraping {} URLs as {}", urls.len(), format);

    let report = scrape_urls(&urls, &session, &RawHtmlConverter, &options).await?;

    println!("Successfully scraped: {} URLs", report.succeeded);
    if report.failed > 0 {
        println!("Failed to scrape: {} URLs", report.failed);
    }
    println!("Results saved to: {}", options.results_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_format_accepts_only_html() {
        assert_eq!(scrape_format("html").unwrap(), OutputFormat::Html);
        assert_eq!(scrape_format("HTML").unwrap(), OutputFormat::Html);
        assert!(scrape_format("json").is_err());
        assert!(scrape_format("markdown").is_err());
        assert!(scrape_format("csv").is_err());
        assert!(scrape_format("pdf").is_err());
    }

    #[test]
    fn test_threshold_prompt_mentions_forced_exit() {
        let prompt = threshold_prompt(&Threshold::Interval { page_count: 20 });
        assert!(prompt.contains("[c]ontinue"));
        assert!(prompt.contains("Ctrl-C twice"));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["gleaner", "scrape", "https://example.com/"]).unwrap();
        assert!(matches!(cli.command, Command::Scrape { .. }));

        let cli = Cli::try_parse_from(["gleaner", "search", "rust", "--export"]).unwrap();
        assert!(matches!(cli.command, Command::Search { export: true, .. }));

        let cli = Cli::try_parse_from(["gleaner", "scrape-all"]).unwrap();
        assert!(matches!(cli.command, Command::ScrapeAll { file: None, .. }));
    }
}
