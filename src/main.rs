use anyhow::{bail, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use litharvest::config::{default_config_path, find_config_file, get_config, load_config, Config};
use litharvest::export::default_file_name;
use litharvest::import::default_output_path;
use litharvest::models::{Completion, DateRange, Query};
use litharvest::pipeline::{harvest, import_bibtex};
use litharvest::sources::Source;
#[cfg(feature = "acm")]
use litharvest::sources::AcmSource;
#[cfg(feature = "pubmed")]
use litharvest::sources::PubMedSource;
#[cfg(feature = "wos")]
use litharvest::sources::WosSource;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// litharvest - Harvest bibliographic metadata into normalized CSV tables
#[derive(Parser, Debug)]
#[command(name = "litharvest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Harvest bibliographic metadata from literature sources into CSV", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory CSV files are written to
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Arguments shared by every source command
#[derive(Args, Debug)]
struct SearchArgs {
    /// Search query, written in the source's own syntax
    #[arg(long)]
    query: Option<String>,

    /// Start of the publication date range (YYYY-MM-DD or YYYY/MM/DD)
    #[arg(long)]
    start: Option<String>,

    /// End of the publication date range (YYYY-MM-DD or YYYY/MM/DD)
    #[arg(long)]
    end: Option<String>,

    /// Output CSV path (default: <output-dir>/lit_<source>_<dates>.csv)
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scrape the ACM Digital Library search results
    #[cfg(feature = "acm")]
    Acm {
        #[command(flatten)]
        search: SearchArgs,

        /// Results per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Pause between result pages in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Query the Web of Science Lite API
    #[cfg(feature = "wos")]
    Wos {
        #[command(flatten)]
        search: SearchArgs,

        /// Records per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Clarivate API key (default: WOS_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Query PubMed through NCBI E-utilities
    #[cfg(feature = "pubmed")]
    Pubmed {
        #[command(flatten)]
        search: SearchArgs,

        /// Ids per enumeration request
        #[arg(long)]
        batch_size: Option<usize>,

        /// Contact email sent to NCBI (default: NCBI_EMAIL)
        #[arg(long)]
        email: Option<String>,
    },

    /// Convert an ACM BibTeX export into CSV
    ImportBib {
        /// The .bib file (relative paths are also looked up in the output directory)
        path: PathBuf,

        /// Output CSV path (default: lit_<name>.csv next to the input)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Write a configuration file with the default settings
    InitConfig {
        /// Where to write the file (default: <config dir>/litharvest/config.toml)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

/// Print all available environment variables
fn print_env_vars() {
    println!("litharvest - Environment Variables");
    println!();
    println!("API Keys:");
    println!("  WOS_API_KEY                 Clarivate Web of Science Lite API key");
    println!("  NCBI_API_KEY                NCBI E-utilities API key (optional)");
    println!("  NCBI_EMAIL                  Contact email sent with PubMed requests");
    println!();
    println!("Default Queries:");
    println!("  ACM_QUERY                   Query for the acm command");
    println!("  WOS_QUERY                   Query for the wos command");
    println!("  PUBMED_QUERY                Query for the pubmed command");
    println!();
    println!("Overrides (any config key, sections separated by a double underscore):");
    println!("  LITHARVEST_FETCH__PAGE_DELAY_MS      Pause between ACM pages (default: 1000)");
    println!("  LITHARVEST_FETCH__WOS_PAGE_SIZE      Web of Science page size (default: 100)");
    println!("  LITHARVEST_FETCH__PUBMED_BATCH_SIZE  PubMed ids per request (default: 1000)");
    println!("  LITHARVEST_OUTPUT__DIRECTORY         Output directory (default: literature)");
    println!();
    println!("Other Settings:");
    println!("  RUST_LOG                    Rust logging level (e.g., debug, info, warn, error)");
}

/// Ask on the terminal; `None` when stdin is not interactive or the answer is empty
fn prompt(label: &str) -> Result<Option<String>> {
    if !std::io::stdin().is_terminal() {
        return Ok(None);
    }

    eprint!("{}: ", label);
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;

    let answer = line.trim();
    Ok((!answer.is_empty()).then(|| answer.to_string()))
}

fn resolve_query(search: &SearchArgs, configured: Option<String>, label: &str) -> Result<Query> {
    let text = match search.query.clone().or(configured) {
        Some(text) => text,
        None => match prompt(label)? {
            Some(text) => text,
            None => bail!("no query given; pass one as an argument or set it in the configuration"),
        },
    };

    let (start, end) = match (&search.start, &search.end) {
        (None, None) => (
            prompt("Enter the start date (YYYY-MM-DD) or press Enter to skip")?,
            prompt("Enter the end date (YYYY-MM-DD) or press Enter to skip")?,
        ),
        (start, end) => (start.clone(), end.clone()),
    };

    let mut query = Query::new(text);
    match (start, end) {
        (Some(start), Some(end)) => {
            query = query.date_range(DateRange::parse(&start, &end)?);
        }
        (None, None) => {}
        _ => bail!("a date range needs both --start and --end"),
    }

    Ok(query)
}

async fn run(
    source: &dyn Source,
    query: Query,
    output: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    let result = harvest(source, &query)
        .await
        .with_context(|| format!("{} fetch aborted", source.name()))?;

    if result.completion == Completion::NoMatches {
        println!("No results found.");
        return Ok(());
    }

    let path = output.unwrap_or_else(|| {
        config
            .output
            .directory
            .join(default_file_name(result.source, query.date_range.as_ref()))
    });

    let rows = result
        .write_csv(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Saved {} records to {}", rows, path.display());

    if let Completion::Degraded { status } = result.completion {
        let cause = match status {
            Some(status) => format!("HTTP status {}", status),
            None => "a failed request".to_string(),
        };
        eprintln!(
            "warning: {} stopped after {}; the export is incomplete",
            source.name(),
            cause
        );
    }

    Ok(())
}

fn import_bib(path: &Path, output: Option<PathBuf>, config: &Config) -> Result<()> {
    let input = if !path.exists() && path.is_relative() {
        config.output.directory.join(path)
    } else {
        path.to_path_buf()
    };

    let result = import_bibtex(&input)
        .with_context(|| format!("Failed to import {}", input.display()))?;
    println!("Found {} entries", result.records.len());

    let output = output.unwrap_or_else(|| default_output_path(&input));
    let rows = result
        .write_csv(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Saved {} records to {}", rows, output.display());
    Ok(())
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = path.unwrap_or_else(default_config_path);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    Config::default()
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show environment variables and exit if requested
    if cli.env {
        print_env_vars();
        return Ok(());
    }

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    let fmt_layer = if cli.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("litharvest={}", env_filter)),
        ))
        .with(fmt_layer)
        .init();

    // Load configuration from file if specified or found in default locations
    let mut config = if let Some(config_path) = &cli.config {
        load_config(config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?
    } else if let Some(config_path) = find_config_file() {
        tracing::info!("Using config file: {}", config_path.display());
        load_config(&config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?
    } else {
        get_config()
    };

    if let Some(timeout) = cli.timeout {
        config.fetch.timeout_secs = timeout;
    }
    if let Some(dir) = cli.output_dir {
        config.output.directory = dir;
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        #[cfg(feature = "acm")]
        Commands::Acm {
            search,
            page_size,
            delay_ms,
        } => {
            if let Some(size) = page_size {
                config.fetch.acm_page_size = size;
            }
            if let Some(delay) = delay_ms {
                config.fetch.page_delay_ms = delay;
            }
            let query = resolve_query(&search, config.queries.acm.clone(), "Enter your ACM query")?;
            let source = AcmSource::new(&config.fetch)?;
            run(&source, query, search.output, &config).await
        }

        #[cfg(feature = "wos")]
        Commands::Wos {
            search,
            page_size,
            api_key,
        } => {
            if let Some(size) = page_size {
                config.fetch.wos_page_size = size;
            }
            let query = resolve_query(&search, config.queries.wos.clone(), "Enter your WOS query")?;
            let api_key = match api_key.or_else(|| config.api_keys.wos.clone()) {
                Some(key) => key,
                None => match prompt("Enter your WOS API key")? {
                    Some(key) => key,
                    None => bail!("a Web of Science API key is required (set WOS_API_KEY)"),
                },
            };
            let source = WosSource::new(api_key, &config.fetch)?;
            run(&source, query, search.output, &config).await
        }

        #[cfg(feature = "pubmed")]
        Commands::Pubmed {
            search,
            batch_size,
            email,
        } => {
            if let Some(size) = batch_size {
                config.fetch.pubmed_batch_size = size;
            }
            if email.is_some() {
                config.fetch.contact_email = email;
            }
            let query = resolve_query(&search, config.queries.pubmed.clone(), "Enter your query")?;
            let source = PubMedSource::new(&config.fetch, config.api_keys.ncbi.clone())?;
            run(&source, query, search.output, &config).await
        }

        Commands::ImportBib { path, output } => import_bib(&path, output, &config),

        Commands::InitConfig { path, force } => init_config(path, force),
    }
}
