//! Domain Sweep CLI Application
//!
//! Sweeps generated names across registrar-operated suffixes and records
//! the availability of each one to a CSV store. This application is a thin
//! frontend over domain-sweep-lib.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use domain_sweep_lib::config::{
    normalize_suffixes, parse_timeout, parse_timeout_string, validate_pattern,
    validate_suffix_format, MAX_RUN_LENGTH,
};
use domain_sweep_lib::{load_env_config, ConfigManager, FileConfig};
use domain_sweep_lib::{
    tasks_for_config, CsvStore, RegistrarClient, RouteTable, Scheduler, SweepConfig,
};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for domain-sweep
#[derive(Parser, Debug)]
#[command(name = "domain-sweep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sweep generated names across registrar suffixes and record availability")]
#[command(
    long_about = "Check every name from a word list, repeated-character runs and wildcard patterns under each configured suffix.\n\nLookups run with bounded concurrency and every result is saved to a CSV store as soon as it completes."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Suffixes to sweep (comma-separated or multiple -s flags)
    #[arg(short = 's', long = "suffix", value_name = "SUFFIX", value_delimiter = ',', action = clap::ArgAction::Append, help_heading = "Name Selection")]
    pub suffixes: Option<Vec<String>>,

    /// Lengths of repeated-character runs, e.g. 2 gives 00..99, aa..zz
    #[arg(
        long = "lengths",
        value_name = "N",
        value_delimiter = ',',
        help_heading = "Name Selection"
    )]
    pub lengths: Option<Vec<usize>>,

    /// JSON word list (array of strings)
    #[arg(
        short = 'w',
        long = "words",
        value_name = "FILE",
        help_heading = "Name Selection"
    )]
    pub words: Option<String>,

    /// Pattern for name generation (\w=letter, \d=digit, ?=either)
    #[arg(
        long = "pattern",
        value_name = "PATTERN",
        value_delimiter = ',',
        help_heading = "Name Selection"
    )]
    pub patterns: Option<Vec<String>>,

    /// Print the task list as JSON without checking or writing anything
    #[arg(long = "dry-run", help_heading = "Name Selection")]
    pub dry_run: bool,

    /// CSV result store
    #[arg(
        short = 'o',
        long = "store",
        value_name = "FILE",
        help_heading = "Results"
    )]
    pub store: Option<String>,

    /// Do not re-check names already in the store
    #[arg(long = "skip-known", help_heading = "Results")]
    pub skip_known: bool,

    /// Max concurrent lookups (default: 5, max: 100)
    #[arg(short = 'c', long = "concurrency", help_heading = "Performance")]
    pub concurrency: Option<usize>,

    /// Per-lookup timeout, e.g. 10s or 2m
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// List registrar routes and exit
    #[arg(long = "list-routes", help_heading = "Configuration")]
    pub list_routes: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show debug logging
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_tracing(&args);

    if let Err(e) = run_sweep(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > 100 {
            return Err("Concurrency must be between 1 and 100".to_string());
        }
    }

    if let Some(lengths) = &args.lengths {
        if lengths.iter().any(|&l| l == 0 || l > MAX_RUN_LENGTH) {
            return Err(format!("Lengths must be between 1 and {}", MAX_RUN_LENGTH));
        }
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout_string(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '5s', '30s', '2m'",
                timeout
            ));
        }
    }

    if let Some(suffixes) = &args.suffixes {
        for suffix in suffixes {
            validate_suffix_format(suffix.trim()).map_err(|e| e.to_string())?;
        }
    }

    if let Some(patterns) = &args.patterns {
        for pattern in patterns {
            validate_pattern(pattern).map_err(|e| e.to_string())?;
        }
    }

    if args.dry_run && args.list_routes {
        return Err("Cannot combine --dry-run with --list-routes".to_string());
    }

    Ok(())
}

/// Log to stderr; `-d`/`-v` win over `RUST_LOG`, which wins over `warn`.
fn init_tracing(args: &Args) {
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run_sweep(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&args)?;
    let routes = RouteTable::with_custom(&config.routes)?;

    if args.list_routes {
        ui::print_routes(&routes);
        return Ok(());
    }

    let tasks = tasks_for_config(&config)?;
    tracing::info!(tasks = tasks.len(), suffixes = ?config.suffixes, "task list built");

    if args.dry_run {
        for suffix in &config.suffixes {
            routes.resolve(suffix)?;
        }
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    let checker = Arc::new(RegistrarClient::with_config(routes, config.timeout)?);
    let store = Box::new(CsvStore::new(&config.store_path));
    let scheduler =
        Scheduler::with_config(checker, store, &config)?.on_progress(ui::print_task_line);

    ui::print_header(tasks.len(), &config);
    let summary = scheduler.run(tasks).await?;
    println!();
    ui::print_summary(&summary, &config.store_path);

    Ok(())
}

/// Resolve the run configuration: CLI > environment > config files > defaults.
fn build_config(args: &Args) -> Result<SweepConfig, Box<dyn std::error::Error>> {
    let mut config = SweepConfig::default();
    let config_manager = ConfigManager::new(args.verbose || args.debug);
    let env_config = load_env_config();

    // Step 1: config files, either the explicit one or discovered ones
    let explicit_path = args.config.clone().or_else(|| env_config.config.clone());
    let file_config: FileConfig = match &explicit_path {
        Some(path) => {
            tracing::info!(path = %path, "using explicit config file");
            config_manager
                .load_file(path)
                .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?
        }
        None => config_manager.discover_and_load()?,
    };
    file_config.apply_to(&mut config)?;

    // Step 2: DS_* environment variables
    env_config.apply_to(&mut config);

    // Step 3: CLI arguments (highest precedence)
    apply_cli_args_to_config(&mut config, args)?;

    Ok(config)
}

fn apply_cli_args_to_config(
    config: &mut SweepConfig,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(timeout) = &args.timeout {
        config.timeout = Some(parse_timeout(timeout)?);
    }
    if let Some(suffixes) = &args.suffixes {
        config.suffixes = normalize_suffixes(suffixes);
    }
    if let Some(lengths) = &args.lengths {
        config.lengths = lengths.clone();
    }
    if let Some(words) = &args.words {
        config.words_path = words.clone();
    }
    if let Some(store) = &args.store {
        config.store_path = store.clone();
    }
    if let Some(patterns) = &args.patterns {
        config.patterns = patterns.clone();
    }
    if args.skip_known {
        config.skip_known = true;
    }
    Ok(())
}
