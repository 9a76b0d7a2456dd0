//! Breakout screener - main entry point
//!
//! This binary provides two subcommands:
//! - scan: one full pass over the universe, then exit
//! - watch: continuous scanning with a sleep between cycles

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "breakout-screener")]
#[command(about = "Rolling-window fresh-high and reversal screener for NSE symbols", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single full-universe scan
    Scan {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/screener.json")]
        config: String,

        /// Universe CSV with symbol,sector columns
        #[arg(short, long, default_value = "universe.csv")]
        universe: String,

        /// Signal CSV path (overrides config file)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Scan continuously until Ctrl+C
    Watch {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/screener.json")]
        config: String,

        /// Universe CSV with symbol,sector columns
        #[arg(short, long, default_value = "universe.csv")]
        universe: String,

        /// Signal CSV path (overrides config file)
        #[arg(short, long)]
        output: Option<String>,

        /// Seconds between cycles (overrides config file)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Stop after this many cycles instead of running until Ctrl+C
        #[arg(long)]
        cycles: Option<u32>,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Create log file with naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Set log level - filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    // File appender
    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    // File layer - same format but without ANSI colors
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Scan { .. } => "scan",
        Commands::Watch { .. } => "watch",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Scan {
            config,
            universe,
            output,
        } => commands::scan::run(config, universe, output),

        Commands::Watch {
            config,
            universe,
            output,
            interval,
            cycles,
        } => commands::watch::run(config, universe, output, interval, cycles),
    }
}
