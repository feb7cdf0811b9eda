//! Tree Summary - summarize a directory tree with a language model
//!
//! Walks a directory, summarizes each matching file, and appends the
//! results to markdown reports. Progress survives restarts.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::Path;
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tree_summary::{
    Cli, ConfirmContinuation, Config, MessagesClient, Processor, RunReport, SuspendingStderr,
};

// CLI Output Module
mod cli_output {
    //! Styled terminal output for the run summary

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(format!("{}\n", "─".repeat(60))));
    }

    pub fn print_title(title: &str) {
        let padding = 60usize.saturating_sub(title.len()) / 2;
        let _ = stdout().execute(Print(format!(
            "{}{}\n\n",
            " ".repeat(padding),
            title.bold()
        )));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_stat(key: &str, value: &str, color: Color) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value).with(color).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_key_value(key: &str, value: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(format!("{}\n", value)));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.sample_config {
        println!("{}", Config::sample_config());
        return Ok(());
    }

    let config = Config::load_from_file(&cli.config)
        .with_context(|| format!("Could not load configuration from {}", cli.config.display()))?;
    let config = cli.merge_with_config(config);
    config.validate()?;

    let log_path = config.output_dir.join("logs").join(format!(
        "treesummary_{}.log",
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    let _guard = setup_logging(&cli, &config, &log_path)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Tree Summary starting");
    if config.verbose {
        info!(?config, "Configuration loaded");
    }

    let directory = cli
        .directory
        .clone()
        .context("Please provide the directory path as an argument")?;

    let client = MessagesClient::from_config(&config)?;
    let mut processor = Processor::new(config, cli.run_options(directory), Box::new(client))?;
    if !cli.yes {
        processor = processor.with_continuation(ConfirmContinuation);
    }

    match processor.run() {
        Ok(report) => {
            print_report(&report, &processor, &log_path);
            info!(log_file = %log_path.display(), "Run complete");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            Err(e.into())
        }
    }
}

fn print_report(report: &RunReport, processor: &Processor, log_path: &Path) {
    use cli_output::*;

    let paths = processor.paths();

    print_separator();
    print_title("Summarization complete");
    print_separator();

    print_stat("Candidates", &report.candidates.to_string(), CliTheme::ACCENT);
    print_stat("Already processed", &report.already_processed.to_string(), CliTheme::HINT);
    print_stat("Summarized", &report.summarized.to_string(), CliTheme::SUCCESS);
    print_stat("Failed", &report.failures.len().to_string(), CliTheme::ERROR);
    print_stat("Batches", &report.batches.to_string(), CliTheme::ACCENT);
    print_stat("Supersummaries", &report.supersummaries.to_string(), CliTheme::ACCENT);
    print_stat("Total processed", &report.total_processed.to_string(), CliTheme::SUCCESS);
    print_blank();

    if !report.failures.is_empty() {
        print_separator();
        print_error(&format!("{} files failed and will be retried on the next run", report.failures.len()));
        for failure in &report.failures {
            print_key_value(&failure.path.display().to_string(), &failure.error);
        }
        print_blank();
    }

    if report.stopped_early {
        print_warning("Stopped before all files were processed; run again to resume");
    }

    print_separator();
    print_key_value("Directory", &processor.root().display().to_string());
    if report.summarized > 0 {
        print_key_value("Summaries", &paths.summaries.display().to_string());
    }
    if report.supersummaries > 0 {
        print_key_value("Supersummaries", &paths.supersummaries.display().to_string());
    }
    if report.final_summary_written {
        print_key_value("Final summary", &paths.final_summary.display().to_string());
    }
    print_key_value("Log file", &log_path.display().to_string());
}

/// Log to the run's log file and to stderr
///
/// Console lines go through [`SuspendingStderr`] so batch progress bars are
/// redrawn below them instead of being torn.
fn setup_logging(cli: &Cli, config: &Config, log_path: &Path) -> Result<WorkerGuard> {
    let level = if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if cli.json_log {
        subscriber
            .with(fmt::layer().json().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_target(false).with_writer(|| SuspendingStderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_target(false).with_writer(|| SuspendingStderr))
            .init();
    }

    Ok(guard)
}
