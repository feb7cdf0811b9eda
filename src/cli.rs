//! CLI argument parsing with clap

use crate::config::Config;
use crate::process::RunOptions;
use clap::Parser;
use std::path::PathBuf;

/// Tree Summary - summarize every file in a directory tree with a language model
///
/// Progress is kept in the output directory, so an interrupted run resumes
/// where it stopped. Per-file summaries, supersummaries and the final summary
/// are appended to timestamped markdown files.
#[derive(Parser, Debug)]
#[command(name = "tree-summary")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to summarize
    #[arg(required_unless_present = "sample_config")]
    pub directory: Option<PathBuf>,

    /// Path to the configuration file (JSON, or TOML with a .toml extension)
    #[arg(short = 'C', long, default_value = "config.json")]
    pub config: PathBuf,

    /// Clear the saved progress before running
    #[arg(long)]
    pub clear_state: bool,

    /// Start from the beginning, ignoring saved progress
    #[arg(long)]
    pub restart: bool,

    /// Continue with every batch without asking
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Output directory for summaries, state and logs
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Files per batch (0 = all files in one batch)
    #[arg(short, long)]
    pub limit: Option<i64>,

    /// Worker threads per batch (0 = one per file)
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,

    /// Print a sample configuration and exit
    #[arg(long)]
    pub sample_config: bool,
}

impl Cli {
    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref output) = self.output {
            config.output_dir = output.clone();
        }
        if let Some(limit) = self.limit {
            config.limit = limit;
        }
        if let Some(parallel) = self.parallel {
            config.parallel = parallel;
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Run options for the given root directory
    pub fn run_options(&self, root: PathBuf) -> RunOptions {
        RunOptions {
            root,
            clear_state: self.clear_state,
            restart: self.restart,
            show_progress: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["tree-summary", "src"]);
        assert_eq!(cli.directory, Some(PathBuf::from("src")));
        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert!(!cli.clear_state);
        assert!(!cli.restart);
    }

    #[test]
    fn test_directory_required() {
        assert!(Cli::try_parse_from(["tree-summary"]).is_err());
        assert!(Cli::try_parse_from(["tree-summary", "--sample-config"]).is_ok());
    }

    #[test]
    fn test_merge_overrides() {
        let cli = Cli::parse_from([
            "tree-summary", "src", "--output", "out", "--limit", "5", "--parallel", "2", "-v",
        ]);
        let config = cli.merge_with_config(Config::default());
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.batch_limit(), Some(5));
        assert_eq!(config.parallel, 2);
        assert!(config.verbose);
    }

    #[test]
    fn test_run_options_flags() {
        let cli = Cli::parse_from(["tree-summary", "src", "--restart", "--clear-state"]);
        let options = cli.run_options(PathBuf::from("src"));
        assert!(options.restart);
        assert!(options.clear_state);
    }
}
