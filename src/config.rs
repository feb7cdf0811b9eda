//! Configuration types for the tree summarizer

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default Messages API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";

/// How supersummaries are scheduled relative to batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SupersummaryPolicy {
    /// Fire once for a batch whose successful summary count is an exact
    /// multiple of the interval; the check never looks across batches
    #[default]
    PerBatch,
    /// Accumulate summaries across batches and fire every time `interval`
    /// of them are pending
    Cumulative,
}

/// Configuration for a summarization run
///
/// Loaded once at startup and passed read-only to every component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Messages API endpoint the summarization client talks to
    pub endpoint: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Protocol version string sent with every request
    pub anthropic_version: String,

    /// Model identifier
    pub model_id: String,

    /// File name suffixes to include (e.g. ".go", ".rs")
    pub file_extensions: Vec<String>,

    /// Path substrings to skip; a matching directory is pruned entirely
    pub ignore_paths: Vec<String>,

    pub system_prompt: String,
    pub file_prompt: String,
    pub summary_prompt: String,
    pub final_summary_prompt: String,

    /// Generation cap for file summaries and supersummaries
    pub max_tokens: u32,

    /// Generation cap for the final summary
    pub final_summary_max_tokens: u32,

    /// Generate a final summary over all supersummaries at the end of a run
    pub generate_final_summary: bool,

    /// Files per batch (<= 0 means everything in one batch)
    pub limit: i64,

    /// Worker threads per batch (0 = one per file in the batch)
    pub parallel: usize,

    /// Summaries per supersummary (<= 0 disables supersummaries)
    pub supersummary_interval: i64,

    /// Whether the interval is checked per batch or across the whole run
    pub supersummary_policy: SupersummaryPolicy,

    pub temperature: f64,
    pub top_p: f64,

    /// Directory for summaries, state and logs
    pub output_dir: PathBuf,

    /// Depth of the project tree included in each file prompt
    pub tree_depth: usize,

    /// External token estimation program (empty disables)
    pub token_estimator: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Verbose output
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            api_key_env: "ANTHROPIC_API_KEY".into(),
            anthropic_version: "2023-06-01".into(),
            model_id: "claude-3-haiku-20240307".into(),
            file_extensions: vec![".go".into(), ".py".into(), ".rs".into()],
            ignore_paths: vec![".git/".into(), "node_modules".into(), "vendor/".into()],
            system_prompt: "You are an expert software engineer who writes precise, compact documentation.".into(),
            file_prompt: "Summarize the purpose and key behavior of the following file.".into(),
            summary_prompt: "Combine the following file summaries into one coherent overview.".into(),
            final_summary_prompt: "Combine the following supersummaries into a final summary of the project.".into(),
            max_tokens: 1000,
            final_summary_max_tokens: 4000,
            generate_final_summary: false,
            limit: 0,
            parallel: 0,
            supersummary_interval: 0,
            supersummary_policy: SupersummaryPolicy::default(),
            temperature: 0.3,
            top_p: 0.9,
            output_dir: PathBuf::from("output"),
            tree_depth: 3,
            token_estimator: "ingest".into(),
            request_timeout_secs: 120,
            verbose: false,
        }
    }
}

impl Config {
    /// Batch size, or `None` when everything runs as one batch
    pub fn batch_limit(&self) -> Option<usize> {
        (self.limit > 0).then_some(self.limit as usize)
    }

    /// Supersummary interval, or `None` when supersummaries are disabled
    pub fn supersummary_interval(&self) -> Option<usize> {
        (self.supersummary_interval > 0).then_some(self.supersummary_interval as usize)
    }

    /// Worker threads for a batch of `batch_len` files
    pub fn workers_for(&self, batch_len: usize) -> usize {
        match self.parallel {
            0 => batch_len.max(1),
            n => n.min(batch_len.max(1)),
        }
    }

    /// Token estimation program, if enabled
    pub fn token_estimator(&self) -> Option<&str> {
        let program = self.token_estimator.trim();
        (!program.is_empty()).then_some(program)
    }

    /// Check value ranges before a run starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.file_extensions.is_empty() {
            return Err(ConfigError::invalid("file_extensions", "at least one extension is required"));
        }
        if self.model_id.trim().is_empty() {
            return Err(ConfigError::invalid("model_id", "must not be empty"));
        }
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::invalid("endpoint", "must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ConfigError::invalid("temperature", "must be between 0 and 1"));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ConfigError::invalid("top_p", "must be between 0 and 1"));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::invalid("max_tokens", "must be greater than 0"));
        }
        if self.generate_final_summary && self.final_summary_max_tokens == 0 {
            return Err(ConfigError::invalid("final_summary_max_tokens", "must be greater than 0"));
        }
        if self.tree_depth == 0 {
            return Err(ConfigError::invalid("tree_depth", "must be greater than 0"));
        }
        Ok(())
    }

    /// Load configuration from a JSON file, or TOML when the extension is `.toml`
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

        if is_toml {
            toml::from_str(&content).map_err(|e| ConfigError::TomlError {
                path: path.to_path_buf(),
                source: e,
            })
        } else {
            serde_json::from_str(&content).map_err(|e| ConfigError::JsonError {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        serde_json::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Errors that can occur when loading configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse a JSON configuration file
    JsonError {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Failed to parse a TOML configuration file
    TomlError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// A field holds a value the run cannot use
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: &'static str) -> Self {
        ConfigError::Invalid { field, reason }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::JsonError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::TomlError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::Invalid { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::JsonError { source, .. } => Some(source),
            ConfigError::TomlError { source, .. } => Some(source),
            ConfigError::Invalid { .. } => None,
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        crate::error::Error::Config(e.to_string())
    }
}
