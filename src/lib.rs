//! Tree Summary - resumable batch summarization of a directory tree
//!
//! This library provides:
//! - Candidate file selection with extension and ignore-path filters
//! - A durable processed-set so interrupted runs resume
//! - Parallel per-file summarization with Rayon, one batch at a time
//! - Supersummaries per batch (or per N files) and an optional final summary
//! - Append-only markdown reports

pub mod aggregate;
pub mod batch;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod estimate;
pub mod process;
pub mod progress;
pub mod prompt;
pub mod report;
pub mod select;
pub mod state;

pub use cli::Cli;
pub use client::{MessagesClient, Summarizer, SummaryRequest};
pub use config::{Config, ConfigError, SupersummaryPolicy};
pub use error::{Error, Result};
pub use process::{AlwaysContinue, ContinuationPolicy, Processor, RunOptions, RunPhase, RunReport};
pub use progress::{ConfirmContinuation, SuspendingStderr};
pub use state::{ProgressState, ProgressStore};
