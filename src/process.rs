//! Run orchestration
//!
//! Drives a run through its phases:
//! - Init: validate configuration, resolve the root, optionally clear state
//! - Selecting: collect the candidate files
//! - Resuming / Fresh: subtract already-processed files, or start over
//! - BatchLoop: summarize batch by batch, flush markdown, fire supersummaries
//! - Finalizing: report the processed count and write the final summary
//!
//! Batches run strictly one after another; parallelism lives inside a batch.

use crate::aggregate::{Aggregator, SupersummarySchedule};
use crate::batch::{BatchContext, BatchExecutor, FileFailure};
use crate::client::Summarizer;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::estimate::TokenEstimator;
use crate::report::{OutputPaths, ReportWriter};
use crate::select::{list_files, list_tree};
use crate::state::ProgressStore;
use std::fs;
use std::path::PathBuf;
use tracing::{Level, error, info, span, warn};

/// Decides whether another batch runs after one finishes
///
/// Only consulted when a batch limit is set and files remain.
pub trait ContinuationPolicy {
    /// `batch_index` is zero-based, `processed` is the size of the batch that
    /// just finished and `remaining` counts the files not yet attempted
    fn should_continue(&mut self, batch_index: usize, processed: usize, remaining: usize) -> bool;
}

impl<F> ContinuationPolicy for F
where
    F: FnMut(usize, usize, usize) -> bool,
{
    fn should_continue(&mut self, batch_index: usize, processed: usize, remaining: usize) -> bool {
        self(batch_index, processed, remaining)
    }
}

/// Runs every batch without asking
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysContinue;

impl ContinuationPolicy for AlwaysContinue {
    fn should_continue(&mut self, _: usize, _: usize, _: usize) -> bool {
        true
    }
}

/// Per-run options that come from the command line rather than the config file
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory to summarize
    pub root: PathBuf,
    /// Delete the progress file before running
    pub clear_state: bool,
    /// Ignore existing progress when computing the work list
    pub restart: bool,
    /// Draw progress bars
    pub show_progress: bool,
}

impl RunOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            clear_state: false,
            restart: false,
            show_progress: false,
        }
    }
}

/// Phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    Selecting,
    Resuming,
    Fresh,
    BatchLoop,
    Finalizing,
    Done,
}

fn transition(phase: &mut RunPhase, next: RunPhase) {
    info!(from = ?phase, to = ?next, "Run phase");
    *phase = next;
}

/// What a run did
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Files matching the filters
    pub candidates: usize,
    /// Candidates skipped because an earlier run processed them
    pub already_processed: usize,
    /// Files summarized in this run
    pub summarized: usize,
    /// Files that failed in this run
    pub failures: Vec<FileFailure>,
    /// Batches executed
    pub batches: usize,
    /// Supersummaries generated
    pub supersummaries: usize,
    pub final_summary_written: bool,
    /// The continuation policy stopped the run with files left
    pub stopped_early: bool,
    /// Size of the processed-set after the run
    pub total_processed: usize,
}

/// Orchestrates a summarization run
pub struct Processor {
    config: Config,
    options: RunOptions,
    summarizer: Box<dyn Summarizer>,
    continuation: Box<dyn ContinuationPolicy>,
    estimator: Option<TokenEstimator>,
    store: ProgressStore,
    paths: OutputPaths,
    phase: RunPhase,
}

impl Processor {
    /// Prepare a run (the Init phase)
    ///
    /// Fails on invalid configuration, a missing root directory, an output
    /// directory that cannot be created, or a state file that cannot be cleared.
    pub fn new(config: Config, options: RunOptions, summarizer: Box<dyn Summarizer>) -> Result<Self> {
        config.validate()?;

        let root = fs::canonicalize(&options.root).map_err(|e| {
            Error::Config(format!("Cannot access directory {}: {}", options.root.display(), e))
        })?;
        if !root.is_dir() {
            return Err(Error::Config(format!("{} is not a directory", root.display())));
        }

        fs::create_dir_all(&config.output_dir)?;
        let paths = OutputPaths::new(&config.output_dir, &OutputPaths::timestamp(chrono::Local::now()));
        let store = ProgressStore::new(&paths.state);

        if options.clear_state {
            store.clear()?;
        }

        let estimator = config.token_estimator().map(TokenEstimator::new);

        Ok(Self {
            config,
            options: RunOptions { root, ..options },
            summarizer,
            continuation: Box::new(AlwaysContinue),
            estimator,
            store,
            paths,
            phase: RunPhase::Init,
        })
    }

    /// Replace the continuation policy (defaults to [`AlwaysContinue`])
    pub fn with_continuation(mut self, policy: impl ContinuationPolicy + 'static) -> Self {
        self.continuation = Box::new(policy);
        self
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Canonical root directory of the run
    pub fn root(&self) -> &std::path::Path {
        &self.options.root
    }

    /// Run the pipeline to completion
    pub fn run(&mut self) -> Result<RunReport> {
        let _span = span!(Level::INFO, "processor_run").entered();
        let mut report = RunReport::default();
        let root = self.options.root.clone();

        transition(&mut self.phase, RunPhase::Selecting);
        let candidates = list_files(&root, &self.config.file_extensions, &self.config.ignore_paths)?;
        report.candidates = candidates.len();
        info!(count = candidates.len(), root = %root.display(), "Total files found to process");

        let remaining = if !self.options.restart && self.store.exists() {
            transition(&mut self.phase, RunPhase::Resuming);
            let state = self.store.load();
            if let Some(last) = state.last_directory()
                && last != root.as_path()
            {
                warn!(last = %last.display(), "Progress file was written for a different directory");
            }
            let remaining = state.remaining(&candidates);
            report.already_processed = candidates.len() - remaining.len();
            info!(
                already_processed = report.already_processed,
                remaining = remaining.len(),
                "Resuming processing"
            );
            remaining
        } else {
            transition(&mut self.phase, RunPhase::Fresh);
            info!(count = candidates.len(), "Starting fresh processing");
            candidates
        };

        let context = BatchContext {
            project_tree: list_tree(&root, self.config.tree_depth, &self.config.ignore_paths)?,
            root,
        };

        transition(&mut self.phase, RunPhase::BatchLoop);
        let writer = ReportWriter::new(self.paths.clone());
        let aggregator = Aggregator::new(&*self.summarizer, &self.config);
        let executor = BatchExecutor::new(&*self.summarizer, &self.config, &self.store, &context)
            .with_progress(self.options.show_progress);
        let mut schedule = SupersummarySchedule::from_config(&self.config);
        let mut supersummaries: Vec<String> = Vec::new();
        let limit = self.config.batch_limit();

        let mut offset = 0;
        while offset < remaining.len() {
            let end = limit.map_or(remaining.len(), |l| (offset + l).min(remaining.len()));
            let batch = &remaining[offset..end];
            offset = end;

            let batch_index = report.batches;
            report.batches += 1;

            if let Some(estimator) = &self.estimator
                && let Some(tokens) = estimator.estimate(batch)
            {
                info!(tokens, "Estimated total tokens for this batch");
            }

            let outcome = executor.run(batch)?;
            report.summarized += outcome.summaries.len();

            match writer.append_markdown(&outcome.summaries) {
                Ok(()) if !outcome.summaries.is_empty() => {
                    info!(path = %writer.paths().summaries.display(), "Results saved");
                }
                Ok(()) => {}
                Err(e) => error!(error = %e, "Error saving summaries to markdown"),
            }

            for group in schedule.due(&outcome.summaries) {
                info!(files = group.len(), "Generating supersummary");
                match aggregator.summarize_summaries(&group) {
                    Ok(text) => {
                        if let Err(e) = writer.append_supersummary(&text) {
                            error!(error = %e, "Error appending supersummary");
                        }
                        supersummaries.push(text);
                    }
                    Err(e) => error!(error = %e, "Error generating supersummary"),
                }
            }

            report.failures.extend(outcome.failures);

            let left = remaining.len() - offset;
            if left > 0
                && limit.is_some()
                && !self.continuation.should_continue(batch_index, batch.len(), left)
            {
                info!(remaining = left, "Stopping before the next batch");
                report.stopped_early = true;
                break;
            }
        }

        transition(&mut self.phase, RunPhase::Finalizing);
        report.total_processed = self.store.load().file_count();
        report.supersummaries = supersummaries.len();
        info!(total = report.total_processed, "Total files processed");

        if self.config.generate_final_summary {
            if supersummaries.is_empty() {
                warn!("No supersummaries were generated, skipping final summary");
            } else {
                info!(supersummaries = supersummaries.len(), "Generating final summary");
                match aggregator.summarize_all(&supersummaries) {
                    Ok(text) => match writer.append_final_summary(&text) {
                        Ok(()) => {
                            report.final_summary_written = true;
                            info!(path = %writer.paths().final_summary.display(), "Final summary saved");
                        }
                        Err(e) => error!(error = %e, "Error saving final summary"),
                    },
                    Err(e) => error!(error = %e, "Error generating final summary"),
                }
            }
        }

        transition(&mut self.phase, RunPhase::Done);
        Ok(report)
    }
}
