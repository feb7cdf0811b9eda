//! Batch executor with Rayon worker pools
//!
//! Each batch gets its own pool; every file in the batch is summarized on a
//! worker and the call returns only after all workers have finished. A
//! successful file is marked processed in the progress store right away, a
//! failed one is logged and left for a later run.

use crate::client::Summarizer;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::progress::BatchProgress;
use crate::prompt::file_request;
use crate::report::SummaryMap;
use crate::select::sibling_files;
use crate::state::ProgressStore;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{Level, debug, error, info, span};

/// Run-wide context shared by every file request
#[derive(Debug, Clone)]
pub struct BatchContext {
    /// Root directory of the run
    pub root: PathBuf,
    /// Rendered project tree included in each prompt
    pub project_tree: String,
}

/// Per-batch counters
#[derive(Debug, Default)]
pub struct BatchStats {
    pub completed: AtomicUsize,
    pub failed: AtomicUsize,
}

impl BatchStats {
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}

/// A file that could not be summarized
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Result of one batch
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub summaries: SummaryMap,
    pub failures: Vec<FileFailure>,
}

/// Runs summarization for batches of files
pub struct BatchExecutor<'a> {
    summarizer: &'a dyn Summarizer,
    config: &'a Config,
    store: &'a ProgressStore,
    context: &'a BatchContext,
    show_progress: bool,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(
        summarizer: &'a dyn Summarizer,
        config: &'a Config,
        store: &'a ProgressStore,
        context: &'a BatchContext,
    ) -> Self {
        Self {
            summarizer,
            config,
            store,
            context,
            show_progress: true,
        }
    }

    /// Show or hide the terminal progress bar
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Summarize every file of the batch
    ///
    /// Only a failure to build the worker pool is returned as an error;
    /// per-file problems end up in [`BatchOutcome::failures`].
    pub fn run(&self, files: &[PathBuf]) -> Result<BatchOutcome> {
        if files.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let workers = self.config.workers_for(files.len());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("summarize-{}", i))
            .build()?;

        info!(files = files.len(), workers, "Processing batch");

        let stats = BatchStats::default();
        let progress = BatchProgress::new(files.len() as u64, self.show_progress);

        let results: Vec<(PathBuf, Result<String>)> = pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    let result = self.process_file(path);
                    match &result {
                        Ok(_) => stats.completed.fetch_add(1, Ordering::Relaxed),
                        Err(_) => stats.failed.fetch_add(1, Ordering::Relaxed),
                    };
                    progress.file_done(path);
                    (path.clone(), result)
                })
                .collect()
        });
        progress.finish();

        let mut outcome = BatchOutcome::default();
        for (path, result) in results {
            match result {
                Ok(summary) => {
                    outcome.summaries.insert(path, summary);
                }
                Err(e) => outcome.failures.push(FileFailure {
                    path,
                    error: e.to_string(),
                }),
            }
        }

        info!(
            summarized = stats.completed(),
            failed = stats.failed(),
            "Batch finished"
        );
        Ok(outcome)
    }

    /// Summarize one file and record it as processed on success
    fn process_file(&self, path: &Path) -> Result<String> {
        let _file_span = span!(Level::DEBUG, "summarize_file", ?path).entered();

        match self.summarize_file(path) {
            Ok(summary) => {
                if !self.store.mark_processed(path, &self.context.root) {
                    debug!(?path, "Summary kept in memory, progress not persisted");
                }
                Ok(summary)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to summarize file, skipping");
                Err(e)
            }
        }
    }

    fn summarize_file(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let content = String::from_utf8_lossy(&bytes);
        let siblings = sibling_files(path)?;

        let request = file_request(
            self.config,
            &self.context.project_tree,
            path,
            &siblings,
            &content,
        );

        let summary = self.summarizer.summarize(&request)?;
        if summary.trim().is_empty() {
            return Err(Error::MalformedResponse("summary is empty".into()));
        }

        debug!(?path, chars = summary.len(), "Summarized file");
        Ok(summary)
    }
}
