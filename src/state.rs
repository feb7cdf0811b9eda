//! Durable progress tracking for resumable runs
//!
//! The progress file records every file that already has a summary, so an
//! interrupted run can pick up where it stopped. Workers never touch the file
//! directly: each mutation goes through [`ProgressStore::mark_processed`],
//! which serializes load -> mutate -> save under one lock.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Persisted processed-set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressState {
    /// Version for state file format compatibility
    version: u32,

    /// Files with a recorded summary
    processed_files: BTreeSet<PathBuf>,

    /// Root directory of the run that last updated the state
    last_directory: Option<PathBuf>,

    /// Last save timestamp
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressState {
    /// Current state file format version
    const VERSION: u32 = 1;

    /// Create a new empty state
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            processed_files: BTreeSet::new(),
            last_directory: None,
            updated_at: None,
        }
    }

    /// Load state from file
    ///
    /// A missing file yields an empty state. Parse failures and version
    /// mismatches are errors; [`ProgressStore::load`] turns them into an
    /// empty state with a warning.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(?path, "State file does not exist, starting with empty state");
            return Ok(Self::new());
        }

        let file = File::open(path)
            .map_err(|e| Error::StateFile(format!("Failed to open state file: {}", e)))?;
        let reader = BufReader::new(file);

        let state: Self = serde_json::from_reader(reader)
            .map_err(|e| Error::StateFile(format!("Failed to parse state file: {}", e)))?;

        if state.version != Self::VERSION {
            return Err(Error::StateFile(format!(
                "State file version {} does not match {}",
                state.version,
                Self::VERSION
            )));
        }

        Ok(state)
    }

    /// Save state to file
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.updated_at = Some(chrono::Utc::now());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to a temporary file first, then rename over the old state
        let temp_path = path.with_extension("tmp");

        let file = File::create(&temp_path)
            .map_err(|e| Error::StateFile(format!("Failed to create temp state file: {}", e)))?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| Error::StateFile(format!("Failed to write state file: {}", e)))?;

        fs::rename(&temp_path, path)
            .map_err(|e| Error::StateFile(format!("Failed to rename temp state file: {}", e)))?;

        debug!(files_tracked = self.processed_files.len(), "Saved progress state");
        Ok(())
    }

    /// Check whether a file already has a recorded summary
    pub fn is_processed(&self, path: &Path) -> bool {
        self.processed_files.contains(path)
    }

    /// Record a processed file; returns false if it was already recorded
    pub fn mark_processed(&mut self, path: PathBuf) -> bool {
        self.processed_files.insert(path)
    }

    pub fn set_last_directory(&mut self, dir: PathBuf) {
        self.last_directory = Some(dir);
    }

    pub fn last_directory(&self) -> Option<&Path> {
        self.last_directory.as_deref()
    }

    /// Get the number of tracked files
    pub fn file_count(&self) -> usize {
        self.processed_files.len()
    }

    pub fn processed_files(&self) -> impl Iterator<Item = &Path> {
        self.processed_files.iter().map(PathBuf::as_path)
    }

    /// Candidates that are not yet processed, in their original order
    pub fn remaining(&self, candidates: &[PathBuf]) -> Vec<PathBuf> {
        candidates
            .iter()
            .filter(|p| !self.is_processed(p))
            .cloned()
            .collect()
    }
}

/// Owner of the progress file
///
/// Shared by reference across the workers of a batch.
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if a progress file is present on disk
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the current state, falling back to an empty one on any error
    pub fn load(&self) -> ProgressState {
        match ProgressState::load(&self.path) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not load progress state, starting empty");
                ProgressState::new()
            }
        }
    }

    /// Save the state; failures are logged and the run carries on
    pub fn save(&self, state: &mut ProgressState) -> bool {
        match state.save(&self.path) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not save progress state");
                false
            }
        }
    }

    /// Record `file` as processed with a fresh load -> insert -> save
    ///
    /// The lock is held across the whole read-modify-write.
    pub fn mark_processed(&self, file: &Path, root: &Path) -> bool {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut state = self.load();
        state.mark_processed(file.to_path_buf());
        state.set_last_directory(root.to_path_buf());
        self.save(&mut state)
    }

    /// Remove the progress file; a missing file is not an error
    pub fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Progress state cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::StateFile(format!("Failed to clear state file: {}", e))),
        }
    }
}
