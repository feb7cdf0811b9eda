//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tree_summary::{Config, Error, Result, Summarizer, SummaryRequest};

/// In-memory summarizer that records every prompt
///
/// File prompts are answered with `summary of <file name>`; supersummary and
/// final-summary prompts with a fixed text. Any prompt containing one of the
/// `fail_on` markers fails.
#[derive(Default)]
pub struct FakeSummarizer {
    pub prompts: Mutex<Vec<String>>,
    pub fail_on: Vec<String>,
}

impl FakeSummarizer {
    pub fn failing_on(markers: &[&str]) -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            fail_on: markers.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(needle))
            .count()
    }
}

impl Summarizer for FakeSummarizer {
    fn summarize(&self, request: &SummaryRequest) -> Result<String> {
        self.prompts.lock().unwrap().push(request.prompt.clone());

        if self.fail_on.iter().any(|m| request.prompt.contains(m.as_str())) {
            return Err(Error::Request("simulated failure".into()));
        }

        if request.prompt.contains("SUPER_TASK") {
            return Ok("a supersummary".into());
        }
        if request.prompt.contains("FINAL_TASK") {
            return Ok("the final summary".into());
        }

        let name = request
            .prompt
            .split("Files in the same directory as ")
            .nth(1)
            .and_then(|rest| rest.split(':').next())
            .unwrap_or("unknown");
        Ok(format!("summary of {}", name))
    }
}

/// Lets a test keep a handle on the summarizer it hands to the processor
pub struct Shared(pub std::sync::Arc<FakeSummarizer>);

impl Summarizer for Shared {
    fn summarize(&self, request: &SummaryRequest) -> Result<String> {
        self.0.summarize(request)
    }
}

pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

pub fn test_config(output_dir: &Path) -> Config {
    Config {
        output_dir: output_dir.to_path_buf(),
        file_extensions: vec![".go".into()],
        ignore_paths: vec![],
        summary_prompt: "SUPER_TASK".into(),
        final_summary_prompt: "FINAL_TASK".into(),
        token_estimator: String::new(),
        limit: 0,
        ..Config::default()
    }
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

pub fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap()
}
