//! Optional token estimate from an external tool
//!
//! The tool is invoked with the batch's file paths and its output is scanned
//! for a `Tokens (Approximate): 4,324` line. Anything unexpected simply means
//! no estimate.

use regex::Regex;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use tracing::{debug, info};

static TOKEN_LINE: OnceLock<Regex> = OnceLock::new();

fn token_line() -> &'static Regex {
    TOKEN_LINE.get_or_init(|| Regex::new(r"Tokens \(Approximate\):\s*([0-9][0-9,]*)").unwrap())
}

/// Pull the approximate token count out of the tool's output
pub fn parse_token_count(output: &str) -> Option<usize> {
    let caps = token_line().captures(output)?;
    caps[1].replace(',', "").parse().ok()
}

/// Runs the external estimation program
#[derive(Debug, Clone)]
pub struct TokenEstimator {
    program: String,
}

impl TokenEstimator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Estimate tokens for `files`; `None` when the tool is absent or silent
    pub fn estimate(&self, files: &[PathBuf]) -> Option<usize> {
        if files.is_empty() {
            return None;
        }

        let output = match Command::new(&self.program)
            .args(files)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(program = %self.program, "Token estimator not found on PATH, skipping estimate");
                return None;
            }
            Err(e) => {
                debug!(program = %self.program, error = %e, "Token estimator failed to start");
                return None;
            }
        };

        if !output.status.success() {
            debug!(program = %self.program, status = %output.status, "Token estimator exited with failure");
            return None;
        }

        let count = parse_token_count(&String::from_utf8_lossy(&output.stdout));
        if count.is_none() {
            debug!(program = %self.program, "No token count in estimator output");
        }
        count
    }
}
