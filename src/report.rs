//! Markdown artifacts: per-file summaries, supersummaries and the final summary
//!
//! Every write appends; nothing here truncates an existing artifact.

use crate::error::Result;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Summaries of one batch keyed by file path
pub type SummaryMap = BTreeMap<PathBuf, String>;

/// Locations of every artifact a run produces
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub dir: PathBuf,
    pub summaries: PathBuf,
    pub supersummaries: PathBuf,
    pub final_summary: PathBuf,
    pub state: PathBuf,
    pub logs: PathBuf,
}

impl OutputPaths {
    /// Artifact paths for a run started at `timestamp` (e.g. `20240615-1430`)
    ///
    /// The state file is not timestamped so resumptions find it again.
    pub fn new(dir: &Path, timestamp: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            summaries: dir.join(format!("summary_output_{}.md", timestamp)),
            supersummaries: dir.join(format!("supersummary_{}.md", timestamp)),
            final_summary: dir.join(format!("final_summary_{}.md", timestamp)),
            state: dir.join("treesummary_state.json"),
            logs: dir.join("logs"),
        }
    }

    /// Timestamp format used in artifact names
    pub fn timestamp(now: chrono::DateTime<chrono::Local>) -> String {
        now.format("%Y%m%d-%H%M").to_string()
    }
}

/// Escape `#` so a path cannot be read as heading syntax
pub fn escape_heading(text: &str) -> String {
    text.replace('#', "\\#")
}

fn is_list_item(trimmed: &str) -> bool {
    trimmed.starts_with("- ") || trimmed.starts_with("* ") || trimmed.starts_with("1. ")
}

/// Render a summary body, putting a blank line before list items outside
/// fenced code blocks
fn render_body(out: &mut String, summary: &str) {
    let mut in_code_block = false;

    for line in summary.split('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_code_block = !in_code_block;
        } else if !in_code_block && is_list_item(trimmed) {
            out.push('\n');
        }
        out.push_str(line);
        out.push('\n');
    }
}

/// Render one `# File:` section per summary, each closed by `---`
pub fn render_summaries(results: &SummaryMap) -> String {
    let mut out = String::new();

    for (path, summary) in results {
        out.push_str("# File: ");
        out.push_str(&escape_heading(&path.display().to_string()));
        out.push_str("\n\n## Summary:\n\n");
        render_body(&mut out, summary);
        out.push_str("---\n");
    }

    out
}

/// Render a titled section closed by a `---` separator
pub fn render_section(title: &str, body: &str) -> String {
    format!("# {}\n\n{}\n\n---\n\n", title, body)
}

/// Appends run results to the markdown artifacts
#[derive(Debug, Clone)]
pub struct ReportWriter {
    paths: OutputPaths,
}

impl ReportWriter {
    pub fn new(paths: OutputPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    /// Append the per-file sections of one batch
    pub fn append_markdown(&self, results: &SummaryMap) -> Result<()> {
        if results.is_empty() {
            return Ok(());
        }
        append(&self.paths.summaries, &render_summaries(results))
    }

    pub fn append_supersummary(&self, text: &str) -> Result<()> {
        append(&self.paths.supersummaries, &render_section("Supersummary", text))
    }

    pub fn append_final_summary(&self, text: &str) -> Result<()> {
        append(&self.paths.final_summary, &render_section("Final Summary", text))
    }
}

fn append(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(content.as_bytes())?;
    writer.flush()?;

    debug!(path = %path.display(), bytes = content.len(), "Appended to artifact");
    Ok(())
}
