//! Terminal feedback: per-batch progress bar, a log writer that stays clear
//! of it, and the continuation prompt

use crate::process::ContinuationPolicy;
use dialoguer::Confirm;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::warn;

/// Answer used when the continuation prompt gets a bare Enter
pub const CONTINUE_BY_DEFAULT: bool = false;

static BARS: OnceLock<MultiProgress> = OnceLock::new();

/// Draw target shared by every visible batch bar
fn bars() -> &'static MultiProgress {
    BARS.get_or_init(MultiProgress::new)
}

/// Stderr writer that hides the progress bars while a log line is printed
///
/// Pass `|| SuspendingStderr` to a `fmt` layer's `with_writer`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SuspendingStderr;

impl Write for SuspendingStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        bars().suspend(|| io::stderr().write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        bars().suspend(|| io::stderr().write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

/// Progress bar for one batch
pub struct BatchProgress {
    bar: ProgressBar,
}

impl BatchProgress {
    pub fn new(total_files: u64, visible: bool) -> Self {
        if !visible {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = bars().add(ProgressBar::new(total_files));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("█▓▒░  "));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Advance by one finished file
    pub fn file_done(&self, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.bar.set_message(name);
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("batch complete");
        bars().remove(&self.bar);
    }
}

/// Asks on the terminal whether to run another batch
#[derive(Debug, Default)]
pub struct ConfirmContinuation;

impl ContinuationPolicy for ConfirmContinuation {
    fn should_continue(&mut self, batch_index: usize, processed: usize, remaining: usize) -> bool {
        let prompt = format!(
            "Batch {} done, processed {} files ({} remaining). Continue for another batch?",
            batch_index + 1,
            processed,
            remaining
        );

        let answer = Confirm::new()
            .with_prompt(prompt)
            .default(CONTINUE_BY_DEFAULT)
            .interact();
        continue_on(answer)
    }
}

/// Only an explicit yes continues; a failed prompt stops the run
fn continue_on(answer: dialoguer::Result<bool>) -> bool {
    match answer {
        Ok(answer) => answer,
        Err(e) => {
            warn!(error = %e, "Continuation prompt failed, stopping after this batch");
            false
        }
    }
}
