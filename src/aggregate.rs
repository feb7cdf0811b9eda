//! Supersummary and final summary generation
//!
//! [`SupersummarySchedule`] decides which groups of file summaries are due
//! for a supersummary after each batch; [`Aggregator`] turns a group (or the
//! list of supersummaries) into one condensed text.

use crate::client::Summarizer;
use crate::config::{Config, SupersummaryPolicy};
use crate::error::Result;
use crate::prompt::{final_request, supersummary_request};
use crate::report::SummaryMap;
use std::path::PathBuf;
use tracing::debug;

/// Condenses summaries through the summarization client
pub struct Aggregator<'a> {
    summarizer: &'a dyn Summarizer,
    config: &'a Config,
}

impl<'a> Aggregator<'a> {
    pub fn new(summarizer: &'a dyn Summarizer, config: &'a Config) -> Self {
        Self { summarizer, config }
    }

    /// One supersummary over a group of file summaries
    pub fn summarize_summaries(&self, summaries: &SummaryMap) -> Result<String> {
        debug!(files = summaries.len(), "Requesting supersummary");
        self.summarizer
            .summarize(&supersummary_request(self.config, summaries))
    }

    /// The final summary over every supersummary, in creation order
    pub fn summarize_all(&self, supersummaries: &[String]) -> Result<String> {
        debug!(supersummaries = supersummaries.len(), "Requesting final summary");
        self.summarizer
            .summarize(&final_request(self.config, supersummaries))
    }
}

/// Decides when supersummaries fire
#[derive(Debug)]
pub struct SupersummarySchedule {
    interval: Option<usize>,
    policy: SupersummaryPolicy,
    /// Summaries waiting for a cumulative supersummary, oldest first
    pending: Vec<(PathBuf, String)>,
}

impl SupersummarySchedule {
    pub fn new(interval: Option<usize>, policy: SupersummaryPolicy) -> Self {
        Self {
            interval,
            policy,
            pending: Vec::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.supersummary_interval(), config.supersummary_policy)
    }

    /// Summaries held back for a later cumulative supersummary
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Groups due for a supersummary after a batch produced `batch`
    ///
    /// Per-batch: the whole batch is one group iff its size is a non-zero
    /// multiple of the interval. Cumulative: the batch is queued and every
    /// full run of `interval` queued summaries becomes a group.
    pub fn due(&mut self, batch: &SummaryMap) -> Vec<SummaryMap> {
        let Some(interval) = self.interval else {
            return Vec::new();
        };

        match self.policy {
            SupersummaryPolicy::PerBatch => {
                if !batch.is_empty() && batch.len() % interval == 0 {
                    vec![batch.clone()]
                } else {
                    Vec::new()
                }
            }
            SupersummaryPolicy::Cumulative => {
                self.pending
                    .extend(batch.iter().map(|(p, s)| (p.clone(), s.clone())));

                let mut groups = Vec::new();
                while self.pending.len() >= interval {
                    groups.push(self.pending.drain(..interval).collect());
                }
                groups
            }
        }
    }
}
