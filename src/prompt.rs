//! Request builders for file summaries, supersummaries and the final summary

use crate::client::SummaryRequest;
use crate::config::Config;
use std::fmt::Write;
use std::path::{Path, PathBuf};

fn request(config: &Config, task_prompt: &str, context: &str, max_tokens: u32) -> SummaryRequest {
    SummaryRequest {
        prompt: format!("{}\n\n{}\n\n{}", config.system_prompt, task_prompt, context),
        max_tokens,
        temperature: config.temperature,
        top_p: config.top_p,
    }
}

/// Request for a single file, with the project tree and its siblings as context
pub fn file_request(
    config: &Config,
    project_tree: &str,
    path: &Path,
    siblings: &[String],
    content: &str,
) -> SummaryRequest {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let context = format!(
        "\nProject Structure:\n{}\n\nFiles in the same directory as {}:\n{}\n\nFile Content:\n{}\n",
        project_tree,
        name,
        siblings.join(", "),
        content
    );

    request(config, &config.file_prompt, &context, config.max_tokens)
}

/// Request that condenses a group of file summaries
pub fn supersummary_request<'a, I>(config: &Config, summaries: I) -> SummaryRequest
where
    I: IntoIterator<Item = (&'a PathBuf, &'a String)>,
{
    let mut context = String::new();
    for (path, summary) in summaries {
        let _ = write!(context, "File: {}\nSummary: {}\n\n", path.display(), summary);
    }

    request(config, &config.summary_prompt, &context, config.max_tokens)
}

/// Request that condenses every supersummary of the run, numbered from 1
pub fn final_request(config: &Config, supersummaries: &[String]) -> SummaryRequest {
    let mut context = String::new();
    for (i, summary) in supersummaries.iter().enumerate() {
        let _ = write!(context, "Supersummary {}:\n{}\n\n", i + 1, summary);
    }

    request(
        config,
        &config.final_summary_prompt,
        &context,
        config.final_summary_max_tokens,
    )
}
