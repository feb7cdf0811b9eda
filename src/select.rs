//! Candidate file selection and directory tree rendering
//!
//! Both walks sort entries by file name so the candidate order, and with it
//! batch membership, is the same on every run.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// True if the path contains any of the ignore substrings
pub fn is_ignored(path: &Path, ignore: &[String]) -> bool {
    let text = path.to_string_lossy();
    ignore
        .iter()
        .filter(|pattern| !pattern.is_empty())
        .any(|pattern| text.contains(pattern.as_str()))
}

/// Ignore patterns apply to the path below `root`, so the root itself is never pruned
fn is_pruned(entry: &DirEntry, root: &Path, ignore: &[String]) -> bool {
    match entry.path().strip_prefix(root) {
        Ok(rel) => is_ignored(rel, ignore),
        Err(_) => is_ignored(entry.path(), ignore),
    }
}

/// Render an indented directory tree, at most `max_depth` levels below `root`
///
/// Ignored directories are pruned with their contents, ignored files are
/// omitted. Each level indents by two spaces; directories end with `/`.
pub fn list_tree(root: &Path, max_depth: usize, ignore: &[String]) -> Result<String> {
    let mut lines = Vec::new();

    for entry in WalkDir::new(root)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_pruned(e, root, ignore))
    {
        let entry = entry?;
        let indent = "  ".repeat(entry.depth());
        let name = entry.file_name().to_string_lossy();

        if entry.file_type().is_dir() {
            lines.push(format!("{}{}/", indent, name));
        } else {
            lines.push(format!("{}{}", indent, name));
        }
    }

    Ok(lines.join("\n"))
}

/// List every file under `root` whose name ends with one of `extensions`
///
/// The whole tree is walked without following symlinks, so a dangling link is
/// just a non-file entry. A traversal error aborts the call and no partial
/// list is returned.
pub fn list_files(root: &Path, extensions: &[String], ignore: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_pruned(e, root, ignore))
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
            files.push(entry.into_path());
        }
    }

    debug!(root = %root.display(), count = files.len(), "Collected candidate files");
    Ok(files)
}

/// Names of the regular files sharing a directory with `path`, sorted
pub fn sibling_files(path: &Path) -> Result<Vec<String>> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let entries = fs::read_dir(dir).map_err(|e| Error::FileRead {
        path: dir.to_path_buf(),
        message: format!("Failed to list directory: {}", e),
    })?;

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| !t.is_dir()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    Ok(names)
}
