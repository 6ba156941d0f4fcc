//! Workflow directory scanner
//!
//! Only looks one level deep: workflows are the direct sub-directories of
//! the root, steps are the direct `.yml` children of a workflow.

use crate::config::{START_TRIGGER_DESCRIPTOR, STEP_EXTENSION, WORKFLOW_DESCRIPTOR};
use crate::error::ScanError;
use colored::Colorize;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Names of the workflow directories under `root`; empty on error.
pub fn list_workflow_dirs(root: &Path) -> Vec<String> {
    try_list_workflow_dirs(root).unwrap_or_else(|e| {
        report(&e, "Error reading workflows directory");
        Vec::new()
    })
}

/// Names of the step files in `workflow_dir`; empty on error.
pub fn list_step_files(workflow_dir: &Path) -> Vec<String> {
    try_list_step_files(workflow_dir).unwrap_or_else(|e| {
        report(&e, "Error reading workflow directory");
        Vec::new()
    })
}

pub fn try_list_workflow_dirs(root: &Path) -> Result<Vec<String>, ScanError> {
    children(root, |entry| entry.file_type().is_dir())
}

pub fn try_list_step_files(workflow_dir: &Path) -> Result<Vec<String>, ScanError> {
    children(workflow_dir, |entry| {
        !entry.file_type().is_dir() && is_step_file_name(&entry.file_name().to_string_lossy())
    })
}

/// True for `*.yml` names other than the two workflow descriptors.
pub fn is_step_file_name(name: &str) -> bool {
    name.ends_with(STEP_EXTENSION)
        && name != WORKFLOW_DESCRIPTOR
        && name != START_TRIGGER_DESCRIPTOR
}

fn children<F>(dir: &Path, keep: F) -> Result<Vec<String>, ScanError>
where
    F: Fn(&DirEntry) -> bool,
{
    let mut names = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        match entry {
            Ok(entry) if keep(&entry) => {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
            Ok(_) => {}
            // depth 0 is the directory itself: nothing can be listed
            Err(source) if source.depth() == 0 => {
                return Err(ScanError::Unreadable {
                    path: dir.to_path_buf(),
                    source,
                });
            }
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
            }
        }
    }

    Ok(names)
}

fn report(error: &ScanError, context: &str) {
    tracing::warn!(%error, "directory listing failed");
    eprintln!("{}: {}", context.red(), error);
}
