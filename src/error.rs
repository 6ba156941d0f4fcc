//! Error types with fix suggestions

use std::path::PathBuf;
use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Failures of the document store. Always scoped to one file.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A directory listing that could not be produced.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot read directory {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Interactive channel failures.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("prompt channel already closed")]
    Closed,
}

/// Run-level outcome that stops the controller early.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("workflows directory not found: {}", root.display())]
    RootMissing { root: PathBuf },

    #[error("no workflow directories found in {}", root.display())]
    NoWorkflows { root: PathBuf },

    #[error("interrupted by user")]
    Interrupted,

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl RunError {
    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Interrupted => 130,
            _ => 1,
        }
    }
}

impl FixSuggestion for RunError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            RunError::RootMissing { .. } => {
                Some("Run from the project directory or pass --root <DIR>")
            }
            RunError::NoWorkflows { .. } => {
                Some("Each workflow must be a sub-directory of the workflows root")
            }
            RunError::Interrupted => None,
            RunError::Prompt(_) => Some("Check that stdin is readable and stdout is writable"),
        }
    }
}
