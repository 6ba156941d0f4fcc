//! retrofit - stamp retry policies onto workflow datasource steps

pub mod cancel;
pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod policy;
pub mod prompt;
pub mod scanner;

pub use cancel::Cancellation;
pub use config::{CountMode, RunConfig};
pub use controller::{Controller, RunSummary};
pub use document::{
    is_blank, read_document, write_document, Document, DocumentStore, FileStore,
};
pub use error::{DocumentError, FixSuggestion, PromptError, RunError, ScanError};
pub use policy::{apply_policy, has_desired_policy, is_eligible, RetryPolicy};
pub use prompt::{Prompter, StdPrompter};
pub use scanner::{list_step_files, list_workflow_dirs};
