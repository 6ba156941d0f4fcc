//! Run configuration
//!
//! Everything the operator decides before the first prompt: where the
//! workflows live, how the retry count is asked for, and which optional
//! steps of the run are enabled.

use clap::ValueEnum;
use std::path::PathBuf;

/// Default workflows root, relative to the working directory.
pub const DEFAULT_ROOT: &str = "./workflows";

/// Workflow-level descriptor, never a step.
pub const WORKFLOW_DESCRIPTOR: &str = "workflow.yml";

/// Start-trigger descriptor, never a step.
pub const START_TRIGGER_DESCRIPTOR: &str = "startTrigger.yml";

/// Extension of step definition files.
pub const STEP_EXTENSION: &str = ".yml";

pub const DEFAULT_ATTEMPTS: u32 = 6;
pub const DEFAULT_RETRIES: u32 = DEFAULT_ATTEMPTS - 1;
pub const DEFAULT_INITIAL_INTERVAL_MS: i64 = 1000;
pub const DEFAULT_MAXIMUM_INTERVAL_MS: i64 = 20000;
pub const DEFAULT_BACKOFF_COEFFICIENT: f64 = 2.0;

/// How the operator enters the retry count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CountMode {
    /// Total number of attempts (>= 1)
    #[default]
    Attempts,

    /// Number of retries after the first attempt (>= 0)
    Retries,
}

impl CountMode {
    /// Prompt label for the count field.
    pub fn question(self) -> &'static str {
        match self {
            CountMode::Attempts => "Number of attempts",
            CountMode::Retries => "Number of retries",
        }
    }

    /// Default shown in the prompt.
    pub fn default_value(self) -> u32 {
        match self {
            CountMode::Attempts => DEFAULT_ATTEMPTS,
            CountMode::Retries => DEFAULT_RETRIES,
        }
    }

    /// Converts a raw answer into an attempt count, or `None` when the
    /// answer is not an integer in range.
    pub fn to_attempts(self, answer: &str) -> Option<u32> {
        let n: i64 = answer.trim().parse().ok()?;
        let attempts = match self {
            CountMode::Attempts => n,
            CountMode::Retries => n.checked_add(1)?,
        };
        if attempts < 1 {
            return None;
        }
        u32::try_from(attempts).ok()
    }

    /// Message printed before re-prompting.
    pub fn invalid_message(self) -> &'static str {
        match self {
            CountMode::Attempts => "numAttempts must be a number >= 1",
            CountMode::Retries => "number of retries must be a number >= 0",
        }
    }
}

/// Options for one run of the controller
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Directory holding one sub-directory per workflow
    pub root: PathBuf,

    pub count_mode: CountMode,

    /// Ask for the backoff coefficient instead of fixing it at 2
    pub prompt_coefficient: bool,

    /// Skip workflows whose eligible steps already carry the policy
    pub skip_up_to_date: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            count_mode: CountMode::default(),
            prompt_coefficient: false,
            skip_up_to_date: false,
        }
    }
}
