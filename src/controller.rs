//! Interactive controller
//!
//! Drives one run: ask for the retry policy, walk the workflows, confirm
//! each one with the operator, and rewrite the eligible step files.
//!
//! Every file is read, patched and written on its own. A failure on one file
//! is reported and the run moves on; there is no rollback.

use crate::cancel::Cancellation;
use crate::config::{
    RunConfig, DEFAULT_BACKOFF_COEFFICIENT, DEFAULT_INITIAL_INTERVAL_MS,
    DEFAULT_MAXIMUM_INTERVAL_MS,
};
use crate::document::{is_blank, DocumentStore, FileStore};
use crate::error::RunError;
use crate::policy::{apply_policy, has_desired_policy, is_eligible, RetryPolicy};
use crate::prompt::Prompter;
use crate::scanner::{list_step_files, list_workflow_dirs};
use colored::Colorize;
use std::io::{BufRead, Write};
use std::path::Path;

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub workflows_seen: usize,
    pub workflows_processed: usize,
    pub workflows_skipped: usize,
    pub files_checked: usize,
    pub files_modified: usize,
    pub files_failed: usize,
}

/// What happened to one step file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepOutcome {
    Modified,
    Ineligible,
    Failed,
}

pub struct Controller {
    config: RunConfig,
    cancel: Cancellation,
    store: Box<dyn DocumentStore + Send + Sync>,
}

impl Controller {
    pub fn new(config: RunConfig, cancel: Cancellation) -> Self {
        Self {
            config,
            cancel,
            store: Box::new(FileStore),
        }
    }

    /// Replace the filesystem store.
    pub fn with_store(mut self, store: impl DocumentStore + Send + Sync + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run all stages against `io`.
    pub fn run<R: BufRead, W: Write>(
        &self,
        io: &mut Prompter<R, W>,
    ) -> Result<RunSummary, RunError> {
        io.say("YAML Retry Policy Modifier")?;
        io.say("==========================\n")?;

        let root = &self.config.root;
        if !root.exists() {
            return Err(RunError::RootMissing { root: root.clone() });
        }

        let policy = self.configure(io)?;

        let workflows = list_workflow_dirs(root);
        if workflows.is_empty() {
            return Err(RunError::NoWorkflows { root: root.clone() });
        }
        io.say(format!("Found {} workflow(s):\n", workflows.len()))?;

        let mut summary = RunSummary {
            workflows_seen: workflows.len(),
            ..RunSummary::default()
        };

        for name in &workflows {
            self.checkpoint()?;
            self.process_workflow(io, name, &policy, &mut summary)?;
        }

        io.say(format!(
            "\nCompleted! Modified {} block file(s) total.",
            summary.files_modified
        ))?;

        tracing::info!(?summary, "run complete");
        Ok(summary)
    }

    /// Config stage: the count loops until valid, the rest fall back to
    /// their defaults.
    fn configure<R: BufRead, W: Write>(
        &self,
        io: &mut Prompter<R, W>,
    ) -> Result<RetryPolicy, RunError> {
        io.say("Please configure the retry policy:")?;

        let mode = self.config.count_mode;
        let default_count = mode.default_value().to_string();
        let num_attempts = loop {
            self.checkpoint()?;
            let answer = io.ask(mode.question(), &default_count)?;
            match mode.to_attempts(&answer) {
                Some(n) => break n,
                None => io.say(format!("{} {}", "Error:".red(), mode.invalid_message()))?,
            }
        };

        self.checkpoint()?;
        let initial_interval_ms = io
            .ask("Initial interval (ms)", &DEFAULT_INITIAL_INTERVAL_MS.to_string())?
            .parse()
            .unwrap_or(DEFAULT_INITIAL_INTERVAL_MS);

        self.checkpoint()?;
        let maximum_interval_ms = io
            .ask("Maximum interval (ms)", &DEFAULT_MAXIMUM_INTERVAL_MS.to_string())?
            .parse()
            .unwrap_or(DEFAULT_MAXIMUM_INTERVAL_MS);

        let backoff_coefficient = if self.config.prompt_coefficient {
            self.checkpoint()?;
            io.ask("Backoff coefficient", &DEFAULT_BACKOFF_COEFFICIENT.to_string())?
                .parse::<f64>()
                .ok()
                .filter(|c| c.is_finite())
                .unwrap_or(DEFAULT_BACKOFF_COEFFICIENT)
        } else {
            DEFAULT_BACKOFF_COEFFICIENT
        };

        let policy = RetryPolicy {
            num_attempts,
            initial_interval_ms,
            maximum_interval_ms,
            backoff_coefficient,
        };

        io.say("\nRetry policy configuration:")?;
        io.say(format!("{policy}\n"))?;
        tracing::debug!(?policy, "retry policy configured");

        Ok(policy)
    }

    fn process_workflow<R: BufRead, W: Write>(
        &self,
        io: &mut Prompter<R, W>,
        name: &str,
        policy: &RetryPolicy,
        summary: &mut RunSummary,
    ) -> Result<(), RunError> {
        let dir = self.config.root.join(name);

        if self.config.skip_up_to_date && !self.needs_update(&dir, policy)? {
            io.say(format!(
                "  {}\n",
                format!("Workflow \"{name}\" already up to date, skipping")
                    .as_str()
                    .yellow()
            ))?;
            summary.workflows_skipped += 1;
            return Ok(());
        }

        if !io.ask_yes_no(&format!("Modify workflow \"{name}\"?"), true)? {
            io.say(format!("  Skipping workflow \"{name}\"\n"))?;
            summary.workflows_skipped += 1;
            return Ok(());
        }

        io.say(format!("Processing workflow: {}", name.bold()))?;
        summary.workflows_processed += 1;

        let files = list_step_files(&dir);
        if files.is_empty() {
            io.say("  No block files found.\n")?;
            return Ok(());
        }

        let mut modified = 0;
        for file in &files {
            self.checkpoint()?;
            summary.files_checked += 1;
            match self.process_step(io, &dir.join(file), file, policy)? {
                StepOutcome::Modified => {
                    modified += 1;
                    summary.files_modified += 1;
                }
                StepOutcome::Failed => summary.files_failed += 1,
                StepOutcome::Ineligible => {}
            }
        }

        io.say(format!("  Modified {modified} file(s) in this workflow\n"))?;
        Ok(())
    }

    fn process_step<R: BufRead, W: Write>(
        &self,
        io: &mut Prompter<R, W>,
        path: &Path,
        file: &str,
        policy: &RetryPolicy,
    ) -> Result<StepOutcome, RunError> {
        io.say(format!("  Checking {file}..."))?;

        let doc = match self.store.read(path) {
            Ok(doc) if is_blank(&doc) => {
                tracing::warn!(path = %path.display(), "empty document");
                io.say(format!("    {} Could not read {file}", "Error:".red()))?;
                return Ok(StepOutcome::Failed);
            }
            Ok(doc) => doc,
            Err(error) => {
                tracing::warn!(%error, "step file skipped");
                io.say(format!("    {} Could not read {file}", "Error:".red()))?;
                return Ok(StepOutcome::Failed);
            }
        };

        if !is_eligible(&doc) {
            tracing::debug!(path = %path.display(), "not eligible");
            io.say("    Skipping: Not a datasource block with valid subtype")?;
            return Ok(StepOutcome::Ineligible);
        }

        let doc = apply_policy(doc, policy);

        let _writing = self.cancel.write_guard();
        self.checkpoint()?;
        match self.store.write(path, &doc) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "retry policy written");
                io.say(format!("    {} Modified {file}", "✓".green()))?;
                Ok(StepOutcome::Modified)
            }
            Err(error) => {
                tracing::warn!(%error, "step file not written");
                io.say(format!("    {} Could not write {file}", "Error:".red()))?;
                Ok(StepOutcome::Failed)
            }
        }
    }

    /// True if some eligible step in `dir` lacks `policy`. Unreadable files
    /// do not count.
    fn needs_update(&self, dir: &Path, policy: &RetryPolicy) -> Result<bool, RunError> {
        for file in list_step_files(dir) {
            self.checkpoint()?;
            let Ok(doc) = self.store.read(&dir.join(&file)) else {
                continue;
            };
            if is_eligible(&doc) && !has_desired_policy(&doc, policy) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn checkpoint(&self) -> Result<(), RunError> {
        if self.cancel.is_cancelled() {
            Err(RunError::Interrupted)
        } else {
            Ok(())
        }
    }
}
