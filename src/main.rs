//! retrofit CLI - interactive retry policy patcher

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use retrofit::config::DEFAULT_ROOT;
use retrofit::{
    Cancellation, Controller, CountMode, FixSuggestion, RunConfig, RunError, RunSummary,
    StdPrompter,
};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "retrofit")]
#[command(about = "Add or update retry policies on workflow datasource steps")]
#[command(version)]
struct Cli {
    /// Directory holding one sub-directory per workflow
    #[arg(short, long, default_value = DEFAULT_ROOT)]
    root: PathBuf,

    /// Ask for the number of attempts or the number of retries
    #[arg(long, value_enum, default_value_t = CountMode::Attempts)]
    count: CountMode,

    /// Also ask for the backoff coefficient (fixed at 2 otherwise)
    #[arg(long)]
    coefficient: bool,

    /// Skip workflows whose eligible steps already carry the requested policy
    #[arg(long)]
    skip_up_to_date: bool,
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        RunConfig {
            root: cli.root,
            count_mode: cli.count,
            prompt_coefficient: cli.coefficient,
            skip_up_to_date: cli.skip_up_to_date,
        }
    }
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so they never land inside a prompt line
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let code = match run(cli.into()).await {
        Ok(Ok(_)) => 0,
        Ok(Err(e)) => {
            report(&e);
            e.exit_code()
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            1
        }
    };

    std::process::exit(code);
}

/// Runs the controller on a blocking thread and races it against Ctrl-C.
///
/// The outer error is for failures of the harness itself; the inner one is
/// the controller's own outcome.
async fn run(config: RunConfig) -> anyhow::Result<Result<RunSummary, RunError>> {
    let cancel = Cancellation::new();
    let controller = Controller::new(config, cancel.clone());
    tracing::debug!(config = ?controller.config(), "starting run");

    let task = tokio::task::spawn_blocking(move || -> Result<RunSummary, RunError> {
        let mut io = StdPrompter::stdio();
        let result = controller.run(&mut io);
        io.close()?;
        result
    });

    tokio::select! {
        joined = task => joined.context("controller thread failed"),
        Ok(()) = tokio::signal::ctrl_c() => {
            cancel.cancel();
            // a step file being replaced is finished before the process goes
            let waiter = cancel.clone();
            tokio::task::spawn_blocking(move || waiter.wait_for_writes())
                .await
                .context("write wait failed")?;

            // the pending read_line cannot be woken, so close the prompt
            // channel by hand and leave
            std::io::stdout().flush().context("flushing stdout")?;
            println!("\n{}", "Script interrupted by user.".yellow());
            tracing::info!("interrupted, exiting without further writes");
            std::process::exit(RunError::Interrupted.exit_code());
        }
    }
}

fn report(e: &RunError) {
    if matches!(e, RunError::Interrupted) {
        println!("\n{}", "Script interrupted by user.".yellow());
        return;
    }
    eprintln!("{} {}", "Error:".red().bold(), e);
    if let Some(suggestion) = e.fix_suggestion() {
        eprintln!("  {} {}", "Fix:".yellow(), suggestion);
    }
}
