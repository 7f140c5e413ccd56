//! CLI binary for checking and repairing glossary files.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;

use glossa_engine::{
    plan, EventEmitter, PipelineEvent, PipelineResult, PipelineRunner, RuleUnit, RunReport,
};
use glossa_types::{Artifact, Context, FixMode};

#[derive(Parser)]
#[command(name = "glossa", version, about = "Validate and repair glossary tables")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a glossary file and optionally repair it
    Check(CheckArgs),

    /// List the built-in rules in execution order
    Rules,
}

#[derive(Args)]
struct CheckArgs {
    /// Path to the glossary file
    file: PathBuf,

    /// Declared language code (repeatable)
    #[arg(long = "lang", value_name = "CODE")]
    languages: Vec<String>,

    /// When fixes may run: never, only-if-failed, if-not-passing, always
    #[arg(long, value_name = "MODE")]
    fix_mode: Option<FixMode>,

    /// Do not revalidate after a fix
    #[arg(long)]
    no_rerun: bool,

    /// Exit non-zero when any rule reports ERROR
    #[arg(long)]
    hard_fail: bool,

    /// Keep running after a fail-fast rule fails
    #[arg(long)]
    keep_going: bool,

    /// JSON config file (default: ./glossa.json if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the repaired file here
    #[arg(short, long, conflicts_with = "in_place")]
    output: Option<PathBuf>,

    /// Overwrite the input file when a fix changed it
    #[arg(long)]
    in_place: bool,

    /// Write a JSON run report here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Cancel the run after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

impl CheckArgs {
    fn overrides(&self) -> config::Overrides {
        config::Overrides {
            languages: self.languages.clone(),
            fix_mode: self.fix_mode,
            no_rerun: self.no_rerun,
            hard_fail: self.hard_fail,
            keep_going: self.keep_going,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing; RUST_LOG wins over --verbose
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check(args) => {
            let failed = cmd_check(args, cli.verbose).await?;
            if failed {
                std::process::exit(1);
            }
        }
        Commands::Rules => {
            cmd_rules()?;
        }
    }

    Ok(())
}

fn log_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::RuleStarted { rule, fail_fast } => {
            tracing::debug!(rule = %rule, fail_fast, "rule started");
        }
        PipelineEvent::FixApplied { rule, path, bytes } => {
            tracing::debug!(rule = %rule, path = %path, bytes, "fix applied");
        }
        PipelineEvent::PipelineHalted { rule, status } => {
            tracing::debug!(rule = %rule, status = %status, "pipeline halted");
        }
        other => tracing::trace!(event = ?other, "pipeline event"),
    }
}

fn print_result(result: &PipelineResult, verbose: bool) {
    for outcome in &result.outcomes {
        println!("[{}] {}: {}", outcome.status, outcome.rule, outcome.message);
        if verbose && !outcome.note.is_empty() {
            for line in outcome.note.lines() {
                println!("    {line}");
            }
        }
    }
    for rule in &result.skipped {
        println!("[SKIP] {rule}");
    }

    println!();
    if let Some(rule) = &result.halted_by {
        println!("Halted by fail-fast rule '{rule}'");
    }
    if result.cancelled {
        println!("Run was cancelled");
    }
    println!(
        "Overall: {} ({} rule(s), {} ms)",
        result.worst_status(),
        result.outcomes.len(),
        result.duration.as_millis()
    );
}

async fn write_output(args: &CheckArgs, result: &PipelineResult) -> anyhow::Result<()> {
    let target: Option<&Path> = match (&args.output, args.in_place) {
        (Some(path), _) => Some(path.as_path()),
        (None, true) => Some(args.file.as_path()),
        _ => None,
    };
    match target {
        Some(path) if result.changed() => {
            tokio::fs::write(path, result.artifact.data())
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None if result.changed() => {
            println!("Fixes were applied in memory; use --output or --in-place to save them");
        }
        _ => {}
    }
    Ok(())
}

async fn cmd_check(args: CheckArgs, verbose: bool) -> anyhow::Result<bool> {
    let cwd = std::env::current_dir()?;
    let file_config = config::discover(args.config.as_deref(), &cwd)?;
    if let Some((path, _)) = &file_config {
        tracing::debug!(path = %path.display(), "loaded config");
    }
    let settings = config::resolve(file_config.map(|(_, c)| c), &args.overrides());
    let opts = settings.options;

    let data = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;
    let artifact = Artifact::new(&args.file, data).with_languages(&settings.languages);
    let input = artifact.clone();

    let ctx = match args.timeout {
        Some(secs) => Context::with_timeout(Duration::from_secs(secs)),
        None => Context::new(),
    };

    // Ctrl-C cancels cooperatively; the current rule finishes first.
    let cancel = ctx.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            cancel.cancel("interrupted");
        }
    });

    let events = EventEmitter::default();
    let mut rx = events.subscribe();
    let listener = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "event listener lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let registry = Arc::new(glossa_rules::default_registry()?);
    let runner = PipelineRunner::new(registry)
        .with_events(events)
        .with_keep_going(settings.keep_going);
    let started_at = chrono::Utc::now();
    let run_ctx = ctx.clone();
    let result = tokio::task::spawn_blocking(move || runner.run(&run_ctx, artifact, &opts)).await?;
    interrupt.abort();
    let _ = listener.await;

    print_result(&result, verbose);
    write_output(&args, &result).await?;

    if let Some(path) = &args.report {
        RunReport::new(&input, &result, started_at)
            .save(path)
            .await
            .with_context(|| format!("writing report {}", path.display()))?;
        println!("Report: {}", path.display());
    }

    Ok(result.should_fail(&opts))
}

fn cmd_rules() -> anyhow::Result<()> {
    let registry = glossa_rules::default_registry()?;
    let plan = plan(&registry);

    println!("Fail-fast (in order):");
    for rule in &plan.critical {
        println!("  {:<22} priority {}", rule.name(), rule.priority());
    }
    println!("Advisory:");
    for rule in &plan.normal {
        println!("  {}", rule.name());
    }
    Ok(())
}
