//! Pipeline driver: runs the registry's rules over one artifact.
//!
//! Critical rules run first in (priority, name) order, threading the
//! artifact from one to the next. The first critical FAIL/ERROR halts the
//! run unless `keep_going` is set. Normal rules run afterwards when the run
//! was not halted. Cancellation stops scheduling; whatever already ran is
//! kept.

use std::sync::Arc;
use std::time::{Duration, Instant};

use glossa_types::{Artifact, Context, FinalOutcome, GlossaError, RunOptions, Status};

use crate::events::{EventEmitter, PipelineEvent};
use crate::guard::catch_panic;
use crate::registry::{DynRule, Registry};
use crate::sequencer::plan;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Drives the registered rules over an artifact.
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    registry: Arc<Registry>,
    events: Option<EventEmitter>,
    keep_going: bool,
}

/// Everything a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// One outcome per rule that ran, in run order.
    pub outcomes: Vec<FinalOutcome>,
    /// Artifact after the last rule that ran.
    pub artifact: Artifact,
    /// Critical rule whose FAIL/ERROR stopped the run.
    pub halted_by: Option<String>,
    /// Rules that were planned but never ran.
    pub skipped: Vec<String>,
    pub cancelled: bool,
    pub duration: Duration,
}

impl PipelineResult {
    /// Most severe status among the outcomes; `Pass` for an empty run.
    pub fn worst_status(&self) -> Status {
        self.outcomes
            .iter()
            .map(|o| o.status)
            .max()
            .unwrap_or(Status::Pass)
    }

    /// Whether any rule changed the artifact.
    pub fn changed(&self) -> bool {
        self.outcomes.iter().any(|o| o.changed)
    }

    pub fn outcome(&self, rule: &str) -> Option<&FinalOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.rule.eq_ignore_ascii_case(rule.trim()))
    }

    /// Whether the caller should treat the run as failed.
    pub fn should_fail(&self, opts: &RunOptions) -> bool {
        self.halted_by.is_some()
            || (opts.hard_fail_on_error && self.outcomes.iter().any(|o| o.status == Status::Error))
    }
}

// ---------------------------------------------------------------------------
// PipelineRunner
// ---------------------------------------------------------------------------

impl PipelineRunner {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            events: None,
            keep_going: false,
        }
    }

    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = Some(events);
        self
    }

    /// Keep running after a critical FAIL/ERROR instead of halting.
    pub fn with_keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }

    /// Run one unit, containing a panic from hand-written rules.
    fn run_unit(
        &self,
        rule: &DynRule,
        ctx: &Context,
        artifact: &Artifact,
        opts: &RunOptions,
    ) -> FinalOutcome {
        let name = rule.name().to_string();
        self.emit(PipelineEvent::RuleStarted {
            rule: name.clone(),
            fail_fast: rule.is_fail_fast(),
        });
        let start = Instant::now();
        let outcome = match catch_panic(&name, "run", || rule.run(ctx, artifact, opts)) {
            Ok(outcome) => outcome,
            Err(err) => {
                let note = match &err {
                    GlossaError::Panicked { backtrace, .. } => backtrace.clone(),
                    _ => String::new(),
                };
                FinalOutcome::unchanged(&name, Status::Error, err.to_string(), artifact)
                    .with_note(note)
            }
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            rule = %name,
            status = %outcome.status,
            changed = outcome.changed,
            duration_ms,
            "rule completed"
        );
        if outcome.changed {
            self.emit(PipelineEvent::FixApplied {
                rule: name.clone(),
                path: outcome.path().display().to_string(),
                bytes: outcome.data().len(),
            });
        }
        self.emit(PipelineEvent::RuleCompleted {
            rule: name,
            status: outcome.status,
            changed: outcome.changed,
            duration_ms,
        });
        outcome
    }

    /// Run every registered rule over `artifact`.
    pub fn run(&self, ctx: &Context, artifact: Artifact, opts: &RunOptions) -> PipelineResult {
        let start = Instant::now();
        let plan = plan(&self.registry);
        tracing::info!(
            path = %artifact.path().display(),
            critical = plan.critical.len(),
            normal = plan.normal.len(),
            fix_mode = %opts.fix_mode,
            "pipeline started"
        );
        self.emit(PipelineEvent::PipelineStarted {
            path: artifact.path().display().to_string(),
            critical: plan.critical.len(),
            normal: plan.normal.len(),
        });

        let mut current = artifact;
        let mut outcomes = Vec::with_capacity(plan.len());
        let mut halted_by = None;
        let mut skipped = Vec::new();

        for rule in &plan.critical {
            if halted_by.is_some() || ctx.is_cancelled() {
                skipped.push(rule.name().to_string());
                continue;
            }
            let outcome = self.run_unit(rule, ctx, &current, opts);
            current = outcome.artifact.clone();
            if outcome.status.is_blocking() && !self.keep_going {
                tracing::warn!(rule = %outcome.rule, status = %outcome.status, "fail-fast rule halted the pipeline");
                self.emit(PipelineEvent::PipelineHalted {
                    rule: outcome.rule.clone(),
                    status: outcome.status,
                });
                halted_by = Some(outcome.rule.clone());
            }
            outcomes.push(outcome);
        }

        for rule in &plan.normal {
            if halted_by.is_some() || ctx.is_cancelled() {
                skipped.push(rule.name().to_string());
                continue;
            }
            let outcome = self.run_unit(rule, ctx, &current, opts);
            current = outcome.artifact.clone();
            outcomes.push(outcome);
        }

        let result = PipelineResult {
            outcomes,
            artifact: current,
            halted_by,
            skipped,
            cancelled: ctx.is_cancelled(),
            duration: start.elapsed(),
        };
        if result.cancelled {
            tracing::warn!(skipped = result.skipped.len(), "pipeline cancelled");
        }
        tracing::info!(
            status = %result.worst_status(),
            changed = result.changed(),
            duration_ms = result.duration.as_millis() as u64,
            "pipeline completed"
        );
        self.emit(PipelineEvent::PipelineCompleted {
            status: result.worst_status(),
            rules_run: result.outcomes.len(),
            cancelled: result.cancelled,
            duration_ms: result.duration.as_millis() as u64,
        });
        result
    }
}
