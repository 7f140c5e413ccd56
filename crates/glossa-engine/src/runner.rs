//! Recipe runner: the validate → decide → fix → propagate → revalidate
//! state machine every recipe-based rule goes through.
//!
//! The runner never returns an error: configuration defects, cancellation,
//! panics and fix failures all end in a [`FinalOutcome`] with
//! [`Status::Error`], and ordinary validation failures end in the recipe's
//! configured failure status.

use glossa_types::{
    Artifact, Context, FinalOutcome, FixOutcome, GlossaError, RunOptions, Status,
    ValidationOutcome,
};

use crate::guard::{guarded_fix, guarded_validate, FixCall};
use crate::policy::should_attempt_fix;
use crate::propagate::propagate;
use crate::recipe::{
    Recipe, DEFAULT_APPLIED_MESSAGE, DEFAULT_FIXED_MESSAGE, DEFAULT_NO_CHANGE_MESSAGE,
    DEFAULT_PASS_MESSAGE, DEFAULT_STILL_BAD_MESSAGE,
};

/// States a recipe run moves through; only used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Validating,
    Passed,
    Failed,
    FixSkipped,
    FixAttempted,
    FixDeclined,
    FixError,
    FixApplied,
    Revalidating,
    RevalidatedOk,
    RevalidatedStillBad,
    RevalidationError,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Validating => "validating",
            Phase::Passed => "passed",
            Phase::Failed => "failed",
            Phase::FixSkipped => "fix_skipped",
            Phase::FixAttempted => "fix_attempted",
            Phase::FixDeclined => "fix_declined",
            Phase::FixError => "fix_error",
            Phase::FixApplied => "fix_applied",
            Phase::Revalidating => "revalidating",
            Phase::RevalidatedOk => "revalidated_ok",
            Phase::RevalidatedStillBad => "revalidated_still_bad",
            Phase::RevalidationError => "revalidation_error",
        }
    }
}

fn enter(rule: &str, phase: Phase) {
    tracing::debug!(rule = %rule, state = phase.as_str(), "recipe transition");
}

/// Message for an outcome carrying a system error: the validator's first
/// line when it has one, else the error's display. Extra lines (such as a
/// panic backtrace) go to the note.
fn system_message(outcome: &ValidationOutcome, err: &GlossaError) -> (String, String) {
    let mut lines = outcome.message.splitn(2, '\n');
    let head = lines.next().unwrap_or("").trim();
    let rest = lines.next().unwrap_or("").to_string();
    if head.is_empty() {
        (err.to_string(), rest)
    } else {
        (head.to_string(), rest)
    }
}

/// Execute `recipe` against `artifact` under `opts`.
pub fn run_recipe(
    ctx: &Context,
    artifact: &Artifact,
    opts: &RunOptions,
    recipe: &Recipe,
) -> FinalOutcome {
    // --- Preconditions -----------------------------------------------------
    let name = recipe.name.as_str();
    if name.trim().is_empty() {
        let err = GlossaError::RecipeConfig {
            recipe: String::new(),
            message: "recipe has no name".into(),
        };
        tracing::warn!(error = %err, "rejecting recipe");
        return FinalOutcome::unchanged(name, Status::Error, err.to_string(), artifact);
    }
    let Some(validate) = recipe.validate.as_ref() else {
        let err = GlossaError::RecipeConfig {
            recipe: name.to_string(),
            message: "no validate function".into(),
        };
        tracing::warn!(rule = %name, error = %err, "rejecting recipe");
        return FinalOutcome::unchanged(name, Status::Error, err.to_string(), artifact);
    };
    if let Some(err) = ctx.err() {
        return FinalOutcome::unchanged(name, Status::Error, err.to_string(), artifact);
    }

    // --- Validate ----------------------------------------------------------
    enter(name, Phase::Validating);
    let first = guarded_validate(name, validate, ctx, artifact);
    if let Some(err) = &first.system_error {
        let (message, note) = system_message(&first, err);
        return FinalOutcome::unchanged(name, Status::Error, message, artifact).with_note(note);
    }
    if first.ok {
        enter(name, Phase::Passed);
        let message = recipe
            .messages
            .pass
            .clone()
            .or_else(|| Some(first.message.clone()).filter(|m| !m.is_empty()))
            .unwrap_or_else(|| DEFAULT_PASS_MESSAGE.to_string());
        return FinalOutcome::unchanged(name, Status::Pass, message, artifact);
    }
    enter(name, Phase::Failed);
    let failure = recipe.failure_status;

    // --- Decide ------------------------------------------------------------
    let Some(fix) = recipe.fix.as_ref() else {
        return FinalOutcome::unchanged(name, failure, first.message, artifact);
    };
    if !should_attempt_fix(opts.fix_mode, failure) {
        enter(name, Phase::FixSkipped);
        return FinalOutcome::unchanged(name, failure, first.message, artifact);
    }
    if let Some(err) = ctx.err() {
        enter(name, Phase::FixSkipped);
        let message = format!("{} (fix skipped: {err})", first.message);
        return FinalOutcome::unchanged(name, failure, message, artifact);
    }

    // --- Fix ---------------------------------------------------------------
    enter(name, Phase::FixAttempted);
    let patch = match guarded_fix(name, fix, ctx, artifact) {
        FixCall::Skipped(err) => {
            enter(name, Phase::FixSkipped);
            let message = format!("{} (fix skipped: {err})", first.message);
            return FinalOutcome::unchanged(name, failure, message, artifact);
        }
        FixCall::Ran(Ok(FixOutcome::Applied(patch))) => patch,
        FixCall::Ran(Ok(FixOutcome::Declined { note })) => {
            enter(name, Phase::FixDeclined);
            return FinalOutcome::unchanged(name, failure, first.message, artifact).with_note(note);
        }
        FixCall::Ran(Err(err)) => {
            enter(name, Phase::FixError);
            tracing::warn!(rule = %name, error = %err, "fix failed");
            let note = match &err {
                GlossaError::Panicked { backtrace, .. } => backtrace.clone(),
                _ => String::new(),
            };
            let err = match err {
                err @ GlossaError::FixFailed { .. } => err,
                other => GlossaError::FixFailed {
                    rule: name.to_string(),
                    message: other.to_string(),
                },
            };
            return FinalOutcome::unchanged(name, Status::Error, err.to_string(), artifact)
                .with_note(note);
        }
    };

    // --- Propagate ---------------------------------------------------------
    let (next, changed) = propagate(artifact, &patch);
    enter(name, Phase::FixApplied);
    if changed {
        tracing::info!(rule = %name, path = %next.path().display(), "fix applied");
    }
    let finish = |status: Status, message: String| FinalOutcome {
        rule: name.to_string(),
        status,
        message,
        artifact: next.clone(),
        changed,
        note: patch.note.clone(),
    };

    // A fix that already ran is never discarded, even if nothing else can run.
    if let Some(err) = ctx.err() {
        let status = if failure == Status::Error {
            Status::Error
        } else {
            Status::Warn
        };
        return finish(status, format!("fix applied but revalidation skipped: {err}"));
    }

    // --- Revalidate --------------------------------------------------------
    if opts.rerun_after_fix {
        enter(name, Phase::Revalidating);
        let second = guarded_validate(name, validate, ctx, &next);
        if let Some(err) = &second.system_error {
            enter(name, Phase::RevalidationError);
            let (message, backtrace) = system_message(&second, err);
            let mut outcome = finish(Status::Error, message);
            if !backtrace.is_empty() {
                if !outcome.note.is_empty() {
                    outcome.note.push('\n');
                }
                outcome.note.push_str(&backtrace);
            }
            return outcome;
        }
        if second.ok {
            enter(name, Phase::RevalidatedOk);
            let message = recipe
                .messages
                .fixed
                .clone()
                .unwrap_or_else(|| DEFAULT_FIXED_MESSAGE.to_string());
            return finish(recipe.status_after_fix, message);
        }
        enter(name, Phase::RevalidatedStillBad);
        let prefix = recipe
            .messages
            .still_bad
            .as_deref()
            .unwrap_or(DEFAULT_STILL_BAD_MESSAGE);
        return finish(failure, format!("{prefix}: {}", second.message));
    }

    // Unconfirmed fixes are always WARN, whatever the failure status.
    let message = if !changed && patch.note.is_empty() {
        DEFAULT_NO_CHANGE_MESSAGE.to_string()
    } else {
        recipe
            .messages
            .applied
            .clone()
            .unwrap_or_else(|| DEFAULT_APPLIED_MESSAGE.to_string())
    };
    finish(Status::Warn, message)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
