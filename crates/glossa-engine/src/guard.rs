//! Panic and cancellation guard around rule code.
//!
//! Validate and fix functions are arbitrary plug-in code. Every call goes
//! through [`guarded_validate`] / [`guarded_fix`], which refuse to start on a
//! cancelled context and turn a panic into an ordinary error value so a
//! broken rule degrades to a single ERROR outcome instead of a crash.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use glossa_types::{Artifact, Context, FixOutcome, GlossaError, Result, ValidationOutcome};

use crate::recipe::{FixFn, ValidateFn};

thread_local! {
    /// Nesting depth of guarded calls on this thread.
    static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
    /// Backtrace recorded by the hook for the most recent guarded panic.
    static LAST_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Install a panic hook that records the panic-site backtrace for guarded
/// calls and defers to the previous hook for everything else.
fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if GUARD_DEPTH.with(|depth| depth.get()) > 0 {
                let backtrace = Backtrace::force_capture().to_string();
                LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(backtrace));
            } else {
                previous(info);
            }
        }));
    });
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> Self {
        GUARD_DEPTH.with(|depth| depth.set(depth.get() + 1));
        DepthGuard
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        GUARD_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Extract a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run `f`, converting a panic into [`GlossaError::Panicked`] tagged with
/// the rule name and stage.
pub fn catch_panic<T>(rule: &str, stage: &str, f: impl FnOnce() -> T) -> Result<T> {
    install_hook();
    let result = {
        let _depth = DepthGuard::enter();
        panic::catch_unwind(AssertUnwindSafe(f))
    };
    result.map_err(|payload| {
        let message = panic_message(&*payload);
        let backtrace = LAST_BACKTRACE
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_default();
        tracing::warn!(rule = %rule, stage = %stage, panic = %message, "rule panicked; contained");
        GlossaError::Panicked {
            rule: rule.to_string(),
            stage: stage.to_string(),
            message,
            backtrace,
        }
    })
}

/// Invoke a validate function safely.
///
/// A cancelled context or a panic yields a [`ValidationOutcome`] with
/// `system_error` set. For a panic the message carries the payload and the
/// panic-site stack trace.
pub fn guarded_validate(
    rule: &str,
    validate: &ValidateFn,
    ctx: &Context,
    artifact: &Artifact,
) -> ValidationOutcome {
    if let Some(err) = ctx.err() {
        return ValidationOutcome::system(err);
    }
    match catch_panic(rule, "validate", || validate(ctx, artifact)) {
        Ok(outcome) => outcome,
        Err(err) => {
            let diagnostic = match &err {
                GlossaError::Panicked { backtrace, .. } if !backtrace.is_empty() => {
                    format!("{err}\nstack backtrace:\n{backtrace}")
                }
                _ => err.to_string(),
            };
            ValidationOutcome::system(err).with_message(diagnostic)
        }
    }
}

/// What happened to a guarded fix call.
#[derive(Debug)]
pub enum FixCall {
    /// The context was already cancelled; the fix never started.
    Skipped(GlossaError),
    /// The fix ran. A panic inside it is reported as `Err`.
    Ran(Result<FixOutcome>),
}

/// Invoke a fix function safely.
pub fn guarded_fix(rule: &str, fix: &FixFn, ctx: &Context, artifact: &Artifact) -> FixCall {
    if let Some(err) = ctx.err() {
        return FixCall::Skipped(err);
    }
    FixCall::Ran(catch_panic(rule, "fix", || fix(ctx, artifact)).and_then(|result| result))
}
