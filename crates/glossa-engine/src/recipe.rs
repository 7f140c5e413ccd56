//! Recipe descriptors: the declarative validate/fix/message bundle a rule
//! hands to the recipe runner instead of writing its own state machine.

use std::fmt;
use std::sync::Arc;

use glossa_types::{Artifact, Context, FinalOutcome, FixOutcome, Result, RunOptions, Status, ValidationOutcome};

/// Validate function: a pure check of the artifact, sensitive only to cancellation.
pub type ValidateFn = Arc<dyn Fn(&Context, &Artifact) -> ValidationOutcome + Send + Sync>;

/// Fix function. `Ok(FixOutcome::Declined)` means "not mine to repair";
/// any `Err` is reported as an engine-level ERROR.
pub type FixFn = Arc<dyn Fn(&Context, &Artifact) -> Result<FixOutcome> + Send + Sync>;

pub const DEFAULT_PASS_MESSAGE: &str = "ok";
pub const DEFAULT_FIXED_MESSAGE: &str = "fixed";
pub const DEFAULT_APPLIED_MESSAGE: &str = "fix applied (not revalidated)";
pub const DEFAULT_NO_CHANGE_MESSAGE: &str = "fix attempted, no changes";
pub const DEFAULT_STILL_BAD_MESSAGE: &str = "still failing after fix";

/// Box a closure as a [`ValidateFn`].
pub fn validate_fn<F>(f: F) -> ValidateFn
where
    F: Fn(&Context, &Artifact) -> ValidationOutcome + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Box a closure as a [`FixFn`].
pub fn fix_fn<F>(f: F) -> FixFn
where
    F: Fn(&Context, &Artifact) -> Result<FixOutcome> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Message templates. `None` falls back to the runner's defaults.
#[derive(Debug, Clone, Default)]
pub struct RecipeMessages {
    pub pass: Option<String>,
    pub fixed: Option<String>,
    pub applied: Option<String>,
    pub still_bad: Option<String>,
}

/// Immutable recipe configuration, built once with the `with_*` / setter chain.
#[derive(Clone)]
pub struct Recipe {
    pub(crate) name: String,
    pub(crate) validate: Option<ValidateFn>,
    pub(crate) fix: Option<FixFn>,
    pub(crate) messages: RecipeMessages,
    pub(crate) failure_status: Status,
    pub(crate) status_after_fix: Status,
}

impl Recipe {
    /// A recipe with no validate function yet. Running it as-is reports ERROR.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            validate: None,
            fix: None,
            messages: RecipeMessages::default(),
            failure_status: Status::Fail,
            status_after_fix: Status::Warn,
        }
    }

    pub fn with_validate<F>(self, f: F) -> Self
    where
        F: Fn(&Context, &Artifact) -> ValidationOutcome + Send + Sync + 'static,
    {
        self.with_validate_fn(validate_fn(f))
    }

    pub fn with_validate_fn(mut self, f: ValidateFn) -> Self {
        self.validate = Some(f);
        self
    }

    pub fn with_fix<F>(self, f: F) -> Self
    where
        F: Fn(&Context, &Artifact) -> Result<FixOutcome> + Send + Sync + 'static,
    {
        self.with_fix_fn(fix_fn(f))
    }

    pub fn with_fix_fn(mut self, f: FixFn) -> Self {
        self.fix = Some(f);
        self
    }

    pub fn pass_message(mut self, message: impl Into<String>) -> Self {
        self.messages.pass = Some(message.into());
        self
    }

    pub fn fixed_message(mut self, message: impl Into<String>) -> Self {
        self.messages.fixed = Some(message.into());
        self
    }

    pub fn applied_message(mut self, message: impl Into<String>) -> Self {
        self.messages.applied = Some(message.into());
        self
    }

    /// Prefix for the "fix ran but validation still fails" message; the
    /// fresh validator message is appended after `": "`.
    pub fn still_bad_message(mut self, message: impl Into<String>) -> Self {
        self.messages.still_bad = Some(message.into());
        self
    }

    /// Status reported when validation fails and no fix runs or helps.
    pub fn failure_status(mut self, status: Status) -> Self {
        self.failure_status = status;
        self
    }

    /// Status reported when a fix was applied and revalidation passed.
    pub fn status_after_fix(mut self, status: Status) -> Self {
        self.status_after_fix = status;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_validate(&self) -> bool {
        self.validate.is_some()
    }

    pub fn has_fix(&self) -> bool {
        self.fix.is_some()
    }

    pub fn messages(&self) -> &RecipeMessages {
        &self.messages
    }

    pub fn configured_failure_status(&self) -> Status {
        self.failure_status
    }

    pub fn configured_status_after_fix(&self) -> Status {
        self.status_after_fix
    }

    /// Run this recipe through the orchestration state machine.
    pub fn run(&self, ctx: &Context, artifact: &Artifact, opts: &RunOptions) -> FinalOutcome {
        crate::runner::run_recipe(ctx, artifact, opts, self)
    }
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipe")
            .field("name", &self.name)
            .field("has_validate", &self.validate.is_some())
            .field("has_fix", &self.fix.is_some())
            .field("messages", &self.messages)
            .field("failure_status", &self.failure_status)
            .field("status_after_fix", &self.status_after_fix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let recipe = Recipe::new("header");
        assert_eq!(recipe.name(), "header");
        assert!(!recipe.has_validate());
        assert!(!recipe.has_fix());
        assert_eq!(recipe.configured_failure_status(), Status::Fail);
        assert_eq!(recipe.configured_status_after_fix(), Status::Warn);
        assert!(recipe.messages().pass.is_none());
    }

    #[test]
    fn builder_sets_everything() {
        let recipe = Recipe::new("header")
            .with_validate(|_, _| ValidationOutcome::pass("fine"))
            .with_fix(|_, _| Ok(FixOutcome::unchanged("nothing")))
            .pass_message("header ok")
            .fixed_message("header normalized")
            .applied_message("header rewritten")
            .still_bad_message("header still broken")
            .failure_status(Status::Error)
            .status_after_fix(Status::Pass);
        assert!(recipe.has_validate());
        assert!(recipe.has_fix());
        assert_eq!(recipe.messages().pass.as_deref(), Some("header ok"));
        assert_eq!(recipe.messages().fixed.as_deref(), Some("header normalized"));
        assert_eq!(recipe.messages().applied.as_deref(), Some("header rewritten"));
        assert_eq!(recipe.messages().still_bad.as_deref(), Some("header still broken"));
        assert_eq!(recipe.configured_failure_status(), Status::Error);
        assert_eq!(recipe.configured_status_after_fix(), Status::Pass);
    }

    #[test]
    fn debug_does_not_require_closures_to_be_debug() {
        let recipe = Recipe::new("r").with_validate(|_, _| ValidationOutcome::pass(""));
        let dbg = format!("{recipe:?}");
        assert!(dbg.contains("has_validate: true"));
    }
}
