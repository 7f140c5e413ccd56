//! Rule unit trait and the standard recipe-backed implementation.

use glossa_types::{Artifact, Context, FinalOutcome, RunOptions};

use crate::recipe::Recipe;

// ---------------------------------------------------------------------------
// RuleUnit trait
// ---------------------------------------------------------------------------

pub trait RuleUnit: Send + Sync {
    /// Stable identifier; the registry compares it case-insensitively.
    fn name(&self) -> &str;

    /// Whether a FAIL/ERROR from this unit may stop the pipeline.
    fn is_fail_fast(&self) -> bool {
        false
    }

    /// Lower runs earlier. Only meaningful among fail-fast units.
    fn priority(&self) -> i32 {
        0
    }

    /// Run the unit. Must return the artifact to hand to the next stage,
    /// even when nothing changed.
    fn run(&self, ctx: &Context, artifact: &Artifact, opts: &RunOptions) -> FinalOutcome;
}

// ---------------------------------------------------------------------------
// RecipeRule: a rule that is nothing but a recipe
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecipeRule {
    recipe: Recipe,
    fail_fast: bool,
    priority: i32,
}

impl RecipeRule {
    pub fn new(recipe: Recipe) -> Self {
        Self {
            recipe,
            fail_fast: false,
            priority: 0,
        }
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }
}

impl RuleUnit for RecipeRule {
    fn name(&self) -> &str {
        self.recipe.name()
    }

    fn is_fail_fast(&self) -> bool {
        self.fail_fast
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn run(&self, ctx: &Context, artifact: &Artifact, opts: &RunOptions) -> FinalOutcome {
        self.recipe.run(ctx, artifact, opts)
    }
}
