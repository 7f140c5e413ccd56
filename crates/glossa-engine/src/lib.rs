//! Validation-fix orchestration engine.
//!
//! This crate implements the generic machinery behind glossa's checks: the
//! rule unit trait and registry, recipe descriptors and the recipe runner
//! state machine, the fix policy, artifact propagation, the panic and
//! cancellation guard, rule sequencing, the pipeline driver, its event
//! stream and the JSON run report.

pub mod events;
pub mod guard;
pub mod pipeline;
pub mod policy;
pub mod propagate;
pub mod recipe;
pub mod registry;
pub mod report;
pub mod rule;
pub mod runner;
pub mod sequencer;

pub use events::{EventEmitter, PipelineEvent};
pub use guard::{catch_panic, guarded_fix, guarded_validate, panic_message, FixCall};
pub use pipeline::{PipelineResult, PipelineRunner};
pub use policy::should_attempt_fix;
pub use propagate::propagate;
pub use recipe::{fix_fn, validate_fn, FixFn, Recipe, RecipeMessages, ValidateFn};
pub use registry::{normalize_name, DynRule, Registry};
pub use report::{RuleRecord, RunReport};
pub use rule::{RecipeRule, RuleUnit};
pub use runner::{run_recipe, Phase};
pub use sequencer::{plan, ExecutionPlan};
