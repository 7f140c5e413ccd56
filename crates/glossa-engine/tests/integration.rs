//! End-to-end tests for the glossa engine.
//!
//! Each test drives recipes, the registry or the pipeline through the public
//! API only.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glossa_engine::{
    plan, DynRule, PipelineRunner, Recipe, RecipeRule, Registry, RuleUnit,
};
use glossa_types::{Artifact, Context, FixMode, FixOutcome, RunOptions, Status, ValidationOutcome};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Validates `data == "fixed"`; the fix unconditionally writes `"fixed"`.
fn fixed_recipe(name: &str) -> Recipe {
    Recipe::new(name)
        .with_validate(|_, a| {
            if a.data() == b"fixed" {
                ValidationOutcome::pass("")
            } else {
                ValidationOutcome::fail("not fixed yet")
            }
        })
        .with_fix(|_, _| Ok(FixOutcome::with_data(b"fixed".to_vec())))
}

fn artifact(data: &[u8]) -> Artifact {
    Artifact::new("glossary.csv", data.to_vec())
}

fn opts(mode: FixMode) -> RunOptions {
    RunOptions::default().with_fix_mode(mode).with_rerun(true)
}

fn unit(name: &str, fail_fast: bool, priority: i32) -> RecipeRule {
    RecipeRule::new(Recipe::new(name).with_validate(|_, _| ValidationOutcome::pass("")))
        .with_fail_fast(fail_fast)
        .with_priority(priority)
}

fn names(rules: &[DynRule]) -> Vec<String> {
    rules.iter().map(|r| r.name().to_string()).collect()
}

// ---------------------------------------------------------------------------
// Recipe runner properties
// ---------------------------------------------------------------------------

#[test]
fn noop_fix_on_valid_artifact_is_idempotent() {
    let fix_calls = Arc::new(AtomicUsize::new(0));
    let calls = fix_calls.clone();
    let recipe = fixed_recipe("idempotent").with_fix(move |_, a| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(FixOutcome::with_data(a.data().to_vec()))
    });
    let input = artifact(b"fixed");
    let out = recipe.run(&Context::new(), &input, &opts(FixMode::Always));
    assert_eq!(out.status, Status::Pass);
    assert!(!out.changed);
    assert_eq!(out.data(), b"fixed");
    assert!(out.artifact.shares_buffer_with(&input));
    assert_eq!(fix_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn declined_fix_preserves_original_message() {
    let recipe = fixed_recipe("declines")
        .still_bad_message("should not appear")
        .with_fix(|_, _| Ok(FixOutcome::declined("not mine to repair")));
    let out = recipe.run(&Context::new(), &artifact(b"broken"), &opts(FixMode::Always));
    assert_eq!(out.status, Status::Fail);
    assert_eq!(out.message, "not fixed yet");
    assert!(!out.changed);
    assert_eq!(out.data(), b"broken");
}

#[test]
fn fix_then_pass_uses_default_status_after_fix() {
    let recipe = fixed_recipe("default_after_fix");
    let out = recipe.run(&Context::new(), &artifact(b"broken"), &opts(FixMode::IfNotPassing));
    assert_eq!(out.status, Status::Warn);
    assert_eq!(out.message, "fixed");
    assert!(out.changed);
}

#[test]
fn fix_then_pass_honors_pass_override() {
    let recipe = fixed_recipe("pass_after_fix").status_after_fix(Status::Pass);
    let out = recipe.run(&Context::new(), &artifact(b"broken"), &opts(FixMode::IfNotPassing));
    assert_eq!(out.status, Status::Pass);
}

#[test]
fn cancellation_before_fix_never_runs_fix() {
    let ctx = Context::new();
    let canceller = ctx.clone();
    let fix_calls = Arc::new(AtomicUsize::new(0));
    let calls = fix_calls.clone();
    let recipe = Recipe::new("cancel_before_fix")
        .with_validate(move |_, _| {
            canceller.cancel("operator abort");
            ValidationOutcome::fail("not fixed yet")
        })
        .with_fix(move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(FixOutcome::with_data(b"fixed".to_vec()))
        });
    let out = recipe.run(&ctx, &artifact(b"broken"), &opts(FixMode::Always));
    assert_eq!(fix_calls.load(Ordering::SeqCst), 0);
    assert_eq!(out.status, Status::Fail);
    assert!(out.message.contains("fix skipped"), "{}", out.message);
    assert!(!out.changed);
}

#[test]
fn validate_panic_is_contained() {
    let recipe = Recipe::new("panics").with_validate(|_, _| panic!("validator payload 42"));
    let out = recipe.run(&Context::new(), &artifact(b"x"), &RunOptions::default());
    assert_eq!(out.status, Status::Error);
    assert!(out.message.contains("validator payload 42"), "{}", out.message);
}

#[test]
fn end_to_end_fixed_scenario() {
    let recipe = fixed_recipe("e2e").status_after_fix(Status::Pass);
    let out = recipe.run(&Context::new(), &artifact(b"broken"), &opts(FixMode::IfNotPassing));
    assert_eq!(out.status, Status::Pass);
    assert!(out.changed);
    assert_eq!(out.data(), b"fixed");
}

// ---------------------------------------------------------------------------
// Registry properties
// ---------------------------------------------------------------------------

#[test]
fn registry_replacement_is_case_insensitive() {
    let reg = Registry::new();
    let first = RecipeRule::new(
        Recipe::new("Dup").with_validate(|_, _| ValidationOutcome::fail("first")),
    );
    let second = RecipeRule::new(
        Recipe::new("dup").with_validate(|_, _| ValidationOutcome::fail("second")),
    );
    assert!(!reg.register_rule(first).unwrap());
    assert!(reg.register_rule(second).unwrap());
    assert_eq!(reg.len(), 1);

    let stored = reg.lookup("DUP").unwrap();
    assert_eq!(stored.name(), "dup");
    let out = stored.run(&Context::new(), &artifact(b"x"), &RunOptions::default());
    assert_eq!(out.message, "second");
}

#[test]
fn sorted_listing_is_deterministic() {
    let reg = Registry::new();
    for (name, priority) in [("z", 2), ("a", 1), ("b", 1), ("m", 5)] {
        reg.register_rule(unit(name, true, priority)).unwrap();
    }
    reg.register_rule(unit("advisory", false, 0)).unwrap();

    let critical: Vec<DynRule> = reg
        .list_sorted()
        .into_iter()
        .filter(|r| r.is_fail_fast())
        .collect();
    assert_eq!(names(&critical), ["a", "b", "z", "m"]);
    assert_eq!(names(&plan(&reg).critical), ["a", "b", "z", "m"]);
}

#[test]
fn listings_are_snapshots() {
    let reg = Registry::new();
    reg.register_rule(unit("a", true, 1)).unwrap();
    reg.register_rule(unit("b", true, 2)).unwrap();

    let mut all = reg.list_all();
    all[0] = Arc::new(unit("intruder", true, 0));
    let mut sorted = reg.list_sorted();
    sorted[0] = Arc::new(unit("intruder", true, 0));
    sorted.clear();

    let mut again = names(&reg.list_all());
    again.sort();
    assert_eq!(again, ["a", "b"]);
    assert_eq!(names(&reg.list_sorted()), ["a", "b"]);
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[test]
fn pipeline_feeds_fixed_artifact_to_later_rules() {
    let reg = Arc::new(Registry::new());
    reg.register_rule(
        RecipeRule::new(fixed_recipe("make_fixed").status_after_fix(Status::Pass))
            .with_fail_fast(true)
            .with_priority(1),
    )
    .unwrap();
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = seen.clone();
    reg.register_rule(RecipeRule::new(Recipe::new("observer").with_validate(move |_, a| {
        sink.lock().unwrap().push(a.data().to_vec());
        ValidationOutcome::pass("")
    })))
    .unwrap();

    let result = PipelineRunner::new(reg).run(
        &Context::new(),
        artifact(b"broken"),
        &opts(FixMode::IfNotPassing),
    );
    assert_eq!(result.worst_status(), Status::Pass);
    assert!(result.changed());
    assert_eq!(result.artifact.data(), b"fixed");
    assert_eq!(*seen.lock().unwrap(), vec![b"fixed".to_vec()]);
}

#[test]
fn pipeline_halts_on_critical_failure_without_fix() {
    let reg = Arc::new(Registry::new());
    reg.register_rule(RecipeRule::new(fixed_recipe("gate")).with_fail_fast(true))
        .unwrap();
    reg.register_rule(unit("never_runs", false, 0)).unwrap();
    let options = opts(FixMode::Never);
    let result = PipelineRunner::new(reg).run(&Context::new(), artifact(b"broken"), &options);
    assert_eq!(result.halted_by.as_deref(), Some("gate"));
    assert_eq!(result.skipped, ["never_runs"]);
    assert!(result.should_fail(&options));
}

#[test]
fn cancelled_context_runs_nothing() {
    let reg = Arc::new(Registry::new());
    reg.register_rule(unit("a", true, 1)).unwrap();
    let ctx = Context::new();
    ctx.cancel("before start");
    let result = PipelineRunner::new(reg).run(&ctx, artifact(b"x"), &RunOptions::default());
    assert!(result.cancelled);
    assert!(result.outcomes.is_empty());
    assert_eq!(result.skipped, ["a"]);
}
