//! Built-in glossary checks.
//!
//! Each rule is a [`Recipe`](glossa_engine::Recipe) wrapped in a
//! [`RecipeRule`]. The fail-fast rules (`encoding`, `line_endings`,
//! `delimiter`, `header`) bring the file into a shape the advisory rules
//! (`duplicate_terms`, `flags`, `trailing_whitespace`) can read.

pub mod delimiter;
pub mod duplicates;
pub mod encoding;
pub mod flags;
pub mod header;
pub mod line_endings;
pub mod table;
pub mod whitespace;

use glossa_engine::{RecipeRule, Registry};
use glossa_types::Result;

/// Fresh instances of every built-in rule.
pub fn builtin_rules() -> Vec<RecipeRule> {
    vec![
        encoding::rule(),
        line_endings::rule(),
        delimiter::rule(),
        header::rule(),
        duplicates::rule(),
        flags::rule(),
        whitespace::rule(),
    ]
}

/// Add the built-in rules to `registry`, replacing same-named entries.
/// Returns how many were added.
pub fn register_builtin(registry: &Registry) -> Result<usize> {
    let mut count = 0;
    for rule in builtin_rules() {
        registry.register_rule(rule)?;
        count += 1;
    }
    tracing::debug!(count, "registered built-in rules");
    Ok(count)
}

/// A registry holding exactly the built-in rules.
pub fn default_registry() -> Result<Registry> {
    let registry = Registry::new();
    register_builtin(&registry)?;
    Ok(registry)
}
