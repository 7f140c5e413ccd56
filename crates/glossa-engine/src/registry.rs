//! Rule registry: thread-safe map from normalized name to rule unit.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use glossa_types::{GlossaError, Result};

use crate::rule::RuleUnit;

pub type DynRule = Arc<dyn RuleUnit>;

/// Registry keys are trimmed and lower-cased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Registered rules. Readers run concurrently; `register` and `reset`
/// take the write lock. Every listing is a fresh `Vec`.
#[derive(Default)]
pub struct Registry {
    rules: RwLock<HashMap<String, DynRule>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock leaves the map itself consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, DynRule>> {
        self.rules.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, DynRule>> {
        self.rules.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert or replace a rule. Returns `true` when an entry with the same
    /// normalized name was replaced.
    pub fn register(&self, rule: DynRule) -> Result<bool> {
        let key = normalize_name(rule.name());
        if key.is_empty() {
            return Err(GlossaError::InvalidRule(format!(
                "rule name {:?} is empty after normalization",
                rule.name()
            )));
        }
        let replaced = self.write().insert(key.clone(), rule).is_some();
        if replaced {
            tracing::debug!(rule = %key, "replaced registered rule");
        } else {
            tracing::debug!(rule = %key, "registered rule");
        }
        Ok(replaced)
    }

    pub fn register_rule(&self, rule: impl RuleUnit + 'static) -> Result<bool> {
        self.register(Arc::new(rule))
    }

    pub fn lookup(&self, name: &str) -> Option<DynRule> {
        self.read().get(&normalize_name(name)).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(&normalize_name(name))
    }

    /// All rules, in no particular order.
    pub fn list_all(&self) -> Vec<DynRule> {
        self.read().values().cloned().collect()
    }

    /// All rules sorted by (priority, normalized name, original name).
    pub fn list_sorted(&self) -> Vec<DynRule> {
        let mut rules = self.list_all();
        sort_rules(&mut rules);
        rules
    }

    pub fn reset(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

pub(crate) fn sort_rules(rules: &mut [DynRule]) {
    rules.sort_by(|a, b| {
        a.priority()
            .cmp(&b.priority())
            .then_with(|| normalize_name(a.name()).cmp(&normalize_name(b.name())))
            .then_with(|| a.name().cmp(b.name()))
    });
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("Registry").field("rules", &names).finish()
    }
}
