//! Splits registered rules into the critical (fail-fast) and normal groups.

use crate::registry::{sort_rules, DynRule, Registry};

/// Execution order for one pipeline run.
///
/// `critical` is sorted by (priority, name). `normal` carries no ordering
/// guarantee; it is sorted by name only so logs read the same run to run.
#[derive(Clone, Default)]
pub struct ExecutionPlan {
    pub critical: Vec<DynRule>,
    pub normal: Vec<DynRule>,
}

impl ExecutionPlan {
    pub fn len(&self) -> usize {
        self.critical.len() + self.normal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.critical.is_empty() && self.normal.is_empty()
    }

    /// Critical rules first, then normal ones.
    pub fn iter(&self) -> impl Iterator<Item = &DynRule> {
        self.critical.iter().chain(self.normal.iter())
    }
}

impl std::fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = |rules: &[DynRule]| rules.iter().map(|r| r.name().to_string()).collect::<Vec<_>>();
        f.debug_struct("ExecutionPlan")
            .field("critical", &names(&self.critical))
            .field("normal", &names(&self.normal))
            .finish()
    }
}

/// Take a snapshot of `registry` and partition it.
pub fn plan(registry: &Registry) -> ExecutionPlan {
    let (mut critical, mut normal): (Vec<DynRule>, Vec<DynRule>) = registry
        .list_all()
        .into_iter()
        .partition(|rule| rule.is_fail_fast());
    sort_rules(&mut critical);
    normal.sort_by(|a, b| a.name().cmp(b.name()));
    ExecutionPlan { critical, normal }
}
