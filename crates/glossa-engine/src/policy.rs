//! Fix-policy resolver: decides whether a fix may run for a given status.

use glossa_types::{FixMode, Status};

/// Map a configured fix mode and the status a rule would otherwise report
/// to a yes/no "attempt fix" answer.
///
/// - `Never` never fixes.
/// - `Always` fixes regardless of status.
/// - `IfNotPassing` fixes anything that is not `Pass`.
/// - `OnlyIfFailed` fixes `Fail` and `Error`, leaving `Warn` alone.
pub fn should_attempt_fix(mode: FixMode, status: Status) -> bool {
    match mode {
        FixMode::Never => false,
        FixMode::Always => true,
        FixMode::IfNotPassing => status != Status::Pass,
        FixMode::OnlyIfFailed => matches!(status, Status::Fail | Status::Error),
    }
}
