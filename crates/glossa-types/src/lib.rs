//! Shared types, errors, cancellation context and outcomes for the glossa rule engine.
//!
//! This crate provides the foundational types used across all other glossa crates:
//! - `GlossaError`: unified error taxonomy
//! - `Context`: shared cancellation handle threaded through validate/fix calls
//! - `Artifact`: the byte buffer, path and declared languages flowing through a run
//! - `ValidationOutcome`, `FixOutcome`, `FinalOutcome`: what rules report back
//! - `Status`, `FixMode`, `RunOptions`: status taxonomy and per-run knobs

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Unified error type for all glossa subsystems.
#[derive(Debug, thiserror::Error)]
pub enum GlossaError {
    // === Registry / recipe configuration ===
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Recipe '{recipe}' is misconfigured: {message}")]
    RecipeConfig { recipe: String, message: String },

    // === Infrastructure ===
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Panic in {stage} of rule '{rule}': {message}")]
    Panicked {
        rule: String,
        stage: String,
        message: String,
        /// Stack trace captured at the panic site; not part of the display.
        backtrace: String,
    },

    // === Fix stage ===
    #[error("Fix for rule '{rule}' failed: {message}")]
    FixFailed { rule: String, message: String },

    // === Configuration ===
    #[error("Invalid fix mode '{0}' (expected never, only-if-failed, if-not-passing or always)")]
    InvalidFixMode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl GlossaError {
    /// Returns `true` for infrastructure-level failures: cancellation, an
    /// expired deadline, or a caught panic.
    pub fn is_system(&self) -> bool {
        matches!(
            self,
            GlossaError::Cancelled(_) | GlossaError::DeadlineExceeded | GlossaError::Panicked { .. }
        )
    }

    /// Returns `true` if the error came from the cancellation context.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, GlossaError::Cancelled(_) | GlossaError::DeadlineExceeded)
    }
}

/// A convenience alias for `Result<T, GlossaError>`.
pub type Result<T> = std::result::Result<T, GlossaError>;

// ---------------------------------------------------------------------------
// Context: cooperative cancellation shared by caller and engine
// ---------------------------------------------------------------------------

/// Cooperative cancellation handle.
///
/// Cloning a `Context` yields another handle to the **same** state, so the
/// caller can keep one clone to cancel while the engine checks another.
/// A context built with a deadline reports itself cancelled once the
/// deadline has passed.
#[derive(Debug, Clone, Default)]
pub struct Context {
    inner: Arc<ContextInner>,
}

#[derive(Debug, Default)]
struct ContextInner {
    cancelled: AtomicBool,
    reason: Mutex<Option<String>>,
    deadline: Option<Instant>,
}

impl Context {
    /// Create a context that is only cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                ..ContextInner::default()
            }),
        }
    }

    /// Create a context that expires `timeout` from now. A timeout too large
    /// to represent as an `Instant` means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(deadline),
            None => {
                tracing::debug!(timeout_secs = timeout.as_secs(), "timeout out of range; no deadline");
                Self::new()
            }
        }
    }

    /// Cancel the context. The first reason recorded wins.
    pub fn cancel(&self, reason: impl Into<String>) {
        let mut guard = match self.inner.reason.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.is_none() {
            let reason = reason.into();
            tracing::debug!(reason = %reason, "context cancelled");
            *guard = Some(reason);
        }
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// `true` once `cancel` was called or the deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire) || self.deadline_passed()
    }

    /// The deadline this context was built with, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// The cancellation cause, or `None` while the context is live.
    pub fn err(&self) -> Option<GlossaError> {
        if self.inner.cancelled.load(Ordering::Acquire) {
            let reason = match self.inner.reason.lock() {
                Ok(guard) => guard.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            };
            return Some(GlossaError::Cancelled(
                reason.unwrap_or_else(|| "context cancelled".to_string()),
            ));
        }
        if self.deadline_passed() {
            return Some(GlossaError::DeadlineExceeded);
        }
        None
    }

    fn deadline_passed(&self) -> bool {
        self.inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

// ---------------------------------------------------------------------------
// Status: final status of a rule run
// ---------------------------------------------------------------------------

/// Status taxonomy, ordered by severity: `Pass < Warn < Fail < Error`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Warn,
    Fail,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Warn => "WARN",
            Status::Fail => "FAIL",
            Status::Error => "ERROR",
        }
    }

    /// `true` for the statuses that stop a fail-fast rule sequence.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Status::Fail | Status::Error)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FixMode / RunOptions: per-invocation knobs
// ---------------------------------------------------------------------------

/// When a rule's fix may be attempted relative to its validation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixMode {
    #[default]
    Never,
    #[serde(alias = "only_if_failed")]
    OnlyIfFailed,
    #[serde(alias = "if_not_passing")]
    IfNotPassing,
    Always,
}

impl FixMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixMode::Never => "never",
            FixMode::OnlyIfFailed => "only-if-failed",
            FixMode::IfNotPassing => "if-not-passing",
            FixMode::Always => "always",
        }
    }
}

impl fmt::Display for FixMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FixMode {
    type Err = GlossaError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "never" => Ok(FixMode::Never),
            "only-if-failed" => Ok(FixMode::OnlyIfFailed),
            "if-not-passing" => Ok(FixMode::IfNotPassing),
            "always" => Ok(FixMode::Always),
            _ => Err(GlossaError::InvalidFixMode(s.to_string())),
        }
    }
}

/// Per-run configuration supplied fresh by the caller for each pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub fix_mode: FixMode,
    /// Revalidate the artifact after a fix was applied.
    pub rerun_after_fix: bool,
    /// Caller-level escalation hint; the engine itself never reads it.
    pub hard_fail_on_error: bool,
}

impl RunOptions {
    pub fn with_fix_mode(mut self, mode: FixMode) -> Self {
        self.fix_mode = mode;
        self
    }

    pub fn with_rerun(mut self, rerun: bool) -> Self {
        self.rerun_after_fix = rerun;
        self
    }

    pub fn with_hard_fail(mut self, hard_fail: bool) -> Self {
        self.hard_fail_on_error = hard_fail;
        self
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            fix_mode: FixMode::Never,
            rerun_after_fix: true,
            hard_fail_on_error: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Artifact: the unit of work flowing through the pipeline
// ---------------------------------------------------------------------------

/// Bytes, logical path and declared languages of the glossary under check.
///
/// The buffer is shared immutably: every stage either keeps the exact same
/// `Arc<[u8]>` or produces a new one, so earlier stages stay inspectable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    data: Arc<[u8]>,
    path: PathBuf,
    languages: Arc<[String]>,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            path: path.into(),
            languages: Arc::from(Vec::new()),
        }
    }

    /// Attach the declared language list. Codes are trimmed, lower-cased and
    /// de-duplicated keeping the first occurrence; empty codes are dropped.
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen: Vec<String> = Vec::new();
        for lang in languages {
            let code = lang.as_ref().trim().to_ascii_lowercase();
            if !code.is_empty() && !seen.contains(&code) {
                seen.push(code);
            }
        }
        self.languages = Arc::from(seen);
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Another handle to the same immutable buffer.
    pub fn shared_data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// The buffer as UTF-8, or `None` if it is not valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    pub fn text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// `true` if both artifacts point at the very same buffer allocation.
    pub fn shares_buffer_with(&self, other: &Artifact) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Build the next-stage artifact, keeping the language list.
    pub fn derive(&self, data: Arc<[u8]>, path: PathBuf) -> Artifact {
        Artifact {
            data,
            path,
            languages: Arc::clone(&self.languages),
        }
    }
}

// ---------------------------------------------------------------------------
// ValidationOutcome: result of a validate call
// ---------------------------------------------------------------------------

/// Result of a validate call. `system_error` is reserved for infrastructure
/// failures (cancellation, a caught panic) and always means `ok == false`.
#[derive(Debug)]
pub struct ValidationOutcome {
    pub ok: bool,
    pub message: String,
    pub system_error: Option<GlossaError>,
}

impl ValidationOutcome {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            system_error: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            system_error: None,
        }
    }

    /// An infrastructure failure; the message defaults to the error's display.
    pub fn system(error: GlossaError) -> Self {
        Self {
            ok: false,
            message: error.to_string(),
            system_error: Some(error),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn is_system(&self) -> bool {
        self.system_error.is_some()
    }
}

// ---------------------------------------------------------------------------
// FixOutcome: result of a fix call
// ---------------------------------------------------------------------------

/// What a fix function proposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixOutcome {
    /// The fix ran; the patch may or may not change anything.
    Applied(FixPatch),
    /// The failure is not this fix's to repair. The original validation
    /// message is reported, not the note.
    Declined { note: String },
}

impl FixOutcome {
    pub fn declined(note: impl Into<String>) -> Self {
        FixOutcome::Declined { note: note.into() }
    }

    /// Shorthand for a patch that proposes new bytes.
    pub fn with_data(data: impl Into<Arc<[u8]>>) -> Self {
        FixOutcome::Applied(FixPatch::new().with_data(data))
    }

    /// Shorthand for a patch that proposes nothing.
    pub fn unchanged(note: impl Into<String>) -> Self {
        FixOutcome::Applied(FixPatch::new().with_note(note))
    }
}

/// Proposed changes. `None` data or path means "keep the input's".
/// `changed` is a hint the engine ORs with its own byte/path comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixPatch {
    pub data: Option<Arc<[u8]>>,
    pub path: Option<PathBuf>,
    pub changed: bool,
    pub note: String,
}

impl FixPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, data: impl Into<Arc<[u8]>>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Flag a change that is not visible as a byte or path difference.
    pub fn mark_changed(mut self) -> Self {
        self.changed = true;
        self
    }
}

// ---------------------------------------------------------------------------
// FinalOutcome: what a rule unit hands back to the pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FinalOutcome {
    pub rule: String,
    pub status: Status,
    pub message: String,
    /// Artifact to feed the next stage, even when nothing changed.
    pub artifact: Artifact,
    pub changed: bool,
    pub note: String,
}

impl FinalOutcome {
    /// An outcome that carries the input artifact forward untouched.
    pub fn unchanged(
        rule: impl Into<String>,
        status: Status,
        message: impl Into<String>,
        artifact: &Artifact,
    ) -> Self {
        Self {
            rule: rule.into(),
            status,
            message: message.into(),
            artifact: artifact.clone(),
            changed: false,
            note: String::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn data(&self) -> &[u8] {
        self.artifact.data()
    }

    pub fn path(&self) -> &Path {
        self.artifact.path()
    }
}
