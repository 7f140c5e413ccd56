//! Artifact propagation: merges a fix's proposal into the next-stage artifact.

use glossa_types::{Artifact, FixPatch};

/// Compute the next-stage artifact from `input` and a fix's `patch`.
///
/// Proposed data or path is adopted only when it actually differs from the
/// input; otherwise the input's buffer is reused as-is. The patch's own
/// `changed` flag is OR-ed in, but never trusted on its own to mean "same".
pub fn propagate(input: &Artifact, patch: &FixPatch) -> (Artifact, bool) {
    let mut changed = false;

    let data = match &patch.data {
        Some(proposed) if &proposed[..] != input.data() => {
            changed = true;
            proposed.clone()
        }
        _ => input.shared_data(),
    };

    let path = match &patch.path {
        Some(proposed) if !proposed.as_os_str().is_empty() && proposed != input.path() => {
            changed = true;
            proposed.clone()
        }
        _ => input.path().to_path_buf(),
    };

    if patch.changed {
        changed = true;
    }

    (input.derive(data, path), changed)
}
