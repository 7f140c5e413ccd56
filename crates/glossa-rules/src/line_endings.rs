//! `line_endings`: LF line breaks only, and a final newline.

use glossa_engine::{Recipe, RecipeRule};
use glossa_types::{Artifact, Context, FixOutcome, Result, Status, ValidationOutcome};

pub const NAME: &str = "line_endings";
pub const PRIORITY: i32 = 20;

#[derive(Debug, Default, PartialEq, Eq)]
struct Breaks {
    crlf: usize,
    cr: usize,
    missing_final: bool,
}

fn count(data: &[u8]) -> Breaks {
    let mut breaks = Breaks::default();
    let mut i = 0;
    while i < data.len() {
        if data[i] == b'\r' {
            if data.get(i + 1) == Some(&b'\n') {
                breaks.crlf += 1;
                i += 1;
            } else {
                breaks.cr += 1;
            }
        }
        i += 1;
    }
    breaks.missing_final = data.last().is_some_and(|&b| b != b'\n' && b != b'\r');
    breaks
}

/// CRLF and lone CR become LF; a non-empty buffer gets a final LF.
pub fn normalize(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 1);
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'\r' => {
                out.push(b'\n');
                if data.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    if out.last().is_some_and(|&b| b != b'\n') {
        out.push(b'\n');
    }
    out
}

fn validate(_ctx: &Context, artifact: &Artifact) -> ValidationOutcome {
    let breaks = count(artifact.data());
    let mut problems = Vec::new();
    if breaks.crlf > 0 {
        problems.push(format!("{} CRLF line break(s)", breaks.crlf));
    }
    if breaks.cr > 0 {
        problems.push(format!("{} CR line break(s)", breaks.cr));
    }
    if breaks.missing_final {
        problems.push("missing final newline".to_string());
    }
    if problems.is_empty() {
        ValidationOutcome::pass("")
    } else {
        ValidationOutcome::fail(problems.join("; "))
    }
}

fn fix(_ctx: &Context, artifact: &Artifact) -> Result<FixOutcome> {
    Ok(FixOutcome::with_data(normalize(artifact.data())))
}

pub fn rule() -> RecipeRule {
    RecipeRule::new(
        Recipe::new(NAME)
            .with_validate(validate)
            .with_fix(fix)
            .pass_message("LF line endings")
            .fixed_message("line endings normalized to LF")
            .status_after_fix(Status::Pass),
    )
    .with_fail_fast(true)
    .with_priority(PRIORITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glossa_engine::RuleUnit;
    use glossa_types::{FixMode, RunOptions};

    #[test]
    fn counts_each_kind() {
        assert_eq!(
            count(b"a\r\nb\rc"),
            Breaks {
                crlf: 1,
                cr: 1,
                missing_final: true
            }
        );
        assert_eq!(count(b""), Breaks::default());
        assert_eq!(count(b"a\n"), Breaks::default());
    }

    #[test]
    fn normalize_handles_mixed_breaks() {
        assert_eq!(normalize(b"a\r\nb\rc\nd"), b"a\nb\nc\nd\n");
        assert_eq!(normalize(b"a\r"), b"a\n");
        assert_eq!(normalize(b""), b"");
    }

    #[test]
    fn validate_lists_problems() {
        let art = Artifact::new("g.csv", b"term\r\nx".to_vec());
        let v = validate(&Context::new(), &art);
        assert!(!v.ok);
        assert_eq!(v.message, "1 CRLF line break(s); missing final newline");
    }

    #[test]
    fn fixes_and_revalidates() {
        let art = Artifact::new("g.csv", b"term,en\r\nhi,hi\r\n".to_vec());
        let opts = RunOptions::default().with_fix_mode(FixMode::OnlyIfFailed);
        let out = rule().run(&Context::new(), &art, &opts);
        assert_eq!(out.status, Status::Pass);
        assert_eq!(out.data(), b"term,en\nhi,hi\n");
        assert!(out.changed);
    }

    #[test]
    fn without_fix_mode_reports_failure() {
        let art = Artifact::new("g.csv", b"term\r\n".to_vec());
        let out = rule().run(&Context::new(), &art, &RunOptions::default());
        assert_eq!(out.status, Status::Fail);
        assert_eq!(out.data(), b"term\r\n");
    }
}
