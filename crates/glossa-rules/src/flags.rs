//! `flags`: the `flags` column holds `|`-separated values from a fixed set.

use std::sync::LazyLock;

use regex::Regex;

use glossa_engine::{Recipe, RecipeRule};
use glossa_types::{Artifact, Context, FixOutcome, FixPatch, Result, Status, ValidationOutcome};

use crate::header::FLAGS_COLUMN;
use crate::table;

pub const NAME: &str = "flags";

pub const ALLOWED_FLAGS: [&str; 4] = ["case-sensitive", "deprecated", "do-not-translate", "forbidden"];

const SEPARATOR: char = '|';

static SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_]+").expect("flag spacing pattern is valid"));

fn normalize_value(value: &str) -> String {
    SPACING
        .replace_all(value.trim(), "-")
        .trim_matches('-')
        .to_lowercase()
}

/// Canonical form of a flags cell and the values that are not allowed.
fn canonical(cell: &str) -> (String, Vec<String>) {
    let mut values: Vec<String> = Vec::new();
    for value in cell.split(SEPARATOR).map(normalize_value) {
        if !value.is_empty() && !values.contains(&value) {
            values.push(value);
        }
    }
    let unknown = values
        .iter()
        .filter(|v| !ALLOWED_FLAGS.contains(&v.as_str()))
        .cloned()
        .collect();
    (values.join(&SEPARATOR.to_string()), unknown)
}

struct CellIssue {
    line: usize,
    cell: String,
    unknown: Vec<String>,
}

fn issues(text: &str) -> Option<Vec<CellIssue>> {
    let column = table::column(&table::header(text), FLAGS_COLUMN)?;
    let mut found = Vec::new();
    for (line, row) in table::data_rows(text) {
        let Some(cell) = table::split(row).get(column).copied() else {
            continue;
        };
        let (fixed, unknown) = canonical(cell);
        if fixed != cell || !unknown.is_empty() {
            found.push(CellIssue {
                line,
                cell: cell.to_string(),
                unknown,
            });
        }
    }
    Some(found)
}

fn validate(_ctx: &Context, artifact: &Artifact) -> ValidationOutcome {
    let text = match table::text(artifact) {
        Ok(text) => text,
        Err(outcome) => return outcome,
    };
    let Some(found) = issues(text) else {
        return ValidationOutcome::pass("no flags column");
    };
    if found.is_empty() {
        return ValidationOutcome::pass("");
    }
    let items: Vec<String> = found
        .iter()
        .map(|issue| {
            if issue.unknown.is_empty() {
                format!("line {}: {:?} is not normalized", issue.line, issue.cell)
            } else {
                format!("line {}: unknown flag(s) {}", issue.line, issue.unknown.join(", "))
            }
        })
        .collect();
    ValidationOutcome::fail(table::summarize(&items, 5))
}

fn fix(_ctx: &Context, artifact: &Artifact) -> Result<FixOutcome> {
    let Some(text) = artifact.text() else {
        return Ok(FixOutcome::declined("file is not valid UTF-8"));
    };
    if table::is_quoted(text) {
        return Ok(FixOutcome::declined("quoted cells; normalize flags manually"));
    }
    let Some(column) = table::column(&table::header(text), FLAGS_COLUMN) else {
        return Ok(FixOutcome::unchanged("no flags column"));
    };
    let found = issues(text).unwrap_or_default();
    let mut unknown: Vec<String> = found.into_iter().flat_map(|i| i.unknown).collect();
    unknown.sort();
    unknown.dedup();
    if !unknown.is_empty() {
        return Ok(FixOutcome::declined(format!(
            "unknown flag(s) {}; allowed: {}",
            unknown.join(", "),
            ALLOWED_FLAGS.join(", ")
        )));
    }
    let rewritten = table::map_cells(text, |idx, col, cell| {
        if idx > 0 && col == column {
            canonical(cell).0
        } else {
            cell.to_string()
        }
    });
    Ok(FixOutcome::Applied(
        FixPatch::new()
            .with_data(rewritten.into_bytes())
            .with_note("normalized flag values"),
    ))
}

pub fn rule() -> RecipeRule {
    RecipeRule::new(
        Recipe::new(NAME)
            .with_validate(validate)
            .with_fix(fix)
            .pass_message("flags valid")
            .fixed_message("flags normalized")
            .failure_status(Status::Warn)
            .status_after_fix(Status::Pass),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use glossa_engine::RuleUnit;
    use glossa_types::{FixMode, RunOptions};

    fn run(text: &str) -> glossa_types::FinalOutcome {
        let opts = RunOptions::default().with_fix_mode(FixMode::IfNotPassing);
        rule().run(&Context::new(), &Artifact::new("g.csv", text.as_bytes().to_vec()), &opts)
    }

    #[test]
    fn canonical_form() {
        assert_eq!(
            canonical(" Do Not_Translate|deprecated|DEPRECATED"),
            ("do-not-translate|deprecated".to_string(), Vec::<String>::new())
        );
        assert_eq!(canonical("").0, "");
        assert_eq!(canonical("loud").1, ["loud"]);
    }

    #[test]
    fn missing_column_passes() {
        let out = run("term,en\na,a\n");
        assert_eq!(out.status, Status::Pass);
        assert_eq!(out.message, "flags valid");
    }

    #[test]
    fn valid_flags_pass() {
        assert_eq!(run("term,en,flags\na,a,forbidden|case-sensitive\nb,b,\n").status, Status::Pass);
    }

    #[test]
    fn normalizes_values() {
        let out = run("term,en,flags\na,a,Case Sensitive|case_sensitive\n");
        assert_eq!(out.status, Status::Pass);
        assert_eq!(out.data(), b"term,en,flags\na,a,case-sensitive\n");
    }

    #[test]
    fn unknown_values_are_declined() {
        let out = run("term,en,flags\na,a,loud\n");
        assert_eq!(out.status, Status::Warn);
        assert_eq!(out.message, "line 2: unknown flag(s) loud");
        assert!(out.note.starts_with("unknown flag(s) loud; allowed:"));
    }

    #[test]
    fn short_rows_are_skipped() {
        assert_eq!(run("term,en,flags\na,a\n").status, Status::Pass);
    }
}
