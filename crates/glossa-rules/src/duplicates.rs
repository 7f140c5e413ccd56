//! `duplicate_terms`: every term appears once (trimmed, case-insensitive).
//!
//! The fix only drops rows that repeat an earlier row exactly; duplicates
//! with different translations are left for a human.

use std::collections::HashMap;

use glossa_engine::{Recipe, RecipeRule};
use glossa_types::{Artifact, Context, FixOutcome, FixPatch, Result, Status, ValidationOutcome};

use crate::header::TERM_COLUMN;
use crate::table;

pub const NAME: &str = "duplicate_terms";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Duplicate {
    term: String,
    first_line: usize,
    line: usize,
    identical: bool,
}

fn find_duplicates(text: &str) -> Vec<Duplicate> {
    let column = table::column(&table::header(text), TERM_COLUMN).unwrap_or(0);
    let mut first_seen: HashMap<String, (usize, &str)> = HashMap::new();
    let mut duplicates = Vec::new();
    for (line, row) in table::data_rows(text) {
        let term = table::split(row).get(column).map(|t| t.trim()).unwrap_or("");
        if term.is_empty() {
            continue;
        }
        match first_seen.get(&term.to_lowercase()) {
            Some(&(first_line, first_row)) => duplicates.push(Duplicate {
                term: term.to_string(),
                first_line,
                line,
                identical: first_row.trim() == row.trim(),
            }),
            None => {
                first_seen.insert(term.to_lowercase(), (line, row));
            }
        }
    }
    duplicates
}

fn validate(_ctx: &Context, artifact: &Artifact) -> ValidationOutcome {
    let text = match table::text(artifact) {
        Ok(text) => text,
        Err(outcome) => return outcome,
    };
    let duplicates = find_duplicates(text);
    if duplicates.is_empty() {
        return ValidationOutcome::pass("");
    }
    let items: Vec<String> = duplicates
        .iter()
        .map(|d| format!("'{}' on line {} (first on line {})", d.term, d.line, d.first_line))
        .collect();
    ValidationOutcome::fail(format!(
        "{} duplicate term(s): {}",
        duplicates.len(),
        table::summarize(&items, 5)
    ))
}

fn fix(_ctx: &Context, artifact: &Artifact) -> Result<FixOutcome> {
    let Some(text) = artifact.text() else {
        return Ok(FixOutcome::declined("file is not valid UTF-8"));
    };
    let drop: Vec<usize> = find_duplicates(text)
        .into_iter()
        .filter(|d| d.identical)
        .map(|d| d.line)
        .collect();
    if drop.is_empty() {
        return Ok(FixOutcome::declined(
            "duplicate terms have different content; resolve them manually",
        ));
    }
    let kept = text
        .lines()
        .enumerate()
        .filter(|(idx, _)| !drop.contains(&(idx + 1)))
        .map(|(_, line)| line);
    Ok(FixOutcome::Applied(
        FixPatch::new()
            .with_data(table::join_lines(kept).into_bytes())
            .with_note(format!("removed {} identical row(s)", drop.len())),
    ))
}

pub fn rule() -> RecipeRule {
    RecipeRule::new(
        Recipe::new(NAME)
            .with_validate(validate)
            .with_fix(fix)
            .pass_message("no duplicate terms")
            .fixed_message("identical duplicate rows removed")
            .still_bad_message("duplicates remain")
            .failure_status(Status::Warn)
            .status_after_fix(Status::Pass),
    )
}
