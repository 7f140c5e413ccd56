//! `trailing_whitespace`: no cell starts or ends with spaces or tabs.

use glossa_engine::{Recipe, RecipeRule};
use glossa_types::{Artifact, Context, FixOutcome, FixPatch, Result, Status, ValidationOutcome};

use crate::table;

pub const NAME: &str = "trailing_whitespace";

fn is_padding(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn trim(cell: &str) -> &str {
    cell.trim_matches(is_padding)
}

/// `line N column M` for every padded cell, header included.
fn padded_cells(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        for (col, cell) in table::split(line).into_iter().enumerate() {
            if trim(cell).len() != cell.len() {
                found.push(format!("line {} column {}", idx + 1, col + 1));
            }
        }
    }
    found
}

fn validate(_ctx: &Context, artifact: &Artifact) -> ValidationOutcome {
    let text = match table::text(artifact) {
        Ok(text) => text,
        Err(outcome) => return outcome,
    };
    let found = padded_cells(text);
    if found.is_empty() {
        ValidationOutcome::pass("")
    } else {
        ValidationOutcome::fail(format!(
            "{} cell(s) with surrounding whitespace: {}",
            found.len(),
            table::summarize(&found, 5)
        ))
    }
}

fn fix(_ctx: &Context, artifact: &Artifact) -> Result<FixOutcome> {
    let Some(text) = artifact.text() else {
        return Ok(FixOutcome::declined("file is not valid UTF-8"));
    };
    if table::is_quoted(text) {
        return Ok(FixOutcome::declined("quoted cells; trim manually"));
    }
    let rewritten = table::map_cells(text, |_, _, cell| trim(cell).to_string());
    Ok(FixOutcome::Applied(
        FixPatch::new()
            .with_data(rewritten.into_bytes())
            .with_note("trimmed cells"),
    ))
}

pub fn rule() -> RecipeRule {
    RecipeRule::new(
        Recipe::new(NAME)
            .with_validate(validate)
            .with_fix(fix)
            .fixed_message("cells trimmed")
            .failure_status(Status::Warn)
            .status_after_fix(Status::Pass),
    )
}
