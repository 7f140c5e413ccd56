//! `header`: the first row names the columns.
//!
//! The first column is `term`; every declared language has a column; the
//! only other columns allowed are `flags` and `comment`. When no languages
//! are declared, any column that looks like a language code is accepted.
//! Column names are trimmed and lower-case.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use glossa_engine::{Recipe, RecipeRule};
use glossa_types::{Artifact, Context, FixOutcome, FixPatch, Result, Status, ValidationOutcome};

use crate::table::{self, DELIMITER};

pub const NAME: &str = "header";
pub const PRIORITY: i32 = 40;

pub const TERM_COLUMN: &str = "term";
pub const FLAGS_COLUMN: &str = "flags";
pub const COMMENT_COLUMN: &str = "comment";

// ISO 639 code with optional region/script subtags: en, pt-br, zh_hans.
static LANGUAGE_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]{2,3}(?:[-_][a-z0-9]{2,8})*$").expect("language code pattern is valid")
});

pub fn is_language_code(name: &str) -> bool {
    LANGUAGE_CODE.is_match(name)
}

fn normalize(cell: &str) -> String {
    cell.trim().to_lowercase()
}

/// Problems the fix can repair.
fn formatting_problems(cells: &[&str]) -> Vec<String> {
    cells
        .iter()
        .enumerate()
        .filter(|(_, cell)| **cell != normalize(cell))
        .map(|(idx, cell)| format!("column {} {cell:?} is not trimmed lower-case", idx + 1))
        .collect()
}

/// Problems that remain after normalizing names.
fn structural_problems(cells: &[String], languages: &[String]) -> Vec<String> {
    if cells.iter().all(|c| c.is_empty()) {
        return vec!["file has no header row".to_string()];
    }
    let mut problems = Vec::new();
    if cells[0] != TERM_COLUMN {
        problems.push(format!("first column must be '{TERM_COLUMN}' (found '{}')", cells[0]));
    }
    for lang in languages {
        if !cells.contains(lang) {
            problems.push(format!("missing language column '{lang}'"));
        }
    }
    let mut seen = HashSet::new();
    for (idx, cell) in cells.iter().enumerate() {
        if cell.is_empty() {
            problems.push(format!("empty column name at position {}", idx + 1));
            continue;
        }
        if !seen.insert(cell.as_str()) {
            problems.push(format!("duplicate column '{cell}'"));
            continue;
        }
        let reserved = matches!(cell.as_str(), TERM_COLUMN | FLAGS_COLUMN | COMMENT_COLUMN);
        let allowed = if languages.is_empty() {
            is_language_code(cell)
        } else {
            languages.contains(cell)
        };
        if !reserved && !allowed {
            problems.push(format!("unknown column '{cell}'"));
        }
    }
    problems
}

fn validate(_ctx: &Context, artifact: &Artifact) -> ValidationOutcome {
    let text = match table::text(artifact) {
        Ok(text) => text,
        Err(outcome) => return outcome,
    };
    let cells = table::header(text);
    let normalized: Vec<String> = cells.iter().map(|c| normalize(c)).collect();
    let mut problems = formatting_problems(&cells);
    problems.extend(structural_problems(&normalized, artifact.languages()));
    if problems.is_empty() {
        ValidationOutcome::pass(format!("{} columns", cells.len()))
    } else {
        ValidationOutcome::fail(table::summarize(&problems, 5))
    }
}

fn fix(_ctx: &Context, artifact: &Artifact) -> Result<FixOutcome> {
    let Some(text) = artifact.text() else {
        return Ok(FixOutcome::declined("file is not valid UTF-8"));
    };
    let Some(header) = text.lines().next() else {
        return Ok(FixOutcome::declined("file has no header row"));
    };
    if table::is_quoted(header) {
        return Ok(FixOutcome::declined("quoted header cells"));
    }
    let normalized: Vec<String> = table::split(header).iter().map(|c| normalize(c)).collect();
    let remaining = structural_problems(&normalized, artifact.languages());
    if !remaining.is_empty() {
        return Ok(FixOutcome::declined(table::summarize(&remaining, 5)));
    }
    let new_header = normalized.join(&DELIMITER.to_string());
    if new_header == header {
        return Ok(FixOutcome::unchanged("header already normalized"));
    }
    let rewritten = match text.split_once('\n') {
        Some((_, rest)) => format!("{new_header}\n{rest}"),
        None => new_header,
    };
    Ok(FixOutcome::Applied(
        FixPatch::new()
            .with_data(rewritten.into_bytes())
            .with_note("normalized header names"),
    ))
}

pub fn rule() -> RecipeRule {
    RecipeRule::new(
        Recipe::new(NAME)
            .with_validate(validate)
            .with_fix(fix)
            .fixed_message("header normalized")
            .still_bad_message("header still invalid")
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

    fn artifact(text: &str, langs: &[&str]) -> Artifact {
        Artifact::new("g.csv", text.as_bytes().to_vec()).with_languages(langs.iter().copied())
    }

    fn run(text: &str, langs: &[&str]) -> glossa_types::FinalOutcome {
        let opts = RunOptions::default().with_fix_mode(FixMode::IfNotPassing);
        rule().run(&Context::new(), &artifact(text, langs), &opts)
    }

    #[test]
    fn language_codes() {
        for ok in ["en", "deu", "pt-br", "zh_hans"] {
            assert!(is_language_code(ok), "{ok}");
        }
        for bad in ["english", "e", "EN", "en-", "notes"] {
            assert!(!is_language_code(bad), "{bad}");
        }
    }

    #[test]
    fn valid_header_passes() {
        let out = run("term,en,de,flags,comment\n", &["en", "de"]);
        assert_eq!(out.status, Status::Pass);
        assert_eq!(out.message, "5 columns");
    }

    #[test]
    fn undeclared_language_columns_need_code_shape() {
        assert_eq!(run("term,en,fr\n", &[]).status, Status::Pass);
        let out = run("term,en,notes\n", &[]);
        assert_eq!(out.status, Status::Fail);
        assert!(out.message.contains("unknown column 'notes'"));
    }

    #[test]
    fn reports_missing_and_unknown_columns() {
        let v = validate(&Context::new(), &artifact("word,en,fr\n", &["en", "de"]));
        assert!(!v.ok);
        assert_eq!(
            v.message,
            "first column must be 'term' (found 'word'); missing language column 'de'; \
             unknown column 'word'; unknown column 'fr'"
        );
    }

    #[test]
    fn fixes_case_and_whitespace() {
        let out = run(" Term ,EN, De\nhi,hi,hallo\n", &["en", "de"]);
        assert_eq!(out.status, Status::Pass);
        assert_eq!(out.data(), b"term,en,de\nhi,hi,hallo\n");
        assert_eq!(out.message, "header normalized");
    }

    #[test]
    fn declines_when_columns_are_missing() {
        let out = run("Term,EN\n", &["en", "de"]);
        assert_eq!(out.status, Status::Fail);
        assert!(out.message.contains("column 1 \"Term\" is not trimmed lower-case"));
        assert_eq!(out.note, "missing language column 'de'");
        assert_eq!(out.data(), b"Term,EN\n");
    }

    #[test]
    fn duplicates_and_empty_names() {
        let v = validate(&Context::new(), &artifact("term,en,en,\n", &["en"]));
        assert!(v.message.contains("duplicate column 'en'"));
        assert!(v.message.contains("empty column name at position 4"));
    }

    #[test]
    fn empty_file_fails() {
        let v = validate(&Context::new(), &artifact("", &[]));
        assert_eq!(v.message, "file has no header row");
    }
}
