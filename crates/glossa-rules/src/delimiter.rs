//! `delimiter`: the table must be comma-separated.

use glossa_engine::{Recipe, RecipeRule};
use glossa_types::{Artifact, Context, FixOutcome, FixPatch, Result, Status, ValidationOutcome};

use crate::table::{self, DELIMITER};

pub const NAME: &str = "delimiter";
pub const PRIORITY: i32 = 30;

/// Delimiters we know how to convert from.
const CANDIDATES: [char; 3] = [';', '\t', '|'];

fn describe(delimiter: char) -> &'static str {
    match delimiter {
        ';' => "';'",
        '\t' => "tab",
        '|' => "'|'",
        _ => "unknown",
    }
}

/// Candidate delimiters present in the header line.
fn header_candidates(header: &str) -> Vec<char> {
    CANDIDATES
        .iter()
        .copied()
        .filter(|c| header.contains(*c))
        .collect()
}

fn validate(_ctx: &Context, artifact: &Artifact) -> ValidationOutcome {
    let text = match table::text(artifact) {
        Ok(text) => text,
        Err(outcome) => return outcome,
    };
    let Some(header) = text.lines().next() else {
        return ValidationOutcome::pass("empty file");
    };
    if header.contains(DELIMITER) {
        return ValidationOutcome::pass("");
    }
    match header_candidates(header).as_slice() {
        [] => ValidationOutcome::pass("single column"),
        [one] => ValidationOutcome::fail(format!("header uses {} instead of ','", describe(*one))),
        many => ValidationOutcome::fail(format!(
            "header uses {} instead of ','",
            many.iter().map(|c| describe(*c)).collect::<Vec<_>>().join(" and ")
        )),
    }
}

fn fix(_ctx: &Context, artifact: &Artifact) -> Result<FixOutcome> {
    let Some(text) = artifact.text() else {
        return Ok(FixOutcome::declined("file is not valid UTF-8"));
    };
    let Some(header) = text.lines().next() else {
        return Ok(FixOutcome::declined("empty file"));
    };
    let delimiter = match header_candidates(header).as_slice() {
        [one] => *one,
        [] => return Ok(FixOutcome::declined("no known delimiter in header")),
        _ => return Ok(FixOutcome::declined("ambiguous delimiter in header")),
    };
    if table::is_quoted(text) {
        return Ok(FixOutcome::declined("quoted cells; convert the delimiter manually"));
    }
    if text.contains(DELIMITER) {
        return Ok(FixOutcome::declined("cells already contain ','"));
    }
    let expected = header.matches(delimiter).count();
    if let Some((line, _)) = table::data_rows(text).find(|(_, row)| row.matches(delimiter).count() != expected) {
        return Ok(FixOutcome::declined(format!(
            "line {line} has a different column count than the header"
        )));
    }
    let rewritten = text.replace(delimiter, &DELIMITER.to_string());
    Ok(FixOutcome::Applied(
        FixPatch::new()
            .with_data(rewritten.into_bytes())
            .with_note(format!("converted {} to ','", describe(delimiter))),
    ))
}

pub fn rule() -> RecipeRule {
    RecipeRule::new(
        Recipe::new(NAME)
            .with_validate(validate)
            .with_fix(fix)
            .pass_message("comma-separated")
            .fixed_message("delimiter converted to ','")
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

    fn run(text: &str) -> glossa_types::FinalOutcome {
        let opts = RunOptions::default().with_fix_mode(FixMode::IfNotPassing);
        rule().run(&Context::new(), &Artifact::new("g.csv", text.as_bytes().to_vec()), &opts)
    }

    #[test]
    fn comma_header_passes() {
        let out = run("term,en\nhi,hi\n");
        assert_eq!(out.status, Status::Pass);
        assert!(!out.changed);
    }

    #[test]
    fn single_column_passes() {
        assert_eq!(run("term\nhi\n").status, Status::Pass);
    }

    #[test]
    fn converts_semicolons() {
        let out = run("term;en;de\nhi;hi;hallo\n");
        assert_eq!(out.status, Status::Pass);
        assert_eq!(out.data(), b"term,en,de\nhi,hi,hallo\n");
        assert_eq!(out.note, "converted ';' to ','");
    }

    #[test]
    fn converts_tabs() {
        let out = run("term\ten\nhi\thi\n");
        assert_eq!(out.data(), b"term,en\nhi,hi\n");
    }

    #[test]
    fn declines_ambiguous_header() {
        let out = run("term;en|de\nhi;hi|hallo\n");
        assert_eq!(out.status, Status::Fail);
        assert_eq!(out.message, "header uses ';' and '|' instead of ','");
        assert_eq!(out.note, "ambiguous delimiter in header");
    }

    #[test]
    fn declines_quoted_files() {
        let out = run("term;en\n\"a;b\";x\n");
        assert_eq!(out.status, Status::Fail);
        assert!(out.note.contains("quoted"));
    }

    #[test]
    fn declines_ragged_rows() {
        let out = run("term;en\nhi;hi;extra\n");
        assert_eq!(out.status, Status::Fail);
        assert_eq!(out.note, "line 2 has a different column count than the header");
    }
}
