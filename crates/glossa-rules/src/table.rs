//! Line and cell view of a glossary table.
//!
//! Rows are lines; cells are split on [`DELIMITER`]. Quotes are not
//! interpreted, so rules that would rewrite cells decline when the file
//! contains any.

use glossa_types::{Artifact, ValidationOutcome};

pub const DELIMITER: char = ',';
pub const QUOTE: char = '"';

/// The artifact as UTF-8 text, or a failing outcome for text-based rules.
pub fn text(artifact: &Artifact) -> Result<&str, ValidationOutcome> {
    artifact
        .text()
        .ok_or_else(|| ValidationOutcome::fail("file is not valid UTF-8"))
}

/// Header cells, untrimmed. Empty when the file has no lines.
pub fn header(text: &str) -> Vec<&str> {
    text.lines().next().map(split).unwrap_or_default()
}

pub fn split(line: &str) -> Vec<&str> {
    line.split(DELIMITER).collect()
}

/// Non-blank data rows as `(line_number, line)`, 1-based, header excluded.
pub fn data_rows(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .skip(1)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| (idx + 1, line))
}

/// Position of `name` in `header`, ignoring case and surrounding whitespace.
pub fn column(header: &[&str], name: &str) -> Option<usize> {
    header.iter().position(|c| c.trim().eq_ignore_ascii_case(name))
}

pub fn is_quoted(text: &str) -> bool {
    text.contains(QUOTE)
}

/// Join lines with `\n`, terminating the last one.
pub fn join_lines<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out
}

/// Rewrite every cell with `f(line_index, column, cell)`; `line_index` 0 is
/// the header. Blank lines are kept as they are.
pub fn map_cells<F>(text: &str, mut f: F) -> String
where
    F: FnMut(usize, usize, &str) -> String,
{
    join_lines(text.lines().enumerate().map(|(idx, line)| {
        if line.trim().is_empty() {
            return line.to_string();
        }
        split(line)
            .into_iter()
            .enumerate()
            .map(|(col, cell)| f(idx, col, cell))
            .collect::<Vec<_>>()
            .join(&DELIMITER.to_string())
    }))
}

/// Render up to `limit` items followed by a count of the rest.
pub fn summarize(items: &[String], limit: usize) -> String {
    let mut out = items
        .iter()
        .take(limit)
        .cloned()
        .collect::<Vec<_>>()
        .join("; ");
    if items.len() > limit {
        out.push_str(&format!("; and {} more", items.len() - limit));
    }
    out
}
