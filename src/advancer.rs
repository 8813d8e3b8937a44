//! Date Advancer: moves the notebook's `year = YYYYMM` parameter forward one
//! calendar month, or reports that the terminal month has already run.

use crate::document::{LineRef, NotebookDocument};
use crate::runlog::RunLog;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

/// Last month the workflow runs. Advancing past this leaves the notebook
/// untouched and ends the run.
pub const STOP_BOUND: YearMonth = YearMonth { year: 2024, month: 12 };

// [0-9] rather than \d: the token is six ASCII digits, nothing Unicode.
static YEAR_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"year\s*=\s*([0-9]{6})").expect("valid year-line regex"));

/// A `YYYYMM` parameter value. Ordering is (year, month), so out-of-range
/// months still compare the obvious way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: u16,
    pub month: u8,
}

impl YearMonth {
    /// Split a six-digit token: first four digits are the year, last two the
    /// month. The month is taken as-is; values past 12 only normalize
    /// through the carry in [`YearMonth::next`].
    pub fn from_token(token: &str) -> Option<Self> {
        if token.len() != 6 || !token.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year = token[..4].parse().ok()?;
        let month = token[4..].parse().ok()?;
        Some(Self { year, month })
    }

    /// The following month, carrying into the year when the month passes 12.
    pub fn next(self) -> Self {
        let mut year = self.year;
        let mut month = self.month + 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
        Self { year, month }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

/// Outcome of one advancer invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The parameter moved forward one month and the notebook was rewritten.
    Advanced { from: YearMonth, to: YearMonth },
    /// The next month would pass [`STOP_BOUND`]; nothing was written.
    BoundReached,
}

#[derive(Debug, Error)]
pub enum AdvanceError {
    #[error("notebook parse failed: {0:#}")]
    Parse(anyhow::Error),
    #[error("no `year = YYYYMM` parameter line in any notebook cell")]
    ParameterNotFound,
    #[error("notebook write failed: {0:#}")]
    Io(anyhow::Error),
}

struct YearLineHit {
    at: LineRef,
    text: String,
    /// Byte span of the six-digit token within `text`.
    span: Range<usize>,
    value: YearMonth,
}

fn find_year_line(doc: &NotebookDocument) -> Option<YearLineHit> {
    for (at, line) in doc.source_lines() {
        if let Some(caps) = YEAR_LINE.captures(line) {
            let token = caps.get(1)?;
            let value = YearMonth::from_token(token.as_str())?;
            return Some(YearLineHit {
                at,
                text: line.to_string(),
                span: token.range(),
                value,
            });
        }
    }
    None
}

/// Advance the first `year = YYYYMM` parameter in the notebook at `path` by
/// one month. Only the captured token's span is rewritten; the rest of the
/// line and document come back byte-for-byte. A notebook with no matching
/// line is an error, not a silent no-op.
pub fn advance_notebook_date(path: &Path, log: &RunLog) -> Result<Advance, AdvanceError> {
    let mut doc = NotebookDocument::load(path).map_err(AdvanceError::Parse)?;

    let Some(hit) = find_year_line(&doc) else {
        return Err(AdvanceError::ParameterNotFound);
    };

    let next = hit.value.next();
    if next > STOP_BOUND {
        log.line(&format!("reached bound {}, no months left to run", STOP_BOUND));
        return Ok(Advance::BoundReached);
    }

    let mut line = hit.text;
    line.replace_range(hit.span, &next.to_string());
    if !doc.rewrite_line(hit.at, line) {
        // Unreachable while scan and rewrite share one in-memory document.
        return Err(AdvanceError::Io(anyhow::anyhow!(
            "cell {} line {} disappeared between scan and rewrite",
            hit.at.cell,
            hit.at.line
        )));
    }
    doc.save(path).map_err(AdvanceError::Io)?;

    log.line(&format!("updated year parameter: {} -> {}", hit.value, next));
    Ok(Advance::Advanced { from: hit.value, to: next })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn ym(year: u16, month: u8) -> YearMonth {
        YearMonth { year, month }
    }

    fn setup(raw: &str) -> (tempfile::TempDir, PathBuf, RunLog) {
        let dir = tempfile::tempdir().unwrap();
        let nb = dir.path().join("nb.ipynb");
        fs::write(&nb, raw).unwrap();
        let log = RunLog::create(&dir.path().join("run.log")).unwrap();
        (dir, nb, log)
    }

    fn notebook_with_line(line: &str) -> String {
        serde_json::json!({
            "cells": [
                {"source": ["import pandas as pd", "offset = 3"]},
                {"source": [line, "print(year)"]}
            ],
            "nbformat": 4
        })
        .to_string()
    }

    fn line_at(path: &Path, cell: usize, line: usize) -> String {
        let doc = NotebookDocument::load(path).unwrap();
        let found = doc
            .source_lines()
            .find(|(at, _)| at.cell == cell && at.line == line)
            .map(|(_, s)| s.to_string());
        found.unwrap()
    }

    #[test]
    fn test_next_month_within_year() {
        assert_eq!(ym(2023, 3).next(), ym(2023, 4));
    }

    #[test]
    fn test_next_month_carries_into_new_year() {
        assert_eq!(ym(2023, 12).next(), ym(2024, 1));
    }

    #[test]
    fn test_next_normalizes_out_of_range_month() {
        // A month past 12 carries on the first step, same as the stock
        // workflow behaved.
        assert_eq!(ym(2024, 99).next(), ym(2025, 1));
    }

    #[test]
    fn test_token_parse_and_display() {
        assert_eq!(YearMonth::from_token("202311"), Some(ym(2023, 11)));
        assert_eq!(ym(2024, 1).to_string(), "202401");
        assert_eq!(YearMonth::from_token("20231"), None);
        assert_eq!(YearMonth::from_token("2023-1"), None);
    }

    #[test]
    fn test_ordering_against_bound() {
        assert!(ym(2024, 12) <= STOP_BOUND);
        assert!(ym(2025, 1) > STOP_BOUND);
        assert!(ym(2024, 13) > STOP_BOUND);
    }

    #[test]
    fn test_advance_rewrites_only_the_token() {
        let (_dir, nb, log) = setup(&notebook_with_line("year = 202311  # download month"));
        let got = advance_notebook_date(&nb, &log).unwrap();
        assert_eq!(got, Advance::Advanced { from: ym(2023, 11), to: ym(2023, 12) });
        assert_eq!(line_at(&nb, 1, 0), "year = 202312  # download month");
        assert_eq!(line_at(&nb, 0, 1), "offset = 3");
        assert_eq!(line_at(&nb, 1, 1), "print(year)");
    }

    #[test]
    fn test_advance_leaves_earlier_digit_runs_alone() {
        let (_dir, nb, log) = setup(&notebook_with_line("run_id = 111111; year = 202311"));
        advance_notebook_date(&nb, &log).unwrap();
        assert_eq!(line_at(&nb, 1, 0), "run_id = 111111; year = 202312");
    }

    #[test]
    fn test_advance_accepts_spacing_variants() {
        for line in ["year=202311", "year  =   202311"] {
            let (_dir, nb, log) = setup(&notebook_with_line(line));
            let got = advance_notebook_date(&nb, &log).unwrap();
            assert_eq!(got, Advance::Advanced { from: ym(2023, 11), to: ym(2023, 12) });
        }
    }

    #[test]
    fn test_first_match_in_cell_order_wins() {
        let raw = serde_json::json!({
            "cells": [
                {"source": ["year = 202301"]},
                {"source": ["year = 209901"]}
            ]
        })
        .to_string();
        let (_dir, nb, log) = setup(&raw);
        advance_notebook_date(&nb, &log).unwrap();
        assert_eq!(line_at(&nb, 0, 0), "year = 202302");
        assert_eq!(line_at(&nb, 1, 0), "year = 209901");
    }

    #[test]
    fn test_bound_reached_writes_nothing() {
        let (_dir, nb, log) = setup(&notebook_with_line("year = 202412"));
        let before = fs::read(&nb).unwrap();
        assert_eq!(advance_notebook_date(&nb, &log).unwrap(), Advance::BoundReached);
        assert_eq!(fs::read(&nb).unwrap(), before);
        // Repeated calls stay put.
        assert_eq!(advance_notebook_date(&nb, &log).unwrap(), Advance::BoundReached);
        assert_eq!(fs::read(&nb).unwrap(), before);
    }

    #[test]
    fn test_advance_sequence_runs_out_at_bound() {
        let (_dir, nb, log) = setup(&notebook_with_line("year = 202311"));
        let mut seen = Vec::new();
        loop {
            match advance_notebook_date(&nb, &log).unwrap() {
                Advance::Advanced { to, .. } => seen.push(to),
                Advance::BoundReached => break,
            }
        }
        let mut expected = Vec::new();
        let mut cursor = ym(2023, 11);
        while cursor < STOP_BOUND {
            cursor = cursor.next();
            expected.push(cursor);
        }
        assert_eq!(seen, expected);
        assert_eq!(seen.len(), 13);
        assert_eq!(line_at(&nb, 1, 0), "year = 202412");
    }

    #[test]
    fn test_missing_parameter_is_an_error_and_writes_nothing() {
        let (_dir, nb, log) = setup(&notebook_with_line("years = [2023]"));
        let before = fs::read(&nb).unwrap();
        let err = advance_notebook_date(&nb, &log).unwrap_err();
        assert!(matches!(err, AdvanceError::ParameterNotFound));
        assert_eq!(fs::read(&nb).unwrap(), before);
    }

    #[test]
    fn test_malformed_notebook_is_a_parse_error() {
        let (_dir, nb, log) = setup("{ this is not json");
        let err = advance_notebook_date(&nb, &log).unwrap_err();
        assert!(matches!(err, AdvanceError::Parse(_)));
    }

    #[test]
    fn test_unrelated_cells_survive_byte_for_byte() {
        let raw = serde_json::json!({
            "cells": [
                {"cell_type": "markdown", "metadata": {}, "source": ["# Monthly download"]},
                {"cell_type": "code", "execution_count": 7, "outputs": [], "source": ["year = 202311"]}
            ],
            "metadata": {"language_info": {"name": "python"}},
            "nbformat": 4,
            "nbformat_minor": 5
        })
        .to_string();
        let (_dir, nb, log) = setup(&raw);
        advance_notebook_date(&nb, &log).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&nb).unwrap()).unwrap();
        assert_eq!(saved["cells"][0]["source"][0], "# Monthly download");
        assert_eq!(saved["cells"][1]["execution_count"], 7);
        assert_eq!(saved["nbformat_minor"], 5);
        let keys: Vec<&String> = saved.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["cells", "metadata", "nbformat", "nbformat_minor"]);
    }
}
