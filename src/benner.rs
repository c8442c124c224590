//! Parser for Lance Benner's delta-v ranking report.
//!
//! The report is a fixed-column text table preceded by three lines of
//! metadata. Each ranked row carries the rank, a percentile, an optional
//! `(number) name` column, the two-part designation and five decimals:
//! delta-v, absolute magnitude H and the orbital elements a, e, i. Rows are
//! re-emitted as CSV; anything that doesn't look like a ranked row is dropped.

use anyhow::Result;
use csv::{Terminator, WriterBuilder};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::debug;

/// Number of metadata lines at the top of the report.
const HEADER_LINES: usize = 3;

pub const CSV_HEADER: [&str; 6] = ["pdes", "dv", "H", "a", "e", "i"];

static ROW_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^\s*(?P<rank>\d+)",
        r"\s+(?P<percentile>\d+\.\d+)",
        r"\s+(?P<name>\(\d+\)(?:\s+[-\w ]+)?)?",
        r"\s+(?P<pdes1>\d+)",
        r"\s+(?P<pdes2>[-\w]+)",
        r"\s+(?P<dv>\d+\.\d+)",
        r"\s+(?P<h>\d+\.\d+)",
        r"\s+(?P<a>\d+\.\d+)",
        r"\s+(?P<e>\d+\.\d+)",
        r"\s+(?P<i>\d+\.\d+)",
    ))
    .expect("benner row pattern compiles")
});

/// One ranked asteroid from the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AsteroidRow {
    pub pdes: String,
    pub dv: String,
    #[serde(rename = "H")]
    pub h: String,
    pub a: String,
    pub e: String,
    pub i: String,
}

impl AsteroidRow {
    fn from_captures(caps: &Captures<'_>) -> Self {
        let field = |name: &str| caps.name(name).map_or("", |m| m.as_str()).to_string();

        Self {
            pdes: format!("{} {}", field("pdes1"), field("pdes2"))
                .trim()
                .to_string(),
            dv: field("dv"),
            h: field("h"),
            a: field("a"),
            e: field("e"),
            i: field("i"),
        }
    }
}

/// Matches a single report line. Returns `None` when the line isn't a ranked row.
pub fn parse_row(line: &str) -> Option<AsteroidRow> {
    ROW_PATTERN
        .captures(line)
        .map(|caps| AsteroidRow::from_captures(&caps))
}

/// Extracts every ranked row from the raw report, skipping the metadata lines.
pub fn parse_rows(report: &[u8]) -> Vec<AsteroidRow> {
    report
        .split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .skip(HEADER_LINES)
        .filter_map(|line| parse_row(&String::from_utf8_lossy(line)))
        .collect()
}

/// Writes rows as CSV with a `pdes,dv,H,a,e,i` header.
///
/// Records end in `\r\n`. The header is always written, so an empty slice
/// yields a header-only document.
pub fn write_csv(rows: &[AsteroidRow]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to finish CSV buffer: {}", e.error()))
}

/// Converts a raw Benner report into CSV bytes.
pub fn parse_csv(report: &[u8]) -> Result<Vec<u8>> {
    let rows = parse_rows(report);
    debug!(rows = rows.len(), bytes = report.len(), "Benner report parsed");
    write_csv(&rows)
}
