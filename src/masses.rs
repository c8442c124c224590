//! Asteroid mass table aggregation.
//!
//! Each line of the table is a body name followed by whitespace-separated
//! tokens, the second-to-last of which is the mass estimate. Lines are folded
//! into a [`MassRecord`] keyed by name, the unnamed entry produced by the
//! table's summary line is dropped, and the record is serialized as a JSON
//! object for upload.
//!
//! The loading steps are chained with [`Outcome`], so the first failing stage
//! (open, read, parse, serialize) is what reaches the caller.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::num::ParseFloatError;
use std::path::{Path, PathBuf};

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use serde_json::ser::Formatter;
use thiserror::Error;
use tracing::debug;

use crate::outcome::Outcome;

#[derive(Debug, Error)]
pub enum MassError {
    #[error("failed to open mass table {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read lines from mass table {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: expected a name followed by a mass and a unit")]
    MalformedLine { line: usize },
    #[error("line {line}: `{token}` is not a mass")]
    InvalidMass {
        line: usize,
        token: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("mass table has no unnamed entry to drop")]
    MissingUnnamedEntry,
    #[error("failed to serialize mass record")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to upload mass record to s3://{bucket}/{key}")]
    Upload {
        bucket: String,
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

/// How repeated observations of the same body are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MassPolicy {
    /// Keep the first mass seen for a name and ignore later ones.
    #[default]
    First,
    /// Average every mass seen for a name.
    Mean,
}

/// Averaged mass per body name, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MassRecord {
    entries: Vec<(String, f64)>,
}

impl MassRecord {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, mass)| *mass)
    }

    pub fn remove(&mut self, name: &str) -> Option<f64> {
        let idx = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, mass)| (n.as_str(), *mass))
    }
}

impl Serialize for MassRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, mass) in &self.entries {
            map.serialize_entry(name, mass)?;
        }
        map.end()
    }
}

/// Splits one table line into `(name, mass)`. `line` is 1-based, for errors.
fn parse_line(line: usize, text: &str) -> Result<(String, f64), MassError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err(MassError::MalformedLine { line });
    }

    let mass_idx = tokens.len() - 2;
    let token = tokens[mass_idx];
    let mass = token.parse::<f64>().map_err(|source| MassError::InvalidMass {
        line,
        token: token.to_string(),
        source,
    })?;

    Ok((tokens[..mass_idx].join(" "), mass))
}

/// Folds table lines into a record keyed by name, without any post-processing.
pub fn aggregate_masses<S: AsRef<str>>(
    lines: &[S],
    policy: MassPolicy,
) -> Result<MassRecord, MassError> {
    let mut order: Vec<(String, Vec<f64>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (i, text) in lines.iter().enumerate() {
        let (name, mass) = parse_line(i + 1, text.as_ref())?;

        match index.get(&name) {
            Some(&slot) => {
                if policy == MassPolicy::Mean {
                    order[slot].1.push(mass);
                }
            }
            None => {
                index.insert(name.clone(), order.len());
                order.push((name, vec![mass]));
            }
        }
    }

    let entries = order
        .into_iter()
        .map(|(name, masses)| {
            let avg = masses.iter().sum::<f64>() / masses.len() as f64;
            (name, avg)
        })
        .collect();

    Ok(MassRecord { entries })
}

/// Removes the entry with an empty name. Fails if there isn't one.
pub fn drop_unnamed(mut record: MassRecord) -> Result<MassRecord, MassError> {
    record.remove("").ok_or(MassError::MissingUnnamedEntry)?;
    Ok(record)
}

/// Aggregates table lines and drops the unnamed summary entry.
pub fn parse_mass_lines<S: AsRef<str>>(
    lines: &[S],
    policy: MassPolicy,
) -> Result<MassRecord, MassError> {
    drop_unnamed(aggregate_masses(lines, policy)?)
}

/// Opens the mass table.
pub fn open_masses(path: &Path) -> Outcome<File, MassError> {
    Outcome::attempt(|| {
        File::open(path).map_err(|source| MassError::Open {
            path: path.to_path_buf(),
            source,
        })
    })
}

/// Reads every line of an opened mass table. The file is closed afterwards.
pub fn read_mass_lines(path: &Path, file: File) -> Outcome<Vec<String>, MassError> {
    Outcome::attempt(|| {
        BufReader::new(file)
            .lines()
            .collect::<io::Result<Vec<_>>>()
            .map_err(|source| MassError::Read {
                path: path.to_path_buf(),
                source,
            })
    })
}

pub fn mass_lines_to_record(
    lines: Vec<String>,
    policy: MassPolicy,
) -> Outcome<MassRecord, MassError> {
    Outcome::attempt(|| parse_mass_lines(&lines, policy))
}

/// Compact JSON with a space after every `,` and `:`, e.g. `{"Ceres": 123.45}`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            return Ok(());
        }
        writer.write_all(b", ")
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            return Ok(());
        }
        writer.write_all(b", ")
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b": ")
    }
}

pub fn serialize_masses(record: &MassRecord) -> Outcome<Vec<u8>, MassError> {
    Outcome::attempt(|| {
        let mut json = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut json, SpacedFormatter);
        record.serialize(&mut serializer)?;
        Ok::<_, serde_json::Error>(json)
    })
}

/// Runs the local stages of the masses pipeline: open, read, parse, serialize.
pub fn load_masses(path: &Path, policy: MassPolicy) -> Outcome<Vec<u8>, MassError> {
    open_masses(path)
        .then(|file| read_mass_lines(path, file))
        .then(|lines| mass_lines_to_record(lines, policy))
        .map(|record| {
            debug!(bodies = record.len(), ?policy, "Mass table aggregated");
            record
        })
        .then(|record| serialize_masses(&record))
}
