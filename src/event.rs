//! Invocation event passed to each function by the orchestrating workflow.
//!
//! ```json
//! {
//!   "bucketName": "asteroid-files",
//!   "benner":     { "url": "https://…", "filename": "benner.csv" },
//!   "exoplanets": { "url": "https://…", "filename": "exoplanet.csv" },
//!   "masses":     { "filename": "massd.json", "path": "masses.txt", "policy": "first" }
//! }
//! ```
//!
//! Every function reads `bucketName` plus its own dataset object and ignores
//! the rest, so the workflow can pass one event through all of its steps.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::masses::MassPolicy;

pub const DEFAULT_BUCKET: &str = "asteroid-files";
pub const DEFAULT_MASSES_PATH: &str = "masses.txt";
pub const EXOPLANET_ARCHIVE_URL: &str = "http://exoplanetarchive.ipac.caltech.edu/cgi-bin/nstedAPI/nph-nstedAPI?table=cumulative&select=koi_sma,kepoi_name,koi_eccen,koi_incl,koi_longp,koi_period,koi_prad,koi_teq,koi_srad,koi_steff,koi_sage,koi_disposition,koi_pdisposition";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Benner,
    Exoplanets,
    Masses,
}

impl Dataset {
    pub fn name(self) -> &'static str {
        match self {
            Dataset::Benner => "benner",
            Dataset::Exoplanets => "exoplanets",
            Dataset::Masses => "masses",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dataset downloaded from `url` and stored under `filename`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteDataset {
    pub url: String,
    pub filename: String,
}

/// The mass table, read from a local `path` and stored under `filename`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MassesDataset {
    pub filename: String,
    #[serde(default = "default_masses_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub policy: MassPolicy,
}

fn default_masses_path() -> PathBuf {
    PathBuf::from(DEFAULT_MASSES_PATH)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub bucket_name: String,
    #[serde(default)]
    pub benner: Option<RemoteDataset>,
    #[serde(default)]
    pub exoplanets: Option<RemoteDataset>,
    #[serde(default)]
    pub masses: Option<MassesDataset>,
}

impl Event {
    /// Loads an event from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read event file {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("event is not valid JSON for this function")
    }

    /// The event used for manual invocations when none is supplied.
    ///
    /// There is no default Benner source, so `benner` is left unset.
    pub fn sample() -> Self {
        Self {
            bucket_name: DEFAULT_BUCKET.to_string(),
            benner: None,
            exoplanets: Some(RemoteDataset {
                url: EXOPLANET_ARCHIVE_URL.to_string(),
                filename: "exoplanet.csv".to_string(),
            }),
            masses: Some(MassesDataset {
                filename: "massd.json".to_string(),
                path: default_masses_path(),
                policy: MassPolicy::default(),
            }),
        }
    }
}
