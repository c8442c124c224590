//! Errors surfaced by the dataset functions to their invoker.

use std::fmt;

use thiserror::Error;

use crate::event::Dataset;
use crate::masses::MassError;
use crate::outcome::NoOutcomes;
use crate::store::UploadTarget;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("event has no `{0}` dataset")]
    MissingDataset(Dataset),
    #[error("failed to download {dataset} data from {url}")]
    Download {
        dataset: Dataset,
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to convert {dataset} data")]
    Transform {
        dataset: Dataset,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to upload {dataset} data to {target}")]
    Upload {
        dataset: Dataset,
        target: UploadTarget,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Masses(#[from] MassError),
    #[error("no dataset functions were run")]
    NothingRun(#[from] NoOutcomes),
}

/// The pipeline stage an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Event,
    Download,
    /// Opening or reading a local input file.
    Read,
    Transform,
    Upload,
}

impl Stage {
    /// Short message printed by manual invocations.
    pub fn message(self) -> &'static str {
        match self {
            Stage::Event => "Bad event.",
            Stage::Download => "HTTP failed.",
            Stage::Read => "Read failed.",
            Stage::Transform => "Parse failed.",
            Stage::Upload => "Upload failed.",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Event => "event",
            Stage::Download => "download",
            Stage::Read => "read",
            Stage::Transform => "transform",
            Stage::Upload => "upload",
        };
        f.write_str(name)
    }
}

impl HandlerError {
    pub fn stage(&self) -> Stage {
        match self {
            HandlerError::MissingDataset(_) | HandlerError::NothingRun(_) => Stage::Event,
            HandlerError::Download { .. } => Stage::Download,
            HandlerError::Transform { .. } => Stage::Transform,
            HandlerError::Upload { .. } => Stage::Upload,
            HandlerError::Masses(err) => match err {
                MassError::Open { .. } | MassError::Read { .. } => Stage::Read,
                MassError::Upload { .. } => Stage::Upload,
                MassError::MalformedLine { .. }
                | MassError::InvalidMass { .. }
                | MassError::MissingUnnamedEntry
                | MassError::Serialize(_) => Stage::Transform,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_of_mass_errors() {
        let open = HandlerError::from(MassError::Open {
            path: "masses.txt".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert_eq!(open.stage(), Stage::Read);
        assert_eq!(open.stage().message(), "Read failed.");

        let missing = HandlerError::from(MassError::MissingUnnamedEntry);
        assert_eq!(missing.stage(), Stage::Transform);
        assert_eq!(missing.to_string(), "mass table has no unnamed entry to drop");
    }

    #[test]
    fn test_download_and_upload_are_distinct() {
        let download = HandlerError::Download {
            dataset: Dataset::Exoplanets,
            url: "http://example.org".to_string(),
            source: anyhow::anyhow!("connection refused"),
        };
        let upload = HandlerError::Upload {
            dataset: Dataset::Exoplanets,
            target: UploadTarget::new("asteroid-files", "exoplanet.csv"),
            source: anyhow::anyhow!("access denied"),
        };

        assert_eq!(download.stage(), Stage::Download);
        assert_eq!(upload.stage(), Stage::Upload);
        assert_eq!(download.stage().message(), "HTTP failed.");
        assert_eq!(
            upload.to_string(),
            "failed to upload exoplanets data to s3://asteroid-files/exoplanet.csv"
        );
    }
}
