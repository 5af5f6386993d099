//! Artifact IO
//!
//! Fitted detectors are stored as self-contained JSON artifacts carrying a
//! format version, so a scoring service can refuse files it cannot read.
use crate::constants::{ARTIFACT_FORMAT_VERSION, CRATE_NAME};
use crate::detector::DriftDetector;
use crate::errors::DriftError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Serialize)]
struct ArtifactRef<'a, T> {
    format_version: u32,
    created_by: &'a str,
    detector: &'a T,
}

#[derive(Deserialize)]
struct ArtifactHeader {
    format_version: u32,
}

#[derive(Deserialize)]
struct Artifact<T> {
    detector: T,
}

/// IO
pub trait DetectorIO: DriftDetector + Serialize + DeserializeOwned + Sized {
    /// Save a detector as a json artifact to a file.
    ///
    /// * `path` - Path to save detector.
    fn save_detector<P: AsRef<Path>>(&self, path: P) -> Result<(), DriftError> {
        fs::write(path, self.json_dump()?).map_err(|e| DriftError::UnableToWrite(e.to_string()))
    }

    /// Dump a detector as a json artifact.
    fn json_dump(&self) -> Result<String, DriftError> {
        let artifact = ArtifactRef {
            format_version: ARTIFACT_FORMAT_VERSION,
            created_by: CRATE_NAME,
            detector: self,
        };
        serde_json::to_string(&artifact).map_err(|e| DriftError::UnableToWrite(e.to_string()))
    }

    /// Load a detector from a json artifact string.
    ///
    /// The restored detector is validated before it is returned.
    ///
    /// * `json_str` - Artifact produced by `json_dump`.
    fn from_json(json_str: &str) -> Result<Self, DriftError> {
        let header: ArtifactHeader =
            serde_json::from_str(json_str).map_err(|e| DriftError::UnableToRead(e.to_string()))?;
        if header.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(DriftError::IncompatibleVersion {
                found: header.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        let detector = serde_json::from_str::<Artifact<Self>>(json_str)
            .map(|a| a.detector)
            .map_err(|e| DriftError::UnableToRead(e.to_string()))?;
        detector
            .validate()
            .map_err(|e| DriftError::UnableToRead(format!("invalid detector artifact: {}", e)))?;
        Ok(detector)
    }

    /// Load a detector from a path to a json artifact.
    ///
    /// * `path` - Path to load detector from.
    fn load_detector<P: AsRef<Path>>(path: P) -> Result<Self, DriftError> {
        let json_str = fs::read_to_string(path).map_err(|e| DriftError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}
