//! Detector
//!
//! The common capability of every drift detector, a configuration-selected
//! [`Detector`] that wraps either strategy, and the result they produce.
pub mod config;
pub mod io;
pub mod setters;

pub use config::{DetectorConfig, DriftMethod};
pub use io::DetectorIO;

use crate::data::Matrix;
use crate::drift::ks::{KsDrift, KsResult};
use crate::drift::mmd::{MmdDrift, MmdResult};
use crate::errors::DriftError;
use serde::{Deserialize, Serialize};

/// Fit once on a reference, then score any number of batches against it.
///
/// Scoring never mutates the detector, so a fitted detector can be shared
/// between threads.
pub trait DriftDetector: Send + Sync {
    /// Compute the reference statistics.
    ///
    /// * `reference` - Baseline data, one row per sample.
    /// * `cfg` - Detector configuration.
    fn fit(reference: &Matrix<f64>, cfg: &DetectorConfig) -> Result<Self, DriftError>
    where
        Self: Sized;

    /// Number of raw features expected in a batch.
    fn n_features(&self) -> usize;

    /// Configured significance threshold.
    fn p_val(&self) -> f64;

    /// Score a batch against the reference.
    fn score(&self, batch: &Matrix<f64>) -> Result<DriftResult, DriftError>;

    /// Whether the batch has drifted.
    fn predict(&self, batch: &Matrix<f64>) -> Result<bool, DriftError> {
        Ok(self.score(batch)?.is_drift())
    }

    /// Check that the fitted state is consistent, e.g. after restoring an artifact.
    fn validate(&self) -> Result<(), DriftError>;
}

/// Result of a single scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DriftResult {
    Mmd(MmdResult),
    Ks(KsResult),
}

impl DriftResult {
    pub fn is_drift(&self) -> bool {
        match self {
            DriftResult::Mmd(r) => r.is_drift,
            DriftResult::Ks(r) => r.is_drift,
        }
    }

    /// The MMD p-value, or the per-feature KS p-values.
    pub fn p_values(&self) -> &[f64] {
        match self {
            DriftResult::Mmd(r) => std::slice::from_ref(&r.p_value),
            DriftResult::Ks(r) => &r.p_values,
        }
    }

    /// The MMD distance, or the per-feature KS statistics.
    pub fn distances(&self) -> &[f64] {
        match self {
            DriftResult::Mmd(r) => std::slice::from_ref(&r.distance),
            DriftResult::Ks(r) => &r.distances,
        }
    }

    /// Threshold the p-values were compared against, after any correction.
    pub fn threshold(&self) -> f64 {
        match self {
            DriftResult::Mmd(r) => r.threshold,
            DriftResult::Ks(r) => r.threshold,
        }
    }
}

/// A fitted detector of either kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Detector {
    Mmd(MmdDrift),
    Ks(KsDrift),
}

impl Detector {
    pub fn method(&self) -> DriftMethod {
        match self {
            Detector::Mmd(_) => DriftMethod::Mmd,
            Detector::Ks(_) => DriftMethod::Ks,
        }
    }
}

impl DriftDetector for Detector {
    fn fit(reference: &Matrix<f64>, cfg: &DetectorConfig) -> Result<Self, DriftError> {
        match cfg.method {
            DriftMethod::Mmd => MmdDrift::fit(reference, cfg).map(Detector::Mmd),
            DriftMethod::Ks => KsDrift::fit(reference, cfg).map(Detector::Ks),
        }
    }

    fn n_features(&self) -> usize {
        match self {
            Detector::Mmd(d) => d.n_features(),
            Detector::Ks(d) => d.n_features(),
        }
    }

    fn p_val(&self) -> f64 {
        match self {
            Detector::Mmd(d) => d.p_val(),
            Detector::Ks(d) => d.p_val(),
        }
    }

    fn score(&self, batch: &Matrix<f64>) -> Result<DriftResult, DriftError> {
        match self {
            Detector::Mmd(d) => d.score(batch),
            Detector::Ks(d) => d.score(batch),
        }
    }

    fn validate(&self) -> Result<(), DriftError> {
        match self {
            Detector::Mmd(d) => d.validate(),
            Detector::Ks(d) => d.validate(),
        }
    }
}

impl DetectorIO for Detector {}
impl DetectorIO for MmdDrift {}
impl DetectorIO for KsDrift {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DenseMatrix;
    use crate::errors::ErrorKind;
    use crate::preprocess::PreprocessConfig;
    use tempfile::tempdir;

    fn reference() -> DenseMatrix {
        let rows: Vec<Vec<f64>> = (0..40).map(|i| vec![(i % 7) as f64, (i % 5) as f64 * 0.5]).collect();
        DenseMatrix::from_rows(&rows).unwrap()
    }

    fn shifted() -> DenseMatrix {
        let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![(i % 7) as f64 + 6.0, (i % 5) as f64]).collect();
        DenseMatrix::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_fit_dispatch() {
        let x_ref = reference();
        for method in [DriftMethod::Mmd, DriftMethod::Ks] {
            let detector = Detector::fit(&x_ref.view(), &DetectorConfig::default().set_method(method)).unwrap();
            assert_eq!(detector.method(), method);
            assert_eq!(detector.n_features(), 2);
            assert_eq!(detector.p_val(), 0.05);
            assert!(!detector.predict(&x_ref.view()).unwrap());
            assert!(detector.predict(&shifted().view()).unwrap());
        }
    }

    #[test]
    fn test_result_accessors() {
        let x_ref = reference();
        let ks = Detector::fit(&x_ref.view(), &DetectorConfig::default().set_method(DriftMethod::Ks)).unwrap();
        let res = ks.score(&shifted().view()).unwrap();
        assert_eq!(res.p_values().len(), 2);
        assert_eq!(res.distances().len(), 2);
        assert_eq!(res.threshold(), 0.025);

        let mmd = Detector::fit(&x_ref.view(), &DetectorConfig::default()).unwrap();
        let res = mmd.score(&shifted().view()).unwrap();
        assert_eq!(res.p_values().len(), 1);
        assert_eq!(res.threshold(), 0.05);
    }

    #[test]
    fn test_round_trip() {
        let x_ref = reference();
        let batch = shifted();
        let cfg = DetectorConfig::default()
            .set_seed(17)
            .set_preprocess(Some(PreprocessConfig::Standardize));
        for method in [DriftMethod::Mmd, DriftMethod::Ks] {
            let detector = Detector::fit(&x_ref.view(), &cfg.clone().set_method(method)).unwrap();
            let json = detector.json_dump().unwrap();
            let restored = Detector::from_json(&json).unwrap();
            assert_eq!(detector, restored);
            assert_eq!(
                detector.score(&batch.view()).unwrap(),
                restored.score(&batch.view()).unwrap()
            );
        }
    }

    #[test]
    fn test_round_trip_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("detector.json");
        let detector = Detector::fit(&reference().view(), &DetectorConfig::default()).unwrap();
        detector.save_detector(&path).unwrap();
        let restored = Detector::load_detector(&path).unwrap();
        assert_eq!(detector, restored);

        let missing = Detector::load_detector(dir.path().join("missing.json"));
        assert_eq!(missing.unwrap_err().kind(), ErrorKind::Serialization);
    }

    #[test]
    fn test_incompatible_version() {
        let detector = Detector::fit(&reference().view(), &DetectorConfig::default()).unwrap();
        let json = detector.json_dump().unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["format_version"] = serde_json::json!(99);
        let err = Detector::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, DriftError::IncompatibleVersion { found: 99, .. }));

        let err = Detector::from_json("{not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    fn tampered(method: DriftMethod, edit: impl Fn(&mut serde_json::Value)) -> Result<Detector, DriftError> {
        let cfg = DetectorConfig::default().set_method(method);
        let detector = Detector::fit(&reference().view(), &cfg).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&detector.json_dump().unwrap()).unwrap();
        edit(&mut value["detector"]);
        Detector::from_json(&value.to_string())
    }

    #[test]
    fn test_corrupted_artifact_rejected() {
        let mmd_edits: Vec<Box<dyn Fn(&mut serde_json::Value)>> = vec![
            Box::new(|d: &mut serde_json::Value| d["Mmd"]["n_permutations"] = serde_json::json!(0)),
            Box::new(|d: &mut serde_json::Value| d["Mmd"]["x_ref"]["rows"] = serde_json::json!(0)),
            Box::new(|d: &mut serde_json::Value| d["Mmd"]["x_ref"]["rows"] = serde_json::json!(7)),
            Box::new(|d: &mut serde_json::Value| d["Mmd"]["p_val"] = serde_json::json!(1.5)),
            Box::new(|d: &mut serde_json::Value| d["Mmd"]["kernel"]["sigma"] = serde_json::json!(0.0)),
            Box::new(|d: &mut serde_json::Value| d["Mmd"]["n_features"] = serde_json::json!(5)),
        ];
        for edit in mmd_edits {
            let err = tampered(DriftMethod::Mmd, edit).unwrap_err();
            assert!(matches!(err, DriftError::UnableToRead(_)), "{}", err);
        }

        let ks_edits: Vec<Box<dyn Fn(&mut serde_json::Value)>> = vec![
            Box::new(|d: &mut serde_json::Value| d["Ks"]["x_ref_sorted"] = serde_json::json!([])),
            Box::new(|d: &mut serde_json::Value| d["Ks"]["x_ref_sorted"][0] = serde_json::json!([1.0])),
            Box::new(|d: &mut serde_json::Value| d["Ks"]["n_features"] = serde_json::json!(3)),
        ];
        for edit in ks_edits {
            let err = tampered(DriftMethod::Ks, edit).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Serialization);
        }

        assert!(tampered(DriftMethod::Mmd, |_: &mut serde_json::Value| {}).is_ok());
        assert!(tampered(DriftMethod::Ks, |_: &mut serde_json::Value| {}).is_ok());
    }
}
