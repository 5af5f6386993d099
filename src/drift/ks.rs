//! Kolmogorov-Smirnov
//!
//! Univariate two-sample tests, one per (encoded) feature, aggregated with a
//! multiple-comparison correction.
use crate::data::{DenseMatrix, Matrix};
use crate::detector::{DetectorConfig, DriftDetector, DriftResult};
use crate::drift::stats::{correct, ks_2samp, Alternative, Correction};
use crate::errors::DriftError;
use crate::preprocess::Preprocessor;
use crate::utils::{fmt_vec_output, sort_floats, validate_open_interval};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome of one KS scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KsResult {
    /// True when any feature p-value falls below `threshold`.
    pub is_drift: bool,
    /// Per-feature p-values, in feature order.
    pub p_values: Vec<f64>,
    /// Per-feature KS statistics.
    pub distances: Vec<f64>,
    /// Per-feature decision against the corrected threshold.
    pub feature_drift: Vec<bool>,
    /// Corrected threshold.
    pub threshold: f64,
    pub correction: Correction,
}

/// Feature-wise Kolmogorov-Smirnov drift detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KsDrift {
    pub p_val: f64,
    pub correction: Correction,
    pub alternative: Alternative,
    pub parallel: bool,
    /// Number of raw features expected in every batch.
    pub n_features: usize,
    pub preprocessor: Option<Preprocessor>,
    /// Reference values per encoded feature, sorted ascending.
    x_ref_sorted: Vec<Vec<f64>>,
}

fn sorted_columns(m: &DenseMatrix) -> Vec<Vec<f64>> {
    (0..m.cols)
        .map(|j| {
            let mut col = m.col(j).to_vec();
            sort_floats(&mut col);
            col
        })
        .collect()
}

impl KsDrift {
    /// Sorted reference values of every encoded feature.
    pub fn reference(&self) -> &[Vec<f64>] {
        &self.x_ref_sorted
    }

    /// Number of rows in the reference sample.
    pub fn n_reference(&self) -> usize {
        self.x_ref_sorted.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Score a batch and return the per-feature breakdown.
    pub fn score_ks(&self, batch: &Matrix<f64>) -> Result<KsResult, DriftError> {
        batch.validate("batch")?;
        batch.validate_cols(self.n_features, "batch")?;
        let x = match &self.preprocessor {
            Some(p) => p.transform(batch)?,
            None => DenseMatrix::from_matrix(batch),
        };
        let x_sorted = sorted_columns(&x);

        let test = |(r, b): (&Vec<f64>, &Vec<f64>)| ks_2samp(r, b, self.alternative);
        let (distances, p_values): (Vec<f64>, Vec<f64>) = if self.parallel {
            self.x_ref_sorted.par_iter().zip(x_sorted.par_iter()).map(test).unzip()
        } else {
            self.x_ref_sorted.iter().zip(x_sorted.iter()).map(test).unzip()
        };

        let (is_drift, threshold) = correct(self.correction, &p_values, self.p_val);
        let feature_drift = p_values.iter().map(|&p| p < threshold).collect();
        debug!(
            "KS batch of {} rows: p-values [{}], threshold {:.6}, drift {}",
            batch.rows,
            fmt_vec_output(&p_values),
            threshold,
            is_drift
        );
        Ok(KsResult {
            is_drift,
            p_values,
            distances,
            feature_drift,
            threshold,
            correction: self.correction,
        })
    }
}

impl DriftDetector for KsDrift {
    fn fit(reference: &Matrix<f64>, cfg: &DetectorConfig) -> Result<Self, DriftError> {
        cfg.validate()?;
        reference.validate("reference")?;
        let preprocessor = cfg.preprocess.as_ref().map(|p| p.fit(reference)).transpose()?;
        let x_ref = match &preprocessor {
            Some(p) => p.transform(reference)?,
            None => DenseMatrix::from_matrix(reference),
        };
        info!(
            "Fitted KS detector on {} reference rows ({} features, {} encoded), correction {:?}",
            reference.rows, reference.cols, x_ref.cols, cfg.correction
        );
        Ok(KsDrift {
            p_val: cfg.p_val,
            correction: cfg.correction,
            alternative: cfg.alternative,
            parallel: cfg.parallel,
            n_features: reference.cols,
            preprocessor,
            x_ref_sorted: sorted_columns(&x_ref),
        })
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn p_val(&self) -> f64 {
        self.p_val
    }

    fn score(&self, batch: &Matrix<f64>) -> Result<DriftResult, DriftError> {
        self.score_ks(batch).map(DriftResult::Ks)
    }

    fn validate(&self) -> Result<(), DriftError> {
        validate_open_interval(self.p_val, 0.0, 1.0, "p_val")?;
        let encoded = match &self.preprocessor {
            Some(p) => p.validate(self.n_features)?,
            None => self.n_features,
        };
        if encoded == 0 || self.x_ref_sorted.len() != encoded {
            return Err(DriftError::InvalidInput(format!(
                "reference holds {} features, expected {}",
                self.x_ref_sorted.len(),
                encoded
            )));
        }
        let n_ref = self.n_reference();
        for (j, col) in self.x_ref_sorted.iter().enumerate() {
            if col.is_empty() || col.len() != n_ref {
                return Err(DriftError::InvalidInput(format!(
                    "reference feature {} holds {} values, expected {}",
                    j,
                    col.len(),
                    n_ref
                )));
            }
            if col.iter().any(|v| !v.is_finite()) || col.windows(2).any(|w| w[0] > w[1]) {
                return Err(DriftError::InvalidInput(format!(
                    "reference feature {} is not a sorted sequence of finite values",
                    j
                )));
            }
        }
        Ok(())
    }
}
