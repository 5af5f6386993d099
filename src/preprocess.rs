//! Preprocessing
//!
//! Deterministic encoders applied to the reference once at fit time and to every
//! scored batch afterwards. A [`PreprocessConfig`] is fitted into a [`Preprocessor`],
//! which holds every learned parameter so it serializes with the detector.
use crate::data::{DenseMatrix, Matrix};
use crate::errors::DriftError;
use crate::utils::validate_positive_usize_parameter;
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Unfitted preprocessing step.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub enum PreprocessConfig {
    /// Center every feature on its reference mean and divide by its reference standard deviation.
    Standardize,
    /// Project onto `n_components` dimensions with a seeded Gaussian random matrix.
    RandomProjection { n_components: usize, seed: u64 },
    /// Apply the steps in order, each fitted on the output of the previous one.
    Chain(Vec<PreprocessConfig>),
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<(), DriftError> {
        match self {
            PreprocessConfig::Standardize => Ok(()),
            PreprocessConfig::RandomProjection { n_components, .. } => {
                validate_positive_usize_parameter(*n_components, "n_components")
            }
            PreprocessConfig::Chain(steps) => {
                if steps.is_empty() {
                    return Err(DriftError::InvalidParameter(
                        "preprocess".to_string(),
                        "at least one step in a chain".to_string(),
                        "empty chain".to_string(),
                    ));
                }
                steps.iter().try_for_each(|s| s.validate())
            }
        }
    }

    /// Fit the step on the reference data.
    pub fn fit(&self, data: &Matrix<f64>) -> Result<Preprocessor, DriftError> {
        self.validate()?;
        data.validate("reference")?;
        match self {
            PreprocessConfig::Standardize => Ok(fit_standardize(data)),
            PreprocessConfig::RandomProjection { n_components, seed } => {
                fit_random_projection(data.cols, *n_components, *seed)
            }
            PreprocessConfig::Chain(steps) => {
                let mut fitted = Vec::with_capacity(steps.len());
                let mut current = DenseMatrix::from_matrix(data);
                for step in steps {
                    let p = step.fit(&current.view())?;
                    current = p.transform(&current.view())?;
                    fitted.push(p);
                }
                Ok(Preprocessor::Chain(fitted))
            }
        }
    }
}

/// Fitted preprocessing step.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub enum Preprocessor {
    Standardize { mean: Vec<f64>, scale: Vec<f64> },
    /// `weights` has one row per input feature and one column per component.
    RandomProjection { weights: DenseMatrix },
    Chain(Vec<Preprocessor>),
}

fn fit_standardize(data: &Matrix<f64>) -> Preprocessor {
    let n = data.rows as f64;
    let (mean, scale) = (0..data.cols)
        .map(|j| {
            let col = data.get_col(j);
            let m = col.iter().sum::<f64>() / n;
            let var = col.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n;
            let sd = var.sqrt();
            (m, if sd > 0.0 { sd } else { 1.0 })
        })
        .unzip();
    Preprocessor::Standardize { mean, scale }
}

fn fit_random_projection(n_features: usize, n_components: usize, seed: u64) -> Result<Preprocessor, DriftError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let scale = 1.0 / (n_components as f64).sqrt();
    let normal = Normal::new(0.0, scale).map_err(|e| {
        DriftError::InvalidParameter("n_components".to_string(), "positive integer".to_string(), e.to_string())
    })?;
    let data = normal.sample_iter(&mut rng).take(n_features * n_components).collect();
    debug!("Drew {} x {} random projection", n_features, n_components);
    Ok(Preprocessor::RandomProjection {
        weights: DenseMatrix::new(data, n_features, n_components),
    })
}

impl Preprocessor {
    /// Number of features produced for an input with `input_dim` features.
    pub fn output_dim(&self, input_dim: usize) -> usize {
        match self {
            Preprocessor::Standardize { .. } => input_dim,
            Preprocessor::RandomProjection { weights } => weights.cols,
            Preprocessor::Chain(steps) => steps.iter().fold(input_dim, |d, s| s.output_dim(d)),
        }
    }

    /// Check the fitted parameters against an input with `input_dim` features.
    /// Returns the output dimension.
    pub fn validate(&self, input_dim: usize) -> Result<usize, DriftError> {
        match self {
            Preprocessor::Standardize { mean, scale } => {
                if mean.len() != input_dim || scale.len() != input_dim {
                    return Err(DriftError::InvalidInput(format!(
                        "standardize step holds {} means and {} scales for {} features",
                        mean.len(),
                        scale.len(),
                        input_dim
                    )));
                }
                if mean.iter().any(|m| !m.is_finite()) || scale.iter().any(|v| !v.is_finite() || *v <= 0.0) {
                    return Err(DriftError::InvalidInput(
                        "standardize step holds a non-finite mean or a non-positive scale".to_string(),
                    ));
                }
                Ok(input_dim)
            }
            Preprocessor::RandomProjection { weights } => {
                weights.view().validate("projection weights")?;
                if weights.rows != input_dim {
                    return Err(DriftError::InvalidInput(format!(
                        "projection weights expect {} features, got {}",
                        weights.rows, input_dim
                    )));
                }
                Ok(weights.cols)
            }
            Preprocessor::Chain(steps) => {
                if steps.is_empty() {
                    return Err(DriftError::InvalidInput("empty preprocessing chain".to_string()));
                }
                steps.iter().try_fold(input_dim, |d, s| s.validate(d))
            }
        }
    }

    /// Encode a batch.
    pub fn transform(&self, data: &Matrix<f64>) -> Result<DenseMatrix, DriftError> {
        match self {
            Preprocessor::Standardize { mean, scale } => {
                data.validate_cols(mean.len(), "preprocessor input")?;
                let mut out = Vec::with_capacity(data.rows * data.cols);
                for j in 0..data.cols {
                    out.extend(data.get_col(j).iter().map(|v| (v - mean[j]) / scale[j]));
                }
                Ok(DenseMatrix::new(out, data.rows, data.cols))
            }
            Preprocessor::RandomProjection { weights } => {
                data.validate_cols(weights.rows, "preprocessor input")?;
                let mut out = vec![0.0; data.rows * weights.cols];
                for (k, out_col) in out.chunks_mut(data.rows.max(1)).enumerate().take(weights.cols) {
                    let w = weights.col(k);
                    for (j, w_jk) in w.iter().enumerate() {
                        for (o, x) in out_col.iter_mut().zip(data.get_col(j)) {
                            *o += x * w_jk;
                        }
                    }
                }
                Ok(DenseMatrix::new(out, data.rows, weights.cols))
            }
            Preprocessor::Chain(steps) => {
                let mut current = DenseMatrix::from_matrix(data);
                for step in steps {
                    current = step.transform(&current.view())?;
                }
                Ok(current)
            }
        }
    }
}
