//! Maximum Mean Discrepancy
//!
//! Multivariate kernel two-sample test. The significance of the observed
//! statistic is estimated with a permutation test over the pooled sample.
use crate::constants::MIN_SAMPLES_MMD;
use crate::data::{DenseMatrix, Matrix};
use crate::detector::{DetectorConfig, DriftDetector, DriftResult};
use crate::errors::DriftError;
use crate::kernel::GaussianRbf;
use crate::preprocess::Preprocessor;
use crate::sampler::{PermutationSampler, Sampler};
use crate::utils::{
    quantile_sorted, sort_floats, validate_open_interval, validate_positive_float_parameter,
    validate_positive_usize_parameter,
};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome of one MMD scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MmdResult {
    pub is_drift: bool,
    /// Fraction of permuted statistics at least as large as the observed one.
    pub p_value: f64,
    /// Significance threshold the p-value is compared against.
    pub threshold: f64,
    /// Observed squared MMD.
    pub distance: f64,
    /// (1 - threshold) quantile of the permuted statistics.
    pub distance_threshold: f64,
    /// Kernel length-scale used.
    pub sigma: f64,
}

/// Kernel MMD drift detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MmdDrift {
    pub p_val: f64,
    pub n_permutations: usize,
    pub seed: u64,
    pub num_threads: Option<usize>,
    pub parallel: bool,
    /// Number of raw features expected in every batch.
    pub n_features: usize,
    pub kernel: GaussianRbf,
    pub preprocessor: Option<Preprocessor>,
    x_ref: DenseMatrix,
}

impl MmdDrift {
    /// Encoded reference sample.
    pub fn reference(&self) -> &DenseMatrix {
        &self.x_ref
    }

    fn encode(&self, batch: &Matrix<f64>) -> Result<DenseMatrix, DriftError> {
        match &self.preprocessor {
            Some(p) => p.transform(batch),
            None => Ok(DenseMatrix::from_matrix(batch)),
        }
    }

    fn permutation_test(&self, kernel_matrix: &[f64], n_ref: usize, n_total: usize) -> (f64, Vec<f64>) {
        let mut observed_in_x = vec![false; n_total];
        observed_in_x[..n_ref].iter_mut().for_each(|v| *v = true);
        let observed = mmd2_from_kernel_matrix(kernel_matrix, &observed_in_x);

        let index: Vec<usize> = (0..n_total).collect();
        // Each permutation owns its generator, so the statistics do not depend
        // on how the work is scheduled.
        let permuted = |p: usize| -> f64 {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(p as u64));
            let (x_idx, _) = PermutationSampler::new(n_ref).sample(&mut rng, &index);
            let mut in_x = vec![false; n_total];
            x_idx.into_iter().for_each(|i| in_x[i] = true);
            mmd2_from_kernel_matrix(kernel_matrix, &in_x)
        };
        let stats: Vec<f64> = if self.parallel {
            (0..self.n_permutations).into_par_iter().map(permuted).collect()
        } else {
            (0..self.n_permutations).map(permuted).collect()
        };
        (observed, stats)
    }

    fn score_encoded(&self, x: &DenseMatrix) -> MmdResult {
        let n_ref = self.x_ref.rows;
        let n_total = n_ref + x.rows;
        let mut pooled = self.x_ref.to_rows();
        pooled.extend(x.to_rows());
        let kernel_matrix = self.kernel.matrix(&pooled, self.parallel);

        let (observed, mut stats) = self.permutation_test(&kernel_matrix, n_ref, n_total);
        let n_above = stats.iter().filter(|&&s| s >= observed).count();
        let p_value = n_above as f64 / stats.len() as f64;
        sort_floats(&mut stats);
        let distance_threshold = quantile_sorted(&stats, 1.0 - self.p_val);

        MmdResult {
            is_drift: p_value < self.p_val,
            p_value,
            threshold: self.p_val,
            distance: observed,
            distance_threshold,
            sigma: self.kernel.sigma,
        }
    }

    /// Score a batch and return the full MMD result.
    pub fn score_mmd(&self, batch: &Matrix<f64>) -> Result<MmdResult, DriftError> {
        batch.validate("batch")?;
        batch.validate_cols(self.n_features, "batch")?;
        if batch.rows < MIN_SAMPLES_MMD {
            return Err(DriftError::InvalidInput(format!(
                "batch has {} rows, the MMD estimate needs at least {}",
                batch.rows, MIN_SAMPLES_MMD
            )));
        }
        let x = self.encode(batch)?;

        let result = match self.num_threads {
            Some(n) if self.parallel => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| DriftError::ThreadPool(e.to_string()))?;
                pool.install(|| self.score_encoded(&x))
            }
            _ => self.score_encoded(&x),
        };
        debug!(
            "MMD batch of {} rows: distance {:.6}, p-value {:.4}, drift {}",
            batch.rows, result.distance, result.p_value, result.is_drift
        );
        Ok(result)
    }
}

impl DriftDetector for MmdDrift {
    fn fit(reference: &Matrix<f64>, cfg: &DetectorConfig) -> Result<Self, DriftError> {
        cfg.validate()?;
        reference.validate("reference")?;
        if reference.rows < MIN_SAMPLES_MMD {
            return Err(DriftError::InvalidInput(format!(
                "reference has {} rows, the MMD estimate needs at least {}",
                reference.rows, MIN_SAMPLES_MMD
            )));
        }
        let min_permutations = (1.0 / cfg.p_val).ceil() as usize;
        if cfg.n_permutations < min_permutations {
            warn!(
                "{} permutations cannot resolve a p-value threshold of {}, use at least {}.",
                cfg.n_permutations, cfg.p_val, min_permutations
            );
        }

        let preprocessor = cfg.preprocess.as_ref().map(|p| p.fit(reference)).transpose()?;
        let x_ref = match &preprocessor {
            Some(p) => p.transform(reference)?,
            None => DenseMatrix::from_matrix(reference),
        };
        let kernel = GaussianRbf::from_reference(cfg.bandwidth, &x_ref.view(), cfg.seed)?;
        info!(
            "Fitted MMD detector on {} reference rows ({} features, {} encoded), sigma {:.6}",
            reference.rows, reference.cols, x_ref.cols, kernel.sigma
        );

        Ok(MmdDrift {
            p_val: cfg.p_val,
            n_permutations: cfg.n_permutations,
            seed: cfg.seed,
            num_threads: cfg.num_threads,
            parallel: cfg.parallel,
            n_features: reference.cols,
            kernel,
            preprocessor,
            x_ref,
        })
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn p_val(&self) -> f64 {
        self.p_val
    }

    fn score(&self, batch: &Matrix<f64>) -> Result<DriftResult, DriftError> {
        self.score_mmd(batch).map(DriftResult::Mmd)
    }

    fn validate(&self) -> Result<(), DriftError> {
        validate_open_interval(self.p_val, 0.0, 1.0, "p_val")?;
        validate_positive_usize_parameter(self.n_permutations, "n_permutations")?;
        if let Some(n) = self.num_threads {
            validate_positive_usize_parameter(n, "num_threads")?;
        }
        validate_positive_float_parameter(self.kernel.sigma, "sigma")?;
        let x_ref = self.x_ref.view();
        x_ref.validate("reference")?;
        if x_ref.rows < MIN_SAMPLES_MMD {
            return Err(DriftError::InvalidInput(format!(
                "reference has {} rows, the MMD estimate needs at least {}",
                x_ref.rows, MIN_SAMPLES_MMD
            )));
        }
        let encoded = match &self.preprocessor {
            Some(p) => p.validate(self.n_features)?,
            None => self.n_features,
        };
        x_ref.validate_cols(encoded, "reference")
    }
}

/// Unbiased squared MMD from a pooled kernel matrix.
///
/// * `kernel_matrix` - Row-major kernel matrix over the pooled sample.
/// * `in_x` - Membership of every pooled row in the first sample.
///   Each sample needs at least two rows.
pub fn mmd2_from_kernel_matrix(kernel_matrix: &[f64], in_x: &[bool]) -> f64 {
    let total = in_x.len();
    let n = in_x.iter().filter(|&&b| b).count() as f64;
    let m = total as f64 - n;
    let (mut k_xx, mut k_yy, mut k_xy) = (0.0, 0.0, 0.0);
    for i in 0..total {
        let row = &kernel_matrix[i * total..(i + 1) * total];
        for j in (i + 1)..total {
            match (in_x[i], in_x[j]) {
                (true, true) => k_xx += row[j],
                (false, false) => k_yy += row[j],
                _ => k_xy += row[j],
            }
        }
    }
    2.0 * k_xx / (n * (n - 1.0)) + 2.0 * k_yy / (m * (m - 1.0)) - 2.0 * k_xy / (n * m)
}
