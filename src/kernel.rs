//! Kernel
//!
//! Gaussian radial basis function kernel and the rules used to pick its length-scale.
use crate::constants::MAX_BANDWIDTH_SAMPLES;
use crate::data::Matrix;
use crate::errors::DriftError;
use crate::sampler::{Sampler, SubsetSampler};
use crate::utils::{median, squared_distance, validate_positive_float_parameter};
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How the kernel length-scale is chosen.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug, Default)]
pub enum Bandwidth {
    /// sigma^2 is half the median pairwise squared distance between reference rows.
    #[default]
    Median,
    /// Use the given sigma as is.
    Fixed(f64),
}

/// k(x, y) = exp(-||x - y||^2 / (2 sigma^2))
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct GaussianRbf {
    pub sigma: f64,
}

impl GaussianRbf {
    /// Create a kernel with a fixed length-scale.
    pub fn new(sigma: f64) -> Result<Self, DriftError> {
        validate_positive_float_parameter(sigma, "sigma")?;
        Ok(GaussianRbf { sigma })
    }

    /// Create a kernel whose length-scale is derived from the reference rows.
    ///
    /// * `bandwidth` - Rule used to pick sigma.
    /// * `reference` - Reference data, already encoded.
    /// * `seed` - Seed for the row subset used by the median heuristic.
    pub fn from_reference(bandwidth: Bandwidth, reference: &Matrix<f64>, seed: u64) -> Result<Self, DriftError> {
        match bandwidth {
            Bandwidth::Fixed(sigma) => GaussianRbf::new(sigma),
            Bandwidth::Median => GaussianRbf::new(median_heuristic(reference, MAX_BANDWIDTH_SAMPLES, seed)),
        }
    }

    #[inline]
    pub fn eval(&self, a: &[f64], b: &[f64]) -> f64 {
        (-squared_distance(a, b) / (2.0 * self.sigma * self.sigma)).exp()
    }

    /// Full kernel matrix of the rows, flattened row by row.
    pub fn matrix(&self, rows: &[Vec<f64>], parallel: bool) -> Vec<f64> {
        let n = rows.len();
        let mut k = vec![0.0; n * n];
        let fill = |(i, out): (usize, &mut [f64])| {
            for (j, v) in out.iter_mut().enumerate() {
                *v = self.eval(&rows[i], &rows[j]);
            }
        };
        if n == 0 {
            return k;
        }
        if parallel {
            k.par_chunks_mut(n).enumerate().for_each(fill);
        } else {
            k.chunks_mut(n).enumerate().for_each(fill);
        }
        k
    }
}

/// Median heuristic for the RBF length-scale.
///
/// Uses at most `max_samples` rows, picked with a seeded subset sampler. Falls back
/// to 1.0 when the median distance is zero, which happens for constant data.
pub fn median_heuristic(reference: &Matrix<f64>, max_samples: usize, seed: u64) -> f64 {
    let index: Vec<usize> = (0..reference.rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    let (chosen, _) = SubsetSampler::new(max_samples).sample(&mut rng, &index);
    let rows: Vec<Vec<f64>> = chosen.iter().map(|&i| reference.get_row(i)).collect();

    let rows_ref = &rows;
    let dists: Vec<f64> = (0..rows.len())
        .into_par_iter()
        .flat_map_iter(move |i| ((i + 1)..rows_ref.len()).map(move |j| squared_distance(&rows_ref[i], &rows_ref[j])))
        .collect();
    if dists.is_empty() {
        return 1.0;
    }
    let med = median(&dists);
    let sigma = (0.5 * med).sqrt();
    debug!(
        "Median heuristic over {} rows: median squared distance {:.6}, sigma {:.6}",
        rows.len(),
        med,
        sigma
    );
    if sigma.is_finite() && sigma > 0.0 {
        sigma
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval() {
        let k = GaussianRbf::new(1.0).unwrap();
        assert_eq!(k.eval(&[1.0, 2.0], &[1.0, 2.0]), 1.0);
        // ||x - y||^2 = 2, exp(-2 / 2)
        assert!((k.eval(&[0.0, 0.0], &[1.0, 1.0]) - (-1.0_f64).exp()).abs() < 1e-12);
        assert!(GaussianRbf::new(0.0).is_err());
        assert!(GaussianRbf::new(-1.0).is_err());
    }

    #[test]
    fn test_matrix_symmetric() {
        let k = GaussianRbf::new(0.7).unwrap();
        let rows = vec![vec![0.0], vec![1.0], vec![3.0]];
        let m = k.matrix(&rows, true);
        let s = k.matrix(&rows, false);
        assert_eq!(m, s);
        for i in 0..3 {
            assert_eq!(m[i * 3 + i], 1.0);
            for j in 0..3 {
                assert_eq!(m[i * 3 + j], m[j * 3 + i]);
            }
        }
    }

    #[test]
    fn test_median_heuristic() {
        // Points 0, 1, 2 on a line: squared distances 1, 4, 1 -> median 1 -> sigma sqrt(0.5).
        let v = vec![0.0, 1.0, 2.0];
        let m = Matrix::new(&v, 3, 1);
        let sigma = median_heuristic(&m, 1000, 0);
        assert!((sigma - 0.5_f64.sqrt()).abs() < 1e-12);

        let k = GaussianRbf::from_reference(Bandwidth::Median, &m, 0).unwrap();
        assert_eq!(k.sigma, sigma);
        let k = GaussianRbf::from_reference(Bandwidth::Fixed(2.0), &m, 0).unwrap();
        assert_eq!(k.sigma, 2.0);
    }

    #[test]
    fn test_median_heuristic_constant_data() {
        let v = vec![3.0; 8];
        let m = Matrix::new(&v, 4, 2);
        assert_eq!(median_heuristic(&m, 1000, 0), 1.0);
    }
}
