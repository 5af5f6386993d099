use crate::detector::config::{DetectorConfig, DriftMethod};
use crate::drift::stats::{Alternative, Correction};
use crate::errors::DriftError;
use crate::kernel::Bandwidth;
use crate::preprocess::PreprocessConfig;

impl DetectorConfig {
    // Set methods for parameters

    /// Set the test used by the detector.
    /// * `method` - MMD or KS.
    pub fn set_method(mut self, method: DriftMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the significance threshold.
    /// * `p_val` - P-value below which a batch is flagged as drifted.
    pub fn set_p_val(mut self, p_val: f64) -> Self {
        self.p_val = p_val;
        self
    }

    /// Set the number of permutations of the MMD test.
    pub fn set_n_permutations(mut self, n_permutations: usize) -> Self {
        self.n_permutations = n_permutations;
        self
    }

    /// Set the multiple-comparison correction of the KS test.
    pub fn set_correction(mut self, correction: Correction) -> Self {
        self.correction = correction;
        self
    }

    /// Set the correction from its name, "bonferroni" or "fdr".
    pub fn set_correction_str(self, correction: &str) -> Result<Self, DriftError> {
        Ok(self.set_correction(correction.parse()?))
    }

    /// Set the alternative hypothesis of the KS test.
    pub fn set_alternative(mut self, alternative: Alternative) -> Self {
        self.alternative = alternative;
        self
    }

    /// Set the kernel bandwidth rule of the MMD test.
    pub fn set_bandwidth(mut self, bandwidth: Bandwidth) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    /// Set the preprocessing applied to reference and batches.
    pub fn set_preprocess(mut self, preprocess: Option<PreprocessConfig>) -> Self {
        self.preprocess = preprocess;
        self
    }

    /// Set the seed.
    /// * `seed` - Integer value used to seed any randomness used in the algorithm.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of threads.
    /// * `num_threads` - Set the number of threads to be used during scoring.
    pub fn set_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Set whether scoring runs in parallel.
    pub fn set_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters() {
        let cfg = DetectorConfig::default()
            .set_method(DriftMethod::Ks)
            .set_p_val(0.01)
            .set_correction_str("fdr")
            .unwrap()
            .set_alternative(Alternative::Less)
            .set_seed(9)
            .set_parallel(false);
        assert_eq!(cfg.method, DriftMethod::Ks);
        assert_eq!(cfg.p_val, 0.01);
        assert_eq!(cfg.correction, Correction::Fdr);
        assert_eq!(cfg.alternative, Alternative::Less);
        assert_eq!(cfg.seed, 9);
        assert!(!cfg.parallel);

        let err = DetectorConfig::default().set_correction_str("holm").unwrap_err();
        assert!(matches!(err, DriftError::ParseString(..)));
    }
}
