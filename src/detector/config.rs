//! Detector Configuration
//!
//! Defines the configuration structure and enums used to fit a drift detector.
use crate::constants::{DEFAULT_N_PERMUTATIONS, DEFAULT_P_VAL};
use crate::drift::stats::{Alternative, Correction};
use crate::errors::DriftError;
use crate::kernel::Bandwidth;
use crate::preprocess::PreprocessConfig;
use crate::utils::{
    items_to_strings, validate_open_interval, validate_positive_float_parameter, validate_positive_usize_parameter,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Statistical test used by a detector.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum DriftMethod {
    /// Kernel maximum mean discrepancy with a permutation test.
    #[default]
    Mmd,
    /// Feature-wise Kolmogorov-Smirnov with multiple-comparison correction.
    Ks,
}

impl FromStr for DriftMethod {
    type Err = DriftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mmd" => Ok(DriftMethod::Mmd),
            "ks" => Ok(DriftMethod::Ks),
            _ => Err(DriftError::ParseString(
                s.to_string(),
                "DriftMethod".to_string(),
                items_to_strings(vec!["mmd", "ks"]),
            )),
        }
    }
}

fn default_p_val() -> f64 {
    DEFAULT_P_VAL
}
fn default_n_permutations() -> usize {
    DEFAULT_N_PERMUTATIONS
}
fn default_parallel() -> bool {
    true
}

/// Configuration for fitting a drift detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Test to run.
    #[serde(default)]
    pub method: DriftMethod,
    /// P-value below which a batch is flagged.
    #[serde(default = "default_p_val")]
    pub p_val: f64,
    /// Number of permutations for the MMD test.
    #[serde(default = "default_n_permutations")]
    pub n_permutations: usize,
    /// Multiple-comparison correction for the KS test.
    #[serde(default)]
    pub correction: Correction,
    /// Alternative hypothesis for the KS test.
    #[serde(default)]
    pub alternative: Alternative,
    /// Kernel length-scale rule for the MMD test.
    #[serde(default)]
    pub bandwidth: Bandwidth,
    /// Encoder fitted on the reference and applied to every batch.
    #[serde(default)]
    pub preprocess: Option<PreprocessConfig>,
    /// Seed for random number generation.
    #[serde(default)]
    pub seed: u64,
    /// Number of threads for parallel tasks. Uses the global pool when unset.
    #[serde(default)]
    pub num_threads: Option<usize>,
    /// Whether to parallelize scoring.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            method: DriftMethod::Mmd,
            p_val: DEFAULT_P_VAL,
            n_permutations: DEFAULT_N_PERMUTATIONS,
            correction: Correction::Bonferroni,
            alternative: Alternative::TwoSided,
            bandwidth: Bandwidth::Median,
            preprocess: None,
            seed: 0,
            num_threads: None,
            parallel: true,
        }
    }
}

impl DetectorConfig {
    /// Check every parameter, returning the first invalid one.
    pub fn validate(&self) -> Result<(), DriftError> {
        validate_open_interval(self.p_val, 0.0, 1.0, "p_val")?;
        validate_positive_usize_parameter(self.n_permutations, "n_permutations")?;
        if let Bandwidth::Fixed(sigma) = self.bandwidth {
            validate_positive_float_parameter(sigma, "bandwidth")?;
        }
        if let Some(n) = self.num_threads {
            validate_positive_usize_parameter(n, "num_threads")?;
        }
        if let Some(p) = &self.preprocess {
            p.validate()?;
        }
        Ok(())
    }

    /// Dump the configuration as json.
    pub fn json_dump(&self) -> Result<String, DriftError> {
        serde_json::to_string(self).map_err(|e| DriftError::UnableToWrite(e.to_string()))
    }

    /// Load a configuration from json and validate it.
    ///
    /// Method, correction and alternative names go through `FromStr`, so they are
    /// case-insensitive and an unknown name is a `ParseString` error.
    ///
    /// * `json_str` - Configuration json, missing fields take their defaults.
    pub fn from_json(json_str: &str) -> Result<Self, DriftError> {
        let mut value: Value = serde_json::from_str(json_str).map_err(|e| DriftError::UnableToRead(e.to_string()))?;
        if let Some(fields) = value.as_object_mut() {
            normalize_name::<DriftMethod>(fields.get_mut("method"))?;
            normalize_name::<Correction>(fields.get_mut("correction"))?;
            normalize_name::<Alternative>(fields.get_mut("alternative"))?;
        }
        let config: DetectorConfig =
            serde_json::from_value(value).map_err(|e| DriftError::UnableToRead(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a json file.
    ///
    /// * `path` - Path to save the configuration.
    pub fn save_config<P: AsRef<Path>>(&self, path: P) -> Result<(), DriftError> {
        fs::write(path, self.json_dump()?).map_err(|e| DriftError::UnableToWrite(e.to_string()))
    }

    /// Load a configuration from a json file.
    ///
    /// * `path` - Path to load the configuration from.
    pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Self, DriftError> {
        let json_str = fs::read_to_string(path).map_err(|e| DriftError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

/// Replace a string name with the canonical serialized form of `T`.
fn normalize_name<T>(field: Option<&mut Value>) -> Result<(), DriftError>
where
    T: FromStr<Err = DriftError> + Serialize,
{
    if let Some(v) = field {
        if let Some(name) = v.as_str() {
            let parsed = T::from_str(name)?;
            *v = serde_json::to_value(parsed).map_err(|e| DriftError::UnableToRead(e.to_string()))?;
        }
    }
    Ok(())
}
