//! Covariate drift detection.
//!
//! Fit a detector once on a trusted reference sample, then score incoming
//! batches for distributional shift with either a kernel MMD permutation test
//! or feature-wise Kolmogorov-Smirnov tests.

// Modules
pub mod constants;
pub mod data;
pub mod deployment;
pub mod detector;
pub mod drift;
pub mod errors;
pub mod kernel;
pub mod pipeline;
pub mod preprocess;
pub mod sampler;
pub mod utils;

// Individual classes, and functions
pub use data::{DenseMatrix, Matrix};
pub use detector::{Detector, DetectorConfig, DetectorIO, DriftDetector, DriftMethod, DriftResult};
pub use drift::{Alternative, Correction, KsDrift, MmdDrift};
pub use errors::{DriftError, ErrorKind};
