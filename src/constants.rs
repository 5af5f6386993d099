pub const DEFAULT_P_VAL: f64 = 0.05;
pub const DEFAULT_N_PERMUTATIONS: usize = 100;
pub const MAX_BANDWIDTH_SAMPLES: usize = 1000;
pub const MIN_SAMPLES_MMD: usize = 2;
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;
pub const CRATE_NAME: &str = concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));
