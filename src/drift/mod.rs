//! Drift Detection Logic
//!
//! This module provides the two-sample tests used to decide whether a batch
//! has drifted away from a reference sample.

pub mod ks;
pub mod mmd;
pub mod stats;

pub use ks::{KsDrift, KsResult};
pub use mmd::{MmdDrift, MmdResult};
pub use stats::{Alternative, Correction};
