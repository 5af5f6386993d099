//! Two-sample statistics
//!
//! Kolmogorov-Smirnov statistic and p-values, plus the multiple-comparison
//! corrections used to aggregate per-feature tests.
use crate::errors::DriftError;
use crate::utils::{items_to_strings, sort_floats};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

/// Multiple-comparison correction across features.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum Correction {
    /// Divide the threshold by the number of features.
    #[default]
    Bonferroni,
    /// Benjamini-Hochberg false discovery rate.
    Fdr,
}

impl FromStr for Correction {
    type Err = DriftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bonferroni" => Ok(Correction::Bonferroni),
            "fdr" => Ok(Correction::Fdr),
            _ => Err(DriftError::ParseString(
                s.to_string(),
                "Correction".to_string(),
                items_to_strings(vec!["bonferroni", "fdr"]),
            )),
        }
    }
}

/// Alternative hypothesis of the KS test. The reference is the first sample.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Alternative {
    #[default]
    TwoSided,
    /// The reference CDF lies below the batch CDF somewhere.
    Less,
    /// The reference CDF lies above the batch CDF somewhere.
    Greater,
}

impl FromStr for Alternative {
    type Err = DriftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "two-sided" | "two_sided" => Ok(Alternative::TwoSided),
            "less" => Ok(Alternative::Less),
            "greater" => Ok(Alternative::Greater),
            _ => Err(DriftError::ParseString(
                s.to_string(),
                "Alternative".to_string(),
                items_to_strings(vec!["two-sided", "less", "greater"]),
            )),
        }
    }
}

/// Signed extremes of F_a - F_b over the pooled sample.
///
/// Returns `(d_plus, d_minus)` where `d_plus = max(F_a - F_b)` and
/// `d_minus = max(F_b - F_a)`, both clamped at zero.
pub fn ks_extremes(sorted_a: &[f64], sorted_b: &[f64]) -> (f64, f64) {
    let (n, m) = (sorted_a.len(), sorted_b.len());
    let (mut i, mut j) = (0, 0);
    let (mut d_plus, mut d_minus) = (0.0_f64, 0.0_f64);
    while i < n && j < m {
        let v = sorted_a[i].min(sorted_b[j]);
        while i < n && sorted_a[i] <= v {
            i += 1;
        }
        while j < m && sorted_b[j] <= v {
            j += 1;
        }
        let diff = i as f64 / n as f64 - j as f64 / m as f64;
        d_plus = d_plus.max(diff);
        d_minus = d_minus.max(-diff);
    }
    // Once one sample is exhausted the other CDF only climbs towards 1.
    if i < n {
        d_minus = d_minus.max(1.0 - i as f64 / n as f64);
    }
    if j < m {
        d_plus = d_plus.max(1.0 - j as f64 / m as f64);
    }
    (d_plus, d_minus)
}

/// Survival function of the Kolmogorov distribution, P(K > z).
pub fn kolmogorov_sf(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    if z <= 0.0 {
        return 1.0;
    }
    let p = if z < 1.18 {
        // Jacobi theta form converges fast for small z.
        let factor = (2.0 * PI).sqrt() / z;
        let w = PI * PI / (8.0 * z * z);
        let mut cdf = 0.0;
        for k in 1..=50 {
            let odd = (2 * k - 1) as f64;
            let term = (-odd * odd * w).exp();
            cdf += term;
            if term < 1e-17 {
                break;
            }
        }
        1.0 - factor * cdf
    } else {
        let mut sf = 0.0;
        for k in 1..=100 {
            let kf = k as f64;
            let term = (-2.0 * kf * kf * z * z).exp();
            sf += if k % 2 == 1 { term } else { -term };
            if term < 1e-17 {
                break;
            }
        }
        2.0 * sf
    };
    p.clamp(0.0, 1.0)
}

/// Two-sample Kolmogorov-Smirnov test on sorted samples.
///
/// Returns the statistic and its asymptotic p-value.
pub fn ks_2samp(sorted_a: &[f64], sorted_b: &[f64], alternative: Alternative) -> (f64, f64) {
    let (n, m) = (sorted_a.len() as f64, sorted_b.len() as f64);
    let (d_plus, d_minus) = ks_extremes(sorted_a, sorted_b);
    let en = n * m / (n + m);
    let (d, p) = match alternative {
        Alternative::TwoSided => {
            let d = d_plus.max(d_minus);
            (d, kolmogorov_sf(en.sqrt() * d))
        }
        Alternative::Greater => (d_plus, (-2.0 * en * d_plus * d_plus).exp()),
        Alternative::Less => (d_minus, (-2.0 * en * d_minus * d_minus).exp()),
    };
    (d, p.clamp(0.0, 1.0))
}

/// Aggregate per-feature p-values.
///
/// Returns `(is_drift, threshold)`, where `is_drift` is true exactly when some
/// p-value is strictly below `threshold`.
pub fn correct(correction: Correction, p_values: &[f64], p_val: f64) -> (bool, f64) {
    let k = p_values.len().max(1) as f64;
    match correction {
        Correction::Bonferroni => {
            let threshold = p_val / k;
            (p_values.iter().any(|&p| p < threshold), threshold)
        }
        Correction::Fdr => {
            let mut sorted = p_values.to_vec();
            sort_floats(&mut sorted);
            let passing = sorted
                .iter()
                .enumerate()
                .filter(|(i, &p)| p < p_val * (*i + 1) as f64 / k)
                .map(|(i, _)| i)
                .last();
            match passing {
                Some(i) => (true, p_val * (i + 1) as f64 / k),
                None => (false, p_val / k),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ks_extremes() {
        // a entirely below b: F_a reaches 1 before F_b moves.
        let (dp, dm) = ks_extremes(&[1.0, 2.0], &[3.0, 4.0]);
        assert_eq!(dp, 1.0);
        assert_eq!(dm, 0.0);

        let (dp, dm) = ks_extremes(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!((dp, dm), (0.0, 0.0));

        // Ties across samples are consumed together.
        let (dp, dm) = ks_extremes(&[1.0, 1.0, 2.0, 4.0], &[1.0, 3.0]);
        assert!((dp - 0.25).abs() < 1e-12);
        assert!((dm - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_kolmogorov_sf() {
        assert_eq!(kolmogorov_sf(0.0), 1.0);
        // Reference values of the Kolmogorov distribution.
        assert!((kolmogorov_sf(1.0) - 0.26999967).abs() < 1e-6);
        assert!((kolmogorov_sf(1.36) - 0.049486).abs() < 1e-4);
        assert!((kolmogorov_sf(0.5) - 0.96394524).abs() < 1e-6);
        // Both series agree around the switch point.
        assert!((kolmogorov_sf(1.1799) - kolmogorov_sf(1.1801)).abs() < 1e-3);
        assert!(kolmogorov_sf(5.0) < 1e-20);
        assert!(kolmogorov_sf(0.05) <= 1.0);
    }

    #[test]
    fn test_ks_2samp() {
        let a: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let (d, p) = ks_2samp(&a, &a, Alternative::TwoSided);
        assert_eq!(d, 0.0);
        assert_eq!(p, 1.0);

        let b: Vec<f64> = (100..150).map(|i| i as f64).collect();
        let (d, p) = ks_2samp(&a, &b, Alternative::TwoSided);
        assert_eq!(d, 1.0);
        assert!(p < 1e-10);

        // a below b means F_a above F_b.
        let (_, p_greater) = ks_2samp(&a, &b, Alternative::Greater);
        let (d_less, p_less) = ks_2samp(&a, &b, Alternative::Less);
        assert!(p_greater < 1e-10);
        assert_eq!(d_less, 0.0);
        assert_eq!(p_less, 1.0);
    }

    #[test]
    fn test_bonferroni() {
        let (drift, threshold) = correct(Correction::Bonferroni, &[0.02, 0.5], 0.05);
        assert_eq!(threshold, 0.025);
        assert!(drift);
        let (drift, _) = correct(Correction::Bonferroni, &[0.03, 0.5], 0.05);
        assert!(!drift);
    }

    #[test]
    fn test_fdr() {
        // Sorted: 0.01 < 0.05/4, 0.02 < 0.05*2/4, 0.03 >= 0.05*3/4? 0.03 < 0.0375 yes, 0.9 no.
        let p = [0.9, 0.02, 0.01, 0.03];
        let (drift, threshold) = correct(Correction::Fdr, &p, 0.05);
        assert!(drift);
        assert!((threshold - 0.0375).abs() < 1e-12);
        assert_eq!(drift, p.iter().any(|&x| x < threshold));

        let p = [0.2, 0.4];
        let (drift, threshold) = correct(Correction::Fdr, &p, 0.05);
        assert!(!drift);
        assert_eq!(threshold, 0.025);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Bonferroni".parse::<Correction>().unwrap(), Correction::Bonferroni);
        assert_eq!("fdr".parse::<Correction>().unwrap(), Correction::Fdr);
        let err = "holm".parse::<Correction>().unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Configuration);
        assert_eq!("two-sided".parse::<Alternative>().unwrap(), Alternative::TwoSided);
        assert!("sideways".parse::<Alternative>().is_err());
    }
}
