use crate::errors::DriftError;
use std::cmp::Ordering;

/// Create a string of all available items.
pub fn items_to_strings(items: Vec<&str>) -> String {
    items.join(", ")
}

pub fn fmt_vec_output(v: &[f64]) -> String {
    v.iter().map(|n| format!("{:.4}", n)).collect::<Vec<_>>().join(", ")
}

// Validation
pub fn validate_positive_float_parameter(value: f64, parameter: &str) -> Result<(), DriftError> {
    if value.is_nan() || value <= 0.0 || !value.is_finite() {
        Err(DriftError::InvalidParameter(
            parameter.to_string(),
            "finite positive real value".to_string(),
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate a value lies strictly between `min` and `max`.
pub fn validate_open_interval(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), DriftError> {
    if value.is_nan() || value <= min || max <= value {
        let ex_msg = format!("real value within open interval ({}, {})", min, max);
        Err(DriftError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

pub fn validate_positive_usize_parameter(value: usize, parameter: &str) -> Result<(), DriftError> {
    if value == 0 {
        Err(DriftError::InvalidParameter(
            parameter.to_string(),
            "positive integer".to_string(),
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Sort floats ascending. NaN values compare equal to everything.
#[inline]
pub fn sort_floats(v: &mut [f64]) {
    v.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
}

/// Linear interpolation quantile of an already sorted slice.
///
/// * `sorted` - Values sorted ascending.
/// * `q` - Quantile in [0, 1].
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Median of the values, sorting a copy.
pub fn median(v: &[f64]) -> f64 {
    let mut s = v.to_vec();
    sort_floats(&mut s);
    quantile_sorted(&s, 0.5)
}

/// Squared euclidean distance.
#[inline]
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_open_interval() {
        assert!(validate_open_interval(0.05, 0.0, 1.0, "p_val").is_ok());
        assert!(validate_open_interval(0.0, 0.0, 1.0, "p_val").is_err());
        assert!(validate_open_interval(1.0, 0.0, 1.0, "p_val").is_err());
        assert!(validate_open_interval(f64::NAN, 0.0, 1.0, "p_val").is_err());
    }

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive_float_parameter(0.5, "sigma").is_ok());
        assert!(validate_positive_float_parameter(0.0, "sigma").is_err());
        assert!(validate_positive_float_parameter(f64::INFINITY, "sigma").is_err());
        assert!(validate_positive_usize_parameter(0, "n_permutations").is_err());
        assert!(validate_positive_usize_parameter(1, "n_permutations").is_ok());
    }

    #[test]
    fn test_quantile() {
        let v = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile_sorted(&v, 0.5), 3.0);
        assert_eq!(quantile_sorted(&v, 0.0), 1.0);
        assert_eq!(quantile_sorted(&v, 1.0), 5.0);
        assert!((quantile_sorted(&v, 0.125) - 1.5).abs() < 1e-12);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert!(quantile_sorted(&[], 0.5).is_nan());
    }

    #[test]
    fn test_fmt_vec_output() {
        assert_eq!(fmt_vec_output(&[0.5, 1.0]), "0.5000, 1.0000");
        assert_eq!(fmt_vec_output(&[]), "");
    }
}
