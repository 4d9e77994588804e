use ndarray::ArrayView1;

use crate::error::{RagError, Result};

/// Cosine similarity of two equal-length vectors.
///
/// Each vector is divided by its largest absolute element first, so very
/// large or very small magnitudes neither overflow nor flush to zero.
/// If either vector has zero magnitude (the empty vector included) the
/// result is `0.0` rather than NaN.
pub fn cosine_similarity(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Result<f64> {
    if a.len() != b.len() {
        return Err(RagError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let max_a = max_abs(a);
    let max_b = max_abs(b);
    if max_a == 0.0 || max_b == 0.0 {
        return Ok(0.0);
    }

    let a = a.mapv(|x| x / max_a);
    let b = b.mapv(|x| x / max_b);

    let dot_product = a.dot(&b);
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();

    Ok(dot_product / (norm_a * norm_b))
}

/// Largest absolute element, NaN if any element is NaN.
fn max_abs(v: ArrayView1<'_, f64>) -> f64 {
    v.fold(0.0, |max: f64, &x| {
        if x.is_nan() || max.is_nan() {
            f64::NAN
        } else {
            max.max(x.abs())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, array};

    fn score(a: &Array1<f64>, b: &Array1<f64>) -> Result<f64> {
        cosine_similarity(a.view(), b.view())
    }

    #[test]
    fn test_identical_vectors() {
        let v = array![0.3, -1.2, 4.5, 0.0, 7.25];
        assert!((score(&v, &v).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_orthogonal_vectors() {
        assert_eq!(score(&array![1.0, 0.0], &array![0.0, 1.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_opposite_vectors() {
        assert_eq!(score(&array![1.0, 0.0], &array![-1.0, 0.0]).unwrap(), -1.0);
    }

    #[test]
    fn test_scale_invariance() {
        let a = array![1.0, 2.0, 3.0];
        let b = array![10.0, 20.0, 30.0];
        assert!((score(&a, &b).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_dimension_mismatch() {
        match score(&array![1.0, 2.0, 3.0], &array![1.0, 2.0]) {
            Err(RagError::DimensionMismatch { left: 3, right: 2 }) => {}
            other => panic!("expected DimensionMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_magnitude_scores_zero() {
        let zero = array![0.0, 0.0];
        let v = array![1.0, 1.0];
        assert_eq!(score(&zero, &v).unwrap(), 0.0);
        assert_eq!(score(&v, &zero).unwrap(), 0.0);
        assert_eq!(score(&zero, &zero).unwrap(), 0.0);

        let empty = Array1::<f64>::zeros(0);
        assert_eq!(score(&empty, &empty).unwrap(), 0.0);
    }

    #[test]
    fn test_extreme_magnitudes() {
        let huge = array![1e200, 1e200];
        let tiny = array![1e-170, 1e-170];
        assert!((score(&huge, &huge).unwrap() - 1.0).abs() < 1e-9);
        assert!((score(&tiny, &tiny).unwrap() - 1.0).abs() < 1e-9);
        assert!((score(&huge, &tiny).unwrap() - 1.0).abs() < 1e-9);

        let subnormal = array![5e-324, 0.0];
        assert!((score(&subnormal, &array![1.0, 0.0]).unwrap() - 1.0).abs() < 1e-9);
        assert!((score(&huge, &array![-1e200, -1e200]).unwrap() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_nan_element_yields_nan() {
        assert!(score(&array![f64::NAN, 0.0], &array![1.0, 0.0]).unwrap().is_nan());
    }
}
