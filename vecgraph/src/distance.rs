//! Similarity kernels.
//!
//! Both metrics return a value where higher means more similar. This is a
//! deliberate divergence from a "distance" API: callers of the graph engine
//! never see raw distances and never need to flip a comparison direction.

use serde::{Deserialize, Serialize};

/// Similarity metric used by an index. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Cosine similarity. Zero if either vector has zero magnitude.
    Cosine,
    /// `1 / (1 + euclidean_distance)`, a monotone-decreasing transform so
    /// that, like cosine, higher is more similar.
    Euclidean,
}

impl Metric {
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::Cosine => cosine_similarity(a, b),
            Metric::Euclidean => euclidean_similarity(a, b),
        }
    }
}

#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity in `[-1, 1]`; `0.0` if either vector is all-zero.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mag_a = magnitude(a);
    let mag_b = magnitude(b);
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (mag_a * mag_b)
}

/// Euclidean similarity: `1 / (1 + ||a - b||)`, in `(0, 1]`.
#[inline]
pub fn euclidean_similarity(a: &[f32], b: &[f32]) -> f32 {
    let sum_sq: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
    1.0 / (1.0 + sum_sq.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn cosine_identical_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!(approx_eq(cosine_similarity(&v, &v), 1.0));
    }

    #[test]
    fn cosine_orthogonal_is_zero() {
        assert!(approx_eq(
            cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]),
            0.0
        ));
    }

    #[test]
    fn cosine_zero_vector_is_zero() {
        assert!(approx_eq(
            cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]),
            0.0
        ));
    }

    #[test]
    fn euclidean_identical_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!(approx_eq(euclidean_similarity(&v, &v), 1.0));
    }

    #[test]
    fn euclidean_known_value() {
        // 3-4-5 triangle: distance 5, similarity 1/6.
        let sim = euclidean_similarity(&[0.0, 0.0, 0.0], &[3.0, 4.0, 0.0]);
        assert!(approx_eq(sim, 1.0 / 6.0));
    }

    #[test]
    fn metric_dispatches() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        assert!(approx_eq(Metric::Cosine.similarity(&a, &b), 0.0));
        assert!(approx_eq(
            Metric::Euclidean.similarity(&a, &b),
            1.0 / (1.0 + 2.0_f32.sqrt())
        ));
    }
}
