//! Embedding value object and the vector math shared by every store.
//!
//! All distances are computed in IEEE-754 double precision regardless of the
//! `f32` storage representation, and cosine scores are clamped to `[0, 1]`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A fixed-dimension real-valued vector produced by an embedding provider.
///
/// Vectors are not required to be unit-normalized; consumers normalize on
/// demand for cosine scoring. Providers may return slightly different
/// vectors for the same input across runs — consumers that require
/// stability hash inputs and reuse stored vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// The vector components
    pub vector: Vec<f32>,
    /// Model that produced this vector
    pub model: String,
    /// Dimension count; always equals `vector.len()` for valid embeddings
    pub dimensions: usize,
}

impl Embedding {
    /// Create an embedding, deriving `dimensions` from the vector length.
    pub fn new(vector: Vec<f32>, model: impl Into<String>) -> Self {
        let dimensions = vector.len();
        Self {
            vector,
            model: model.into(),
            dimensions,
        }
    }

    /// Verify this embedding against an expected dimension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dimension`] when the vector length disagrees with
    /// `expected`. Mismatches are fatal — vectors are never truncated or
    /// padded.
    pub fn check_dimensions(&self, expected: usize) -> Result<()> {
        if self.vector.len() != expected {
            return Err(Error::dimension(expected, self.vector.len()));
        }
        Ok(())
    }
}

fn check_pair(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::dimension(a.len(), b.len()));
    }
    Ok(())
}

/// Cosine score `1 - cosine_distance(a, b)`, clamped to `[0, 1]`.
///
/// Zero-norm vectors score `0.0` (no direction to compare).
///
/// # Errors
///
/// Returns [`Error::Dimension`] when the vectors differ in length.
pub fn cosine_score(a: &[f32], b: &[f32]) -> Result<f64> {
    check_pair(a, b)?;

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    Ok(similarity.clamp(0.0, 1.0))
}

/// Euclidean (L2) distance between two vectors. Always `>= 0`.
///
/// # Errors
///
/// Returns [`Error::Dimension`] when the vectors differ in length.
pub fn l2_distance(a: &[f32], b: &[f32]) -> Result<f64> {
    check_pair(a, b)?;

    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum();
    Ok(sum.sqrt())
}

/// Map a similarity score to a behavior-prediction confidence bucket.
///
/// Buckets: `>= 0.9 → 0.95`, `>= 0.8 → 0.85`, `>= 0.7 → 0.75`, else `0.60`.
#[must_use]
pub fn confidence_bucket(score: f64) -> f64 {
    if score >= 0.9 {
        0.95
    } else if score >= 0.8 {
        0.85
    } else if score >= 0.7 {
        0.75
    } else {
        0.60
    }
}

/// Render a vector in pgvector literal form, e.g. `[0.1,0.2,0.3]`.
#[must_use]
pub fn vector_literal(v: &[f32]) -> String {
    let mut out = String::with_capacity(v.len() * 10 + 2);
    out.push('[');
    for (i, x) in v.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&x.to_string());
    }
    out.push(']');
    out
}
