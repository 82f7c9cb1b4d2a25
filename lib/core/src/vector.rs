use serde::{Deserialize, Serialize};

/// A dense embedding vector.
///
/// Catalog and query vectors are produced by the embedding collaborator and
/// are expected to arrive L2-normalized; the index scores them by plain inner
/// product and never re-normalizes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Vector {
    data: Vec<f32>,
}

impl Vector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn from_slice(data: &[f32]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Inner product with another vector. Zero when dimensions differ.
    #[inline]
    pub fn dot(&self, other: &Vector) -> f32 {
        if self.dim() != other.dim() {
            return 0.0;
        }
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// L2 norm.
    #[inline]
    pub fn norm(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Normalized copy. Identity for the zero vector.
    #[inline]
    #[must_use]
    pub fn normalized(&self) -> Self {
        let norm = self.norm();
        if norm <= f32::EPSILON {
            return self.clone();
        }
        let inv = 1.0 / norm;
        Vector::new(self.data.iter().map(|x| x * inv).collect())
    }
}
