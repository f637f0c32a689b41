//! Client-computed embedding vectors.
//!
//! Embeddings are produced on the client from text the server never sees.
//! The store keeps them verbatim and only compares them.

use serde::{Deserialize, Serialize};

/// A dense embedding of floating-point values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    data: Vec<f32>,
}

impl Embedding {
    /// Creates an embedding from a slice of f32 values.
    ///
    /// # Example
    ///
    /// ```
    /// use privmatch_core::Embedding;
    ///
    /// let e = Embedding::new(&[1.0, 2.0, 3.0]);
    /// assert_eq!(e.dimension(), 3);
    /// ```
    #[inline]
    pub fn new(data: &[f32]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    /// Creates an embedding from an owned `Vec<f32>`.
    #[inline]
    pub fn from_vec(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Returns the dimension (length) of the embedding.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Returns a slice view of the embedding data.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns true if the embedding has zero elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Computes the L2 norm.
    #[inline]
    pub fn norm(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Returns a unit-length copy, or None for a zero vector.
    pub fn normalized(&self) -> Option<Self> {
        let norm = self.norm();
        if norm == 0.0 {
            None
        } else {
            Some(Self {
                data: self.data.iter().map(|x| x / norm).collect(),
            })
        }
    }

    /// Consumes the embedding and returns the underlying data.
    #[inline]
    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(data: Vec<f32>) -> Self {
        Self::from_vec(data)
    }
}

impl From<&[f32]> for Embedding {
    fn from(data: &[f32]) -> Self {
        Self::new(data)
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_norm() {
        let e = Embedding::new(&[3.0, 4.0]);
        assert!((e.norm() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_embedding_normalized() {
        let e = Embedding::new(&[3.0, 4.0]);
        let n = e.normalized().unwrap();
        assert!((n.norm() - 1.0).abs() < 1e-6);
        assert!((n.as_slice()[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_zero_embedding_normalized() {
        assert!(Embedding::new(&[0.0, 0.0]).normalized().is_none());
    }

    #[test]
    fn test_embedding_serializes_as_array() {
        let e = Embedding::new(&[1.0, 2.5]);
        assert_eq!(serde_json::to_string(&e).unwrap(), "[1.0,2.5]");
        let back: Embedding = serde_json::from_str("[1.0,2.5]").unwrap();
        assert_eq!(back, e);
    }
}
