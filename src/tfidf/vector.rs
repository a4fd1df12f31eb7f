//! Sparse term vectors and cosine similarity.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single term-weight pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    /// The stemmed term.
    pub term: String,
    /// TF-IDF weight.
    pub weight: f64,
}

/// Sparse vector sorted by term, with no duplicate terms.
///
/// The sort order is what lets [`cosine_similarity`] run as a single merge-join.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    terms: Vec<Term>,
}

impl SparseVector {
    /// Build a sorted vector from a term-weight map.
    pub fn from_weights<K: Into<String>>(weights: HashMap<K, f64>) -> Self {
        let mut terms: Vec<Term> = weights
            .into_iter()
            .map(|(term, weight)| Term {
                term: term.into(),
                weight,
            })
            .collect();
        terms.sort_by(|a, b| a.term.cmp(&b.term));
        Self { terms }
    }

    /// Terms in ascending term order.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Number of non-zero terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// An empty vector is treated the same as an absent one.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Cosine of the angle between two sorted sparse vectors.
///
/// Dot product and both squared norms are accumulated in one merge pass.
/// Returns 0.0 when either vector is empty or has a zero norm.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let (a, b) = (a.terms(), b.terms());
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        match a[i].term.cmp(&b[j].term) {
            Ordering::Equal => {
                dot += a[i].weight * b[j].weight;
                norm_a += a[i].weight * a[i].weight;
                norm_b += b[j].weight * b[j].weight;
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                norm_a += a[i].weight * a[i].weight;
                i += 1;
            }
            Ordering::Greater => {
                norm_b += b[j].weight * b[j].weight;
                j += 1;
            }
        }
    }

    norm_a += a[i..].iter().map(|t| t.weight * t.weight).sum::<f64>();
    norm_b += b[j..].iter().map(|t| t.weight * t.weight).sum::<f64>();

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(pairs: &[(&str, f64)]) -> SparseVector {
        SparseVector::from_weights(
            pairs
                .iter()
                .map(|(t, w)| (t.to_string(), *w))
                .collect::<HashMap<String, f64>>(),
        )
    }

    #[test]
    fn test_from_weights_sorts_terms() {
        let v = vector(&[("zeta", 1.0), ("alpha", 2.0), ("mid", 3.0)]);
        let order: Vec<&str> = v.terms().iter().map(|t| t.term.as_str()).collect();
        assert_eq!(order, vec!["alpha", "mid", "zeta"]);
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn test_from_weights_empty() {
        let v = SparseVector::from_weights(HashMap::<String, f64>::new());
        assert!(v.is_empty());
    }

    #[test]
    fn test_cosine_identical() {
        let v = vector(&[("auth", 0.5), ("jwt", 0.3), ("token", 0.2)]);
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_disjoint() {
        let a = vector(&[("auth", 1.0)]);
        let b = vector(&[("database", 1.0)]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_empty() {
        let a = vector(&[("auth", 1.0)]);
        let empty = SparseVector::default();
        assert_eq!(cosine_similarity(&a, &empty), 0.0);
        assert_eq!(cosine_similarity(&empty, &a), 0.0);
        assert_eq!(cosine_similarity(&empty, &empty), 0.0);
    }

    #[test]
    fn test_cosine_zero_norm() {
        let a = vector(&[("auth", 0.0)]);
        let b = vector(&[("auth", 1.0)]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_known_value() {
        // a = (1, 1, 0), b = (1, 0, 1) → cos = 1/2
        let a = vector(&[("x", 1.0), ("y", 1.0)]);
        let b = vector(&[("x", 1.0), ("z", 1.0)]);
        assert!((cosine_similarity(&a, &b) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_symmetric_and_bounded() {
        let a = vector(&[("api", 0.4), ("auth", 0.9), ("jwt", 0.1)]);
        let b = vector(&[("auth", 0.2), ("jwt", 0.7), ("token", 0.5)]);
        let ab = cosine_similarity(&a, &b);
        let ba = cosine_similarity(&b, &a);
        assert!((ab - ba).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&ab));
    }
}
