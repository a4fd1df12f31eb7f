//! Incremental document-frequency statistics.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::vector::SparseVector;
use crate::text::{term_frequency, tokenize};

/// Incremental TF-IDF corpus.
///
/// Document frequencies are persisted and updated as prompts are added and
/// evicted, instead of being rebuilt from the forest on every run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Corpus {
    /// Number of documents containing each term.
    #[serde(default)]
    pub doc_freq: HashMap<String, u64>,
    /// Number of registered documents.
    #[serde(default)]
    pub total_docs: u64,
}

impl Corpus {
    /// Create an empty corpus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document. Each distinct token increments its frequency once.
    pub fn add_document(&mut self, tokens: &[String]) {
        let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        for term in unique {
            *self.doc_freq.entry(term.to_string()).or_insert(0) += 1;
        }
        self.total_docs += 1;
    }

    /// Unregister a document previously passed to [`Corpus::add_document`].
    ///
    /// Terms that drop to zero are deleted so the table stays bounded.
    pub fn remove_document(&mut self, tokens: &[String]) {
        let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        for term in unique {
            if let Some(df) = self.doc_freq.get_mut(term) {
                *df = df.saturating_sub(1);
                if *df == 0 {
                    self.doc_freq.remove(term);
                }
            }
        }
        self.total_docs = self.total_docs.saturating_sub(1);
    }

    /// Smoothed inverse document frequency, `log2(1 + total / df)`; 0 for unseen terms.
    pub fn idf(&self, term: &str) -> f64 {
        match self.doc_freq.get(term) {
            Some(&df) if df > 0 => (1.0 + self.total_docs as f64 / df as f64).log2(),
            _ => 0.0,
        }
    }

    /// Tokenize and vectorize raw text.
    pub fn vectorize(&self, text: &str) -> SparseVector {
        self.vectorize_tokens(&tokenize(text))
    }

    /// Vectorize pre-tokenized text. Terms with no positive weight are dropped.
    pub fn vectorize_tokens(&self, tokens: &[String]) -> SparseVector {
        if tokens.is_empty() {
            return SparseVector::default();
        }
        let weights: HashMap<&str, f64> = term_frequency(tokens)
            .into_iter()
            .map(|(term, tf)| (term, tf * self.idf(term)))
            .filter(|(_, weight)| *weight > 0.0)
            .collect();
        SparseVector::from_weights(weights)
    }

    /// Number of distinct terms.
    pub fn unique_terms(&self) -> usize {
        self.doc_freq.len()
    }

    /// The `n` terms with the highest document frequency, ties by term.
    pub fn top_terms(&self, n: usize) -> Vec<(&str, u64)> {
        let mut terms: Vec<(&str, u64)> = self
            .doc_freq
            .iter()
            .map(|(term, df)| (term.as_str(), *df))
            .collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        terms.truncate(n);
        terms
    }

    /// True when no document is registered.
    pub fn is_empty(&self) -> bool {
        self.total_docs == 0 && self.doc_freq.is_empty()
    }
}
