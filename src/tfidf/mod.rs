//! Incremental TF-IDF vector space.
//!
//! - [`Corpus`]: persisted document frequencies, updated as prompts are added and evicted
//! - [`SparseVector`]: term-sorted weights
//! - [`cosine_similarity`]: merge-join similarity over two sparse vectors

mod corpus;
mod vector;

pub use corpus::Corpus;
pub use vector::{cosine_similarity, SparseVector, Term};
