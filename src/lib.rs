//! # Intent Gate
//!
//! A prompt hook for AI coding assistants that keeps a bounded, decaying memory
//! of what the user is working on and injects a compact digest of it before
//! every prompt.
//!
//! ## Features
//!
//! - **TF-IDF classification**: each prompt is matched against stored topics
//!   and starts a new topic, branches under one, or extends a close match
//! - **Topic forest**: literal prompts at the leaves, term abstractions above
//! - **Bounded memory**: lowest-scoring leaves are evicted by age, weight and depth
//! - **Topic transitions**: a Markov chain boosts and predicts the next topic
//! - **Response guide**: assistant replies reinforce the topics they discuss
//!
//! ## Architecture
//!
//! ```text
//! stdin hook JSON → Session (load) → Classifier → context block → stdout
//!                        ↓
//!              JSON documents (intent, engine, guide, markov)
//! ```
//!
//! ## Example
//!
//! ```
//! use intent_gate::classifier::Classifier;
//! use intent_gate::config::GateConfig;
//!
//! let mut classifier = Classifier::new(GateConfig::default());
//! let context = classifier.process_prompt("add JWT authentication to the API", "p0");
//! assert!(context.starts_with("[Focus | 1 prompts"));
//! ```

#![warn(missing_docs)]

/// Prompt classification, forest mutation and context rendering.
pub mod classifier;
/// Command-line parsing and command execution.
pub mod cli;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Topic trees, nodes and memory eviction.
pub mod forest;
/// Assistant response summaries.
pub mod guide;
/// Load, run and save one invocation's state.
pub mod session;
/// Atomic JSON document persistence.
pub mod storage;
/// Prompt cleaning, tokenization and stemming.
pub mod text;
/// Incremental TF-IDF corpus and sparse vectors.
pub mod tfidf;
/// First-order Markov chain over topics.
pub mod transition;

pub use classifier::Classifier;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use session::Session;
