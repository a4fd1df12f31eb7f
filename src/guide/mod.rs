//! Ring buffer of assistant response summaries.
//!
//! Entries serve two purposes: they are rendered into the context block next to
//! the topics they belong to, and unreinforced entries feed
//! [`crate::classifier::Classifier::reinforce_from_guide`] so topics the
//! assistant keeps talking about stay alive longer.

pub mod transcript;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::forest::Forest;

/// Default number of retained summaries.
pub const DEFAULT_GUIDE_SIZE: usize = 15;

/// One response summary linked to an intent node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideEntry {
    /// Truncated assistant response.
    pub summary: String,
    /// Node the response was about; empty when unknown.
    #[serde(default)]
    pub intent_id: String,
    /// Optional references mentioned by the response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<String>,
    /// When the entry was added.
    pub timestamp: DateTime<Utc>,
    /// Set once the entry has been used to reinforce the forest.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reinforced: bool,
}

/// Bounded list of response summaries, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guide {
    /// Retained entries.
    #[serde(default)]
    pub entries: Vec<GuideEntry>,
    /// Capacity; older entries are dropped beyond it.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
}

fn default_max_size() -> usize {
    DEFAULT_GUIDE_SIZE
}

impl Default for Guide {
    fn default() -> Self {
        Self::new(DEFAULT_GUIDE_SIZE)
    }
}

impl Guide {
    /// Create an empty guide holding at most `max_size` entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_size,
        }
    }

    /// Append a summary. Empty summaries are ignored.
    pub fn add(&mut self, summary: impl Into<String>, intent_id: impl Into<String>, refs: Vec<String>) {
        let summary = summary.into();
        if summary.is_empty() {
            return;
        }
        self.entries.push(GuideEntry {
            summary,
            intent_id: intent_id.into(),
            refs,
            timestamp: Utc::now(),
            reinforced: false,
        });
        self.enforce_capacity();
    }

    /// Change the capacity, dropping the oldest entries if needed.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.enforce_capacity();
    }

    fn enforce_capacity(&mut self) {
        if self.entries.len() > self.max_size {
            let excess = self.entries.len() - self.max_size;
            self.entries.drain(..excess);
        }
    }

    /// Entries not yet used for reinforcement.
    pub fn unreinforced_mut(&mut self) -> impl Iterator<Item = &mut GuideEntry> {
        self.entries.iter_mut().filter(|e| !e.reinforced)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the guide holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render entries whose linked node still exists (or that have no link).
    ///
    /// Returns an empty string when no entry qualifies.
    pub fn render(&self, forest: &Forest) -> String {
        let live: HashSet<&str> = forest
            .trees
            .iter()
            .flat_map(|t| t.nodes.keys().map(String::as_str))
            .collect();

        let lines: Vec<&str> = self
            .entries
            .iter()
            .filter(|e| e.intent_id.is_empty() || live.contains(e.intent_id.as_str()))
            .map(|e| e.summary.as_str())
            .collect();
        if lines.is_empty() {
            return String::new();
        }

        let mut out = String::from("Guide:\n");
        for line in lines {
            out.push_str("  - ");
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}
