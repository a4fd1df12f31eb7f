//! Topic-to-topic transition model.
//!
//! A sparse first-order Markov chain keyed by tree id. Rows hold destination
//! counts plus a cached total so probabilities normalize in constant time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A predicted next topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    /// Destination tree id.
    pub topic_id: String,
    /// `P(topic | from)`.
    pub probability: f64,
}

/// Sparse transition matrix over tree ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionChain {
    /// `counts[from][to]` = times the user moved from `from` to `to`.
    #[serde(default)]
    pub counts: HashMap<String, HashMap<String, u64>>,
    /// Row sums of `counts`.
    #[serde(default)]
    pub totals: HashMap<String, u64>,
    /// Tree the previous prompt landed in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_topic: Option<String>,
}

impl TransitionChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one move from `from` to `to`. Empty ids are ignored.
    pub fn record(&mut self, from: &str, to: &str) {
        if from.is_empty() || to.is_empty() {
            return;
        }
        *self
            .counts
            .entry(from.to_string())
            .or_default()
            .entry(to.to_string())
            .or_insert(0) += 1;
        *self.totals.entry(from.to_string()).or_insert(0) += 1;
    }

    /// `counts[from][to] / totals[from]`, or 0 when undefined.
    pub fn probability(&self, from: &str, to: &str) -> f64 {
        let total = self.totals.get(from).copied().unwrap_or(0);
        if total == 0 {
            return 0.0;
        }
        let count = self
            .counts
            .get(from)
            .and_then(|row| row.get(to))
            .copied()
            .unwrap_or(0);
        count as f64 / total as f64
    }

    /// Most frequent destination from `from`.
    pub fn predict(&self, from: &str) -> Option<&str> {
        self.counts
            .get(from)?
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(id, _)| id.as_str())
    }

    /// Up to `n` destinations from `from`, most probable first.
    pub fn top_transitions(&self, from: &str, n: usize) -> Vec<Transition> {
        let (Some(row), Some(&total)) = (self.counts.get(from), self.totals.get(from)) else {
            return Vec::new();
        };
        if total == 0 {
            return Vec::new();
        }

        let mut transitions: Vec<Transition> = row
            .iter()
            .map(|(id, &count)| Transition {
                topic_id: id.clone(),
                probability: count as f64 / total as f64,
            })
            .collect();
        transitions.sort_by(|a, b| {
            b.probability
                .total_cmp(&a.probability)
                .then_with(|| a.topic_id.cmp(&b.topic_id))
        });
        transitions.truncate(n);
        transitions
    }

    /// Remove every reference to `topic_id`, as source and as destination.
    pub fn prune_topic(&mut self, topic_id: &str) {
        self.counts.remove(topic_id);
        self.totals.remove(topic_id);

        let totals = &mut self.totals;
        self.counts.retain(|from, row| {
            if let Some(count) = row.remove(topic_id) {
                let total = totals.entry(from.clone()).or_insert(0);
                *total = total.saturating_sub(count);
                if *total == 0 || row.is_empty() {
                    totals.remove(from);
                    return false;
                }
            }
            true
        });

        if self.last_topic.as_deref() == Some(topic_id) {
            self.last_topic = None;
        }
        debug!(topic_id, "Pruned topic from transition chain");
    }

    /// Total transitions recorded.
    pub fn transition_count(&self) -> u64 {
        self.totals.values().sum()
    }

    /// Rows for display, ordered by source id with destinations by count.
    pub fn rows(&self) -> Vec<(&str, Vec<(&str, u64)>)> {
        let mut rows: Vec<(&str, Vec<(&str, u64)>)> = self
            .counts
            .iter()
            .map(|(from, row)| {
                let mut dests: Vec<(&str, u64)> =
                    row.iter().map(|(to, &c)| (to.as_str(), c)).collect();
                dests.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
                (from.as_str(), dests)
            })
            .collect();
        rows.sort_by(|a, b| a.0.cmp(b.0));
        rows
    }
}
