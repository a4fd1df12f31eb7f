use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Depth penalty applied per level in [`Node::score`].
const DEPTH_PENALTY: f64 = 0.15;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Generate a forest-wide unique identifier for a node or tree.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// The atomic unit of the forest: a prompt, a sub-topic, or an abstraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique node identifier.
    pub id: String,
    /// Literal prompt text, or a synthetic term summary for internal nodes.
    pub content: String,
    /// Distance from the root (root = 0).
    pub depth: u32,
    /// `log2(frequency + 1)`.
    pub weight: f64,
    /// How often this node was created or touched (≥ 1).
    pub frequency: u32,
    /// When the node was created.
    pub created: DateTime<Utc>,
    /// When the node was last touched.
    pub last_accessed: DateTime<Utc>,
    /// Most recent source ids (prompt ids, `guide-reinforce`), oldest first.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Ordered child ids.
    #[serde(default)]
    pub child_ids: Vec<String>,
    /// Weak back-reference to the parent; `None` for the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Whether `content` is registered in the TF-IDF corpus.
    ///
    /// Only literal prompt text is indexed. Abstractions written by bubble-up
    /// never are, so eviction must not unregister them.
    #[serde(default)]
    pub indexed: bool,
}

impl Node {
    /// Create a node with frequency 1 and weight 1.0.
    pub fn new(content: impl Into<String>, depth: u32, source: &str) -> Self {
        let now = Utc::now();
        let sources = if source.is_empty() {
            Vec::new()
        } else {
            vec![source.to_string()]
        };
        Self {
            id: new_id(),
            content: content.into(),
            depth,
            weight: 1.0,
            frequency: 1,
            created: now,
            last_accessed: now,
            sources,
            child_ids: Vec::new(),
            parent_id: None,
            indexed: false,
        }
    }

    /// Survival priority: `weight × recency × depthFactor`.
    ///
    /// `recency = e^(-decay_rate × ageHours)` with age floored at zero and
    /// `depthFactor = 1 / (1 + depth × 0.15)`.
    pub fn score(&self, now: DateTime<Utc>, decay_rate: f64) -> f64 {
        let age_ms = (now - self.last_accessed).num_milliseconds().max(0);
        let age_hours = age_ms as f64 / MILLIS_PER_HOUR;
        let recency = (-decay_rate * age_hours).exp();
        let depth_factor = 1.0 / (1.0 + self.depth as f64 * DEPTH_PENALTY);
        self.weight * recency * depth_factor
    }

    /// Record another hit: bump frequency, recompute weight, refresh recency,
    /// and append `source` keeping only the `max_sources` most recent.
    pub fn touch(&mut self, max_sources: usize, source: &str) {
        self.frequency = self.frequency.saturating_add(1);
        self.weight = (self.frequency as f64 + 1.0).log2();
        self.last_accessed = Utc::now().max(self.last_accessed);
        if !source.is_empty() && max_sources > 0 {
            self.sources.push(source.to_string());
            if self.sources.len() > max_sources {
                let excess = self.sources.len() - max_sources;
                self.sources.drain(..excess);
            }
        }
    }

    /// A node with no children.
    pub fn is_leaf(&self) -> bool {
        self.child_ids.is_empty()
    }

    /// The root of its tree.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
