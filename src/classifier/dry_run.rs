use serde::Serialize;

use super::{Action, Classification, Classifier};
use crate::text::tokenize;
use crate::tfidf::{cosine_similarity, SparseVector, Term};

/// Similarity of the prompt to one leaf.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafScore {
    /// Leaf node id.
    pub leaf_id: String,
    /// Leaf content.
    pub content: String,
    /// Plain cosine similarity.
    pub cosine: f64,
    /// Cosine times the tree's boost factor.
    pub boosted: f64,
}

/// Similarity of the prompt to one tree's root and leaves.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeScore {
    /// Position of the tree in the forest.
    pub tree_idx: usize,
    /// Tree id.
    pub tree_id: String,
    /// Root node id.
    pub root_id: String,
    /// Root content.
    pub root_content: String,
    /// Plain cosine against the root.
    pub root_cosine: f64,
    /// Root cosine times the boost factor.
    pub root_boosted: f64,
    /// Transition boost applied to this tree.
    pub boost_factor: f64,
    /// Per-leaf scores in leaf order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub leaf_scores: Vec<LeafScore>,
}

/// Full classification trace for one prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunResult {
    /// The prompt as given.
    pub prompt: String,
    /// Stemmed tokens.
    pub tokens: Vec<String>,
    /// TF-IDF vector of the prompt.
    pub vector: Vec<Term>,
    /// One entry per tree.
    pub tree_scores: Vec<TreeScore>,
    /// Action the prompt would trigger.
    pub best_action: Action,
    /// Highest boosted similarity.
    pub best_score: f64,
    /// Index of the best tree.
    pub best_tree: usize,
    /// Best leaf, when a leaf beat its root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_leaf: Option<String>,
}

impl Classifier {
    /// Score every tree root and leaf against `vector`.
    pub(super) fn score_trees(&mut self, vector: &SparseVector) -> Vec<TreeScore> {
        let mut scores = Vec::with_capacity(self.forest.trees.len());
        for (tree_idx, tree) in self.forest.trees.iter().enumerate() {
            let Some(root) = tree.root() else {
                continue;
            };
            let boost_factor = self.boost_factor(&tree.id);

            let root_cosine =
                cosine_similarity(vector, self.cache.get_or_compute(&self.corpus, root));
            let leaf_scores = tree
                .leaves()
                .into_iter()
                .map(|leaf| {
                    let cosine =
                        cosine_similarity(vector, self.cache.get_or_compute(&self.corpus, leaf));
                    LeafScore {
                        leaf_id: leaf.id.clone(),
                        content: leaf.content.clone(),
                        cosine,
                        boosted: cosine * boost_factor,
                    }
                })
                .collect();

            scores.push(TreeScore {
                tree_idx,
                tree_id: tree.id.clone(),
                root_id: root.id.clone(),
                root_content: root.content.clone(),
                root_cosine,
                root_boosted: root_cosine * boost_factor,
                boost_factor,
                leaf_scores,
            });
        }
        scores
    }

    /// Classify `prompt` exactly as [`Classifier::process_prompt`] would, without
    /// touching the forest, corpus or chain.
    ///
    /// `prompt` is expected to be cleaned already.
    pub fn dry_run(&mut self, prompt: &str) -> DryRunResult {
        let tokens = tokenize(prompt);
        let vector = self.corpus.vectorize_tokens(&tokens);
        let (tree_scores, cls) = if self.forest.is_empty() || vector.is_empty() {
            (Vec::new(), Classification::new_topic())
        } else {
            let scores = self.score_trees(&vector);
            let cls = self.select(&scores);
            (scores, cls)
        };

        DryRunResult {
            prompt: prompt.to_string(),
            tokens,
            vector: vector.terms().to_vec(),
            tree_scores,
            best_action: cls.action,
            best_score: cls.score,
            best_tree: cls.tree_idx,
            best_leaf: cls.leaf_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;

    #[test]
    fn test_dry_run_empty_forest() {
        let mut c = Classifier::new(GateConfig::default());
        let result = c.dry_run("add JWT authentication");

        assert_eq!(result.best_action, Action::New);
        assert_eq!(result.tokens, vec!["add", "jwt", "authentica"]);
        assert!(result.vector.is_empty());
        assert!(result.tree_scores.is_empty());
    }

    #[test]
    fn test_dry_run_matches_process_without_mutation() {
        let mut c = Classifier::new(GateConfig::default());
        c.process_prompt("add JWT authentication to the API", "p0");
        let forest = c.forest.clone();
        let corpus = c.corpus.clone();
        let chain = c.chain.clone();

        let result = c.dry_run("fix JWT authentication token expiry");

        assert_eq!(result.best_action, Action::Extend);
        assert_eq!(result.tree_scores.len(), 1);
        let ts = &result.tree_scores[0];
        assert_eq!(ts.boost_factor, 1.0);
        assert!((ts.root_boosted - ts.root_cosine * ts.boost_factor).abs() < 1e-12);
        assert_eq!(ts.leaf_scores.len(), 1);
        assert!((result.best_score - ts.root_boosted).abs() < 1e-12);
        assert!(result.best_leaf.is_none());

        assert_eq!(c.forest, forest);
        assert_eq!(c.corpus, corpus);
        assert_eq!(c.chain, chain);
    }

    #[test]
    fn test_dry_run_json_shape() {
        let mut c = Classifier::new(GateConfig::default());
        c.process_prompt("add JWT authentication to the API", "p0");
        let json = serde_json::to_value(c.dry_run("JWT authentication")).unwrap();

        assert_eq!(json["bestAction"], "extend");
        assert_eq!(json["treeScores"][0]["treeIdx"], 0);
        assert!(json["treeScores"][0]["leafScores"].is_array());
        assert!(json.get("bestLeaf").is_none());
    }
}
