use std::fmt::Write as _;

use chrono::Utc;

use super::Classifier;
use crate::text::{ellipsize, truncate_chars};

/// Line closing every context block.
pub const CLOSE_MARKER: &str = "[/Focus]\n";

const MAX_TREES: usize = 5;
const MAX_LEAVES: usize = 3;
const LEAF_CHARS: usize = 80;
const NAME_CHARS: usize = 30;
const ID_CHARS: usize = 8;
const PREDICTION_TOPICS: usize = 3;
const PREDICTION_MIN: f64 = 0.3;

impl Classifier {
    fn header(&self) -> String {
        format!(
            "[Focus | {} prompts | {}/{} mem | {} trees]\n",
            self.forest.meta.total_prompts,
            self.forest.node_count(),
            self.config.memory_size,
            self.forest.trees.len()
        )
    }

    /// Compact digest of the forest for injection into the next turn.
    ///
    /// Empty when the forest is empty. Otherwise a header, the five strongest
    /// trees by boosted decay score with up to three recent leaves each, and a
    /// prediction line when the top transition from the current topic has
    /// probability of at least 0.3. The body is cut to `context_limit` bytes at
    /// a line boundary before the close marker is appended. The header line is
    /// always kept whole, even when it alone exceeds the limit.
    pub fn render_context(&self) -> String {
        if self.forest.is_empty() {
            return String::new();
        }

        let now = Utc::now();
        let mut out = self.header();

        let mut scored: Vec<_> = self
            .forest
            .trees
            .iter()
            .filter_map(|tree| {
                let root = tree.root()?;
                let score = root.score(now, self.config.decay_rate) * self.boost_factor(&tree.id);
                Some((tree, root, score))
            })
            .collect();
        scored.sort_by(|a, b| b.2.total_cmp(&a.2));

        for (tree, root, score) in scored.into_iter().take(MAX_TREES) {
            let _ = writeln!(out, "  [{score:.2}] {}", root.content);

            let mut leaves: Vec<_> = tree
                .leaves()
                .into_iter()
                .filter(|leaf| leaf.id != tree.root_id)
                .collect();
            leaves.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed));
            for leaf in leaves.into_iter().take(MAX_LEAVES) {
                let _ = writeln!(out, "    - {}", ellipsize(&leaf.content, LEAF_CHARS));
            }
        }

        self.write_prediction(&mut out);
        self.limit_context(&mut out);
        out.push_str(CLOSE_MARKER);
        out
    }

    fn write_prediction(&self, out: &mut String) {
        let Some(last) = self.chain.last_topic.as_deref() else {
            return;
        };
        let top = self.chain.top_transitions(last, PREDICTION_TOPICS);
        if top.first().map_or(true, |t| t.probability < PREDICTION_MIN) {
            return;
        }

        out.push_str("  -> next:");
        for (i, t) in top.iter().enumerate() {
            let name = self
                .forest
                .tree(&t.topic_id)
                .and_then(|tree| tree.root())
                .map(|root| truncate_chars(&root.content, NAME_CHARS))
                .unwrap_or_else(|| truncate_chars(&t.topic_id, ID_CHARS));
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, " {name} ({:.0}%)", t.probability * 100.0);
        }
        out.push('\n');
    }

    fn limit_context(&self, out: &mut String) {
        let limit = self.config.context_limit;
        if limit == 0 {
            return;
        }
        let header_end = out.find('\n').map_or(out.len(), |idx| idx + 1);
        let mut cut = limit.max(header_end);
        if out.len() <= cut {
            return;
        }
        while !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
        if let Some(idx) = out.rfind('\n') {
            out.truncate(idx + 1);
        }
    }

    /// The context block, or a header-only block when nothing is stored yet.
    pub fn status_block(&self) -> String {
        let context = self.render_context();
        if context.is_empty() {
            format!("{}{CLOSE_MARKER}", self.header())
        } else {
            context
        }
    }
}

/// Insert `block` in front of the first close marker of `context`.
pub fn insert_before_close(context: &str, block: &str) -> String {
    if block.is_empty() {
        return context.to_string();
    }
    context.replacen(CLOSE_MARKER, &format!("{block}{CLOSE_MARKER}"), 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use crate::forest::{Forest, Tree};
    use crate::tfidf::Corpus;
    use crate::transition::TransitionChain;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn with_trees(trees: Vec<Tree>, chain: TransitionChain, config: GateConfig) -> Classifier {
        let mut forest = Forest::new();
        for tree in trees {
            forest.add_tree(tree);
        }
        Classifier::with_state(forest, Corpus::new(), chain, config)
    }

    #[test]
    fn test_render_empty_forest() {
        let c = Classifier::new(GateConfig::default());
        assert_eq!(c.render_context(), "");
    }

    #[test]
    fn test_render_single_tree() {
        let mut c = Classifier::new(GateConfig::default());
        let out = c.process_prompt("add JWT authentication to the API", "p0");
        assert_eq!(
            out,
            "[Focus | 1 prompts | 1/100 mem | 1 trees]\n\
             \x20 [1.00] add JWT authentication to the API\n\
             [/Focus]\n"
        );
    }

    #[test]
    fn test_render_recent_leaves_truncated() {
        let mut tree = Tree::new("root", "");
        let root_id = tree.root_id.clone();
        let base = Utc::now();
        let long = "x".repeat(100);
        for (i, content) in ["oldest", "older", "newer", long.as_str()].iter().enumerate() {
            let leaf = tree.add_child(&root_id, *content, "").unwrap();
            leaf.last_accessed = base - Duration::minutes(10 - i as i64);
        }

        let c = with_trees(vec![tree], TransitionChain::new(), GateConfig::default());
        let out = c.render_context();

        let truncated = format!("    - {}...", "x".repeat(80));
        let leaf_lines: Vec<&str> = out.lines().filter(|l| l.starts_with("    - ")).collect();
        assert_eq!(leaf_lines, vec![truncated.as_str(), "    - newer", "    - older"]);
    }

    #[test]
    fn test_render_prediction_line() {
        let auth = Tree::new("jwt authentication", "");
        let db = Tree::new("database migration", "");
        let mut chain = TransitionChain::new();
        chain.record(&auth.id, &db.id);
        chain.last_topic = Some(auth.id.clone());

        let c = with_trees(vec![auth, db], chain, GateConfig::default());
        let out = c.render_context();

        assert!(out.contains("  -> next: database migration (100%)\n"));
        // The boosted tree ranks first.
        let first_tree = out.lines().nth(1).unwrap();
        assert_eq!(first_tree, "  [1.20] database migration");
    }

    #[test]
    fn test_render_prediction_falls_back_to_short_id() {
        let auth = Tree::new("jwt authentication", "");
        let mut chain = TransitionChain::new();
        chain.record(&auth.id, "0123456789abcdef");
        chain.last_topic = Some(auth.id.clone());

        let c = with_trees(vec![auth], chain, GateConfig::default());
        assert!(c.render_context().contains("  -> next: 01234567 (100%)\n"));
    }

    #[test]
    fn test_render_no_prediction_below_threshold() {
        let trees: Vec<Tree> = (0..4).map(|i| Tree::new(format!("topic {i}"), "")).collect();
        let mut chain = TransitionChain::new();
        for t in &trees[1..] {
            chain.record(&trees[0].id, &t.id);
        }
        chain.record(&trees[0].id, "gone");
        chain.last_topic = Some(trees[0].id.clone());

        let c = with_trees(trees, chain, GateConfig::default());
        assert!(!c.render_context().contains("-> next:"));
    }

    #[test]
    fn test_render_respects_context_limit() {
        let trees: Vec<Tree> = (0..5)
            .map(|i| Tree::new(format!("a fairly long topic description number {i}"), ""))
            .collect();
        let config = GateConfig {
            context_limit: 120,
            ..GateConfig::default()
        };
        let c = with_trees(trees, TransitionChain::new(), config);
        let out = c.render_context();

        let body = out.strip_suffix(CLOSE_MARKER).unwrap();
        assert!(body.len() <= 120);
        assert!(body.ends_with('\n'));
        assert!(body.starts_with("[Focus | 0 prompts | 5/100 mem | 5 trees]\n"));
    }

    #[test]
    fn test_render_limit_below_header_keeps_whole_header() {
        let config = GateConfig {
            context_limit: 10,
            ..GateConfig::default()
        };
        let mut c = Classifier::new(config);
        let out = c.process_prompt("add JWT authentication to the API", "p0");

        assert_eq!(out, "[Focus | 1 prompts | 1/100 mem | 1 trees]\n[/Focus]\n");
    }

    #[test]
    fn test_render_limits_to_five_trees() {
        let trees: Vec<Tree> = (0..7).map(|i| Tree::new(format!("topic {i}"), "")).collect();
        let c = with_trees(trees, TransitionChain::new(), GateConfig::default());
        let out = c.render_context();
        assert_eq!(out.lines().filter(|l| l.starts_with("  [")).count(), 5);
    }

    #[test]
    fn test_status_block_empty_forest() {
        let c = Classifier::new(GateConfig::default());
        assert_eq!(
            c.status_block(),
            "[Focus | 0 prompts | 0/100 mem | 0 trees]\n[/Focus]\n"
        );
    }

    #[test]
    fn test_insert_before_close() {
        let context = "[Focus | 1 prompts | 1/100 mem | 1 trees]\n[/Focus]\n";
        assert_eq!(
            insert_before_close(context, "Guide:\n  - done\n"),
            "[Focus | 1 prompts | 1/100 mem | 1 trees]\nGuide:\n  - done\n[/Focus]\n"
        );
        assert_eq!(insert_before_close(context, ""), context);
    }
}
