//! Human and JSON views of persisted state and of dry-run traces.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classifier::{Action, DryRunResult};
use crate::config::GateConfig;
use crate::forest::{Forest, Node, Tree};
use crate::session::Session;
use crate::storage::DocumentStore;
use crate::text::{ellipsize, truncate_chars};

const TEXT_TOP_TERMS: usize = 20;
const JSON_TOP_TERMS: usize = 30;
const NODE_CHARS: usize = 70;
const SUMMARY_CHARS: usize = 80;
const DRY_RUN_CHARS: usize = 50;
const TREE_NAME_CHARS: usize = 30;
const RULE: &str = "═══════════════════════════════════════════════════════════════";

fn timestamp(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn indexed_flag(node: &Node) -> &'static str {
    if node.indexed {
        "Y"
    } else {
        "-"
    }
}

fn node_stats(node: &Node, now: DateTime<Utc>, decay_rate: f64) -> String {
    format!(
        "d={} w={:.2} f={} idx={} s={:.3}",
        node.depth,
        node.weight,
        node.frequency,
        indexed_flag(node),
        node.score(now, decay_rate)
    )
}

/// Short name of a tree: its root content, cut to 30 characters.
fn tree_name<'a>(forest: &'a Forest, tree_id: &str) -> Option<&'a str> {
    let root = forest.tree(tree_id)?.root()?;
    Some(truncate_chars(&root.content, TREE_NAME_CHARS))
}

/// Name of the tree holding `node_id`.
fn node_tree_name<'a>(forest: &'a Forest, node_id: &str) -> Option<&'a str> {
    let tree = forest.trees.iter().find(|t| t.nodes.contains_key(node_id))?;
    let root = tree.root()?;
    Some(truncate_chars(&root.content, TREE_NAME_CHARS))
}

fn with_name(id: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{id} ({name})"),
        None => id.to_string(),
    }
}

/// Draw a tree's hierarchy with box connectors, iteratively in pre-order.
fn write_node_tree(out: &mut String, tree: &Tree, now: DateTime<Utc>, decay_rate: f64) {
    let Some(root) = tree.root() else {
        return;
    };
    let prefix = "    ";
    let _ = writeln!(out, "{prefix}[root] {}  {}", root.id, node_stats(root, now, decay_rate));
    let _ = writeln!(out, "{prefix}{:?}", ellipsize(&root.content, NODE_CHARS));

    let mut stack: Vec<(&Node, String, bool)> = Vec::new();
    push_children(&mut stack, tree, root, prefix);
    while let Some((node, prefix, last)) = stack.pop() {
        let (connector, extension) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        let _ = writeln!(
            out,
            "{prefix}{connector}{}  {}",
            node.id,
            node_stats(node, now, decay_rate)
        );
        let _ = writeln!(out, "{prefix}{extension}{:?}", ellipsize(&node.content, NODE_CHARS));
        push_children(&mut stack, tree, node, &format!("{prefix}{extension}"));
    }
}

fn push_children<'a>(
    stack: &mut Vec<(&'a Node, String, bool)>,
    tree: &'a Tree,
    node: &Node,
    prefix: &str,
) {
    let children = tree.children(&node.id);
    let count = children.len();
    for (i, child) in children.into_iter().enumerate().rev() {
        stack.push((child, prefix.to_string(), i + 1 == count));
    }
}

/// Multi-section text dump of everything the session loaded.
pub fn inspect_text<S: DocumentStore>(session: &Session<S>, config: &GateConfig) -> String {
    let now = Utc::now();
    let forest = &session.classifier.forest;
    let corpus = &session.classifier.corpus;
    let chain = &session.classifier.chain;
    let guide = &session.guide;
    let mut out = String::new();

    out.push_str("\nIntent Gate Inspect\n");
    out.push_str(RULE);
    out.push_str("\n\n");

    out.push_str("--- Config ---\n");
    let _ = writeln!(out, "  memorySize:        {}", config.memory_size);
    let _ = writeln!(out, "  decayRate:         {:.3}", config.decay_rate);
    let _ = writeln!(out, "  similarity.extend: {:.3}", config.extend_threshold);
    let _ = writeln!(out, "  similarity.branch: {:.3}", config.branch_threshold);
    let _ = writeln!(out, "  contextLimit:      {}", config.context_limit);
    let _ = writeln!(out, "  bubbleUpTerms:     {}", config.bubble_up_terms);
    let _ = writeln!(out, "  maxSourcesPerNode: {}", config.max_sources_per_node);
    let _ = writeln!(out, "  guideSize:         {}", config.guide_size);
    let _ = writeln!(out, "  transitionBoost:   {:.3}", config.transition_boost);
    out.push('\n');

    let _ = writeln!(
        out,
        "--- Forest: {} trees, {}/{} nodes, {} prompts ---",
        forest.trees.len(),
        forest.node_count(),
        config.memory_size,
        forest.meta.total_prompts
    );
    let _ = writeln!(out, "  created:    {}", timestamp(forest.meta.created));
    let _ = writeln!(out, "  lastUpdate: {}", timestamp(forest.meta.last_update));
    out.push('\n');

    for (i, tree) in forest.trees.iter().enumerate() {
        let Some(root) = tree.root() else {
            continue;
        };
        let _ = writeln!(
            out,
            "  Tree #{i} [id={}] score={:.3}",
            tree.id,
            root.score(now, config.decay_rate)
        );
        let _ = writeln!(
            out,
            "    {} nodes, {} leaves, created {}",
            tree.node_count(),
            tree.leaves().len(),
            timestamp(tree.created)
        );
        write_node_tree(&mut out, tree, now, config.decay_rate);
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "--- TF-IDF: {} docs, {} unique terms ---",
        corpus.total_docs,
        corpus.unique_terms()
    );
    let top = corpus.top_terms(TEXT_TOP_TERMS);
    if !top.is_empty() {
        let _ = writeln!(out, "  Top {} by document frequency:", top.len());
        for (term, df) in top {
            let _ = writeln!(out, "    {term:<20} df={df}");
        }
    }
    out.push('\n');

    let _ = writeln!(out, "--- Guide: {}/{} entries ---", guide.len(), guide.max_size);
    for (i, entry) in guide.entries.iter().enumerate() {
        let status = if entry.reinforced { "reinforced" } else { "pending" };
        let target = with_name(&entry.intent_id, node_tree_name(forest, &entry.intent_id));
        let _ = writeln!(
            out,
            "  #{i} [{status:<10}] -> {target}  {}",
            timestamp(entry.timestamp)
        );
        let _ = writeln!(out, "     {:?}", ellipsize(&entry.summary, SUMMARY_CHARS));
    }
    out.push('\n');

    out.push_str("--- Transitions ---\n");
    match chain.last_topic.as_deref() {
        Some(last) => {
            let _ = writeln!(out, "  Last topic: {}", with_name(last, tree_name(forest, last)));
        }
        None => out.push_str("  Last topic: (none)\n"),
    }
    for (from, dests) in chain.rows() {
        let total: u64 = dests.iter().map(|(_, c)| c).sum();
        let _ = writeln!(out, "  {} ->", with_name(from, tree_name(forest, from)));
        for (to, count) in dests {
            let pct = count as f64 / total as f64 * 100.0;
            let _ = writeln!(
                out,
                "    {}: {count}/{total} ({pct:.1}%)",
                with_name(to, tree_name(forest, to))
            );
        }
    }

    out
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectView<'a> {
    config: &'a GateConfig,
    forest: ForestView<'a>,
    tfidf: CorpusView<'a>,
    guide: GuideView<'a>,
    transitions: ChainView<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ForestView<'a> {
    total_prompts: u64,
    node_count: usize,
    memory_size: usize,
    tree_count: usize,
    created: DateTime<Utc>,
    last_update: DateTime<Utc>,
    trees: Vec<TreeView<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TreeView<'a> {
    id: &'a str,
    root_id: &'a str,
    node_count: usize,
    leaf_count: usize,
    root_score: f64,
    created: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
    root: NodeView<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeView<'a> {
    id: &'a str,
    content: &'a str,
    depth: u32,
    weight: f64,
    frequency: u32,
    indexed: bool,
    score: f64,
    created: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
    #[serde(skip_serializing_if = "no_sources")]
    sources: &'a [String],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<NodeView<'a>>,
}

fn no_sources(sources: &&[String]) -> bool {
    sources.is_empty()
}

impl<'a> NodeView<'a> {
    fn build(tree: &'a Tree, node: &'a Node, now: DateTime<Utc>, decay_rate: f64) -> Self {
        Self {
            id: &node.id,
            content: &node.content,
            depth: node.depth,
            weight: node.weight,
            frequency: node.frequency,
            indexed: node.indexed,
            score: node.score(now, decay_rate),
            created: node.created,
            last_accessed: node.last_accessed,
            sources: &node.sources,
            children: tree
                .children(&node.id)
                .into_iter()
                .map(|child| Self::build(tree, child, now, decay_rate))
                .collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CorpusView<'a> {
    total_docs: u64,
    unique_terms: usize,
    top_terms: Vec<TermCount<'a>>,
}

#[derive(Serialize)]
struct TermCount<'a> {
    term: &'a str,
    df: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GuideView<'a> {
    count: usize,
    max_size: usize,
    entries: Vec<GuideEntryView<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GuideEntryView<'a> {
    summary: &'a str,
    intent_id: &'a str,
    reinforced: bool,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChainView<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    last_topic: Option<&'a str>,
    topic_count: usize,
    transitions: Vec<RowView<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RowView<'a> {
    from: &'a str,
    total: u64,
    to: Vec<DestView<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DestView<'a> {
    topic_id: &'a str,
    count: u64,
    probability: f64,
}

/// Pretty JSON dump of everything the session loaded, with computed scores.
pub fn inspect_json<S: DocumentStore>(
    session: &Session<S>,
    config: &GateConfig,
) -> serde_json::Result<String> {
    let now = Utc::now();
    let forest = &session.classifier.forest;
    let corpus = &session.classifier.corpus;
    let chain = &session.classifier.chain;
    let guide = &session.guide;

    let trees = forest
        .trees
        .iter()
        .filter_map(|tree| {
            let root = tree.root()?;
            Some(TreeView {
                id: &tree.id,
                root_id: &tree.root_id,
                node_count: tree.node_count(),
                leaf_count: tree.leaves().len(),
                root_score: root.score(now, config.decay_rate),
                created: tree.created,
                last_accessed: tree.last_accessed,
                root: NodeView::build(tree, root, now, config.decay_rate),
            })
        })
        .collect();

    let rows = chain.rows();
    let view = InspectView {
        config,
        forest: ForestView {
            total_prompts: forest.meta.total_prompts,
            node_count: forest.node_count(),
            memory_size: config.memory_size,
            tree_count: forest.trees.len(),
            created: forest.meta.created,
            last_update: forest.meta.last_update,
            trees,
        },
        tfidf: CorpusView {
            total_docs: corpus.total_docs,
            unique_terms: corpus.unique_terms(),
            top_terms: corpus
                .top_terms(JSON_TOP_TERMS)
                .into_iter()
                .map(|(term, df)| TermCount { term, df })
                .collect(),
        },
        guide: GuideView {
            count: guide.len(),
            max_size: guide.max_size,
            entries: guide
                .entries
                .iter()
                .map(|e| GuideEntryView {
                    summary: &e.summary,
                    intent_id: &e.intent_id,
                    reinforced: e.reinforced,
                    timestamp: e.timestamp,
                })
                .collect(),
        },
        transitions: ChainView {
            last_topic: chain.last_topic.as_deref(),
            topic_count: rows.len(),
            transitions: rows
                .into_iter()
                .map(|(from, dests)| {
                    let total: u64 = dests.iter().map(|(_, c)| c).sum();
                    RowView {
                        from,
                        total,
                        to: dests
                            .into_iter()
                            .map(|(topic_id, count)| DestView {
                                topic_id,
                                count,
                                probability: count as f64 / total as f64,
                            })
                            .collect(),
                    }
                })
                .collect(),
        },
    };

    serde_json::to_string_pretty(&view)
}

/// Step-by-step text trace of a dry run.
pub fn dry_run_text(result: &DryRunResult, config: &GateConfig) -> String {
    let mut out = String::new();

    out.push_str("\nIntent Gate Dry Run\n");
    out.push_str(RULE);
    out.push_str("\n\n");
    let _ = writeln!(out, "Prompt: {:?}", result.prompt);
    let _ = writeln!(out, "Tokens: {:?}", result.tokens);
    out.push('\n');

    if !result.vector.is_empty() {
        let _ = writeln!(out, "TF-IDF Vector ({} terms):", result.vector.len());
        for t in &result.vector {
            let _ = writeln!(out, "  {:<20} {:.4}", t.term, t.weight);
        }
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "Thresholds: extend >= {:.3}, branch >= {:.3}",
        config.extend_threshold, config.branch_threshold
    );
    out.push('\n');

    if result.tree_scores.is_empty() {
        out.push_str("  (no trees scored)\n\n");
    } else {
        out.push_str("Per-tree scoring:\n");
        for ts in &result.tree_scores {
            let _ = writeln!(
                out,
                "  Tree #{} {:?}  [boost={:.3}]",
                ts.tree_idx,
                ellipsize(&ts.root_content, DRY_RUN_CHARS),
                ts.boost_factor
            );
            let _ = writeln!(
                out,
                "    Root {:<14}  cosine={:.4}  boosted={:.4}",
                ts.root_id, ts.root_cosine, ts.root_boosted
            );
            for ls in &ts.leaf_scores {
                let best = result.best_tree == ts.tree_idx
                    && result.best_leaf.as_deref() == Some(ls.leaf_id.as_str());
                let _ = writeln!(
                    out,
                    "    Leaf {:<14}  cosine={:.4}  boosted={:.4}  {:?}{}",
                    ls.leaf_id,
                    ls.cosine,
                    ls.boosted,
                    ellipsize(&ls.content, DRY_RUN_CHARS),
                    if best { "  <- BEST" } else { "" }
                );
            }
            out.push('\n');
        }
    }

    let _ = writeln!(
        out,
        "Result: {} (score={:.4})",
        result.best_action, result.best_score
    );
    match result.best_action {
        Action::New => out.push_str("  Would create a new topic tree with this prompt.\n"),
        Action::Branch => {
            let _ = writeln!(
                out,
                "  Would add as new subtopic under root of Tree #{}.",
                result.best_tree
            );
        }
        Action::Extend => {
            let target = result.best_leaf.as_deref().unwrap_or("(root)");
            let _ = writeln!(
                out,
                "  Would add as sibling near leaf {target} in Tree #{}.",
                result.best_tree
            );
        }
    }

    out
}

/// Pretty JSON form of a dry run.
pub fn dry_run_json(result: &DryRunResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}
