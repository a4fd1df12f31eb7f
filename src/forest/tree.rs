use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::node::{new_id, Node};

/// A rooted hierarchy of nodes stored in a flat id-indexed map.
///
/// The root holds an abstracted summary of its descendants after bubble-up;
/// leaves hold literal prompt text. Parent links are plain ids, so the tree
/// owns every node exclusively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    /// Unique tree identifier (also the topic id in the transition chain).
    pub id: String,
    /// Id of the single parentless node.
    pub root_id: String,
    /// All nodes of this tree.
    pub nodes: HashMap<String, Node>,
    /// When the tree was created.
    pub created: DateTime<Utc>,
    /// When a node was last added.
    pub last_accessed: DateTime<Utc>,
}

impl Tree {
    /// Create a single-node tree whose root holds `content`.
    pub fn new(content: impl Into<String>, source: &str) -> Self {
        let root = Node::new(content, 0, source);
        let now = root.created;
        let root_id = root.id.clone();
        let mut nodes = HashMap::new();
        nodes.insert(root_id.clone(), root);
        Self {
            id: new_id(),
            root_id,
            nodes,
            created: now,
            last_accessed: now,
        }
    }

    /// The root node, if the tree is well formed.
    pub fn root(&self) -> Option<&Node> {
        self.nodes.get(&self.root_id)
    }

    /// Mutable access to the root node.
    pub fn root_mut(&mut self) -> Option<&mut Node> {
        self.nodes.get_mut(&self.root_id)
    }

    /// Look up a node by id.
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Mutable lookup by id.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Insert a new child under `parent_id`.
    ///
    /// Returns `None` and leaves the tree untouched when the parent does not exist.
    pub fn add_child(
        &mut self,
        parent_id: &str,
        content: impl Into<String>,
        source: &str,
    ) -> Option<&mut Node> {
        let parent = self.nodes.get_mut(parent_id)?;
        let mut child = Node::new(content, parent.depth + 1, source);
        child.parent_id = Some(parent_id.to_string());
        parent.child_ids.push(child.id.clone());

        self.last_accessed = child.created;
        let child_id = child.id.clone();
        self.nodes.insert(child_id.clone(), child);
        self.nodes.get_mut(&child_id)
    }

    /// Remove a node and all of its descendants.
    ///
    /// The node is detached from its parent's child list first; the subtree is
    /// then walked with an explicit stack. Unknown ids are a no-op.
    pub fn remove_node(&mut self, id: &str) {
        let Some(parent_id) = self.nodes.get(id).map(|n| n.parent_id.clone()) else {
            return;
        };

        if let Some(pid) = parent_id {
            if let Some(parent) = self.nodes.get_mut(&pid) {
                parent.child_ids.retain(|cid| cid != id);
            }
        }

        let mut stack = vec![id.to_string()];
        while let Some(nid) = stack.pop() {
            if let Some(node) = self.nodes.remove(&nid) {
                stack.extend(node.child_ids);
            }
        }
    }

    /// All leaves in depth-first order from the root, following child order.
    ///
    /// A single-node tree yields its root.
    pub fn leaves(&self) -> Vec<&Node> {
        self.leaves_under(&self.root_id)
    }

    /// Leaves of the subtree rooted at `id`, in depth-first child order.
    pub fn leaves_under(&self, id: &str) -> Vec<&Node> {
        self.subtree(id).into_iter().filter(|n| n.is_leaf()).collect()
    }

    /// Nodes of the subtree rooted at `id` in pre-order. Unknown ids yield nothing.
    pub fn subtree(&self, id: &str) -> Vec<&Node> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(nid) = stack.pop() {
            let Some(node) = self.nodes.get(nid) else {
                continue;
            };
            out.push(node);
            stack.extend(node.child_ids.iter().rev().map(String::as_str));
        }
        out
    }

    /// Direct children of a node, in order. Unknown ids yield nothing.
    pub fn children(&self, id: &str) -> Vec<&Node> {
        self.nodes
            .get(id)
            .map(|node| {
                node.child_ids
                    .iter()
                    .filter_map(|cid| self.nodes.get(cid))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of nodes in this tree.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tree() {
        let tree = Tree::new("root content", "src1");
        let root = tree.root().unwrap();

        assert_eq!(tree.node_count(), 1);
        assert_eq!(root.content, "root content");
        assert_eq!(root.depth, 0);
        assert!(root.parent_id.is_none());
        assert_ne!(tree.id, tree.root_id);
    }

    #[test]
    fn test_add_child() {
        let mut tree = Tree::new("root", "");
        let root_id = tree.root_id.clone();
        let child_id = tree.add_child(&root_id, "child", "src").unwrap().id.clone();

        let child = tree.get(&child_id).unwrap();
        assert_eq!(child.depth, 1);
        assert_eq!(child.parent_id.as_deref(), Some(root_id.as_str()));
        assert_eq!(tree.root().unwrap().child_ids, vec![child_id]);
        assert_eq!(tree.node_count(), 2);
    }

    #[test]
    fn test_add_child_missing_parent() {
        let mut tree = Tree::new("root", "");
        assert!(tree.add_child("nope", "child", "").is_none());
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_remove_node_removes_subtree() {
        let mut tree = Tree::new("root", "");
        let root_id = tree.root_id.clone();
        let a = tree.add_child(&root_id, "a", "").unwrap().id.clone();
        let b = tree.add_child(&root_id, "b", "").unwrap().id.clone();
        let a1 = tree.add_child(&a, "a1", "").unwrap().id.clone();
        tree.add_child(&a1, "a1x", "");

        tree.remove_node(&a);

        assert_eq!(tree.node_count(), 2);
        assert!(tree.get(&a).is_none());
        assert!(tree.get(&a1).is_none());
        assert_eq!(tree.root().unwrap().child_ids, vec![b]);
    }

    #[test]
    fn test_remove_unknown_node_is_noop() {
        let mut tree = Tree::new("root", "");
        tree.remove_node("missing");
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_remove_deep_chain_is_iterative() {
        let mut tree = Tree::new("root", "");
        let mut parent = tree.root_id.clone();
        for i in 0..10_000 {
            parent = tree.add_child(&parent, format!("n{i}"), "").unwrap().id.clone();
        }
        let first = tree.root().unwrap().child_ids[0].clone();
        tree.remove_node(&first);
        assert_eq!(tree.node_count(), 1);
        assert!(tree.root().unwrap().is_leaf());
    }

    #[test]
    fn test_leaves_in_child_order() {
        let mut tree = Tree::new("root", "");
        let root_id = tree.root_id.clone();
        let a = tree.add_child(&root_id, "a", "").unwrap().id.clone();
        tree.add_child(&a, "a1", "");
        tree.add_child(&a, "a2", "");
        tree.add_child(&root_id, "b", "");

        let contents: Vec<&str> = tree.leaves().iter().map(|n| n.content.as_str()).collect();
        assert_eq!(contents, vec!["a1", "a2", "b"]);
    }

    #[test]
    fn test_single_node_leaf_is_root() {
        let tree = Tree::new("root", "");
        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].id, tree.root_id);
    }

    #[test]
    fn test_subtree_preorder() {
        let mut tree = Tree::new("root", "");
        let root_id = tree.root_id.clone();
        let a = tree.add_child(&root_id, "a", "").unwrap().id.clone();
        tree.add_child(&a, "a1", "");
        tree.add_child(&root_id, "b", "");

        let order: Vec<&str> = tree.subtree(&root_id).iter().map(|n| n.content.as_str()).collect();
        assert_eq!(order, vec!["root", "a", "a1", "b"]);
        let under: Vec<&str> = tree.leaves_under(&a).iter().map(|n| n.content.as_str()).collect();
        assert_eq!(under, vec!["a1"]);
        assert!(tree.subtree("missing").is_empty());
    }

    #[test]
    fn test_children() {
        let mut tree = Tree::new("root", "");
        let root_id = tree.root_id.clone();
        tree.add_child(&root_id, "x", "");
        tree.add_child(&root_id, "y", "");

        let names: Vec<&str> = tree.children(&root_id).iter().map(|n| n.content.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert!(tree.children("missing").is_empty());
    }

    #[test]
    fn test_serde_round_trip_keeps_structure() {
        let mut tree = Tree::new("root", "p0");
        let root_id = tree.root_id.clone();
        tree.add_child(&root_id, "child", "p1");

        let json = serde_json::to_string(&tree).unwrap();
        assert!(json.contains("\"rootId\""));
        let back: Tree = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }
}
