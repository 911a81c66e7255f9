//! Decorated file tree.

use crate::fs::walker::TreeShape;
use crate::model::path::CanonicalPath;
use std::collections::BTreeSet;

/// Tree node with its note flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedNode {
    pub name: String,
    pub path: CanonicalPath,
    pub is_dir: bool,
    /// Always `false` for directories.
    pub has_note: bool,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Index arena of decorated nodes; node 0 is the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedTree {
    /// Header label, normally the project name.
    pub label: String,
    pub nodes: Vec<DecoratedNode>,
}

impl DecoratedTree {
    pub fn root(&self) -> Option<&DecoratedNode> {
        self.nodes.first()
    }

    pub fn children_of(&self, index: usize) -> impl Iterator<Item = &DecoratedNode> {
        self.nodes
            .get(index)
            .into_iter()
            .flat_map(|node| node.children.iter())
            .filter_map(|&child| self.nodes.get(child))
    }

    /// Paths of every flagged node, in tree order.
    pub fn noted_paths(&self) -> impl Iterator<Item = &CanonicalPath> {
        self.nodes
            .iter()
            .filter(|node| node.has_note)
            .map(|node| &node.path)
    }

    /// Depth-first `(depth, node)` pairs starting at the root.
    pub fn walk(&self) -> Vec<(usize, &DecoratedNode)> {
        let mut ordered = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, usize)> = Vec::new();
        if !self.nodes.is_empty() {
            stack.push((0, TreeShape::ROOT));
        }
        while let Some((depth, index)) = stack.pop() {
            let node = &self.nodes[index];
            ordered.push((depth, node));
            for &child in node.children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        ordered
    }
}

/// Annotates every file node of `shape` whose path is in `highlighted`.
pub fn build_tree_model(
    shape: &TreeShape,
    highlighted: &BTreeSet<CanonicalPath>,
    label: impl Into<String>,
) -> DecoratedTree {
    let nodes = shape
        .nodes
        .iter()
        .map(|node| DecoratedNode {
            name: node.name.clone(),
            path: node.path.clone(),
            is_dir: node.is_dir,
            has_note: !node.is_dir && highlighted.contains(&node.path),
            parent: node.parent,
            children: node.children.clone(),
        })
        .collect();

    DecoratedTree {
        label: label.into(),
        nodes,
    }
}
