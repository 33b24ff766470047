//! Folder hierarchy built from (parent, child) path-segment edges.
//!
//! Nodes are keyed by segment name, so two folders with the same name
//! anywhere on disk are the same node. Child and parent lists are reported
//! in first-seen order and the graph is always rebuilt from scratch.

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const TREE_ROOT: &str = "Root";

#[derive(Debug, Clone, Default)]
pub struct PathGraph {
    graph: StableDiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

/// Nested view of the hierarchy, suitable for JSON export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub children: Vec<TreeNode>,
}

impl PathGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from edges. Repeated edges have no additional effect
    /// and cycles are not rejected.
    pub fn build<I, P, C>(edges: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: AsRef<str>,
    {
        let mut graph = Self::new();
        for (parent, child) in edges {
            graph.add_edge(parent.as_ref(), child.as_ref());
        }
        graph
    }

    pub fn add_edge(&mut self, parent: &str, child: &str) {
        let p = self.intern(parent);
        let c = self.intern(child);
        if !self.graph.contains_edge(p, c) {
            self.graph.add_edge(p, c, ());
        }
    }

    fn intern(&mut self, name: &str) -> NodeIndex {
        if let Some(idx) = self.index.get(name) {
            return *idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All node names in first-seen order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(|idx| self.graph[idx].as_str())
    }

    pub fn children(&self, name: &str) -> Vec<&str> {
        self.neighbours(name, Direction::Outgoing)
    }

    pub fn parents(&self, name: &str) -> Vec<&str> {
        self.neighbours(name, Direction::Incoming)
    }

    pub fn has_children(&self, name: &str) -> bool {
        self.index.get(name).is_some_and(|idx| {
            self.graph
                .neighbors_directed(*idx, Direction::Outgoing)
                .next()
                .is_some()
        })
    }

    // petgraph hands back adjacency newest-first; sort by edge index to
    // recover insertion order.
    fn neighbours(&self, name: &str, direction: Direction) -> Vec<&str> {
        let Some(idx) = self.index.get(name) else {
            return Vec::new();
        };

        let mut edges: Vec<_> = self
            .graph
            .edges_directed(*idx, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (edge.id(), other)
            })
            .collect();
        edges.sort_by_key(|(edge_id, _)| *edge_id);

        edges
            .into_iter()
            .map(|(_, other)| self.graph[other].as_str())
            .collect()
    }

    /// Nodes never seen as a child.
    pub fn roots(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter(|idx| {
                self.graph
                    .neighbors_directed(*idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].as_str())
            .collect()
    }

    /// Every node reachable from `name`, depth-first, each reported once.
    /// The start node itself is not included.
    pub fn descendants(&self, name: &str) -> Vec<&str> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();
        visited.insert(name);

        let mut stack: Vec<&str> = self.children(name).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            order.push(current);
            for child in self.children(current).into_iter().rev() {
                if !visited.contains(child) {
                    stack.push(child);
                }
            }
        }

        order
    }

    /// Hierarchy under a synthetic root whose children are the graph roots.
    pub fn to_tree(&self) -> TreeNode {
        let mut on_path = HashSet::new();
        TreeNode {
            name: TREE_ROOT.to_string(),
            children: self
                .roots()
                .into_iter()
                .map(|root| self.subtree(root, &mut on_path))
                .collect(),
        }
    }

    fn subtree<'a>(&'a self, name: &'a str, on_path: &mut HashSet<&'a str>) -> TreeNode {
        on_path.insert(name);
        let children = self
            .children(name)
            .into_iter()
            .filter(|child| !on_path.contains(child))
            .collect::<Vec<_>>()
            .into_iter()
            .map(|child| self.subtree(child, on_path))
            .collect();
        on_path.remove(name);

        TreeNode {
            name: name.to_string(),
            children,
        }
    }
}
