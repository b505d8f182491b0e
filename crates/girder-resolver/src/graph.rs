//! The resolved dependency graph: one node per module, edges from
//! requester to requested, with tree rendering and path lookup for
//! diagnostics.

use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use girder_core::coordinate::ModuleId;
use girder_core::version::ExactVersion;

/// A node in the resolved dependency graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedNode {
    pub id: ModuleId,
    pub version: ExactVersion,
}

impl fmt::Display for ResolvedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.version)
    }
}

/// A resolved dependency graph backed by petgraph.
///
/// Nodes are keyed by `ModuleId`; the version stored on a node is the
/// arbitration winner and may be rewritten while resolution runs.
#[derive(Default)]
pub struct DependencyGraph {
    graph: DiGraph<ResolvedNode, ()>,
    index: HashMap<ModuleId, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or retrieve the node for a module.
    pub fn ensure_node(&mut self, id: &ModuleId, version: &ExactVersion) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(ResolvedNode {
            id: id.clone(),
            version: version.clone(),
        });
        self.index.insert(id.clone(), idx);
        idx
    }

    /// Rewrite a node's version after arbitration picked a new winner.
    pub fn update_version(&mut self, idx: NodeIndex, version: &ExactVersion) {
        self.graph[idx].version = version.clone();
    }

    /// Add a requester -> requested edge, ignoring duplicates.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) {
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, ());
        }
    }

    pub fn find(&self, id: &ModuleId) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &ResolvedNode {
        &self.graph[idx]
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct dependencies of a node.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.target())
            .collect()
    }

    /// Reverse dependencies (who requested this node).
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| e.source())
            .collect()
    }

    /// Nodes with no requester: the directly declared modules.
    pub fn roots(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .edges_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .collect()
    }

    /// Find the requester chain leading to a module.
    ///
    /// Accepts either `group:name` or a bare name (partial match).
    pub fn find_path(&self, target_key: &str) -> Option<Vec<&ResolvedNode>> {
        let target = self.resolve_key(target_key)?;
        for root in self.roots() {
            let mut path = Vec::new();
            let mut visited = HashSet::new();
            if self.dfs_path(root, target, &mut path, &mut visited) {
                return Some(path.iter().map(|&idx| &self.graph[idx]).collect());
            }
        }
        None
    }

    fn resolve_key(&self, key: &str) -> Option<NodeIndex> {
        for (id, &idx) in &self.index {
            if id.to_string() == key || id.name == key {
                return Some(idx);
            }
        }
        None
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for edge in self.graph.edges(current) {
            if self.dfs_path(edge.target(), target, path, visited) {
                return true;
            }
        }
        path.pop();
        false
    }

    /// Render the graph as a forest rooted at the direct declarations.
    pub fn print_tree(&self) -> String {
        let mut output = String::new();
        let mut roots: Vec<NodeIndex> = self.roots();
        roots.sort_by_key(|&idx| self.graph[idx].id.clone());

        let mut visited = HashSet::new();
        let count = roots.len();
        for (i, root) in roots.into_iter().enumerate() {
            let node = &self.graph[root];
            output.push_str(&format!("{node}\n"));
            visited.insert(root);
            let children = self.sorted_children(root);
            let child_count = children.len();
            for (j, child) in children.into_iter().enumerate() {
                self.print_subtree(&mut output, child, "", j == child_count - 1, &mut visited);
            }
            visited.remove(&root);
            if i + 1 < count {
                output.push('\n');
            }
        }
        output
    }

    fn sorted_children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        // Stable order for rendering; resolution order lives in the
        // artifact list, not the tree.
        let mut children = self.dependencies_of(idx);
        children.sort_by_key(|&c| self.graph[c].id.clone());
        children
    }

    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        output.push_str(&format!("{prefix}{connector}{node}\n"));

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let children = self.sorted_children(idx);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.print_subtree(output, child, &child_prefix, i == count - 1, visited);
        }

        visited.remove(&idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(group: &str, name: &str) -> ModuleId {
        ModuleId::new(group, name)
    }

    fn v(s: &str) -> ExactVersion {
        ExactVersion::parse(s)
    }

    #[test]
    fn ensure_node_dedupes_by_module() {
        let mut g = DependencyGraph::new();
        let a1 = g.ensure_node(&id("org.a", "a"), &v("1.0"));
        let a2 = g.ensure_node(&id("org.a", "a"), &v("2.0"));
        assert_eq!(a1, a2);
        assert_eq!(g.node(a1).version, v("1.0"));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn update_version_rewrites_node() {
        let mut g = DependencyGraph::new();
        let a = g.ensure_node(&id("org.a", "a"), &v("1.0"));
        g.update_version(a, &v("2.0"));
        assert_eq!(g.node(a).version, v("2.0"));
    }

    #[test]
    fn roots_are_nodes_without_requesters() {
        let mut g = DependencyGraph::new();
        let a = g.ensure_node(&id("org.a", "a"), &v("1.0"));
        let b = g.ensure_node(&id("org.b", "b"), &v("1.0"));
        g.add_edge(a, b);
        assert_eq!(g.roots(), vec![a]);
    }

    #[test]
    fn find_path_through_chain() {
        let mut g = DependencyGraph::new();
        let a = g.ensure_node(&id("org.a", "a"), &v("1.0"));
        let b = g.ensure_node(&id("org.b", "b"), &v("1.0"));
        let c = g.ensure_node(&id("org.c", "c"), &v("1.0"));
        g.add_edge(a, b);
        g.add_edge(b, c);

        let path = g.find_path("org.c:c").unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[0].id, id("org.a", "a"));
        assert_eq!(path[2].id, id("org.c", "c"));
    }

    #[test]
    fn find_path_partial_key() {
        let mut g = DependencyGraph::new();
        let a = g.ensure_node(&id("org.a", "my-lib"), &v("1.0"));
        let _ = a;
        let path = g.find_path("my-lib").unwrap();
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn find_path_missing_module() {
        let g = DependencyGraph::new();
        assert!(g.find_path("org.zz:zz").is_none());
    }

    #[test]
    fn tree_printing_covers_all_nodes() {
        let mut g = DependencyGraph::new();
        let a = g.ensure_node(&id("org.a", "a"), &v("1.0"));
        let b = g.ensure_node(&id("org.b", "b"), &v("2.0"));
        let c = g.ensure_node(&id("org.c", "c"), &v("3.0"));
        g.add_edge(a, c);
        g.add_edge(b, c);

        let tree = g.print_tree();
        assert!(tree.contains("org.a:a:1.0"));
        assert!(tree.contains("org.b:b:2.0"));
        assert!(tree.contains("org.c:c:3.0"));
    }

    #[test]
    fn duplicate_edges_ignored() {
        let mut g = DependencyGraph::new();
        let a = g.ensure_node(&id("org.a", "a"), &v("1.0"));
        let b = g.ensure_node(&id("org.b", "b"), &v("1.0"));
        g.add_edge(a, b);
        g.add_edge(a, b);
        assert_eq!(g.dependencies_of(a).len(), 1);
    }
}
