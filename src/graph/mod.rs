//! Whole-project dependency graph.
//!
//! Nodes are built per file by [`DependencyAnalyzer`], then frozen by
//! [`DependencyGraph::from_nodes`], which sorts them by path and fills in the
//! reverse edges. After that nothing mutates a node.

pub mod analyzer;
pub mod filter;
pub mod resolver;
pub mod scan;
pub mod search;

pub use analyzer::DependencyAnalyzer;
pub use filter::FileFilter;
pub use resolver::ModuleResolver;
pub use scan::{discover, Discovery};
pub use search::ReferenceIndex;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One source file in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub path: PathBuf,
    /// Resolved local imports, first-occurrence order
    pub imports: Vec<PathBuf>,
    pub exports: Vec<String>,
    /// Files whose `imports` name this file
    pub dependents: Vec<PathBuf>,
    pub is_entry_point: bool,
    /// More than one dependent
    pub is_shared: bool,
    pub risk_score: u8,
}

impl DependencyNode {
    pub fn new(path: PathBuf, imports: Vec<PathBuf>, exports: Vec<String>) -> Self {
        Self {
            path,
            imports,
            exports,
            dependents: Vec::new(),
            is_entry_point: false,
            is_shared: false,
            risk_score: 0,
        }
    }
}

/// Usage-map projection of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEntry {
    pub imports: Vec<PathBuf>,
    pub exports: Vec<String>,
    pub dependents: Vec<PathBuf>,
    pub is_shared: bool,
    pub usage_count: usize,
}

pub type UsageMap = BTreeMap<PathBuf, UsageEntry>;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
    index: HashMap<PathBuf, usize>,
}

impl DependencyGraph {
    /// Freeze a set of nodes: sort by path, drop duplicate paths, run the
    /// reverse pass and derive `is_shared`.
    pub fn from_nodes(mut nodes: Vec<DependencyNode>) -> Self {
        nodes.sort_by(|a, b| a.path.cmp(&b.path));
        nodes.dedup_by(|a, b| a.path == b.path);

        let index: HashMap<PathBuf, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.path.clone(), i))
            .collect();

        let mut reverse: Vec<Vec<PathBuf>> = vec![Vec::new(); nodes.len()];
        for node in &nodes {
            for import in &node.imports {
                if import == &node.path {
                    continue;
                }
                if let Some(&target) = index.get(import) {
                    reverse[target].push(node.path.clone());
                }
            }
        }

        for (node, dependents) in nodes.iter_mut().zip(reverse) {
            node.is_shared = dependents.len() > 1;
            node.dependents = dependents;
        }

        Self { nodes, index }
    }

    pub fn node(&self, path: &Path) -> Option<&DependencyNode> {
        self.index.get(path).map(|&i| &self.nodes[i])
    }

    /// All nodes, sorted by path.
    pub fn nodes(&self) -> &[DependencyNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn usage_map(&self) -> UsageMap {
        self.nodes
            .iter()
            .map(|n| {
                (
                    n.path.clone(),
                    UsageEntry {
                        imports: n.imports.clone(),
                        exports: n.exports.clone(),
                        dependents: n.dependents.clone(),
                        is_shared: n.is_shared,
                        usage_count: n.dependents.len(),
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(path: &str, imports: &[&str]) -> DependencyNode {
        DependencyNode::new(
            PathBuf::from(path),
            imports.iter().map(PathBuf::from).collect(),
            Vec::new(),
        )
    }

    #[test]
    fn test_reverse_pass_is_bidirectional() {
        let graph = DependencyGraph::from_nodes(vec![
            node("/p/c.ts", &["/p/a.ts"]),
            node("/p/a.ts", &["/p/b.ts", "/p/missing.ts"]),
            node("/p/b.ts", &[]),
            node("/p/d.ts", &["/p/b.ts"]),
        ]);

        for n in graph.nodes() {
            for import in &n.imports {
                if let Some(target) = graph.node(import) {
                    assert!(target.dependents.contains(&n.path));
                }
            }
            for dependent in &n.dependents {
                assert!(graph.node(dependent).unwrap().imports.contains(&n.path));
            }
        }

        let b = graph.node(Path::new("/p/b.ts")).unwrap();
        assert_eq!(
            b.dependents,
            vec![PathBuf::from("/p/a.ts"), PathBuf::from("/p/d.ts")]
        );
        assert!(b.is_shared);
        assert!(!graph.node(Path::new("/p/a.ts")).unwrap().is_shared);
    }

    #[test]
    fn test_nodes_sorted_and_deduplicated() {
        let graph = DependencyGraph::from_nodes(vec![
            node("/p/z.ts", &[]),
            node("/p/a.ts", &[]),
            node("/p/a.ts", &[]),
        ]);
        let paths: Vec<_> = graph.nodes().iter().map(|n| n.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("/p/a.ts"), PathBuf::from("/p/z.ts")]);
    }

    #[test]
    fn test_self_import_is_not_a_dependent() {
        let graph = DependencyGraph::from_nodes(vec![node("/p/a.ts", &["/p/a.ts"])]);
        assert!(graph.node(Path::new("/p/a.ts")).unwrap().dependents.is_empty());
    }

    #[test]
    fn test_usage_map_projects_final_graph() {
        let graph = DependencyGraph::from_nodes(vec![
            node("/p/a.ts", &["/p/b.ts"]),
            node("/p/c.ts", &["/p/b.ts"]),
            node("/p/b.ts", &[]),
        ]);
        let usage = graph.usage_map();
        let b = &usage[Path::new("/p/b.ts")];
        assert_eq!(b.usage_count, 2);
        assert!(b.is_shared);
        assert_eq!(usage.len(), 3);
    }
}
