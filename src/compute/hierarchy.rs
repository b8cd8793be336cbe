//! Hierarchy flattener - turns a parsed dataset into nodes, edges and outcomes.

use std::collections::HashSet;

use log::{info, warn};

use crate::schema::{Dataset, DatasetNode, ROOT_NAME};

/// Which dataset shape produced a hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyKind {
    Nested,
    Flat,
}

/// Outcome breakdown carried by a terminal node.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Per-group counts, each group becoming its own route.
    Groups(Vec<(String, f64)>),
    /// A single count; the group is drawn from the hierarchy's global split.
    Count(f64),
}

/// A category node. `path` is unique, `name` is not.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub path: String,
    /// Distance from the root (root = 0).
    pub depth: usize,
    /// Set on terminal nodes only.
    pub outcome: Option<Outcome>,
}

impl Node {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Directed edge between node paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

/// Flattened node/edge graph reachable from the synthetic root.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    pub kind: HierarchyKind,
    /// Deduplicated by path, root first, then traversal order.
    pub nodes: Vec<Node>,
    /// Every edge in traversal order (left to right).
    pub edges: Vec<Edge>,
    /// Global group split for flat datasets.
    pub group_split: Option<Vec<(String, f64)>>,
}

impl Hierarchy {
    /// Flatten a dataset in a single traversal.
    pub fn flatten(dataset: &Dataset) -> Self {
        let hierarchy = match dataset {
            Dataset::Nested { children } => flatten_nested(children),
            Dataset::Flat {
                categories,
                groups,
                source,
            } => flatten_flat(categories, groups, source),
        };

        info!(
            "Flattened {:?} dataset: {} nodes, {} edges, {} terminals",
            hierarchy.kind,
            hierarchy.nodes.len(),
            hierarchy.edges.len(),
            hierarchy.terminals().count()
        );
        hierarchy
    }

    /// Path of the synthetic root.
    pub fn root_path() -> String {
        format!("/{ROOT_NAME}")
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn node(&self, path: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.path == path)
    }

    pub fn terminals(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_terminal())
    }

    /// Depth of the deepest node.
    pub fn height(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Outgoing edge targets of `path`, in edge order.
    pub fn children_of<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.source == path)
            .map(|e| e.target.as_str())
    }
}

struct NestedWalker {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    seen: HashSet<String>,
}

impl NestedWalker {
    fn push_node(&mut self, node: Node) {
        if self.seen.insert(node.path.clone()) {
            self.nodes.push(node);
        }
    }

    fn walk(&mut self, parent: &str, children: &[(String, DatasetNode)], depth: usize) {
        for (name, child) in children {
            let path = format!("{parent}/{name}");
            self.edges.push(Edge {
                source: parent.to_string(),
                target: path.clone(),
            });

            match child {
                DatasetNode::Terminal(groups) => {
                    if groups.iter().all(|(_, c)| *c == 0.0) {
                        warn!("Terminal {path} has no counts; it will never receive particles");
                    }
                    self.push_node(Node {
                        name: name.clone(),
                        path,
                        depth,
                        outcome: Some(Outcome::Groups(groups.clone())),
                    });
                }
                DatasetNode::Internal(grandchildren) => {
                    self.push_node(Node {
                        name: name.clone(),
                        path: path.clone(),
                        depth,
                        outcome: None,
                    });
                    self.walk(&path, grandchildren, depth + 1);
                }
            }
        }
    }
}

fn flatten_nested(children: &[(String, DatasetNode)]) -> Hierarchy {
    let root_path = Hierarchy::root_path();
    let mut walker = NestedWalker {
        nodes: Vec::new(),
        edges: Vec::new(),
        seen: HashSet::new(),
    };
    walker.push_node(Node {
        name: ROOT_NAME.to_string(),
        path: root_path.clone(),
        depth: 0,
        outcome: None,
    });
    walker.walk(&root_path, children, 1);

    Hierarchy {
        kind: HierarchyKind::Nested,
        nodes: walker.nodes,
        edges: walker.edges,
        group_split: None,
    }
}

fn flatten_flat(categories: &[(String, f64)], groups: &[(String, f64)], source: &str) -> Hierarchy {
    let root_path = Hierarchy::root_path();
    let mut nodes = vec![Node {
        name: source.to_string(),
        path: root_path.clone(),
        depth: 0,
        outcome: None,
    }];
    let mut edges = Vec::with_capacity(categories.len());

    for (name, count) in categories {
        let path = format!("{root_path}/{name}");
        edges.push(Edge {
            source: root_path.clone(),
            target: path.clone(),
        });
        nodes.push(Node {
            name: name.clone(),
            path,
            depth: 1,
            outcome: Some(Outcome::Count(*count)),
        });
    }

    Hierarchy {
        kind: HierarchyKind::Flat,
        nodes,
        edges,
        group_split: Some(groups.to_vec()),
    }
}
