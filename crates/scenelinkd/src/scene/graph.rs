//! Node graph backing the in-memory scene host.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

/// Top-level network contexts present in every scene.
pub(super) const CONTEXTS: [&str; 4] = ["obj", "shop", "mat", "out"];

/// Failures of graph edits; the display text is sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(super) enum GraphError {
    #[error("Parent node not found: {0}")]
    ParentNotFound(String),
    #[error("Node not found: {0}")]
    NodeNotFound(String),
    #[error("Source node not found: {0}")]
    SourceNotFound(String),
    #[error("Target node not found: {0}")]
    TargetNotFound(String),
    #[error("Failed to create node of type {kind}. Error: Invalid node name: {name}")]
    InvalidName { kind: String, name: String },
    #[error("Failed to connect nodes. Error: cannot connect {0} to itself")]
    SelfConnection(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct SceneNode {
    pub(super) kind: String,
    pub(super) params: Map<String, Value>,
    pub(super) inputs: BTreeMap<u64, String>,
}

impl SceneNode {
    fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            params: Map::new(),
            inputs: BTreeMap::new(),
        }
    }
}

/// Nodes keyed by absolute path, in creation order.
#[derive(Debug, Clone)]
pub(super) struct SceneGraph {
    nodes: IndexMap<String, SceneNode>,
}

impl SceneGraph {
    pub(super) fn with_contexts() -> Self {
        let nodes = CONTEXTS
            .iter()
            .map(|context| (format!("/{context}"), SceneNode::new(context)))
            .collect();
        Self { nodes }
    }

    pub(super) fn node(&self, path: &str) -> Result<&SceneNode, GraphError> {
        self.nodes
            .get(path)
            .ok_or_else(|| GraphError::NodeNotFound(path.to_owned()))
    }

    pub(super) fn node_mut(&mut self, path: &str) -> Result<&mut SceneNode, GraphError> {
        self.nodes
            .get_mut(path)
            .ok_or_else(|| GraphError::NodeNotFound(path.to_owned()))
    }

    /// Creates a child of `parent` and returns its path.
    ///
    /// Without a name the node is called `<type>N` with the lowest free `N`
    /// starting at 1. A requested name that is taken gets the same numeric
    /// suffix treatment on its non-digit stem.
    pub(super) fn create(
        &mut self,
        parent: &str,
        kind: &str,
        name: Option<&str>,
    ) -> Result<String, GraphError> {
        if !self.nodes.contains_key(parent) {
            return Err(GraphError::ParentNotFound(parent.to_owned()));
        }
        let path = match name {
            Some(requested) => {
                if !is_valid_name(requested) {
                    return Err(GraphError::InvalidName {
                        kind: kind.to_owned(),
                        name: requested.to_owned(),
                    });
                }
                let candidate = child_path(parent, requested);
                if self.nodes.contains_key(&candidate) {
                    let stem = requested.trim_end_matches(|ch: char| ch.is_ascii_digit());
                    self.free_path(parent, if stem.is_empty() { requested } else { stem })
                } else {
                    candidate
                }
            }
            None => self.free_path(parent, &sanitise(kind)),
        };
        self.nodes.insert(path.clone(), SceneNode::new(kind));
        Ok(path)
    }

    /// Wires `from` into input `index` of `to`, replacing any prior input.
    pub(super) fn connect(&mut self, from: &str, to: &str, index: u64) -> Result<(), GraphError> {
        if !self.nodes.contains_key(from) {
            return Err(GraphError::SourceNotFound(from.to_owned()));
        }
        if from == to {
            return Err(GraphError::SelfConnection(from.to_owned()));
        }
        let target = self
            .nodes
            .get_mut(to)
            .ok_or_else(|| GraphError::TargetNotFound(to.to_owned()))?;
        target.inputs.insert(index, from.to_owned());
        Ok(())
    }

    /// Paths of the direct children of `path`, in creation order.
    pub(super) fn children<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.nodes
            .keys()
            .map(String::as_str)
            .filter(move |candidate| parent_of(candidate) == Some(path))
    }

    /// Paths of the nodes that take `path` as an input, in creation order.
    pub(super) fn outputs<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.nodes
            .iter()
            .filter(move |(_, node)| node.inputs.values().any(|input| input == path))
            .map(|(candidate, _)| candidate.as_str())
    }

    fn free_path(&self, parent: &str, stem: &str) -> String {
        (1_u64..)
            .map(|suffix| child_path(parent, &format!("{stem}{suffix}")))
            .find(|candidate| !self.nodes.contains_key(candidate))
            .unwrap_or_else(|| child_path(parent, stem))
    }
}

/// Returns the parent path, or `None` for top-level contexts.
pub(super) fn parent_of(path: &str) -> Option<&str> {
    match path.rsplit_once('/') {
        Some(("", _)) | None => None,
        Some((parent, _)) => Some(parent),
    }
}

/// Returns the last path component.
pub(super) fn leaf_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, leaf)| leaf)
}

fn child_path(parent: &str, name: &str) -> String {
    format!("{}/{name}", parent.trim_end_matches('/'))
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' || ch == '-')
}

fn sanitise(kind: &str) -> String {
    let cleaned: String = kind
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect();
    cleaned
        .trim_end_matches(|ch: char| ch.is_ascii_digit())
        .to_owned()
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn graph() -> SceneGraph {
        SceneGraph::with_contexts()
    }

    #[rstest]
    fn auto_names_count_from_one(mut graph: SceneGraph) {
        assert_eq!(graph.create("/obj", "geo", None), Ok("/obj/geo1".to_owned()));
        assert_eq!(graph.create("/obj", "geo", None), Ok("/obj/geo2".to_owned()));
    }

    #[rstest]
    fn taken_names_are_suffixed(mut graph: SceneGraph) {
        assert_eq!(
            graph.create("/obj", "geo", Some("box")),
            Ok("/obj/box".to_owned())
        );
        assert_eq!(
            graph.create("/obj", "geo", Some("box")),
            Ok("/obj/box1".to_owned())
        );
        assert_eq!(
            graph.create("/obj", "geo", Some("box1")),
            Ok("/obj/box2".to_owned())
        );
    }

    #[rstest]
    fn unknown_parent_is_rejected(mut graph: SceneGraph) {
        let error = graph.create("/nowhere", "geo", None).expect_err("no parent");
        assert_eq!(error.to_string(), "Parent node not found: /nowhere");
    }

    #[rstest]
    #[case("")]
    #[case("has space")]
    #[case("a/b")]
    fn invalid_names_are_rejected(mut graph: SceneGraph, #[case] name: &str) {
        let error = graph.create("/obj", "geo", Some(name)).expect_err("invalid");
        assert!(matches!(error, GraphError::InvalidName { .. }));
    }

    #[rstest]
    fn connections_are_visible_from_both_ends(mut graph: SceneGraph) {
        let source = graph.create("/obj", "geo", None).expect("source");
        let target = graph.create("/obj", "geo", None).expect("target");
        graph.connect(&source, &target, 0).expect("connect");

        assert_eq!(
            graph.node(&target).expect("target").inputs.get(&0),
            Some(&source)
        );
        assert_eq!(graph.outputs(&source).collect::<Vec<_>>(), vec![target.as_str()]);
    }

    #[rstest]
    fn children_are_direct_descendants_only(mut graph: SceneGraph) {
        let container = graph.create("/obj", "geo", Some("fx")).expect("container");
        graph.create(&container, "dopnet", None).expect("child");
        assert_eq!(graph.children("/obj").collect::<Vec<_>>(), vec!["/obj/fx"]);
    }

    #[rstest]
    #[case("/obj", None)]
    #[case("/obj/geo1", Some("/obj"))]
    #[case("/obj/geo1/box1", Some("/obj/geo1"))]
    fn parent_paths(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(parent_of(path), expected);
    }
}
