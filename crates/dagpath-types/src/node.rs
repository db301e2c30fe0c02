use std::collections::BTreeMap;

use crate::dag_node::DagNode;
use crate::link::Link;
use crate::value::Value;

/// An in-memory node produced by decoding or reifying a block.
///
/// ```text
/// ┌─────────────┬─────────────────────────────┬───────────────────────────┐
/// │ Variant     │ Produced by                 │ Segment lookup            │
/// ├─────────────┼─────────────────────────────┼───────────────────────────┤
/// │ Dag         │ dag-node codec              │ link name → Link          │
/// │ Value       │ value codec, inline children│ map key / list index      │
/// │ Bytes       │ raw codec, reified files    │ always a leaf             │
/// │ Directory   │ reified dir / HAMT shard    │ entry name → Link         │
/// └─────────────┴─────────────────────────────┴───────────────────────────┘
/// ```
///
/// Nodes are immutable once built; a resolver hands them to the caller by
/// value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Dag(DagNode),
    Value(Value),
    Bytes(Vec<u8>),
    Directory(Directory),
}

/// A name-indexed view over a directory, flattened out of however many
/// blocks store it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Directory {
    pub entries: BTreeMap<String, Link>,
}

impl Directory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry. The first insertion of a name wins.
    pub fn insert(&mut self, name: impl Into<String>, link: Link) {
        self.entries.entry(name.into()).or_insert(link);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Link> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of looking up one path segment on a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// The child lives inside the same block.
    Inline(Node),
    /// The child lives in another block, reachable through this link.
    Link(Link),
    /// The node can have children but has none under this segment.
    Missing,
    /// The node is a scalar or raw leaf; it has no children at all.
    Leaf,
}

impl Node {
    /// Resolve one path segment against this node.
    #[must_use]
    pub fn resolve_segment(&self, segment: &str) -> Step {
        match self {
            Self::Dag(dag) => dag.resolve_segment(segment),
            Self::Value(value) => value.resolve_segment(segment),
            Self::Directory(dir) => match dir.get(segment) {
                Some(link) => Step::Link(link.clone()),
                None => Step::Missing,
            },
            Self::Bytes(_) => Step::Leaf,
        }
    }

    /// Every outgoing link of this node, in encounter order.
    #[must_use]
    pub fn links(&self) -> Vec<Link> {
        match self {
            Self::Dag(dag) => dag.links.iter().map(|l| l.link.clone()).collect(),
            Self::Value(value) => {
                let mut out = Vec::new();
                value.collect_links(&mut out);
                out
            }
            Self::Directory(dir) => dir.entries.values().cloned().collect(),
            Self::Bytes(_) => Vec::new(),
        }
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Dag(_) => "dag-node",
            Self::Value(v) => v.kind_name(),
            Self::Bytes(_) => "bytes",
            Self::Directory(_) => "directory",
        }
    }

    /// The raw bytes of a leaf, if this node is one.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) | Self::Value(Value::Bytes(b)) => Some(b),
            _ => None,
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<DagNode> for Node {
    fn from(dag: DagNode) -> Self {
        Self::Dag(dag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag_node::NamedLink;
    use dagpath_wire::{Codec, ContentAddress, HashFn};

    fn link(seed: &[u8]) -> Link {
        Link::new(ContentAddress::compute(Codec::DagNode, HashFn::Blake3, seed))
    }

    #[test]
    fn bytes_are_leaves() {
        assert_eq!(Node::Bytes(b"abc".to_vec()).resolve_segment("x"), Step::Leaf);
    }

    #[test]
    fn directory_lookup() {
        let mut dir = Directory::new();
        dir.insert("a.txt", link(b"a"));
        let node = Node::Directory(dir);
        assert_eq!(node.resolve_segment("a.txt"), Step::Link(link(b"a")));
        assert_eq!(node.resolve_segment("b.txt"), Step::Missing);
    }

    #[test]
    fn directory_first_insert_wins() {
        let mut dir = Directory::new();
        dir.insert("x", link(b"1"));
        dir.insert("x", link(b"2"));
        assert_eq!(dir.len(), 1);
        assert_eq!(dir.get("x"), Some(&link(b"1")));
    }

    #[test]
    fn links_of_dag_node_keep_order() {
        let node = Node::Dag(DagNode {
            links: vec![NamedLink::new("z", link(b"z")), NamedLink::new("a", link(b"a"))],
            data: None,
        });
        assert_eq!(node.links(), vec![link(b"z"), link(b"a")]);
    }

    #[test]
    fn kind_names() {
        assert_eq!(Node::Value(Value::Int(1)).kind_name(), "int");
        assert_eq!(Node::Directory(Directory::new()).kind_name(), "directory");
        assert_eq!(Node::from(DagNode::default()).kind_name(), "dag-node");
    }
}
