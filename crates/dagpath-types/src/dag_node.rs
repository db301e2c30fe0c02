use dagpath_wire::ContentAddress;

use crate::error::TypeError;
use crate::fields::{FieldReader, encode_bytes_field, encode_nested_field, encode_varint_field};
use crate::link::Link;
use crate::node::Step;

/// DAG_NODE block: generic named links plus an opaque data section.
///
/// Field layout within body:
///
/// ```text
/// ┌──────────┬───────────┬───────┬──────────────────────────────┐
/// │ Field ID │ Wire Type │ Name  │ Description                  │
/// ├──────────┼───────────┼───────┼──────────────────────────────┤
/// │ 1        │ Nested    │ link  │ Repeated NamedLink           │
/// │ 2        │ Bytes     │ data  │ Optional payload             │
/// └──────────┴───────────┴───────┴──────────────────────────────┘
/// ```
///
/// Link order is preserved. Names are not required to be unique; lookup by
/// name returns the first match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DagNode {
    pub links: Vec<NamedLink>,
    pub data: Option<Vec<u8>>,
}

/// One named edge out of a [`DagNode`].
///
/// ```text
/// ┌──────────┬───────────┬─────────┬─────────────────────────────┐
/// │ Field ID │ Wire Type │ Name    │ Description                 │
/// ├──────────┼───────────┼─────────┼─────────────────────────────┤
/// │ 1        │ Bytes     │ name    │ Edge name (UTF-8)           │
/// │ 2        │ Bytes     │ address │ Binary content address      │
/// │ 3        │ Varint    │ size    │ Optional cumulative size    │
/// └──────────┴───────────┴─────────┴─────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedLink {
    pub name: String,
    pub link: Link,
}

impl NamedLink {
    pub fn new(name: impl Into<String>, link: Link) -> Self {
        Self {
            name: name.into(),
            link,
        }
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_bytes_field(&mut buf, 1, self.name.as_bytes());
        encode_bytes_field(&mut buf, 2, &self.link.address.to_bytes());
        if let Some(size) = self.link.size {
            encode_varint_field(&mut buf, 3, size);
        }
        buf
    }

    fn decode(buf: &[u8]) -> Result<Self, TypeError> {
        let mut name = None;
        let mut address = None;
        let mut size = None;

        for field in FieldReader::new(buf) {
            let (id, payload) = field?;
            match id {
                1 => name = Some(payload.string("name")?),
                2 => address = Some(ContentAddress::from_bytes(payload.bytes("address")?)?),
                3 => size = Some(payload.varint("size")?),
                _ => {}
            }
        }

        let address = address.ok_or(TypeError::MissingRequiredField { field: "address" })?;
        let mut link = Link::new(address);
        link.size = size;
        Ok(Self {
            name: name.ok_or(TypeError::MissingRequiredField { field: "name" })?,
            link,
        })
    }
}

impl DagNode {
    /// Find the first link named `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.name == name).map(|l| &l.link)
    }

    /// Resolve one segment as a link name.
    ///
    /// DAG nodes have no inline children; every hit is a [`Step::Link`].
    #[must_use]
    pub fn resolve_segment(&self, segment: &str) -> Step {
        match self.find(segment) {
            Some(link) => Step::Link(link.clone()),
            None => Step::Missing,
        }
    }

    /// Parse the data section as a [`NodeData`] record, if present.
    ///
    /// Returns `None` when the node has no data section.
    ///
    /// # Errors
    ///
    /// Any [`TypeError`] if the data section is not a valid record.
    pub fn node_data(&self) -> Option<Result<NodeData, TypeError>> {
        self.data.as_deref().map(NodeData::decode)
    }

    /// Serialize this node into a block body.
    #[must_use]
    pub fn encode_body(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for link in &self.links {
            encode_nested_field(&mut buf, 1, &link.encode());
        }
        if let Some(data) = &self.data {
            encode_bytes_field(&mut buf, 2, data);
        }
        buf
    }

    /// Deserialize a DAG node from a block body.
    ///
    /// # Errors
    ///
    /// Any [`TypeError`] for malformed links or data.
    pub fn decode_body(buf: &[u8]) -> Result<Self, TypeError> {
        let mut node = Self::default();
        for field in FieldReader::new(buf) {
            let (id, payload) = field?;
            match id {
                1 => node.links.push(NamedLink::decode(payload.nested("link")?)?),
                2 => node.data = Some(payload.bytes("data")?.to_vec()),
                _ => {}
            }
        }
        Ok(node)
    }
}

/// What a [`DagNode`] represents in the file-system layer built on top of
/// the DAG.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// File contents: `payload` inline, followed by the chunks its links
    /// point to, in link order.
    File = 0,
    /// A flat directory: link names are entry names.
    Directory = 1,
    /// One shard of a hash-array-mapped trie directory. Link names carry a
    /// fixed-width uppercase hex bucket prefix; a bare prefix is a child
    /// shard, a prefix followed by a name is an entry.
    HamtShard = 2,
}

/// The record stored in a [`DagNode`]'s data section.
///
/// ```text
/// ┌──────────┬───────────┬─────────┬──────────────────────────────┐
/// │ Field ID │ Wire Type │ Name    │ Description                  │
/// ├──────────┼───────────┼─────────┼──────────────────────────────┤
/// │ 1        │ Varint    │ kind    │ 0=file, 1=dir, 2=hamt shard  │
/// │ 2        │ Bytes     │ payload │ Inline file bytes            │
/// │ 3        │ Varint    │ fanout  │ Shard fanout (power of two)  │
/// └──────────┴───────────┴─────────┴──────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeData {
    pub kind: NodeKind,
    pub payload: Vec<u8>,
    pub fanout: Option<u64>,
}

impl NodeData {
    #[must_use]
    pub fn file(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: NodeKind::File,
            payload: payload.into(),
            fanout: None,
        }
    }

    #[must_use]
    pub fn directory() -> Self {
        Self {
            kind: NodeKind::Directory,
            payload: Vec::new(),
            fanout: None,
        }
    }

    #[must_use]
    pub fn hamt_shard(fanout: u64) -> Self {
        Self {
            kind: NodeKind::HamtShard,
            payload: Vec::new(),
            fanout: Some(fanout),
        }
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_varint_field(&mut buf, 1, self.kind as u64);
        if !self.payload.is_empty() {
            encode_bytes_field(&mut buf, 2, &self.payload);
        }
        if let Some(fanout) = self.fanout {
            encode_varint_field(&mut buf, 3, fanout);
        }
        buf
    }

    /// # Errors
    ///
    /// Any [`TypeError`] for a malformed record or unknown kind.
    pub fn decode(buf: &[u8]) -> Result<Self, TypeError> {
        let mut kind = None;
        let mut payload = Vec::new();
        let mut fanout = None;

        for field in FieldReader::new(buf) {
            let (id, value) = field?;
            match id {
                1 => {
                    let raw = value.varint("kind")?;
                    kind = Some(match raw {
                        0 => NodeKind::File,
                        1 => NodeKind::Directory,
                        2 => NodeKind::HamtShard,
                        other => {
                            return Err(TypeError::InvalidEnumValue {
                                enum_name: "NodeKind",
                                value: other,
                            });
                        }
                    });
                }
                2 => payload = value.bytes("payload")?.to_vec(),
                3 => fanout = Some(value.varint("fanout")?),
                _ => {}
            }
        }

        Ok(Self {
            kind: kind.ok_or(TypeError::MissingRequiredField { field: "kind" })?,
            payload,
            fanout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagpath_wire::{Codec, HashFn};

    fn addr(seed: &[u8]) -> ContentAddress {
        ContentAddress::compute(Codec::DagNode, HashFn::Blake3, seed)
    }

    #[test]
    fn links_and_data_survive_encoding() {
        let node = DagNode {
            links: vec![
                NamedLink::new("child", Link::new(addr(b"b")).with_size(40)),
                NamedLink::new("other", Link::new(addr(b"c"))),
            ],
            data: Some(vec![1, 2, 3]),
        };
        assert_eq!(DagNode::decode_body(&node.encode_body()).unwrap(), node);
    }

    #[test]
    fn empty_node_has_empty_body() {
        let node = DagNode::default();
        assert!(node.encode_body().is_empty());
        assert_eq!(DagNode::decode_body(&[]).unwrap(), node);
    }

    #[test]
    fn find_returns_first_duplicate() {
        let node = DagNode {
            links: vec![
                NamedLink::new("dup", Link::new(addr(b"1"))),
                NamedLink::new("dup", Link::new(addr(b"2"))),
            ],
            data: None,
        };
        assert_eq!(node.find("dup").unwrap().address, addr(b"1"));
    }

    #[test]
    fn resolve_segment_by_name() {
        let node = DagNode {
            links: vec![NamedLink::new("child", Link::new(addr(b"b")))],
            data: None,
        };
        assert!(matches!(node.resolve_segment("child"), Step::Link(_)));
        assert!(matches!(node.resolve_segment("nope"), Step::Missing));
    }

    #[test]
    fn node_data_roundtrip() {
        for data in [
            NodeData::file(b"hello".to_vec()),
            NodeData::directory(),
            NodeData::hamt_shard(256),
        ] {
            assert_eq!(NodeData::decode(&data.encode()).unwrap(), data);
        }
    }

    #[test]
    fn node_data_absent_without_data_section() {
        assert!(DagNode::default().node_data().is_none());
    }

    #[test]
    fn link_without_address_is_rejected() {
        let mut link = Vec::new();
        encode_bytes_field(&mut link, 1, b"name-only");
        let mut body = Vec::new();
        encode_nested_field(&mut body, 1, &link);
        assert!(matches!(
            DagNode::decode_body(&body),
            Err(TypeError::MissingRequiredField { field: "address" })
        ));
    }
}
