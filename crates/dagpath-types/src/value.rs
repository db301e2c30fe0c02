use std::collections::BTreeMap;

use dagpath_wire::ContentAddress;

use crate::error::TypeError;
use crate::fields::{FieldReader, encode_bytes_field, encode_nested_field, encode_varint_field};
use crate::link::Link;
use crate::node::{Node, Step};
use crate::prototype::Prototype;

/// Deepest value nesting the decoder accepts.
pub const MAX_VALUE_DEPTH: usize = 64;

/// A typed-field tree stored in a single `value` block.
///
/// Everything except [`Value::Link`] lives inline in the block, so walking
/// into a map key or list index never touches the block source. Map keys
/// are kept sorted so the encoding of a given tree is deterministic, and
/// therefore so is its address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Link(Link),
}

/// Record layout of one encoded value.
///
/// ```text
/// ┌──────────┬───────────┬──────────────┬──────────────────────────────┐
/// │ Field ID │ Wire Type │ Name         │ Used by                      │
/// ├──────────┼───────────┼──────────────┼──────────────────────────────┤
/// │ 1        │ Varint    │ kind         │ all                          │
/// │ 2        │ Varint    │ scalar       │ bool, int (zigzag)           │
/// │ 2        │ Bytes     │ scalar       │ string, bytes, link address  │
/// │ 3        │ Nested    │ item         │ list (repeated)              │
/// │ 4        │ Nested    │ entry        │ map (repeated: 1 key, 2 val) │
/// │ 5        │ Varint    │ link_size    │ link (optional)              │
/// │ 6        │ Varint    │ link_target  │ link (optional, typed links) │
/// └──────────┴───────────┴──────────────┴──────────────────────────────┘
/// ```
mod kind {
    pub const NULL: u64 = 0;
    pub const BOOL: u64 = 1;
    pub const INT: u64 = 2;
    pub const STRING: u64 = 3;
    pub const BYTES: u64 = 4;
    pub const LIST: u64 = 5;
    pub const MAP: u64 = 6;
    pub const LINK: u64 = 7;
}

fn zigzag(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

fn unzigzag(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

impl Value {
    /// Convenience constructor for a map from `(key, value)` pairs.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Link(_) => "link",
        }
    }

    /// Resolve one path segment against this value.
    ///
    /// Maps are keyed by the segment; lists by its decimal index. A child
    /// that is itself a link is reported as [`Step::Link`] so the caller
    /// fetches it; any other child is [`Step::Inline`].
    #[must_use]
    pub fn resolve_segment(&self, segment: &str) -> Step {
        let child = match self {
            Self::Map(entries) => entries.get(segment),
            Self::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => return Step::Leaf,
        };
        match child {
            Some(Self::Link(link)) => Step::Link(link.clone()),
            Some(other) => Step::Inline(Node::Value(other.clone())),
            None => Step::Missing,
        }
    }

    /// Append every link reachable inside this value, depth first.
    pub fn collect_links(&self, out: &mut Vec<Link>) {
        match self {
            Self::Link(link) => out.push(link.clone()),
            Self::List(items) => items.iter().for_each(|v| v.collect_links(out)),
            Self::Map(entries) => entries.values().for_each(|v| v.collect_links(out)),
            _ => {}
        }
    }

    /// Serialize this value tree into a block body.
    #[must_use]
    pub fn encode_body(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Null => encode_varint_field(buf, 1, kind::NULL),
            Self::Bool(b) => {
                encode_varint_field(buf, 1, kind::BOOL);
                encode_varint_field(buf, 2, u64::from(*b));
            }
            Self::Int(i) => {
                encode_varint_field(buf, 1, kind::INT);
                encode_varint_field(buf, 2, zigzag(*i));
            }
            Self::String(s) => {
                encode_varint_field(buf, 1, kind::STRING);
                encode_bytes_field(buf, 2, s.as_bytes());
            }
            Self::Bytes(b) => {
                encode_varint_field(buf, 1, kind::BYTES);
                encode_bytes_field(buf, 2, b);
            }
            Self::List(items) => {
                encode_varint_field(buf, 1, kind::LIST);
                for item in items {
                    encode_nested_field(buf, 3, &item.encode_body());
                }
            }
            Self::Map(entries) => {
                encode_varint_field(buf, 1, kind::MAP);
                for (key, value) in entries {
                    let mut entry = Vec::new();
                    encode_bytes_field(&mut entry, 1, key.as_bytes());
                    encode_nested_field(&mut entry, 2, &value.encode_body());
                    encode_nested_field(buf, 4, &entry);
                }
            }
            Self::Link(link) => {
                encode_varint_field(buf, 1, kind::LINK);
                encode_bytes_field(buf, 2, &link.address.to_bytes());
                if let Some(size) = link.size {
                    encode_varint_field(buf, 5, size);
                }
                if let Some(target) = link.target {
                    encode_varint_field(buf, 6, target.code());
                }
            }
        }
    }

    /// Deserialize a value tree from a block body.
    ///
    /// # Errors
    ///
    /// Any [`TypeError`] for malformed records, unknown kinds, or trees
    /// nested deeper than [`MAX_VALUE_DEPTH`].
    pub fn decode_body(buf: &[u8]) -> Result<Self, TypeError> {
        Self::decode_at(buf, 0)
    }

    fn decode_at(buf: &[u8], depth: usize) -> Result<Self, TypeError> {
        if depth > MAX_VALUE_DEPTH {
            return Err(TypeError::TooDeep {
                limit: MAX_VALUE_DEPTH,
            });
        }

        let mut kind_tag = None;
        let mut scalar = None;
        let mut items = Vec::new();
        let mut entries = BTreeMap::new();
        let mut link_size = None;
        let mut link_target = None;

        for field in FieldReader::new(buf) {
            let (id, payload) = field?;
            match id {
                1 => kind_tag = Some(payload.varint("kind")?),
                2 => scalar = Some(payload),
                3 => items.push(Self::decode_at(payload.nested("item")?, depth + 1)?),
                4 => {
                    let (key, value) = Self::decode_entry(payload.nested("entry")?, depth + 1)?;
                    entries.entry(key).or_insert(value);
                }
                5 => link_size = Some(payload.varint("link_size")?),
                6 => {
                    let code = payload.varint("link_target")?;
                    let prototype =
                        Prototype::from_code(code).ok_or(TypeError::InvalidEnumValue {
                            enum_name: "Prototype",
                            value: code,
                        })?;
                    link_target = Some(prototype);
                }
                _ => {}
            }
        }

        let kind_tag = kind_tag.ok_or(TypeError::MissingRequiredField { field: "kind" })?;
        let scalar = |field: &'static str| scalar.ok_or(TypeError::MissingRequiredField { field });

        Ok(match kind_tag {
            kind::NULL => Self::Null,
            kind::BOOL => Self::Bool(scalar("bool")?.varint("bool")? != 0),
            kind::INT => Self::Int(unzigzag(scalar("int")?.varint("int")?)),
            kind::STRING => Self::String(scalar("string")?.string("string")?),
            kind::BYTES => Self::Bytes(scalar("bytes")?.bytes("bytes")?.to_vec()),
            kind::LIST => Self::List(items),
            kind::MAP => Self::Map(entries),
            kind::LINK => {
                let address = ContentAddress::from_bytes(scalar("link")?.bytes("link")?)?;
                Self::Link(Link {
                    address,
                    size: link_size,
                    target: link_target,
                })
            }
            other => {
                return Err(TypeError::InvalidEnumValue {
                    enum_name: "ValueKind",
                    value: other,
                });
            }
        })
    }

    fn decode_entry(buf: &[u8], depth: usize) -> Result<(String, Self), TypeError> {
        let mut key = None;
        let mut value = None;
        for field in FieldReader::new(buf) {
            let (id, payload) = field?;
            match id {
                1 => key = Some(payload.string("key")?),
                2 => value = Some(Self::decode_at(payload.nested("value")?, depth)?),
                _ => {}
            }
        }
        Ok((
            key.ok_or(TypeError::MissingRequiredField { field: "key" })?,
            value.ok_or(TypeError::MissingRequiredField { field: "value" })?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagpath_wire::{Codec, HashFn};

    fn sample() -> Value {
        Value::map([(
            "foo",
            Value::map([
                ("bar", Value::String("baz".into())),
                ("n", Value::Int(-42)),
                ("list", Value::List(vec![Value::Bool(true), Value::Null])),
            ]),
        )])
    }

    #[test]
    fn nested_tree_survives_encoding() {
        let value = sample();
        assert_eq!(Value::decode_body(&value.encode_body()).unwrap(), value);
    }

    #[test]
    fn typed_link_keeps_hints() {
        let address = ContentAddress::compute(Codec::DagNode, HashFn::Blake3, b"target");
        let value = Value::Link(Link::new(address).with_size(12).typed(Prototype::DagNode));
        assert_eq!(Value::decode_body(&value.encode_body()).unwrap(), value);
    }

    #[test]
    fn zigzag_handles_extremes() {
        for v in [0, 1, -1, i64::MAX, i64::MIN] {
            assert_eq!(unzigzag(zigzag(v)), v);
        }
    }

    #[test]
    fn map_encoding_is_order_independent() {
        let a = Value::map([("x", Value::Int(1)), ("y", Value::Int(2))]);
        let b = Value::map([("y", Value::Int(2)), ("x", Value::Int(1))]);
        assert_eq!(a.encode_body(), b.encode_body());
    }

    #[test]
    fn resolve_inline_map_key() {
        let value = sample();
        match value.resolve_segment("foo") {
            Step::Inline(Node::Value(Value::Map(m))) => assert!(m.contains_key("bar")),
            other => panic!("expected inline map, got {other:?}"),
        }
    }

    #[test]
    fn resolve_list_index() {
        let value = Value::List(vec![Value::Int(5), Value::Int(6)]);
        assert!(matches!(
            value.resolve_segment("1"),
            Step::Inline(Node::Value(Value::Int(6)))
        ));
        assert!(matches!(value.resolve_segment("2"), Step::Missing));
        assert!(matches!(value.resolve_segment("x"), Step::Missing));
    }

    #[test]
    fn resolve_link_child() {
        let address = ContentAddress::compute(Codec::Raw, HashFn::Blake3, b"leaf");
        let value = Value::map([("next", Value::Link(Link::new(address.clone())))]);
        match value.resolve_segment("next") {
            Step::Link(link) => assert_eq!(link.address, address),
            other => panic!("expected link, got {other:?}"),
        }
    }

    #[test]
    fn scalars_are_leaves() {
        assert!(matches!(Value::Int(1).resolve_segment("a"), Step::Leaf));
        assert!(matches!(Value::String("s".into()).resolve_segment("0"), Step::Leaf));
    }

    #[test]
    fn collects_nested_links() {
        let a = ContentAddress::compute(Codec::Raw, HashFn::Blake3, b"a");
        let b = ContentAddress::compute(Codec::Raw, HashFn::Blake3, b"b");
        let value = Value::map([
            ("first", Value::Link(Link::new(a.clone()))),
            ("rest", Value::List(vec![Value::Link(Link::new(b.clone()))])),
        ]);
        let mut links = Vec::new();
        value.collect_links(&mut links);
        let addresses: Vec<_> = links.into_iter().map(|l| l.address).collect();
        assert_eq!(addresses, vec![a, b]);
    }

    #[test]
    fn rejects_unknown_kind() {
        let mut buf = Vec::new();
        encode_varint_field(&mut buf, 1, 99);
        assert!(matches!(
            Value::decode_body(&buf),
            Err(TypeError::InvalidEnumValue { value: 99, .. })
        ));
    }

    #[test]
    fn rejects_missing_kind() {
        assert!(matches!(
            Value::decode_body(&[]),
            Err(TypeError::MissingRequiredField { field: "kind" })
        ));
    }

    #[test]
    fn rejects_excessive_nesting() {
        let mut value = Value::Null;
        for _ in 0..=MAX_VALUE_DEPTH + 1 {
            value = Value::List(vec![value]);
        }
        assert!(matches!(
            Value::decode_body(&value.encode_body()),
            Err(TypeError::TooDeep { .. })
        ));
    }
}
