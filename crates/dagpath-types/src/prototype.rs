use dagpath_wire::Codec;

/// The shape a block is decoded into.
///
/// A prototype is picked *before* decoding, from the address and the
/// context the link was found in; it is never inferred by inspecting a
/// decoded value afterwards.
///
/// ```text
/// ┌─────────┬──────────────────────┬──────────────────────────────────┐
/// │ Variant │ Accepts codec        │ Produces                         │
/// ├─────────┼──────────────────────┼──────────────────────────────────┤
/// │ Any     │ every codec          │ the codec's natural node variant │
/// │ DagNode │ dag-node only        │ Node::Dag                        │
/// │ Value   │ value only           │ Node::Value                      │
/// │ Raw     │ every codec          │ Node::Bytes (the frame body)     │
/// └─────────┴──────────────────────┴──────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Prototype {
    #[default]
    Any,
    DagNode,
    Value,
    Raw,
}

impl Prototype {
    /// The prototype `Any` resolves to for a given codec.
    #[must_use]
    pub fn natural(codec: Codec) -> Self {
        match codec {
            Codec::DagNode => Self::DagNode,
            Codec::Value => Self::Value,
            Codec::Raw => Self::Raw,
        }
    }

    /// Return `true` if blocks of `codec` can be decoded into this shape.
    #[must_use]
    pub fn accepts(self, codec: Codec) -> bool {
        match self {
            Self::Any | Self::Raw => true,
            Self::DagNode => codec == Codec::DagNode,
            Self::Value => codec == Codec::Value,
        }
    }

    /// Numeric tag used when a typed link is written into a value block.
    #[must_use]
    pub fn code(self) -> u64 {
        match self {
            Self::Any => 0,
            Self::DagNode => 1,
            Self::Value => 2,
            Self::Raw => 3,
        }
    }

    #[must_use]
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Any),
            1 => Some(Self::DagNode),
            2 => Some(Self::Value),
            3 => Some(Self::Raw),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::DagNode => "dag-node",
            Self::Value => "value",
            Self::Raw => "raw",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_prototypes_only_accept_their_codec() {
        assert!(Prototype::DagNode.accepts(Codec::DagNode));
        assert!(!Prototype::DagNode.accepts(Codec::Value));
        assert!(!Prototype::Value.accepts(Codec::Raw));
        assert!(Prototype::Raw.accepts(Codec::Value));
        assert!(Prototype::Any.accepts(Codec::Raw));
    }

    #[test]
    fn natural_matches_codec() {
        assert_eq!(Prototype::natural(Codec::Value), Prototype::Value);
        assert_eq!(Prototype::natural(Codec::Raw), Prototype::Raw);
    }
}
