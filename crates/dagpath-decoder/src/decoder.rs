use dagpath_types::{ContentAddress, DagNode, Node, Prototype, Value};
use dagpath_wire::{BlockFrame, Codec};

use crate::decompression::{self, MAX_BLOCK_DECOMPRESSED_SIZE};
use crate::error::DecodeError;

/// Turns the raw bytes of one block into an in-memory [`Node`].
///
/// The prototype has already been chosen by the caller; a decoder never
/// guesses a shape from the bytes. Decoding is pure: the same block,
/// address, and prototype always produce the same node or the same error.
pub trait Decoder: Send + Sync {
    /// # Errors
    ///
    /// [`DecodeError`] if the block is malformed or cannot be represented
    /// by `prototype`.
    fn decode(
        &self,
        block: &[u8],
        address: &ContentAddress,
        prototype: Prototype,
    ) -> Result<Node, DecodeError>;
}

/// The standard decoder for framed blocks.
///
/// Decoding proceeds in four steps:
///
///   1. **Verify** (optional): hash the block with the address's hash
///      function and compare digests.
///   2. **Frame**: parse the [`BlockFrame`] envelope; trailing bytes and
///      reserved flags are errors.
///   3. **Decompress**: if the frame's `COMPRESSED` flag is set,
///      zstd-decompress the body, bounded by `max_decompressed`.
///   4. **Body**: dispatch on the prototype (or, for [`Prototype::Any`],
///      the address codec) and deserialize.
///
/// ```text
/// ┌──────────────────┬──────────────┬──────────────────────────────┐
/// │ Prototype        │ Codec        │ Result                       │
/// ├──────────────────┼──────────────┼──────────────────────────────┤
/// │ Any / DagNode    │ dag-node     │ Node::Dag                    │
/// │ Any / Value      │ value        │ Node::Value                  │
/// │ Any / Raw        │ raw          │ Node::Bytes                  │
/// │ Raw              │ any          │ Node::Bytes (body unparsed)  │
/// │ DagNode / Value  │ other        │ PrototypeMismatch            │
/// └──────────────────┴──────────────┴──────────────────────────────┘
/// ```
///
/// # Example
///
/// ```rust
/// use dagpath_decoder::{BlockDecoder, Decoder};
/// use dagpath_types::{Codec, ContentAddress, HashFn, Node, Prototype};
/// use dagpath_wire::BlockFrame;
///
/// let block = BlockFrame::plain(b"hello".to_vec()).to_bytes();
/// let address = ContentAddress::compute(Codec::Raw, HashFn::Blake3, &block);
/// let node = BlockDecoder::new().decode(&block, &address, Prototype::Any).unwrap();
/// assert_eq!(node, Node::Bytes(b"hello".to_vec()));
/// ```
#[derive(Clone, Debug)]
pub struct BlockDecoder {
    verify: bool,
    max_decompressed: usize,
}

impl Default for BlockDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDecoder {
    /// A verifying decoder with the default decompression limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            verify: true,
            max_decompressed: MAX_BLOCK_DECOMPRESSED_SIZE,
        }
    }

    /// Enable or disable digest verification.
    #[must_use]
    pub fn verify_blocks(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    #[must_use]
    pub fn max_decompressed(mut self, limit: usize) -> Self {
        self.max_decompressed = limit;
        self
    }

    /// Strip the frame from a block and return its (decompressed) body.
    ///
    /// # Errors
    ///
    /// Frame, decompression, and (when enabled) verification errors.
    pub fn body(&self, block: &[u8], address: &ContentAddress) -> Result<Vec<u8>, DecodeError> {
        if self.verify && !address.verify(block) {
            return Err(DecodeError::HashMismatch {
                address: address.clone(),
            });
        }
        let frame = BlockFrame::read_from(block)?;
        if frame.flags.is_compressed() {
            decompression::decompress(&frame.body, self.max_decompressed)
        } else {
            Ok(frame.body)
        }
    }
}

impl Decoder for BlockDecoder {
    fn decode(
        &self,
        block: &[u8],
        address: &ContentAddress,
        prototype: Prototype,
    ) -> Result<Node, DecodeError> {
        let codec = address.codec();
        if !prototype.accepts(codec) {
            return Err(DecodeError::PrototypeMismatch { prototype, codec });
        }
        let body = self.body(block, address)?;

        let node = match (prototype, codec) {
            (Prototype::Raw, _) | (Prototype::Any, Codec::Raw) => Node::Bytes(body),
            (Prototype::Any | Prototype::DagNode, Codec::DagNode) => {
                Node::Dag(DagNode::decode_body(&body)?)
            }
            (Prototype::Any | Prototype::Value, Codec::Value) => {
                Node::Value(Value::decode_body(&body)?)
            }
            _ => return Err(DecodeError::PrototypeMismatch { prototype, codec }),
        };

        tracing::trace!(
            %address,
            codec = codec.name(),
            prototype = prototype.name(),
            kind = node.kind_name(),
            "decoded block"
        );
        Ok(node)
    }
}

/// Decode with whatever prototype the address's codec implies.
///
/// # Errors
///
/// Same as [`Decoder::decode`].
pub fn decode_natural(
    decoder: &dyn Decoder,
    block: &[u8],
    address: &ContentAddress,
) -> Result<Node, DecodeError> {
    decoder.decode(block, address, Prototype::natural(address.codec()))
}
