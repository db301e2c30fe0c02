use dagpath_types::{ContentAddress, Prototype, TypeError};
use dagpath_wire::{Codec, WireError};

/// Errors that can occur while turning a fetched block into a node.
///
/// The decoder validates at three levels: the block's bytes against its
/// address, the block frame envelope, and the codec-specific body. Each
/// variant carries enough context to point at the offending layer.
///
/// Error hierarchy:
///
/// ```text
///   DecodeError
///   ├── HashMismatch          ← block bytes do not hash to their address
///   ├── PrototypeMismatch     ← chosen prototype cannot hold this codec
///   ├── DecompressFailed      ← zstd decompression error
///   ├── DecompressionBomb     ← decompressed body exceeds safety limit
///   ├── Type(TypeError)       ← from dagpath-types body deserialization
///   └── Wire(WireError)       ← from dagpath-wire frame parsing
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The block's digest does not match the one carried by its address.
    ///
    /// Only raised when verification is enabled. A source returning the
    /// wrong bytes for an address is indistinguishable from corruption.
    #[error("block bytes do not match address {address}")]
    HashMismatch { address: ContentAddress },

    /// The prototype chosen for this block cannot represent its codec.
    #[error("cannot decode {} block as {}", .codec.name(), .prototype.name())]
    PrototypeMismatch { prototype: Prototype, codec: Codec },

    /// Zstd decompression failed.
    ///
    /// Returned when the frame's `COMPRESSED` flag is set and the zstd
    /// decoder cannot parse the body: truncated input, corrupt frame, or
    /// non-zstd data with the flag erroneously set.
    #[error("zstd decompression failed: {0}")]
    DecompressFailed(String),

    /// Decompressed data exceeds the safety limit.
    #[error("decompressed size exceeds limit {limit}")]
    DecompressionBomb { limit: usize },

    /// A body deserialization error from `dagpath-types`.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// A frame-level error from `dagpath-wire`.
    #[error(transparent)]
    Wire(#[from] WireError),
}
