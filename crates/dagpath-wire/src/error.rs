/// Errors raised while reading or writing the dagpath wire layer.
///
/// The wire layer owns three formats: LEB128 varints, the binary form of a
/// [`ContentAddress`](crate::ContentAddress), and the [`BlockFrame`]
/// envelope around every stored block. Each variant carries enough context
/// (byte offset, offending code, expected length) to debug a bad block
/// from a hex dump.
///
/// [`BlockFrame`]: crate::BlockFrame
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Varint encoding exceeded 10 bytes without terminating.
    #[error("varint too long: exceeded 10-byte limit")]
    VarintTooLong,

    /// Input ended before a complete item could be read.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// The address version prefix is not one this build understands.
    #[error("unsupported address version {version}")]
    UnsupportedAddressVersion { version: u64 },

    /// The codec tag inside an address is not registered.
    #[error("unknown codec tag {code:#04x}")]
    UnknownCodec { code: u64 },

    /// The hash-function tag inside an address is not registered.
    #[error("unknown hash function tag {code:#04x}")]
    UnknownHashFn { code: u64 },

    /// The digest length does not match the hash function.
    #[error("digest length {found} does not match {hash_fn} (expected {expected})")]
    DigestLength {
        hash_fn: &'static str,
        expected: usize,
        found: usize,
    },

    /// The textual form of an address is malformed.
    #[error("invalid address text {text:?}: {reason}")]
    InvalidAddressText { text: String, reason: &'static str },

    /// Reserved bits in a block frame's flags byte were set.
    #[error("reserved block flags set: {value:#04X}")]
    ReservedFlags { value: u8 },

    /// Bytes were left over after a complete address or frame.
    #[error("{extra_bytes} trailing bytes after {what}")]
    TrailingData { what: &'static str, extra_bytes: usize },

    /// I/O error during read or write.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
