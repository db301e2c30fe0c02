/// Minimum block body size (in bytes) before compression is attempted.
///
/// Bodies smaller than this are always stored uncompressed because zstd
/// framing overhead outweighs any savings on very small inputs.
pub const COMPRESSION_THRESHOLD: usize = 256;

/// Default zstd compression level (1–22 scale).
const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Compress a byte slice with zstd.
///
/// Returns `Some(compressed)` if compression reduced the size, or `None`
/// if the compressed output is >= the input size. The caller stores the
/// body uncompressed when `None` is returned.
///
/// # Example
///
/// ```rust
/// use dagpath_encoder::compression::compress;
///
/// let data = "readme.md ".repeat(100);
/// match compress(data.as_bytes()) {
///     Some(compressed) => assert!(compressed.len() < data.len()),
///     None => { /* data was incompressible */ }
/// }
/// ```
#[must_use]
pub fn compress(data: &[u8]) -> Option<Vec<u8>> {
    let compressed = zstd::encode_all(data, DEFAULT_COMPRESSION_LEVEL).ok()?;
    if compressed.len() < data.len() {
        Some(compressed)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_returns_none_for_small_incompressible_data() {
        assert!(compress(b"abc123").is_none());
    }

    #[test]
    fn compress_reduces_repetitive_data() {
        let data = "src/lib.rs\n".repeat(100);
        let compressed = compress(data.as_bytes()).expect("should compress");
        assert!(compressed.len() < data.len());
        assert_eq!(zstd::decode_all(compressed.as_slice()).unwrap(), data.as_bytes());
    }

    #[test]
    fn compression_threshold_is_256() {
        assert_eq!(COMPRESSION_THRESHOLD, 256);
    }
}
