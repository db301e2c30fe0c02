use std::io::Read;

use crate::error::DecodeError;

/// Maximum decompressed size of a single block body: 16 MiB.
pub const MAX_BLOCK_DECOMPRESSED_SIZE: usize = 16 * 1024 * 1024;

/// Decompress a zstd body, refusing to produce more than `max_size` bytes.
///
/// Output is read through a `take(max_size + 1)` limiter, so a bomb stops
/// at the limit instead of being fully materialized first.
///
/// # Errors
///
/// - [`DecodeError::DecompressFailed`] if zstd cannot decode the input.
/// - [`DecodeError::DecompressionBomb`] if the output exceeds `max_size`.
pub fn decompress(data: &[u8], max_size: usize) -> Result<Vec<u8>, DecodeError> {
    let decoder = zstd::stream::read::Decoder::new(data)
        .map_err(|e| DecodeError::DecompressFailed(e.to_string()))?;
    let mut out = Vec::new();
    decoder
        .take((max_size as u64).saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| DecodeError::DecompressFailed(e.to_string()))?;
    if out.len() > max_size {
        return Err(DecodeError::DecompressionBomb { limit: max_size });
    }
    Ok(out)
}
