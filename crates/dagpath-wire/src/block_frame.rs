use crate::error::WireError;
use crate::varint::{decode_varint, push_varint};

/// Per-block flags bitfield.
///
/// Bit layout:
///   bit 0 = body is compressed with zstd
///   bits 1-7 = reserved, must be zero
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockFlags(u8);

impl BlockFlags {
    pub const NONE: Self = Self(0);
    pub const COMPRESSED: Self = Self(0b0000_0001);

    const KNOWN: u8 = Self::COMPRESSED.0;

    /// Interpret a raw flags byte.
    ///
    /// # Errors
    ///
    /// [`WireError::ReservedFlags`] if any reserved bit is set.
    pub fn from_raw(raw: u8) -> Result<Self, WireError> {
        if raw & !Self::KNOWN != 0 {
            return Err(WireError::ReservedFlags { value: raw });
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn raw(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_compressed(self) -> bool {
        self.0 & Self::COMPRESSED.0 != 0
    }
}

/// Block frame: the envelope around every stored block.
///
/// A block is exactly one frame; the content address is computed over the
/// whole frame, so flipping the compression flag yields a different
/// address.
///
/// ```text
/// ┌──────────────────────────────────────────────────┐
/// │ block_flags  (uint8, 1 byte)                     │
/// │ body_len     (varint)                            │
/// │ body         [body_len bytes]                    │
/// └──────────────────────────────────────────────────┘
/// ```
///
/// How the body is interpreted depends on the codec carried by the
/// address, not on anything inside the frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockFrame {
    pub flags: BlockFlags,
    pub body: Vec<u8>,
}

impl BlockFrame {
    /// Frame an uncompressed body.
    #[must_use]
    pub fn plain(body: Vec<u8>) -> Self {
        Self {
            flags: BlockFlags::NONE,
            body,
        }
    }

    /// Serialize this frame into a fresh buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len() + 6);
        out.push(self.flags.raw());
        push_varint(&mut out, self.body.len() as u64);
        out.extend_from_slice(&self.body);
        out
    }

    /// Write this frame to the provided writer, returning bytes written.
    ///
    /// # Errors
    ///
    /// [`WireError::Io`] if the writer fails.
    pub fn write_to(&self, w: &mut impl std::io::Write) -> Result<usize, WireError> {
        let bytes = self.to_bytes();
        w.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Parse a frame that must span all of `block`.
    ///
    /// # Errors
    ///
    /// - [`WireError::UnexpectedEof`] if the block is empty or truncated.
    /// - [`WireError::ReservedFlags`] if reserved flag bits are set.
    /// - [`WireError::TrailingData`] if bytes follow the body.
    pub fn read_from(block: &[u8]) -> Result<Self, WireError> {
        let (&raw_flags, rest) = block
            .split_first()
            .ok_or(WireError::UnexpectedEof { offset: 0 })?;
        let flags = BlockFlags::from_raw(raw_flags)?;

        let (len, n) = decode_varint(rest).map_err(|e| match e {
            WireError::UnexpectedEof { offset } => WireError::UnexpectedEof { offset: offset + 1 },
            other => other,
        })?;
        let start = 1 + n;
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        let end = start.saturating_add(len);
        let body = block
            .get(start..end)
            .ok_or(WireError::UnexpectedEof { offset: block.len() })?;

        if end != block.len() {
            return Err(WireError::TrailingData {
                what: "block frame",
                extra_bytes: block.len() - end,
            });
        }

        Ok(Self {
            flags,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_frame_layout() {
        let frame = BlockFrame::plain(b"abc".to_vec());
        assert_eq!(frame.to_bytes(), vec![0x00, 0x03, b'a', b'b', b'c']);
    }

    #[test]
    fn read_back_compressed_flag() {
        let frame = BlockFrame {
            flags: BlockFlags::COMPRESSED,
            body: vec![1, 2, 3],
        };
        let parsed = BlockFrame::read_from(&frame.to_bytes()).unwrap();
        assert!(parsed.flags.is_compressed());
        assert_eq!(parsed, frame);
    }

    #[test]
    fn empty_body_is_valid() {
        let parsed = BlockFrame::read_from(&[0x00, 0x00]).unwrap();
        assert!(parsed.body.is_empty());
    }

    #[test]
    fn write_to_reports_length() {
        let mut sink = Vec::new();
        let n = BlockFrame::plain(vec![9; 200]).write_to(&mut sink).unwrap();
        assert_eq!(n, sink.len());
        assert_eq!(n, 1 + 2 + 200);
    }

    #[test]
    fn rejects_reserved_flags() {
        assert!(matches!(
            BlockFrame::read_from(&[0x80, 0x00]),
            Err(WireError::ReservedFlags { value: 0x80 })
        ));
    }

    #[test]
    fn rejects_empty_block() {
        assert!(matches!(
            BlockFrame::read_from(&[]),
            Err(WireError::UnexpectedEof { offset: 0 })
        ));
    }

    #[test]
    fn rejects_truncated_body() {
        assert!(matches!(
            BlockFrame::read_from(&[0x00, 0x05, 1, 2]),
            Err(WireError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn rejects_trailing_bytes() {
        assert!(matches!(
            BlockFrame::read_from(&[0x00, 0x01, 7, 8]),
            Err(WireError::TrailingData { extra_bytes: 1, .. })
        ));
    }
}
