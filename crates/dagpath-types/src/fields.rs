use dagpath_wire::WireError;
use dagpath_wire::varint::{decode_varint, push_varint};

use crate::error::TypeError;

/// Field wire types within a node body.
///
/// Every field in a body is a tag-length-value triple:
///
/// ```text
///   field_id (varint) │ wire_type (varint) │ payload
/// ```
///
/// ```text
/// ┌──────┬──────────┬────────────────────────────────┐
/// │ Wire │ Type     │ Payload format                 │
/// ├──────┼──────────┼────────────────────────────────┤
/// │ 0    │ Varint   │ Single varint value            │
/// │ 1    │ Bytes    │ Varint length + raw bytes      │
/// │ 2    │ Nested   │ Varint length + nested TLV     │
/// └──────┴──────────┴────────────────────────────────┘
/// ```
///
/// Readers skip unknown field ids, so new optional fields can be added to
/// a record without changing the address of old blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldWireType {
    Varint = 0,
    Bytes = 1,
    Nested = 2,
}

impl FieldWireType {
    /// Convert a raw varint value to a [`FieldWireType`].
    ///
    /// # Errors
    ///
    /// [`TypeError::UnknownFieldWireType`] for values outside 0..=2.
    pub fn from_raw(value: u64) -> Result<Self, TypeError> {
        match value {
            0 => Ok(Self::Varint),
            1 => Ok(Self::Bytes),
            2 => Ok(Self::Nested),
            other => Err(TypeError::UnknownFieldWireType { value: other }),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Varint => "varint",
            Self::Bytes => "bytes",
            Self::Nested => "nested",
        }
    }
}

// ── Encoding ──────────────────────────────────────────────────────────

/// Encode a varint field (wire type 0).
pub fn encode_varint_field(buf: &mut Vec<u8>, field_id: u64, value: u64) {
    push_varint(buf, field_id);
    push_varint(buf, FieldWireType::Varint as u64);
    push_varint(buf, value);
}

/// Encode a bytes field (wire type 1).
pub fn encode_bytes_field(buf: &mut Vec<u8>, field_id: u64, data: &[u8]) {
    push_varint(buf, field_id);
    push_varint(buf, FieldWireType::Bytes as u64);
    push_varint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

/// Encode a nested field (wire type 2) whose payload is a pre-encoded
/// TLV record.
pub fn encode_nested_field(buf: &mut Vec<u8>, field_id: u64, nested: &[u8]) {
    push_varint(buf, field_id);
    push_varint(buf, FieldWireType::Nested as u64);
    push_varint(buf, nested.len() as u64);
    buf.extend_from_slice(nested);
}

// ── Decoding ──────────────────────────────────────────────────────────

/// The payload of one decoded field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldPayload<'a> {
    Varint(u64),
    Bytes(&'a [u8]),
    Nested(&'a [u8]),
}

impl<'a> FieldPayload<'a> {
    fn wire_name(&self) -> &'static str {
        match self {
            Self::Varint(_) => FieldWireType::Varint.name(),
            Self::Bytes(_) => FieldWireType::Bytes.name(),
            Self::Nested(_) => FieldWireType::Nested.name(),
        }
    }

    /// Expect a varint payload for `field`.
    ///
    /// # Errors
    ///
    /// [`TypeError::UnexpectedWireType`] for any other payload.
    pub fn varint(self, field: &'static str) -> Result<u64, TypeError> {
        match self {
            Self::Varint(v) => Ok(v),
            other => Err(TypeError::UnexpectedWireType {
                field,
                expected: "varint",
                found: other.wire_name(),
            }),
        }
    }

    /// Expect a bytes payload for `field`.
    ///
    /// # Errors
    ///
    /// [`TypeError::UnexpectedWireType`] for any other payload.
    pub fn bytes(self, field: &'static str) -> Result<&'a [u8], TypeError> {
        match self {
            Self::Bytes(b) => Ok(b),
            other => Err(TypeError::UnexpectedWireType {
                field,
                expected: "bytes",
                found: other.wire_name(),
            }),
        }
    }

    /// Expect a nested payload for `field`.
    ///
    /// # Errors
    ///
    /// [`TypeError::UnexpectedWireType`] for any other payload.
    pub fn nested(self, field: &'static str) -> Result<&'a [u8], TypeError> {
        match self {
            Self::Nested(b) => Ok(b),
            other => Err(TypeError::UnexpectedWireType {
                field,
                expected: "nested",
                found: other.wire_name(),
            }),
        }
    }

    /// Expect a UTF-8 string carried in a bytes payload.
    ///
    /// # Errors
    ///
    /// [`TypeError::UnexpectedWireType`] or [`TypeError::InvalidUtf8`].
    pub fn string(self, field: &'static str) -> Result<String, TypeError> {
        let raw = self.bytes(field)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| TypeError::InvalidUtf8 { field })
    }
}

/// Cursor over the TLV fields of one record.
///
/// Yields `(field_id, payload)` pairs in wire order. A malformed field ends
/// iteration with an error; callers typically drive it with `?` inside a
/// `for` loop and `match` on the field id, ignoring ids they do not know.
///
/// ```rust
/// use dagpath_types::fields::{FieldReader, encode_varint_field};
///
/// let mut body = Vec::new();
/// encode_varint_field(&mut body, 3, 42);
/// let fields: Vec<_> = FieldReader::new(&body).collect::<Result<_, _>>().unwrap();
/// assert_eq!(fields.len(), 1);
/// assert_eq!(fields[0].0, 3);
/// ```
pub struct FieldReader<'a> {
    buf: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> FieldReader<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            offset: 0,
            failed: false,
        }
    }

    fn varint(&mut self) -> Result<u64, TypeError> {
        let (value, n) = decode_varint(&self.buf[self.offset..]).map_err(|e| match e {
            WireError::UnexpectedEof { offset } => WireError::UnexpectedEof {
                offset: self.offset + offset,
            },
            other => other,
        })?;
        self.offset += n;
        Ok(value)
    }

    fn slice(&mut self) -> Result<&'a [u8], TypeError> {
        let len = usize::try_from(self.varint()?).unwrap_or(usize::MAX);
        let end = self.offset.saturating_add(len);
        let data = self
            .buf
            .get(self.offset..end)
            .ok_or(WireError::UnexpectedEof {
                offset: self.buf.len(),
            })?;
        self.offset = end;
        Ok(data)
    }

    fn read_field(&mut self) -> Result<(u64, FieldPayload<'a>), TypeError> {
        let field_id = self.varint()?;
        let wire_type = FieldWireType::from_raw(self.varint()?)?;
        let payload = match wire_type {
            FieldWireType::Varint => FieldPayload::Varint(self.varint()?),
            FieldWireType::Bytes => FieldPayload::Bytes(self.slice()?),
            FieldWireType::Nested => FieldPayload::Nested(self.slice()?),
        };
        Ok((field_id, payload))
    }
}

impl<'a> Iterator for FieldReader<'a> {
    type Item = Result<(u64, FieldPayload<'a>), TypeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.buf.len() {
            return None;
        }
        let item = self.read_field();
        self.failed = item.is_err();
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(buf: &[u8]) -> Result<Vec<(u64, FieldPayload<'_>)>, TypeError> {
        FieldReader::new(buf).collect()
    }

    #[test]
    fn reads_fields_in_wire_order() {
        let mut buf = Vec::new();
        encode_varint_field(&mut buf, 1, 7);
        encode_bytes_field(&mut buf, 2, b"child");
        encode_varint_field(&mut buf, 3, 300);

        let fields = read_all(&buf).unwrap();
        assert_eq!(
            fields,
            vec![
                (1, FieldPayload::Varint(7)),
                (2, FieldPayload::Bytes(b"child")),
                (3, FieldPayload::Varint(300)),
            ]
        );
    }

    #[test]
    fn nested_record_is_a_separate_reader() {
        let mut inner = Vec::new();
        encode_bytes_field(&mut inner, 1, b"grandchild");
        let mut buf = Vec::new();
        encode_nested_field(&mut buf, 4, &inner);

        let fields = read_all(&buf).unwrap();
        let nested = fields[0].1.nested("link").unwrap();
        let inner_fields = read_all(nested).unwrap();
        assert_eq!(inner_fields[0].1.string("name").unwrap(), "grandchild");
    }

    #[test]
    fn empty_record_yields_nothing() {
        assert!(read_all(&[]).unwrap().is_empty());
    }

    #[test]
    fn wrong_wire_type_is_reported() {
        let err = FieldPayload::Varint(1).bytes("name").unwrap_err();
        assert!(matches!(
            err,
            TypeError::UnexpectedWireType {
                field: "name",
                expected: "bytes",
                found: "varint"
            }
        ));
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let err = FieldPayload::Bytes(&[0xFF, 0xFE]).string("name").unwrap_err();
        assert!(matches!(err, TypeError::InvalidUtf8 { field: "name" }));
    }

    #[test]
    fn unknown_wire_type_rejected() {
        let mut buf = Vec::new();
        push_varint(&mut buf, 1);
        push_varint(&mut buf, 5);
        assert!(matches!(
            read_all(&buf),
            Err(TypeError::UnknownFieldWireType { value: 5 })
        ));
    }

    #[test]
    fn truncated_bytes_field_rejected() {
        let mut buf = Vec::new();
        encode_bytes_field(&mut buf, 2, b"hello");
        buf.truncate(buf.len() - 2);
        assert!(matches!(
            read_all(&buf),
            Err(TypeError::Wire(WireError::UnexpectedEof { .. }))
        ));
    }

    #[test]
    fn reader_stops_after_first_error() {
        let mut reader = FieldReader::new(&[0x01, 0x09]);
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }
}
