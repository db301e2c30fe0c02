use dagpath_wire::WireError;

/// Errors that can occur when encoding or decoding typed node bodies.
///
/// These are higher-level than [`WireError`]: they deal with the TLV
/// records inside a block body rather than the block frame or address
/// bytes. A `TypeError` wraps a `WireError` when the problem originates in
/// varint or length-prefix parsing within a body.
///
/// ```text
/// ┌─────────────────────────────────────────────────────┐
/// │ TypeError (this crate)                              │
/// │   ├── MissingRequiredField for incomplete records   │
/// │   ├── UnknownFieldWireType for bad TLV wire types   │
/// │   ├── InvalidEnumValue for out-of-range kind tags   │
/// │   ├── InvalidUtf8 for non-UTF-8 names and strings   │
/// │   └── wraps WireError for low-level parse failures  │
/// └─────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// A required field was not present in a record.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: &'static str },

    /// A field's wire type did not match any known [`FieldWireType`].
    ///
    /// [`FieldWireType`]: crate::fields::FieldWireType
    #[error("unknown field wire type: {value}")]
    UnknownFieldWireType { value: u64 },

    /// A field carried the wrong wire type for its id.
    #[error("field {field} has wire type {found}, expected {expected}")]
    UnexpectedWireType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// A kind/enum tag was outside its defined range.
    #[error("invalid {enum_name} value: {value}")]
    InvalidEnumValue { enum_name: &'static str, value: u64 },

    /// A link name, map key, or string value was not valid UTF-8.
    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    /// Value trees nested deeper than the decoder allows.
    #[error("value nesting exceeds {limit} levels")]
    TooDeep { limit: usize },

    /// An underlying wire-level error occurred while parsing within a body.
    #[error(transparent)]
    Wire(#[from] WireError),
}
