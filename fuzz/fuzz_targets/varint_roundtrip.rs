#![no_main]

use libfuzzer_sys::fuzz_target;
use dagpath_wire::varint::{decode_varint, push_varint, varint_len};

// Fuzz target: every u64 survives encode->decode with the predicted length.
fuzz_target!(|data: [u8; 8]| {
    let value = u64::from_le_bytes(data);
    let mut wire = Vec::new();
    push_varint(&mut wire, value);
    assert_eq!(wire.len(), varint_len(value));

    let (decoded, consumed) = decode_varint(&wire).unwrap();
    assert_eq!(decoded, value);
    assert_eq!(consumed, wire.len());
});
