#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: decode_varint LEB128 codec.
//
// Catches bugs in:
// - over-long continuation runs
// - zero-length input
// - values past u64::MAX in the tenth byte
fuzz_target!(|data: &[u8]| {
    let _ = dagpath_wire::varint::decode_varint(data);
});
