#![no_main]

use libfuzzer_sys::fuzz_target;
use dagpath_decoder::{BlockDecoder, Decoder};
use dagpath_types::{Codec, ContentAddress, HashFn, Prototype};

// Fuzz target: the full block decoder, with digests that always match.
//
// Input format:
//   byte 0:    low two bits pick the codec, next two the prototype
//   bytes 1..: the block
//
// Catches bugs in:
// - frame flag handling
// - zstd decompression limits
// - codec/prototype dispatch
fuzz_target!(|data: &[u8]| {
    let Some((&selector, block)) = data.split_first() else {
        return;
    };
    let codec = match selector & 0b11 {
        0 => Codec::Raw,
        1 => Codec::Value,
        _ => Codec::DagNode,
    };
    let prototype = match (selector >> 2) & 0b11 {
        0 => Prototype::Any,
        1 => Prototype::DagNode,
        2 => Prototype::Value,
        _ => Prototype::Raw,
    };
    let address = ContentAddress::compute(codec, HashFn::Blake3, block);
    let _ = BlockDecoder::new().decode(block, &address, prototype);
});
