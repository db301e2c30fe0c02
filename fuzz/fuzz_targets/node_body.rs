#![no_main]

use libfuzzer_sys::fuzz_target;
use dagpath_types::{DagNode, NodeData, Value};

// Fuzz target: codec body deserialization.
//
// Input format:
//   byte 0:    selects dag-node, value, or node-data record
//   bytes 1..: body
//
// Catches bugs in:
// - nested record length handling
// - value nesting depth limits
// - invalid enum and prototype tags
// - UTF-8 validation of names and strings
fuzz_target!(|data: &[u8]| {
    let Some((&selector, body)) = data.split_first() else {
        return;
    };
    match selector % 3 {
        0 => {
            let _ = DagNode::decode_body(body);
        }
        1 => {
            let _ = Value::decode_body(body);
        }
        _ => {
            let _ = NodeData::decode(body);
        }
    }
});
