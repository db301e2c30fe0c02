#![no_main]

use libfuzzer_sys::fuzz_target;
use dagpath_wire::BlockFrame;

// Fuzz target: BlockFrame::read_from on arbitrary blocks.
//
// A frame that parses must survive a write->read roundtrip.
fuzz_target!(|data: &[u8]| {
    if let Ok(frame) = BlockFrame::read_from(data) {
        let reparsed = BlockFrame::read_from(&frame.to_bytes()).unwrap();
        assert_eq!(reparsed.flags, frame.flags);
        assert_eq!(reparsed.body, frame.body);
    }
});
