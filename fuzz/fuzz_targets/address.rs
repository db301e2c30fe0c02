#![no_main]

use libfuzzer_sys::fuzz_target;
use dagpath_wire::ContentAddress;

// Fuzz target: content address parsing in binary and text form.
//
// Any address that parses must print and re-parse to itself.
fuzz_target!(|data: &[u8]| {
    if let Ok(address) = ContentAddress::from_bytes(data) {
        assert_eq!(ContentAddress::from_bytes(&address.to_bytes()).unwrap(), address);
        let text = address.to_string();
        assert_eq!(text.parse::<ContentAddress>().unwrap(), address);
    }
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = text.parse::<ContentAddress>();
    }
});
