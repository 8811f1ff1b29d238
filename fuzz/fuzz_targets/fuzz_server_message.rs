#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Inbound frames are text; the transport drops anything else before
    // it reaches the codec.
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(message) = taboo_client::codec::decode(text) {
            let _ = message.kind();
        }
    }
});
