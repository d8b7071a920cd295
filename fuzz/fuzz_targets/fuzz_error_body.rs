#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(body) = std::str::from_utf8(data) {
        let _ = mcp_hotel_booking::adapters::rest::response::extract_message(body);
    }
});
