#![no_main]
use libfuzzer_sys::fuzz_target;

use mcp_hotel_booking::domain::booking::Booking;

fuzz_target!(|data: &[u8]| {
    if let Ok(bookings) = serde_json::from_slice::<Vec<Booking>>(data) {
        for booking in &bookings {
            let _ = booking.nights();
            let _ = booking.to_string();
        }
    }
});
