#![no_main]
use libfuzzer_sys::fuzz_target;

use mcp_hotel_booking::domain::date_range::{parse_date_input, validate_dates};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data)
        && let Some((a, b)) = input.split_once('|')
        && let (Ok(check_in), Ok(check_out)) = (parse_date_input(a), parse_date_input(b))
        && let Ok(range) = validate_dates(Some(check_in), Some(check_out), check_in)
    {
        assert!(range.check_out() > range.check_in());
        assert!(mcp_hotel_booking::domain::pricing::nights(&range) >= 1);
    }
});
