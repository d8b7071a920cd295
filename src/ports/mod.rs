pub mod cache;
pub mod clock;
pub mod hotel_api;
