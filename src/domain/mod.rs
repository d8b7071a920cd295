pub mod booking;
pub mod date_range;
pub mod pricing;
pub mod room;
pub mod session;
