use async_trait::async_trait;

use crate::domain::booking::{Booking, BookingDraft};
use crate::domain::date_range::DateRange;
use crate::domain::room::Room;
use crate::domain::session::{Credentials, Registration, Session};
use crate::error::Result;

/// The remote hotel REST API.
///
/// Every call issues at most one request; implementations never retry.
#[async_trait]
pub trait HotelApi: Send + Sync {
    async fn list_rooms(&self) -> Result<Vec<Room>>;
    async fn get_room(&self, id: &str) -> Result<Room>;
    async fn check_availability(&self, room_id: &str, range: &DateRange) -> Result<bool>;
    async fn create_booking(&self, session: &Session, draft: &BookingDraft) -> Result<Booking>;
    async fn list_user_bookings(&self, session: &Session) -> Result<Vec<Booking>>;
    async fn register(&self, registration: &Registration) -> Result<Session>;
    async fn login(&self, credentials: &Credentials) -> Result<Session>;
    async fn save_favorite(&self, session: &Session, room_id: &str) -> Result<()>;
}
