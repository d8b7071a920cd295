use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::booking::{Booking, BookingDraft, BookingStatus};
use crate::domain::date_range::DateRange;
use crate::domain::room::Room;
use crate::domain::session::{Credentials, Registration, Session, User};
use crate::error::{BookingError, Result};
use crate::ports::clock::Clock;
use crate::ports::hotel_api::HotelApi;

type RoomsFn = Box<dyn Fn() -> Result<Vec<Room>> + Send + Sync>;
type RoomFn = Box<dyn Fn(&str) -> Result<Room> + Send + Sync>;
type AvailabilityFn = Box<dyn Fn(&str, &DateRange) -> Result<bool> + Send + Sync>;
type DelayFn = Box<dyn Fn(&DateRange) -> Duration + Send + Sync>;
type CallDelayFn = Box<dyn Fn(usize) -> Duration + Send + Sync>;
type CreateBookingFn = Box<dyn Fn(&BookingDraft) -> Result<Booking> + Send + Sync>;
type BookingsFn = Box<dyn Fn(&Session) -> Result<Vec<Booking>> + Send + Sync>;
type RegisterFn = Box<dyn Fn(&Registration) -> Result<Session> + Send + Sync>;
type LoginFn = Box<dyn Fn(&Credentials) -> Result<Session> + Send + Sync>;
type FavoriteFn = Box<dyn Fn(&Session, &str) -> Result<()> + Send + Sync>;

#[allow(clippy::struct_field_names)]
pub struct MockHotelApi {
    rooms_fn: Mutex<RoomsFn>,
    room_fn: Mutex<RoomFn>,
    room_delay: Mutex<CallDelayFn>,
    availability_fn: Mutex<AvailabilityFn>,
    availability_delay: Mutex<DelayFn>,
    create_booking_fn: Mutex<CreateBookingFn>,
    booking_delay: Mutex<Duration>,
    bookings_fn: Mutex<BookingsFn>,
    register_fn: Mutex<RegisterFn>,
    login_fn: Mutex<LoginFn>,
    favorite_fn: Mutex<FavoriteFn>,
    drafts: Mutex<Vec<BookingDraft>>,
    pub room_calls: AtomicUsize,
    pub availability_calls: AtomicUsize,
    pub booking_calls: AtomicUsize,
}

impl Default for MockHotelApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHotelApi {
    pub fn new() -> Self {
        Self {
            rooms_fn: Mutex::new(Box::new(|| {
                Ok(vec![make_room("r1", 100.0), make_room("r2", 250.0)])
            })),
            room_fn: Mutex::new(Box::new(|id| Ok(make_room(id, 100.0)))),
            room_delay: Mutex::new(Box::new(|_| Duration::ZERO)),
            availability_fn: Mutex::new(Box::new(|_, _| Ok(true))),
            availability_delay: Mutex::new(Box::new(|_| Duration::ZERO)),
            create_booking_fn: Mutex::new(Box::new(|draft| Ok(make_booking(draft)))),
            booking_delay: Mutex::new(Duration::ZERO),
            bookings_fn: Mutex::new(Box::new(|_| Ok(vec![]))),
            register_fn: Mutex::new(Box::new(|reg| {
                Ok(make_session_for(&reg.name, &reg.email))
            })),
            login_fn: Mutex::new(Box::new(|creds| Ok(make_session_for("Ada", &creds.email)))),
            favorite_fn: Mutex::new(Box::new(|_, _| Ok(()))),
            drafts: Mutex::new(Vec::new()),
            room_calls: AtomicUsize::new(0),
            availability_calls: AtomicUsize::new(0),
            booking_calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_rooms(self, f: impl Fn() -> Result<Vec<Room>> + Send + Sync + 'static) -> Self {
        *self.rooms_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_room(self, f: impl Fn(&str) -> Result<Room> + Send + Sync + 'static) -> Self {
        *self.room_fn.lock().unwrap() = Box::new(f);
        self
    }

    /// Latency for `get_room`, keyed by the zero-based call number.
    #[must_use]
    pub fn with_room_delay(self, f: impl Fn(usize) -> Duration + Send + Sync + 'static) -> Self {
        *self.room_delay.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_availability(
        self,
        f: impl Fn(&str, &DateRange) -> Result<bool> + Send + Sync + 'static,
    ) -> Self {
        *self.availability_fn.lock().unwrap() = Box::new(f);
        self
    }

    /// Per-range latency for availability answers, to reorder responses.
    #[must_use]
    pub fn with_availability_delay(
        self,
        f: impl Fn(&DateRange) -> Duration + Send + Sync + 'static,
    ) -> Self {
        *self.availability_delay.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_create_booking(
        self,
        f: impl Fn(&BookingDraft) -> Result<Booking> + Send + Sync + 'static,
    ) -> Self {
        *self.create_booking_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_booking_delay(self, delay: Duration) -> Self {
        *self.booking_delay.lock().unwrap() = delay;
        self
    }

    #[must_use]
    pub fn with_bookings(
        self,
        f: impl Fn(&Session) -> Result<Vec<Booking>> + Send + Sync + 'static,
    ) -> Self {
        *self.bookings_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_register(
        self,
        f: impl Fn(&Registration) -> Result<Session> + Send + Sync + 'static,
    ) -> Self {
        *self.register_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_login(
        self,
        f: impl Fn(&Credentials) -> Result<Session> + Send + Sync + 'static,
    ) -> Self {
        *self.login_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_favorite(
        self,
        f: impl Fn(&Session, &str) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        *self.favorite_fn.lock().unwrap() = Box::new(f);
        self
    }

    /// Every draft passed to `create_booking`, in call order.
    pub fn submitted_drafts(&self) -> Vec<BookingDraft> {
        self.drafts.lock().unwrap().clone()
    }
}

#[async_trait]
impl HotelApi for MockHotelApi {
    async fn list_rooms(&self) -> Result<Vec<Room>> {
        let f = self.rooms_fn.lock().unwrap();
        f()
    }

    async fn get_room(&self, id: &str) -> Result<Room> {
        let call = self.room_calls.fetch_add(1, Ordering::SeqCst);
        let delay = {
            let f = self.room_delay.lock().unwrap();
            f(call)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let f = self.room_fn.lock().unwrap();
        f(id)
    }

    async fn check_availability(&self, room_id: &str, range: &DateRange) -> Result<bool> {
        self.availability_calls.fetch_add(1, Ordering::SeqCst);
        let delay = {
            let f = self.availability_delay.lock().unwrap();
            f(range)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let f = self.availability_fn.lock().unwrap();
        f(room_id, range)
    }

    async fn create_booking(&self, _session: &Session, draft: &BookingDraft) -> Result<Booking> {
        self.booking_calls.fetch_add(1, Ordering::SeqCst);
        self.drafts.lock().unwrap().push(draft.clone());
        let delay = *self.booking_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let f = self.create_booking_fn.lock().unwrap();
        f(draft)
    }

    async fn list_user_bookings(&self, session: &Session) -> Result<Vec<Booking>> {
        let f = self.bookings_fn.lock().unwrap();
        f(session)
    }

    async fn register(&self, registration: &Registration) -> Result<Session> {
        let f = self.register_fn.lock().unwrap();
        f(registration)
    }

    async fn login(&self, credentials: &Credentials) -> Result<Session> {
        let f = self.login_fn.lock().unwrap();
        f(credentials)
    }

    async fn save_favorite(&self, session: &Session, room_id: &str) -> Result<()> {
        let f = self.favorite_fn.lock().unwrap();
        f(session, room_id)
    }
}

/// Clock pinned to noon UTC on a given day.
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn on(day: &str) -> Self {
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap();
        Self(date.and_hms_opt(12, 0, 0).unwrap().and_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// --- Factory functions ---

pub fn make_room(id: &str, price: f64) -> Room {
    Room {
        id: id.to_string(),
        number: format!("1{}", id.len()),
        room_type: "Double".to_string(),
        capacity: 2,
        nightly_rate: price,
        amenities: vec!["WiFi".to_string(), "TV".to_string()],
        available: true,
    }
}

pub fn make_booking(draft: &BookingDraft) -> Booking {
    let midnight = |d: NaiveDate| d.and_hms_opt(0, 0, 0).unwrap().and_utc();
    Booking {
        id: format!("b-{}", draft.room_id),
        room_id: Some(draft.room_id.clone()),
        room: None,
        check_in_date: midnight(draft.date_range.check_in()),
        check_out_date: midnight(draft.date_range.check_out()),
        total_price: draft.total_price,
        status: BookingStatus::Pending,
    }
}

pub fn make_user() -> User {
    User {
        id: "u1".to_string(),
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
    }
}

pub fn make_session() -> Session {
    Session::new("opaque-token".to_string(), make_user())
}

pub fn make_session_for(name: &str, email: &str) -> Session {
    Session::new(
        "opaque-token".to_string(),
        User {
            id: "u1".to_string(),
            name: name.to_string(),
            email: email.to_string(),
        },
    )
}

pub fn unauthorized() -> BookingError {
    BookingError::Unauthorized {
        reason: "Invalid credentials".to_string(),
    }
}
