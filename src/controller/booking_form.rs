use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::domain::booking::{Booking, BookingDraft};
use crate::domain::date_range::{DateRange, DateRangeError, validate_dates};
use crate::domain::pricing::{self, Quote};
use crate::domain::room::Room;
use crate::domain::session::SessionContext;
use crate::error::{BookingError, Result};
use crate::ports::clock::Clock;
use crate::ports::hotel_api::HotelApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormState {
    Idle,
    DatesSelected,
    AvailabilityChecking,
    AvailabilityKnown(Availability),
    Submitting,
    Submitted(Booking),
    /// Behaves like `AvailabilityKnown(Available)` for the next action.
    SubmitFailed(String),
}

impl FormState {
    fn accepts_submit(&self) -> bool {
        matches!(
            self,
            Self::AvailabilityKnown(Availability::Available) | Self::SubmitFailed(_)
        )
    }

    fn locked(&self) -> bool {
        matches!(self, Self::Submitting | Self::Submitted(_))
    }
}

impl std::fmt::Display for FormState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "waiting for dates"),
            Self::DatesSelected => write!(f, "dates selected"),
            Self::AvailabilityChecking => write!(f, "checking availability"),
            Self::AvailabilityKnown(Availability::Available) => {
                write!(f, "room is available for the selected dates")
            }
            Self::AvailabilityKnown(Availability::Unavailable) => {
                write!(f, "room is not available for the selected dates")
            }
            Self::Submitting => write!(f, "submitting booking"),
            Self::Submitted(booking) => write!(f, "booked ({})", booking.id),
            Self::SubmitFailed(reason) => write!(f, "booking failed: {reason}"),
        }
    }
}

/// What a caller sees of the form at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSnapshot {
    pub room_id: String,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub state: FormState,
    pub validation: Option<DateRangeError>,
    pub last_error: Option<String>,
    pub quote: Option<Quote>,
}

impl FormSnapshot {
    pub fn can_submit(&self) -> bool {
        self.state.accepts_submit()
    }
}

impl std::fmt::Display for FormSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |d: Option<NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
        writeln!(f, "Room: {}", self.room_id)?;
        writeln!(
            f,
            "Check-in: {}  Check-out: {}",
            show(self.check_in),
            show(self.check_out)
        )?;
        writeln!(f, "Status: {}", self.state)?;
        if let Some(problem) = self.validation {
            writeln!(f, "Dates: {problem}")?;
        }
        if let Some(err) = &self.last_error {
            writeln!(f, "Error: {err}")?;
        }
        if let Some(quote) = &self.quote {
            writeln!(f, "Total price: {quote}")?;
        }
        write!(
            f,
            "Booking {}",
            if self.can_submit() { "enabled" } else { "disabled" }
        )
    }
}

/// Result of a submit attempt.
#[derive(Debug)]
pub enum SubmitOutcome {
    Booked(Booking),
    /// No live session. The caller should send the user to sign in; the form is unchanged.
    SignInRequired(String),
    /// Submit is not enabled in the current state.
    NotReady(FormState),
    InvalidDates(DateRangeError),
    Failed(BookingError),
}

#[derive(Debug)]
struct FormInner {
    check_in: Option<NaiveDate>,
    check_out: Option<NaiveDate>,
    state: FormState,
    validation: Option<DateRangeError>,
    last_error: Option<String>,
    /// Bumped on every date change; only a check carrying the current value may land.
    generation: u64,
}

/// Interactive booking form for one room.
///
/// State sits behind a mutex that is never held across an `.await`, so date
/// changes issued while a check is in flight are accepted immediately and the
/// superseded result is dropped when it arrives.
pub struct BookingForm {
    room: Room,
    api: Arc<dyn HotelApi>,
    session: SessionContext,
    clock: Arc<dyn Clock>,
    inner: Mutex<FormInner>,
}

impl BookingForm {
    /// Fails for a room whose nightly rate cannot price a stay.
    pub fn new(
        room: Room,
        api: Arc<dyn HotelApi>,
        session: SessionContext,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if !room.has_valid_rate() {
            return Err(BookingError::UnbookableRoom {
                id: room.id.clone(),
                reason: format!("nightly rate {} is not a positive amount", room.nightly_rate),
            });
        }
        Ok(Self {
            room,
            api,
            session,
            clock,
            inner: Mutex::new(FormInner {
                check_in: None,
                check_out: None,
                state: FormState::Idle,
                validation: None,
                last_error: None,
                generation: 0,
            }),
        })
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn snapshot(&self) -> FormSnapshot {
        let inner = self.lock();
        self.snapshot_of(&inner)
    }

    /// Picking a check-in on or after the current check-out clears the check-out.
    pub async fn select_check_in(&self, date: Option<NaiveDate>) -> Result<FormSnapshot> {
        self.change_dates(|inner| {
            inner.check_in = date;
            if let (Some(ci), Some(co)) = (date, inner.check_out)
                && ci >= co
            {
                inner.check_out = None;
            }
        })
        .await
    }

    pub async fn select_check_out(&self, date: Option<NaiveDate>) -> Result<FormSnapshot> {
        self.change_dates(|inner| inner.check_out = date).await
    }

    pub async fn select_dates(
        &self,
        check_in: Option<NaiveDate>,
        check_out: Option<NaiveDate>,
    ) -> Result<FormSnapshot> {
        self.change_dates(|inner| {
            inner.check_in = check_in;
            inner.check_out = check_out;
        })
        .await
    }

    /// Manual retry after a failed availability check.
    pub async fn recheck(&self) -> Result<FormSnapshot> {
        self.change_dates(|_| {}).await
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let (session, draft) = {
            let mut inner = self.lock();
            if !inner.state.accepts_submit() {
                return SubmitOutcome::NotReady(inner.state.clone());
            }
            let session = match self.session.active(self.clock.now()) {
                Ok(session) => session,
                Err(e) => {
                    info!(room_id = %self.room.id, "Submit without a live session, sign-in required");
                    return SubmitOutcome::SignInRequired(e.to_string());
                }
            };
            let range = match validate_dates(inner.check_in, inner.check_out, self.clock.today()) {
                Ok(range) => range,
                Err(problem) => {
                    inner.validation = Some(problem);
                    inner.state = FormState::DatesSelected;
                    return SubmitOutcome::InvalidDates(problem);
                }
            };
            let quote = pricing::quote(&range, self.room.nightly_rate);
            inner.state = FormState::Submitting;
            inner.last_error = None;
            (
                session,
                BookingDraft {
                    room_id: self.room.id.clone(),
                    date_range: range,
                    total_price: quote.total_price,
                },
            )
        };

        info!(
            room_id = %draft.room_id,
            range = %draft.date_range,
            total_price = draft.total_price,
            "Submitting booking"
        );
        let result = self.api.create_booking(&session, &draft).await;

        let mut inner = self.lock();
        match result {
            Ok(booking) => {
                info!(booking_id = %booking.id, status = %booking.status, "Booking submitted");
                inner.state = FormState::Submitted(booking.clone());
                inner.check_in = None;
                inner.check_out = None;
                inner.validation = None;
                inner.generation += 1;
                SubmitOutcome::Booked(booking)
            }
            Err(e) => {
                warn!(error = %e, room_id = %draft.room_id, "Booking submission failed");
                inner.state = FormState::SubmitFailed(e.to_string());
                inner.last_error = Some(e.to_string());
                if e.requires_sign_in() {
                    SubmitOutcome::SignInRequired(e.to_string())
                } else {
                    SubmitOutcome::Failed(e)
                }
            }
        }
    }

    async fn change_dates(&self, edit: impl FnOnce(&mut FormInner)) -> Result<FormSnapshot> {
        let (generation, range) = {
            let mut inner = self.lock();
            if inner.state.locked() {
                return Err(BookingError::InvalidParams {
                    reason: format!("dates cannot be changed: {}", inner.state),
                });
            }
            edit(&mut inner);
            inner.generation += 1;
            inner.last_error = None;
            match validate_dates(inner.check_in, inner.check_out, self.clock.today()) {
                Ok(range) => {
                    inner.validation = None;
                    inner.state = FormState::AvailabilityChecking;
                    (inner.generation, range)
                }
                Err(problem) => {
                    let untouched = inner.check_in.is_none() && inner.check_out.is_none();
                    inner.validation = (!untouched).then_some(problem);
                    inner.state = if untouched {
                        FormState::Idle
                    } else {
                        FormState::DatesSelected
                    };
                    return Ok(self.snapshot_of(&inner));
                }
            }
        };

        debug!(room_id = %self.room.id, %range, generation, "Checking availability");
        let result = self.api.check_availability(&self.room.id, &range).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(
                generation,
                latest = inner.generation,
                "Discarding superseded availability result"
            );
            return Ok(self.snapshot_of(&inner));
        }
        match result {
            Ok(true) => inner.state = FormState::AvailabilityKnown(Availability::Available),
            Ok(false) => inner.state = FormState::AvailabilityKnown(Availability::Unavailable),
            Err(e) => {
                warn!(error = %e, room_id = %self.room.id, "Availability check failed");
                inner.state = FormState::DatesSelected;
                inner.last_error = Some(e.to_string());
            }
        }
        Ok(self.snapshot_of(&inner))
    }

    fn snapshot_of(&self, inner: &FormInner) -> FormSnapshot {
        let quote = self
            .valid_range(inner)
            .map(|range| pricing::quote(&range, self.room.nightly_rate));
        FormSnapshot {
            room_id: self.room.id.clone(),
            check_in: inner.check_in,
            check_out: inner.check_out,
            state: inner.state.clone(),
            validation: inner.validation,
            last_error: inner.last_error.clone(),
            quote,
        }
    }

    fn valid_range(&self, inner: &FormInner) -> Option<DateRange> {
        validate_dates(inner.check_in, inner.check_out, self.clock.today()).ok()
    }

    fn lock(&self) -> MutexGuard<'_, FormInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
