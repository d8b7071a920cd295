use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::date_range::DateRange;
use super::pricing;

/// Unsaved booking candidate held by an open booking form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingDraft {
    pub room_id: String,
    pub date_range: DateRange,
    pub total_price: f64,
}

/// Body of `POST /bookings`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub room_id: String,
    pub check_in_date: String,
    pub check_out_date: String,
    pub total_price: f64,
}

impl From<&BookingDraft> for CreateBookingRequest {
    fn from(draft: &BookingDraft) -> Self {
        Self {
            room_id: draft.room_id.clone(),
            check_in_date: draft.date_range.check_in_iso(),
            check_out_date: draft.date_range.check_out_iso(),
            total_price: draft.total_price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[serde(alias = "Pending")]
    Pending,
    #[serde(alias = "Confirmed")]
    Confirmed,
    #[serde(alias = "Cancelled", alias = "canceled")]
    Cancelled,
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Room reference inside a booking: either a bare id or a populated summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BookedRoom {
    Id(String),
    Summary {
        #[serde(rename = "_id", alias = "id", default)]
        id: Option<String>,
        #[serde(default)]
        number: Option<String>,
        #[serde(rename = "type", default)]
        room_type: Option<String>,
    },
}

/// A booking persisted by the hotel API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub room: Option<BookedRoom>,
    pub check_in_date: DateTime<Utc>,
    pub check_out_date: DateTime<Utc>,
    pub total_price: f64,
    pub status: BookingStatus,
}

impl Booking {
    /// Room id from whichever field the server populated.
    pub fn room_ref(&self) -> Option<&str> {
        match (&self.room_id, &self.room) {
            (Some(id), _) | (None, Some(BookedRoom::Id(id))) => Some(id.as_str()),
            (None, Some(BookedRoom::Summary { id, .. })) => id.as_deref(),
            (None, None) => None,
        }
    }

    pub fn nights(&self) -> u32 {
        pricing::nights_between(self.check_in_date, self.check_out_date)
    }
}

impl std::fmt::Display for Booking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Booking {} [{}]", self.id, self.status)?;
        if let Some(BookedRoom::Summary {
            number, room_type, ..
        }) = &self.room
        {
            if let Some(t) = room_type {
                writeln!(f, "  Room type: {t}")?;
            }
            if let Some(n) = number {
                writeln!(f, "  Room number: {n}")?;
            }
        } else if let Some(id) = self.room_ref() {
            writeln!(f, "  Room: {id}")?;
        }
        writeln!(
            f,
            "  Check-in: {}  Check-out: {}  ({} night(s))",
            self.check_in_date.date_naive(),
            self.check_out_date.date_naive(),
            self.nights()
        )?;
        write!(f, "  Total price: ${:.2}", self.total_price)
    }
}
