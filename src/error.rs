use thiserror::Error;

use crate::domain::date_range::DateRangeError;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid dates: {0}")]
    InvalidDates(#[from] DateRangeError),

    #[error("Invalid input: {reason}")]
    InvalidParams { reason: String },

    #[error("Rejected by the server: {reason}")]
    Rejected { reason: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Not signed in: {reason}")]
    Unauthorized { reason: String },

    #[error("Room not found: {id}")]
    RoomNotFound { id: String },

    #[error("Room {id} cannot be booked: {reason}")]
    UnbookableRoom { id: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl BookingError {
    /// Whether the caller should be sent to sign in instead of seeing a plain error.
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Validation failures detected before any request left the process.
    pub fn is_local_validation(&self) -> bool {
        matches!(self, Self::InvalidDates(_) | Self::InvalidParams { .. })
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;
