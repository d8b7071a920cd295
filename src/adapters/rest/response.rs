use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::BookingError;

/// Pull a human-readable message out of an error body.
///
/// Understands `{"message": ..}`, `{"error": ..}` and field maps like
/// `{"errors": {"email": "taken"}}`; anything else is returned trimmed.
pub fn extract_message(body: &str) -> String {
    let trimmed = body.trim();
    let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return trimmed.chars().take(200).collect();
    };
    if let Some(msg) = json
        .get("message")
        .or_else(|| json.get("error"))
        .and_then(serde_json::Value::as_str)
    {
        return msg.to_string();
    }
    if let Some(errors) = json.get("errors").and_then(serde_json::Value::as_object) {
        let mut parts: Vec<String> = errors
            .iter()
            .map(|(field, value)| match value.as_str() {
                Some(s) => format!("{field}: {s}"),
                None => format!("{field}: {value}"),
            })
            .collect();
        parts.sort();
        return parts.join("; ");
    }
    trimmed.chars().take(200).collect()
}

/// Map a non-success status to the error a user should see.
///
/// `room_id` is set for requests addressing a single room, so a 404 there names it.
pub fn error_for_status(status: StatusCode, body: &str, room_id: Option<&str>) -> BookingError {
    let message = extract_message(body);
    match (status.as_u16(), room_id) {
        (401 | 403, _) => BookingError::Unauthorized {
            reason: if message.is_empty() {
                "the server rejected the session".into()
            } else {
                message
            },
        },
        (404, Some(id)) => BookingError::RoomNotFound { id: id.to_string() },
        (400 | 409 | 422, _) => BookingError::Rejected {
            reason: if message.is_empty() {
                format!("request rejected (HTTP {status})")
            } else {
                message
            },
        },
        (code, _) => BookingError::Server {
            status: code,
            message: if message.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                message
            },
        },
    }
}

/// Decode a success body, reporting a malformed one as a server fault.
pub fn decode<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, BookingError> {
    serde_json::from_str(body).map_err(|e| BookingError::Server {
        status: status.as_u16(),
        message: format!("unexpected response body: {e}"),
    })
}
