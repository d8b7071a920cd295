use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::error::{BookingError, Result};

/// Why a check-in/check-out pair cannot be booked.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("select both a check-in and a check-out date")]
    IncompleteSelection,
    #[error("check-in date is in the past")]
    PastCheckIn,
    #[error("check-out must be at least one day after check-in")]
    InvertedRange,
}

/// A validated stay. Only [`validate_dates`] builds one, so `check_out > check_in`
/// always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl DateRange {
    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Check-in as the ISO-8601 timestamp sent to the API (UTC midnight).
    pub fn check_in_iso(&self) -> String {
        to_iso_timestamp(self.check_in)
    }

    pub fn check_out_iso(&self) -> String {
        to_iso_timestamp(self.check_out)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.check_in, self.check_out)
    }
}

pub fn validate_dates(
    check_in: Option<NaiveDate>,
    check_out: Option<NaiveDate>,
    today: NaiveDate,
) -> std::result::Result<DateRange, DateRangeError> {
    let (Some(check_in), Some(check_out)) = (check_in, check_out) else {
        return Err(DateRangeError::IncompleteSelection);
    };
    if check_in < today {
        return Err(DateRangeError::PastCheckIn);
    }
    if check_out <= check_in {
        return Err(DateRangeError::InvertedRange);
    }
    Ok(DateRange {
        check_in,
        check_out,
    })
}

/// Parse a user-supplied date. Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp,
/// in which case the time of day is dropped.
pub fn parse_date_input(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.date_naive())
        .map_err(|_| BookingError::InvalidParams {
            reason: format!("invalid date '{trimmed}', expected YYYY-MM-DD"),
        })
}

/// Optional variant of [`parse_date_input`] for form fields that may be left blank.
pub fn parse_optional_date(input: Option<&str>) -> Result<Option<NaiveDate>> {
    match input.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_date_input(s).map(Some),
    }
}

fn to_iso_timestamp(date: NaiveDate) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(date.and_time(NaiveTime::MIN), Utc)
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn valid_range_accepted() {
        let range = validate_dates(Some(d("2024-06-01")), Some(d("2024-06-03")), d("2024-05-01"))
            .unwrap();
        assert_eq!(range.check_in(), d("2024-06-01"));
        assert_eq!(range.check_out(), d("2024-06-03"));
    }

    #[test]
    fn check_in_today_is_allowed() {
        assert!(validate_dates(Some(d("2024-06-01")), Some(d("2024-06-02")), d("2024-06-01")).is_ok());
    }

    #[test]
    fn missing_either_date_is_incomplete() {
        let today = d("2024-01-01");
        assert_eq!(
            validate_dates(None, Some(d("2024-06-03")), today),
            Err(DateRangeError::IncompleteSelection)
        );
        assert_eq!(
            validate_dates(Some(d("2024-06-01")), None, today),
            Err(DateRangeError::IncompleteSelection)
        );
        assert_eq!(
            validate_dates(None, None, today),
            Err(DateRangeError::IncompleteSelection)
        );
    }

    #[test]
    fn past_check_in_rejected() {
        assert_eq!(
            validate_dates(Some(d("2024-05-31")), Some(d("2024-06-03")), d("2024-06-01")),
            Err(DateRangeError::PastCheckIn)
        );
    }

    #[test]
    fn same_day_rejected_as_inverted() {
        assert_eq!(
            validate_dates(Some(d("2024-06-01")), Some(d("2024-06-01")), d("2024-05-01")),
            Err(DateRangeError::InvertedRange)
        );
    }

    #[test]
    fn checkout_before_checkin_rejected() {
        assert_eq!(
            validate_dates(Some(d("2024-06-05")), Some(d("2024-06-01")), d("2024-05-01")),
            Err(DateRangeError::InvertedRange)
        );
    }

    #[test]
    fn parse_plain_date() {
        assert_eq!(parse_date_input("2024-06-01").unwrap(), d("2024-06-01"));
        assert_eq!(parse_date_input("  2024-06-01 ").unwrap(), d("2024-06-01"));
    }

    #[test]
    fn parse_timestamp_drops_time_of_day() {
        assert_eq!(
            parse_date_input("2024-06-01T18:45:00Z").unwrap(),
            d("2024-06-01")
        );
        assert_eq!(
            parse_date_input("2024-06-01T23:30:00+02:00").unwrap(),
            d("2024-06-01")
        );
    }

    #[test]
    fn parse_garbage_is_invalid_params() {
        let err = parse_date_input("next tuesday").unwrap_err();
        assert!(matches!(err, BookingError::InvalidParams { .. }));
        assert!(err.to_string().contains("next tuesday"));
    }

    #[test]
    fn parse_optional_blank_is_none() {
        assert_eq!(parse_optional_date(None).unwrap(), None);
        assert_eq!(parse_optional_date(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_optional_date(Some("2024-06-01")).unwrap(),
            Some(d("2024-06-01"))
        );
    }

    #[test]
    fn iso_timestamps_are_utc_midnight() {
        let range = validate_dates(Some(d("2024-06-01")), Some(d("2024-06-03")), d("2024-05-01"))
            .unwrap();
        assert_eq!(range.check_in_iso(), "2024-06-01T00:00:00.000Z");
        assert_eq!(range.check_out_iso(), "2024-06-03T00:00:00.000Z");
        assert_eq!(range.to_string(), "2024-06-01 to 2024-06-03");
    }
}
