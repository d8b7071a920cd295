#![allow(clippy::cast_precision_loss)]

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::date_range::DateRange;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Price breakdown for a stay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quote {
    pub nights: u32,
    pub nightly_rate: f64,
    pub total_price: f64,
}

impl std::fmt::Display for Quote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} night{} x ${:.2} = ${:.2}",
            self.nights,
            if self.nights == 1 { "" } else { "s" },
            self.nightly_rate,
            self.total_price
        )
    }
}

/// Nights billed for a validated range. Never zero.
pub fn nights(range: &DateRange) -> u32 {
    let days = (range.check_out() - range.check_in()).num_days();
    u32::try_from(days).unwrap_or(u32::MAX).max(1)
}

/// Nights between two instants, rounding any partial day up.
///
/// Returns 0 when `check_out` is not after `check_in`, otherwise at least 1.
pub fn nights_between(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> u32 {
    let millis = (check_out - check_in).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    let days = millis.div_euclid(MILLIS_PER_DAY) + i64::from(millis % MILLIS_PER_DAY != 0);
    u32::try_from(days).unwrap_or(u32::MAX)
}

pub fn quote(range: &DateRange, nightly_rate: f64) -> Quote {
    let nights = nights(range);
    Quote {
        nights,
        nightly_rate,
        total_price: f64::from(nights) * nightly_rate,
    }
}
