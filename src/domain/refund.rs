//! Cancellation refund policy.
//!
//! | Days until event (rounded up) | Refund |
//! |-------------------------------|--------|
//! | 7 or more                     | 90 %   |
//! | 3 to 6                        | 50 %   |
//! | under 3                       | 0 %    |

use chrono::{DateTime, TimeDelta, Utc};

/// Whole days until `event_date`, rounded up (`ceil`) at full clock
/// precision. Negative once the event is in the past.
#[must_use]
pub fn days_until(event_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let delta = event_date - now;
    let whole = delta.num_days();
    let has_remainder = TimeDelta::try_days(whole).is_some_and(|days| delta > days);
    if has_remainder { whole + 1 } else { whole }
}

/// Refund percentage for a cancellation made `days` days before the event.
#[must_use]
pub const fn refund_percent(days: i64) -> i64 {
    if days >= 7 {
        90
    } else if days >= 3 {
        50
    } else {
        0
    }
}

/// Refund in minor units for cancelling a booking worth `total_amount`.
#[must_use]
pub fn compute_refund(total_amount: i64, event_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let percent = refund_percent(days_until(event_date, now));
    total_amount.saturating_mul(percent) / 100
}
