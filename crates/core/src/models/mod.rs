//! Shared domain models.

mod flight;
mod reservation;

pub use flight::{Flight, SeatChange};
pub use reservation::{ParseStatusError, Reservation, ReservationStatus};

use chrono::{Local, NaiveDateTime, Timelike};

/// Timestamp pattern used for departure times (minute precision).
pub const DEPARTURE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Timestamp pattern used for booking times (second precision).
pub const BOOKING_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time truncated to whole seconds, matching what the record files can hold.
pub(crate) fn now_to_second() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Drop seconds and sub-seconds so a departure survives the minute-precision record format.
pub(crate) fn truncate_to_minute(time: NaiveDateTime) -> NaiveDateTime {
    time.with_second(0)
        .and_then(|value| value.with_nanosecond(0))
        .unwrap_or(time)
}
