use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Wall-clock instant at which a fragment `presentation_time` seconds into the
/// stream may be served. `None` if the offset cannot be represented.
pub fn available_at(start_time: DateTime<Utc>, presentation_time: f64) -> Option<DateTime<Utc>> {
    let offset = Duration::try_from_secs_f64(presentation_time).ok()?;
    let offset = TimeDelta::from_std(offset).ok()?;
    start_time.checked_add_signed(offset)
}

/// `start_time + presentation_time <= now`.
///
/// A fragment scheduled `presentation_time` seconds into the loop is held back
/// until that much real time has passed since the stream started, which gives
/// the loop a live cadence.
pub fn is_available(start_time: DateTime<Utc>, presentation_time: f64, now: DateTime<Utc>) -> bool {
    available_at(start_time, presentation_time).is_some_and(|at| at <= now)
}
