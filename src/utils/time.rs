use std::time::Duration;

const SECONDS_IN_HOUR: f64 = 3600.;

/// This is the standard way of converting measured time into hours in hourswasted.
pub fn duration_to_hours(duration: Duration) -> f64 {
    duration.as_secs_f64() / SECONDS_IN_HOUR
}
