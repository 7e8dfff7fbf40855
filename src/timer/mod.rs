//! Session timer. Split into:
//!  - [state], a pure state machine describing what each operation should do.
//!  - [session], the driver that applies those descriptions to the store and the display.
//!  - [ticker], the cancellable periodic schedule that drives [session::SessionTimer::tick].

pub mod session;
pub mod state;
pub mod ticker;

use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use crate::error::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    /// How often the running total is refreshed.
    pub tick_period: Duration,
    /// How much running time may be lost on abrupt termination.
    pub checkpoint_interval: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(1),
            checkpoint_interval: Duration::from_secs(60),
        }
    }
}

/// Receives everything the user is supposed to see. Implemented by the shell.
#[cfg_attr(test, automock)]
pub trait StatusSink: Send {
    fn show_total(&mut self, hours: f64);

    fn show_error(&mut self, error: &TrackerError);
}

/// Standard way of showing hours to a user. Stored values keep full precision.
pub fn format_hours(hours: f64) -> String {
    format!("Hours: {hours:.2}")
}
