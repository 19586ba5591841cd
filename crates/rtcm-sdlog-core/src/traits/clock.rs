// # Clock Trait
//
// Defines where the logger gets "now" from.
//
// File names and rotation boundaries are derived from the local calendar
// date, so the clock carries its time zone. Production code uses
// `SystemClock` (the host's local zone); tests inject a settable clock,
// usually in UTC, so rotation can be driven across midnight deterministically.

use chrono::{DateTime, Local, TimeZone};

/// Trait for time sources
pub trait Clock: Send + 'static {
    /// Time zone whose calendar days delimit the log files
    type Tz: TimeZone;

    /// Current instant in [`Self::Tz`]
    fn now(&self) -> DateTime<Self::Tz>;
}

/// Wall clock in the host's local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
