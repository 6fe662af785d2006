//! Wall-clock time for session expiry checks.

use chrono::{DateTime, Utc};

use amparo_application::ports::Clock;

/// Clock backed by the operating system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
