//! Client clock validation against the server time side channel.
//!
//! The server stamps every response with its epoch time in milliseconds
//! (a cookie). When a 401 arrives while the client clock is far off the
//! server clock, logging in again cannot help: tokens would look expired
//! or not yet valid. The gateway then shows a clock notice instead of
//! starting a login.

use std::cell::Cell;
use std::rc::Rc;

/// Source of the client's current time.
pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually driven clock. Clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct FixedClock {
    now: Rc<Cell<i64>>,
}

impl FixedClock {
    pub fn new(now_millis: i64) -> Self {
        Self {
            now: Rc::new(Cell::new(now_millis)),
        }
    }

    pub fn set(&self, now_millis: i64) {
        self.now.set(now_millis);
    }

    pub fn advance(&self, millis: i64) {
        self.now.set(self.now.get() + millis);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkewDirection {
    /// Client clock is later than the server's.
    Ahead,
    /// Client clock is earlier than the server's.
    Behind,
}

/// A detected clock mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSkew {
    pub direction: SkewDirection,
    pub client_millis: i64,
    pub server_millis: i64,
}

/// Compare the client clock with the last known server time.
///
/// Returns `None` when the clocks agree within `max_skew_millis` or when no
/// server time is known.
pub fn check_clock(
    client_millis: i64,
    server_millis: Option<i64>,
    max_skew_millis: i64,
) -> Option<ClockSkew> {
    let server_millis = server_millis?;
    if client_millis.abs_diff(server_millis) < max_skew_millis.unsigned_abs() {
        return None;
    }
    let direction = if client_millis > server_millis {
        SkewDirection::Ahead
    } else {
        SkewDirection::Behind
    };
    Some(ClockSkew {
        direction,
        client_millis,
        server_millis,
    })
}

/// Parse the server time cookie value (decimal epoch milliseconds).
pub fn parse_server_time(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}
