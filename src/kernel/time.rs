use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Host timestamp in milliseconds. Every record and event carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Millis(pub i64);

impl Millis {
    pub const ZERO: Millis = Millis(0);

    /// Whole seconds elapsed from `earlier` to `self`, truncated toward zero.
    /// Saturates instead of overflowing on extreme timestamps.
    pub fn whole_seconds_since(&self, earlier: Millis) -> i64 {
        self.0.saturating_sub(earlier.0) / 1000
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for Millis {
    fn from(v: i64) -> Self {
        Millis(v)
    }
}

/// Source of "now". Only historical queries and push stamps read it;
/// session reconstruction never does.
pub trait Clock: Send + Sync {
    fn now(&self) -> Millis;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Millis {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Millis(ms)
    }
}
