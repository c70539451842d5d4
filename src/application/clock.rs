// Wall clock used for request windows and latency
use chrono::Utc;

pub trait Clock: Send + Sync {
    /// Epoch milliseconds
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}
