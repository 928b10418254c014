use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Wall-clock source in epoch milliseconds.
///
/// Session start instants are persisted and compared after a restart, so this
/// must be a wall clock rather than `std::time::Instant`.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Settable clock shared between a test and the session it drives
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub struct Timer {
    clock: Box<dyn Clock>,
}

impl Timer {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn system() -> Self {
        Self::new(Box::new(SystemClock))
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Milliseconds since `start_ms`. Negative when the clock was set back;
    /// callers clamp for display. Saturates instead of overflowing.
    pub fn elapsed(&self, start_ms: i64) -> i64 {
        self.now_ms().saturating_sub(start_ms)
    }
}

/// Strictly faster than the current best; a tie keeps the old record
pub fn is_new_best(candidate_ms: u64, best_ms: Option<u64>) -> bool {
    match best_ms {
        None => true,
        Some(best) => candidate_ms < best,
    }
}

/// Render milliseconds as zero-padded `MM:SS`, flooring to whole seconds
pub fn format_duration(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;

    format!("{:02}:{:02}", minutes, seconds)
}
