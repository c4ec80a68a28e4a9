//! Wall-clock source for lockout windows.
//!
//! Lockout expiries are absolute timestamps that must survive page reloads, so
//! they are measured against the wall clock rather than a monotonic instant.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use web_time::{SystemTime, UNIX_EPOCH};

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + 'static {
	/// Milliseconds since the Unix epoch.
	fn now_ms(&self) -> i64;
}

/// Clock backed by the platform's system time (browser `Date.now()` on wasm).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now_ms(&self) -> i64 {
		SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
	}
}

/// Manually advanced clock; clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
	now_ms: Arc<AtomicI64>,
}

impl ManualClock {
	/// Creates a clock reading `now_ms`.
	pub fn new(now_ms: i64) -> Self {
		Self {
			now_ms: Arc::new(AtomicI64::new(now_ms)),
		}
	}

	/// Moves time forward.
	pub fn advance(&self, by: Duration) {
		self.now_ms.fetch_add(duration_ms(by), Ordering::AcqRel);
	}

	/// Sets the current time.
	pub fn set(&self, now_ms: i64) {
		self.now_ms.store(now_ms, Ordering::Release);
	}
}

impl Clock for ManualClock {
	fn now_ms(&self) -> i64 {
		self.now_ms.load(Ordering::Acquire)
	}
}

/// Saturating conversion of a duration to whole milliseconds.
pub(crate) fn duration_ms(d: Duration) -> i64 {
	i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
