//! Client-side enforcement of the server's per-user vote limit.
//!
//! The lockout window is persisted as an absolute millisecond timestamp under
//! `"<userId>_limited_until"`, so a reload or reconnect re-derives the remaining
//! time instead of trusting any in-memory timer. Disabling controls is purely
//! presentational; the server remains the authority.

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use chrono_humanize::{Accuracy, HumanTime, Tense};
use postvotes_protocol::UserId;
use tokio::sync::mpsc;

use crate::Result;
use crate::clock::{Clock, duration_ms};
use crate::document::HostDocument;
use crate::registry::ElementRegistry;
use crate::store::{PersistentStore, limited_until_key};
use crate::timer::{TimerFired, TimerKind, TimerSlot};

/// A persisted lockout window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitWindow {
	/// Absolute expiry in milliseconds since the Unix epoch.
	pub until_ms: i64,
}

/// Whether voting is currently locked for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
	/// No live window.
	Unlocked,
	/// A window is open.
	Locked {
		/// Absolute expiry in milliseconds since the Unix epoch.
		until_ms: i64,
		/// Time left until `until_ms`.
		remaining: Duration,
	},
}

impl LockState {
	/// Returns true while a window is open.
	pub fn is_locked(&self) -> bool {
		matches!(self, Self::Locked { .. })
	}
}

/// Persists lockout windows and gates the registry's controls on them.
pub struct RateLimitScheduler {
	clock: Arc<dyn Clock>,
	store: Arc<dyn PersistentStore>,
	timer: TimerSlot,
	disabled: bool,
}

impl RateLimitScheduler {
	pub(crate) fn new(clock: Arc<dyn Clock>, store: Arc<dyn PersistentStore>, timers: mpsc::UnboundedSender<TimerFired>) -> Self {
		Self {
			clock,
			store,
			timer: TimerSlot::new(TimerKind::Lockout, timers),
			disabled: false,
		}
	}

	/// Live window for `user`; expired or unreadable entries count as absent.
	pub async fn window(&self, user: &UserId) -> Result<Option<RateLimitWindow>> {
		let key = limited_until_key(user.as_str());
		let Some(raw) = self.store.get(&key).await? else {
			return Ok(None);
		};
		let Some(until_ms) = parse_timestamp(&raw) else {
			tracing::debug!(key = %key, value = %raw, "ignoring unreadable lockout timestamp");
			return Ok(None);
		};
		Ok((until_ms > self.clock.now_ms()).then_some(RateLimitWindow { until_ms }))
	}

	/// Current lock state for `user`.
	pub async fn is_locked(&self, user: &UserId) -> Result<LockState> {
		let Some(window) = self.window(user).await? else {
			return Ok(LockState::Unlocked);
		};
		let left = window.until_ms.saturating_sub(self.clock.now_ms()).max(0);
		Ok(LockState::Locked {
			until_ms: window.until_ms,
			remaining: Duration::from_millis(left.unsigned_abs()),
		})
	}

	/// Persists a window ending `lockout` from now. The last write wins.
	pub async fn record(&self, user: &UserId, lockout: Duration) -> Result<RateLimitWindow> {
		let until_ms = self.clock.now_ms().saturating_add(duration_ms(lockout));
		self.store.set(&limited_until_key(user.as_str()), until_ms.to_string()).await?;
		tracing::debug!(user_id = %user, until_ms, "recorded lockout window");
		Ok(RateLimitWindow { until_ms })
	}

	/// Brings the registry's controls in line with the persisted window.
	///
	/// A live window disables every control and (re)arms the single lockout
	/// timer; no window enables them again if they were disabled.
	pub async fn refresh(&mut self, user: &UserId, registry: &mut ElementRegistry, document: &mut dyn HostDocument) -> Result<LockState> {
		let state = self.is_locked(user).await?;
		match state {
			LockState::Unlocked => {
				self.timer.cancel();
				if self.disabled {
					registry.set_disabled_all(document, false, None);
					self.disabled = false;
					tracing::debug!(user_id = %user, "voting enabled");
				}
			}
			LockState::Locked { until_ms, remaining } => {
				let tooltip = unlock_tooltip(until_ms, remaining);
				registry.set_disabled_all(document, true, Some(&tooltip));
				self.disabled = true;
				let generation = self.timer.arm_once(remaining);
				tracing::debug!(user_id = %user, until_ms, remaining_ms = duration_ms(remaining), generation, "voting disabled");
			}
		}
		Ok(state)
	}

	/// Handles a lockout timer firing. Returns whether controls were re-enabled.
	pub fn on_timer(&mut self, generation: u64, registry: &mut ElementRegistry, document: &mut dyn HostDocument) -> bool {
		if !self.timer.complete(generation) {
			tracing::trace!(generation, "ignoring stale lockout timer");
			return false;
		}
		registry.set_disabled_all(document, false, None);
		self.disabled = false;
		tracing::debug!("lockout elapsed, voting enabled");
		true
	}

	/// Whether controls are currently rendered disabled.
	pub fn controls_disabled(&self) -> bool {
		self.disabled
	}

	/// Whether a lockout timer is live.
	pub fn is_armed(&self) -> bool {
		self.timer.is_armed()
	}

	/// Drops the timer and forgets the rendered state; the registry is being
	/// torn down alongside.
	pub fn cancel(&mut self) {
		self.timer.cancel();
		self.disabled = false;
	}
}

fn parse_timestamp(raw: &str) -> Option<i64> {
	let raw = raw.trim();
	raw.parse::<i64>().ok().or_else(|| {
		raw.parse::<f64>()
			.ok()
			.filter(|v| v.is_finite())
			.map(|v| v as i64)
	})
}

/// Tooltip shown on disabled controls, e.g.
/// `Voting is disabled until 14:05:09 (in 5 minutes)`.
pub(crate) fn unlock_tooltip(until_ms: i64, remaining: Duration) -> String {
	let at = DateTime::from_timestamp_millis(until_ms)
		.map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
		.unwrap_or_else(|| "later".to_owned());
	match chrono::Duration::from_std(remaining) {
		Ok(left) => format!(
			"Voting is disabled until {at} ({})",
			HumanTime::from(left).to_text_en(Accuracy::Rough, Tense::Future)
		),
		Err(_) => format!("Voting is disabled until {at}"),
	}
}
