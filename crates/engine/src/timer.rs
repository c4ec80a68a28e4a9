//! Generation-scoped timers.
//!
//! Timers run as spawned tasks that post a [`TimerFired`] back to the engine's
//! queue. Each arm bumps the slot's generation and cancels the previous task;
//! the engine acts on a firing only while [`TimerSlot::is_current`] holds, so a
//! task that fires in the window between cancellation and teardown is inert.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Which engine timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
	/// Discovery poll tick.
	Poll,
	/// Lockout window elapsed.
	Lockout,
}

impl TimerKind {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Poll => "poll",
			Self::Lockout => "lockout",
		}
	}
}

/// A timer firing, tagged with the generation that armed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
	/// Timer slot.
	pub kind: TimerKind,
	/// Generation of the arm that produced this firing.
	pub generation: u64,
}

#[derive(Debug)]
struct Armed {
	generation: u64,
	cancel: CancellationToken,
}

/// One cancellable timer with at most a single live task.
#[derive(Debug)]
pub(crate) struct TimerSlot {
	kind: TimerKind,
	sink: mpsc::UnboundedSender<TimerFired>,
	next_generation: u64,
	armed: Option<Armed>,
}

impl TimerSlot {
	pub fn new(kind: TimerKind, sink: mpsc::UnboundedSender<TimerFired>) -> Self {
		Self {
			kind,
			sink,
			next_generation: 0,
			armed: None,
		}
	}

	/// Arms a single firing `delay` from now, replacing any live task.
	///
	/// Deadlines are fixed at arm time, not when the task first runs.
	pub fn arm_once(&mut self, delay: Duration) -> u64 {
		let (generation, cancel) = self.rearm();
		let fired = TimerFired {
			kind: self.kind,
			generation,
		};
		let deadline = deadline_after(delay);
		let sink = self.sink.clone();
		tokio::spawn(async move {
			tokio::select! {
				() = cancel.cancelled() => {}
				() = tokio::time::sleep_until(deadline) => {
					let _ = sink.send(fired);
				}
			}
		});
		generation
	}

	/// Arms a repeating firing every `period`, first firing one period from now.
	/// A zero period is treated as one millisecond.
	pub fn arm_interval(&mut self, period: Duration) -> u64 {
		let period = period.max(Duration::from_millis(1));
		let (generation, cancel) = self.rearm();
		let fired = TimerFired {
			kind: self.kind,
			generation,
		};
		let start = deadline_after(period);
		let sink = self.sink.clone();
		tokio::spawn(async move {
			let mut ticks = tokio::time::interval_at(start, period);
			ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop {
				tokio::select! {
					() = cancel.cancelled() => break,
					_ = ticks.tick() => {
						if sink.send(fired).is_err() {
							break;
						}
					}
				}
			}
		});
		generation
	}

	/// Cancels the live task, if any.
	pub fn cancel(&mut self) {
		if let Some(armed) = self.armed.take() {
			armed.cancel.cancel();
			tracing::trace!(timer = self.kind.as_str(), generation = armed.generation, "timer cancelled");
		}
	}

	/// Whether `generation` belongs to the live task.
	pub fn is_current(&self, generation: u64) -> bool {
		self.armed.as_ref().is_some_and(|a| a.generation == generation)
	}

	/// Clears the slot if `generation` is live; returns whether it was.
	pub fn complete(&mut self, generation: u64) -> bool {
		if !self.is_current(generation) {
			return false;
		}
		self.armed = None;
		true
	}

	pub fn is_armed(&self) -> bool {
		self.armed.is_some()
	}

	fn rearm(&mut self) -> (u64, CancellationToken) {
		self.cancel();
		self.next_generation = self.next_generation.wrapping_add(1);
		let cancel = CancellationToken::new();
		self.armed = Some(Armed {
			generation: self.next_generation,
			cancel: cancel.clone(),
		});
		(self.next_generation, cancel)
	}
}

/// Lockouts far beyond any realistic horizon saturate instead of overflowing.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(delay: Duration) -> Instant {
	let now = Instant::now();
	now.checked_add(delay).unwrap_or_else(|| now + FAR_FUTURE)
}

impl Drop for TimerSlot {
	fn drop(&mut self) {
		self.cancel();
	}
}
