//! Watchdog primitive: a deadline that kicks push forward, with waiters
//! released either when the deadline is reached or when their own
//! `maxwait` elapses first — whichever comes first wins, same race the
//! waiter core already arbitrates for every other primitive.
//!
//! A kick that extends `expires_at` must invalidate any in-flight expiry
//! timer armed for the old instant; that's tracked with a generation
//! counter rather than an actual task cancellation, since the old timer
//! task harmlessly no-ops once it sees its generation is stale.

use crate::clock::Instant;
use crate::error::BouncerError;
use crate::wait::{self, Outcome, WaitPolicy, Waiter};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default, Serialize)]
pub struct WatchdogStats {
	pub kicks: u64,
	pub waited: u64,
	pub timed_out: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchdogSnapshot {
	pub expires_at_ms_from_now: Option<i64>,
	#[serde(flatten)]
	pub stats: WatchdogStats,
}

struct State {
	expires_at: Option<Instant>,
	generation: u64,
	queue: VecDeque<Arc<Waiter<(), ()>>>,
	stats: WatchdogStats,
	timer_armed: bool,
}

pub struct Watchdog {
	state: Mutex<State>,
}

impl Watchdog {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			state: Mutex::new(State {
				expires_at: None,
				generation: 0,
				queue: VecDeque::new(),
				stats: WatchdogStats::default(),
				timer_armed: false,
			}),
		})
	}

	/// `GET /watchdog/{name}/kick?expires=E`
	pub fn kick(self: &Arc<Self>, expires_ms: u64) {
		let wake_now = {
			let mut st = self.state.lock().unwrap();
			let deadline = crate::clock::after_ms(expires_ms);
			st.expires_at = Some(deadline);
			st.generation += 1;
			st.stats.kicks += 1;
			// invalidate any timer already in flight for the old deadline; it
			// will no-op on the stale generation once it wakes.
			st.timer_armed = false;

			if !st.queue.is_empty() && deadline <= crate::clock::now() {
				wait::broadcast(&mut st.queue, &Outcome::Satisfied(()));
				false
			} else {
				!st.queue.is_empty()
			}
		};
		if wake_now {
			self.arm_timer();
		}
	}

	/// `GET /watchdog/{name}/wait?maxwait=M`
	pub async fn wait(self: &Arc<Self>, policy: WaitPolicy, cancel: &CancellationToken) -> Result<(), BouncerError> {
		let (waiter, should_arm) = {
			let mut st = self.state.lock().unwrap();
			if let Some(expires_at) = st.expires_at {
				if crate::clock::now() >= expires_at {
					st.stats.waited += 1;
					return Ok(());
				}
			}
			if policy.is_no_wait() {
				return Err(BouncerError::DeadlineExceeded);
			}
			let waiter = Waiter::new(());
			st.queue.push_back(waiter.clone());
			(waiter, st.expires_at.is_some())
		};

		crate::metrics::record_suspended_waiter("watchdog");
		if should_arm {
			self.arm_timer();
		}

		let this = self.clone();
		let waiter_id = waiter.id;
		let _dequeue = wait::DequeueGuard::new(move || {
			let mut st = this.state.lock().unwrap();
			wait::remove_by_id(&mut st.queue, waiter_id);
		});

		let outcome = waiter.wait(policy.deadline(), cancel).await;
		match outcome {
			Outcome::Satisfied(()) => {
				let mut st = self.state.lock().unwrap();
				st.stats.waited += 1;
				Ok(())
			}
			Outcome::TimedOut => {
				let mut st = self.state.lock().unwrap();
				st.stats.timed_out += 1;
				Err(BouncerError::DeadlineExceeded)
			}
			Outcome::ResourceDeleted => Err(BouncerError::DeadlineExceeded),
			Outcome::Cancelled => Err(BouncerError::Cancelled),
		}
	}

	fn arm_timer(self: &Arc<Self>) {
		let (deadline, generation) = {
			let mut st = self.state.lock().unwrap();
			let Some(deadline) = st.expires_at else { return };
			if st.timer_armed {
				return;
			}
			st.timer_armed = true;
			(deadline, st.generation)
		};

		let this = self.clone();
		tokio::spawn(async move {
			crate::clock::sleep_until(deadline).await;
			let mut st = this.state.lock().unwrap();
			st.timer_armed = false;
			if st.generation != generation {
				// superseded by a later kick; that kick armed its own timer.
				return;
			}
			wait::broadcast(&mut st.queue, &Outcome::Satisfied(()));
		});
	}

	pub fn delete(&self) {
		let mut st = self.state.lock().unwrap();
		wait::broadcast(&mut st.queue, &Outcome::ResourceDeleted);
	}

	pub fn snapshot(&self) -> WatchdogSnapshot {
		let st = self.state.lock().unwrap();
		let expires_at_ms_from_now = st.expires_at.map(|e| {
			let now = crate::clock::now();
			if e >= now {
				e.saturating_duration_since(now).as_millis() as i64
			} else {
				-(now.saturating_duration_since(e).as_millis() as i64)
			}
		});
		WatchdogSnapshot {
			expires_at_ms_from_now,
			stats: st.stats.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[tokio::test(start_paused = true)]
	async fn wait_before_any_kick_times_out_on_its_own_deadline() {
		let wd = Watchdog::new();
		let cancel = CancellationToken::new();
		let err = wd.wait(WaitPolicy::Deadline(crate::clock::after_ms(50)), &cancel).await.unwrap_err();
		assert!(matches!(err, BouncerError::DeadlineExceeded));
		assert_eq!(wd.snapshot().stats.timed_out, 1);
	}

	#[tokio::test(start_paused = true)]
	async fn short_maxwait_times_out_before_long_kick_expiry() {
		let wd = Watchdog::new();
		let cancel = CancellationToken::new();
		wd.kick(1000);

		let mut timed_out = 0;
		for _ in 0..10 {
			let err = wd.wait(WaitPolicy::Deadline(crate::clock::after_ms(500)), &cancel).await;
			if err.is_err() {
				timed_out += 1;
			}
			tokio::time::advance(Duration::from_millis(1)).await;
		}
		assert_eq!(timed_out, 10);
	}

	#[tokio::test(start_paused = true)]
	async fn long_maxwait_succeeds_once_kick_expiry_is_reached() {
		let wd = Watchdog::new();
		let cancel = CancellationToken::new();
		wd.kick(1000);

		let mut handles = Vec::new();
		for _ in 0..10 {
			let wd2 = wd.clone();
			let c2 = cancel.clone();
			handles.push(tokio::spawn(async move { wd2.wait(WaitPolicy::Deadline(crate::clock::after_ms(2000)), &c2).await }));
		}
		tokio::task::yield_now().await;

		tokio::time::advance(Duration::from_millis(1000)).await;
		for h in handles {
			assert!(h.await.unwrap().is_ok());
		}

		let snap = wd.snapshot();
		assert_eq!(snap.stats.kicks, 1);
		assert_eq!(snap.stats.waited, 10);
	}

	#[tokio::test(start_paused = true)]
	async fn later_kick_supersedes_earlier_timer() {
		let wd = Watchdog::new();
		let cancel = CancellationToken::new();
		wd.kick(100);

		let wd2 = wd.clone();
		let c2 = cancel.clone();
		let handle = tokio::spawn(async move { wd2.wait(WaitPolicy::Forever, &c2).await });
		tokio::task::yield_now().await;

		wd.kick(2000);
		tokio::time::advance(Duration::from_millis(150)).await;
		assert!(!handle.is_finished());

		tokio::time::advance(Duration::from_millis(2000)).await;
		assert!(handle.await.unwrap().is_ok());
	}
}
