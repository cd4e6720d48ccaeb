//! Event primitive: a single-shot, sticky trigger carrying a message.
//!
//! Once triggered, stays triggered until delete — every subsequent wait
//! (even ones that arrive long after the send) returns immediately with the
//! same message. A repeat `/send` still updates the message and still
//! counts as a trigger.

use crate::error::BouncerError;
use crate::wait::{self, Outcome, WaitPolicy, Waiter};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default, Serialize)]
pub struct EventStats {
	pub triggered: u64,
	pub waited: u64,
	pub timed_out: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventSnapshot {
	pub is_triggered: bool,
	pub message: String,
	#[serde(flatten)]
	pub stats: EventStats,
}

struct State {
	triggered: bool,
	message: String,
	queue: VecDeque<Arc<Waiter<(), String>>>,
	stats: EventStats,
}

pub struct Event {
	state: Mutex<State>,
}

impl Event {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			state: Mutex::new(State {
				triggered: false,
				message: String::new(),
				queue: VecDeque::new(),
				stats: EventStats::default(),
			}),
		})
	}

	/// `GET /event/{name}/wait?maxwait=M`
	pub async fn wait(self: &Arc<Self>, policy: WaitPolicy, cancel: &CancellationToken) -> Result<String, BouncerError> {
		let waiter = {
			let mut st = self.state.lock().unwrap();
			if st.triggered {
				st.stats.waited += 1;
				return Ok(st.message.clone());
			}
			if policy.is_no_wait() {
				return Err(BouncerError::DeadlineExceeded);
			}
			let waiter = Waiter::new(());
			st.queue.push_back(waiter.clone());
			waiter
		};

		crate::metrics::record_suspended_waiter("event");

		let this = self.clone();
		let waiter_id = waiter.id;
		let _dequeue = wait::DequeueGuard::new(move || {
			let mut st = this.state.lock().unwrap();
			wait::remove_by_id(&mut st.queue, waiter_id);
		});

		let outcome = waiter.wait(policy.deadline(), cancel).await;
		match outcome {
			Outcome::Satisfied(message) => {
				let mut st = self.state.lock().unwrap();
				st.stats.waited += 1;
				Ok(message)
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

	/// `GET /event/{name}/send?message=MSG`
	pub fn send(&self, message: Option<String>) {
		let mut st = self.state.lock().unwrap();
		st.message = message.unwrap_or_default();
		st.triggered = true;
		st.stats.triggered += 1;
		wait::broadcast(&mut st.queue, &Outcome::Satisfied(st.message.clone()));
	}

	pub fn delete(&self) {
		let mut st = self.state.lock().unwrap();
		wait::broadcast(&mut st.queue, &Outcome::ResourceDeleted);
	}

	pub fn snapshot(&self) -> EventSnapshot {
		let st = self.state.lock().unwrap();
		EventSnapshot {
			is_triggered: st.triggered,
			message: st.message.clone(),
			stats: st.stats.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn triggered_before_wait_returns_message_immediately() {
		let event = Event::new();
		let cancel = CancellationToken::new();
		event.send(Some("hurry".to_string()));

		for _ in 0..10 {
			let msg = event.wait(WaitPolicy::NoWait, &cancel).await.unwrap();
			assert_eq!(msg, "hurry");
		}

		let snap = event.snapshot();
		assert_eq!(snap.stats.triggered, 1);
		assert_eq!(snap.stats.waited, 10);
	}

	#[tokio::test(start_paused = true)]
	async fn waiters_queued_before_send_are_woken_with_the_message() {
		let event = Event::new();
		let cancel = CancellationToken::new();

		let e = event.clone();
		let c = cancel.clone();
		let handle = tokio::spawn(async move { e.wait(WaitPolicy::Forever, &c).await });

		tokio::task::yield_now().await;
		event.send(Some("go".to_string()));

		let msg = handle.await.unwrap().unwrap();
		assert_eq!(msg, "go");
	}

	#[tokio::test(start_paused = true)]
	async fn repeat_send_updates_message_and_counts_again() {
		let event = Event::new();
		let cancel = CancellationToken::new();
		event.send(Some("first".to_string()));
		event.send(Some("second".to_string()));

		let msg = event.wait(WaitPolicy::NoWait, &cancel).await.unwrap();
		assert_eq!(msg, "second");
		assert_eq!(event.snapshot().stats.triggered, 2);
	}

	#[tokio::test(start_paused = true)]
	async fn wait_without_send_times_out() {
		let event = Event::new();
		let cancel = CancellationToken::new();
		let deadline = crate::clock::after_ms(50);
		let err = event.wait(WaitPolicy::Deadline(deadline), &cancel).await.unwrap_err();
		assert!(matches!(err, BouncerError::DeadlineExceeded));
		assert_eq!(event.snapshot().stats.timed_out, 1);
	}
}
