//! Barrier primitive: a single-shot rendezvous of N waiters. Once the Nth
//! waiter arrives, the whole queue is released together and the barrier
//! never fires again — further waits are a conflict until delete.

use crate::error::BouncerError;
use crate::wait::{self, Outcome, WaitPolicy, Waiter};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default, Serialize)]
pub struct BarrierStats {
	pub waiting: u64,
	pub timed_out: u64,
	pub total_waited: u64,
	pub triggered: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BarrierSnapshot {
	pub size: u64,
	pub armed: bool,
	#[serde(flatten)]
	pub stats: BarrierStats,
}

struct State {
	initialized: bool,
	size: u64,
	armed: bool,
	queue: VecDeque<Arc<Waiter<(), ()>>>,
	stats: BarrierStats,
}

pub struct Barrier {
	state: Mutex<State>,
}

impl Barrier {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			state: Mutex::new(State {
				initialized: false,
				size: 0,
				armed: true,
				queue: VecDeque::new(),
				stats: BarrierStats::default(),
			}),
		})
	}

	/// `GET /barrier/{name}/wait?size=N&maxwait=M`
	pub async fn wait(self: &Arc<Self>, size: u64, policy: WaitPolicy, cancel: &CancellationToken) -> Result<(), BouncerError> {
		if size < 1 {
			return Err(BouncerError::InvalidParameter("size must be >= 1".to_string()));
		}

		let waiter = {
			let mut st = self.state.lock().unwrap();
			if !st.armed {
				return Err(BouncerError::Conflict("barrier already triggered".to_string()));
			}
			if !st.initialized {
				st.size = size;
				st.initialized = true;
			}

			let waiter = Waiter::new(());
			st.queue.push_back(waiter.clone());

			if st.queue.len() as u64 >= st.size {
				st.armed = false;
				st.stats.triggered += 1;
				st.stats.total_waited = st.size;
				wait::broadcast(&mut st.queue, &Outcome::Satisfied(()));
			}

			waiter
		};

		crate::metrics::record_suspended_waiter("barrier");

		let this = self.clone();
		let waiter_id = waiter.id;
		let _dequeue = wait::DequeueGuard::new(move || {
			let mut st = this.state.lock().unwrap();
			wait::remove_by_id(&mut st.queue, waiter_id);
		});

		let outcome = waiter.wait(policy.deadline(), cancel).await;
		match outcome {
			Outcome::Satisfied(()) => Ok(()),
			Outcome::TimedOut => {
				let mut st = self.state.lock().unwrap();
				st.stats.timed_out += 1;
				Err(BouncerError::DeadlineExceeded)
			}
			Outcome::ResourceDeleted => Err(BouncerError::DeadlineExceeded),
			Outcome::Cancelled => Err(BouncerError::Cancelled),
		}
	}

	pub fn delete(&self) {
		let mut st = self.state.lock().unwrap();
		wait::broadcast(&mut st.queue, &Outcome::ResourceDeleted);
	}

	pub fn snapshot(&self) -> BarrierSnapshot {
		let st = self.state.lock().unwrap();
		BarrierSnapshot {
			size: st.size,
			armed: st.armed,
			stats: BarrierStats {
				waiting: st.queue.len() as u64,
				..st.stats.clone()
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn tenth_waiter_releases_all_ten() {
		let barrier = Barrier::new();
		let cancel = CancellationToken::new();

		let mut handles = Vec::new();
		for _ in 0..9 {
			let b = barrier.clone();
			let c = cancel.clone();
			handles.push(tokio::spawn(async move { b.wait(10, WaitPolicy::Forever, &c).await }));
		}
		tokio::task::yield_now().await;
		for h in &handles {
			assert!(!h.is_finished());
		}

		barrier.wait(10, WaitPolicy::NoWait, &cancel).await.unwrap();
		for h in handles {
			assert!(h.await.unwrap().is_ok());
		}

		let snap = barrier.snapshot();
		assert_eq!(snap.stats.triggered, 1);
		assert_eq!(snap.stats.total_waited, 10);
		assert_eq!(snap.stats.waiting, 0);
		assert!(!snap.armed);
	}

	#[tokio::test(start_paused = true)]
	async fn wait_after_trigger_is_conflict() {
		let barrier = Barrier::new();
		let cancel = CancellationToken::new();
		barrier.wait(1, WaitPolicy::NoWait, &cancel).await.unwrap();
		let err = barrier.wait(1, WaitPolicy::NoWait, &cancel).await.unwrap_err();
		assert!(matches!(err, BouncerError::Conflict(_)));
	}

	#[tokio::test(start_paused = true)]
	async fn timed_out_waiters_leave_barrier_armed() {
		let barrier = Barrier::new();
		let cancel = CancellationToken::new();
		let err = barrier.wait(5, WaitPolicy::Deadline(crate::clock::after_ms(10)), &cancel).await.unwrap_err();
		assert!(matches!(err, BouncerError::DeadlineExceeded));
		let snap = barrier.snapshot();
		assert!(snap.armed);
		assert_eq!(snap.stats.timed_out, 1);
	}
}
