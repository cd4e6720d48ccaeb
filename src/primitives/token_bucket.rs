//! Token bucket primitive.
//!
//! Continuous refill, lazily computed on every touch. Only the head of the
//! FIFO queue is ever served at a time (head-of-line blocking), so a large
//! request can't be starved by a stream of small ones cutting in line. A
//! single rearm-on-demand timer (rather than a persistent per-bucket task)
//! wakes the bucket again exactly when the head becomes satisfiable.

use crate::clock::Instant;
use crate::error::BouncerError;
use crate::wait::{self, Outcome, WaitPolicy, Waiter};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenBucketStats {
	pub acquired: u64,
	pub timed_out: u64,
	pub total_wait_time_ms: u64,
	pub average_wait_time_ms: f64,
}

impl TokenBucketStats {
	fn record_acquired(&mut self, wait_ms: u64) {
		self.acquired += 1;
		self.total_wait_time_ms += wait_ms;
		self.average_wait_time_ms = self.total_wait_time_ms as f64 / self.acquired as f64;
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenBucketSnapshot {
	pub capacity: u64,
	pub available: u64,
	pub interval_ms: u64,
	#[serde(flatten)]
	pub stats: TokenBucketStats,
}

struct State {
	initialized: bool,
	capacity: u64,
	available: u64,
	interval_ms: u64,
	last_refill: Instant,
	queue: VecDeque<Arc<Waiter<u64, ()>>>,
	stats: TokenBucketStats,
	timer_armed: bool,
}

impl State {
	fn refill(&mut self, now: Instant) {
		let elapsed_ms = now.saturating_duration_since(self.last_refill).as_millis() as u64;
		if elapsed_ms == 0 || self.available >= self.capacity {
			return;
		}
		let produced = elapsed_ms.saturating_mul(self.capacity) / self.interval_ms;
		if produced == 0 {
			return;
		}
		self.available = (self.available + produced).min(self.capacity);
		let consumed_ms = produced * self.interval_ms / self.capacity;
		self.last_refill += Duration::from_millis(consumed_ms);
	}
}

pub struct TokenBucket {
	state: Mutex<State>,
}

impl TokenBucket {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			state: Mutex::new(State {
				initialized: false,
				capacity: 0,
				available: 0,
				interval_ms: 1000,
				last_refill: crate::clock::now(),
				queue: VecDeque::new(),
				stats: TokenBucketStats::default(),
				timer_armed: false,
			}),
		})
	}

	/// `GET /tokenbucket/{name}/acquire?size=S&maxwait=M&interval=I`
	pub async fn acquire(self: &Arc<Self>, size: u64, interval_default_ms: u64, policy: WaitPolicy, cancel: &CancellationToken) -> Result<(), BouncerError> {
		if size < 1 {
			return Err(BouncerError::InvalidParameter("size must be >= 1".to_string()));
		}

		let waiter = {
			let mut st = self.state.lock().unwrap();
			if !st.initialized {
				st.capacity = size;
				st.available = size;
				st.interval_ms = interval_default_ms.max(1);
				st.last_refill = crate::clock::now();
				st.initialized = true;
			}

			let now = crate::clock::now();
			st.refill(now);

			if st.available >= size && st.queue.is_empty() {
				st.available -= size;
				st.stats.record_acquired(0);
				return Ok(());
			}

			if policy.is_no_wait() {
				return Err(BouncerError::DeadlineExceeded);
			}

			let waiter = Waiter::new(size);
			st.queue.push_back(waiter.clone());
			waiter
		};

		crate::metrics::record_suspended_waiter("tokenbucket");
		self.arm_timer();

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

	fn drain_locked(st: &mut State, now: Instant) {
		st.refill(now);
		while let Some(head) = st.queue.front().cloned() {
			if st.available < head.request {
				break;
			}
			st.queue.pop_front();
			let wait_ms = now.saturating_duration_since(head.enqueued_at).as_millis() as u64;
			if head.try_satisfy(()) {
				st.available -= head.request;
				st.stats.record_acquired(wait_ms);
			}
			// else: head already resolved (timed out/cancelled) concurrently;
			// capacity is left untouched for the new head.
		}
	}

	fn arm_timer(self: &Arc<Self>) {
		let wait_ms = {
			let mut st = self.state.lock().unwrap();
			let now = crate::clock::now();
			Self::drain_locked(&mut st, now);

			if st.timer_armed {
				return;
			}
			let Some(head) = st.queue.front() else {
				return;
			};
			let needed = head.request.saturating_sub(st.available);
			let numerator = needed.saturating_mul(st.interval_ms);
			let ms = numerator.div_ceil(st.capacity.max(1));
			st.timer_armed = true;
			ms
		};

		let this = self.clone();
		tokio::spawn(async move {
			crate::clock::sleep_until(crate::clock::after_ms(wait_ms)).await;
			{
				let mut st = this.state.lock().unwrap();
				st.timer_armed = false;
			}
			this.arm_timer();
		});
	}

	pub fn delete(&self) {
		let mut st = self.state.lock().unwrap();
		wait::broadcast(&mut st.queue, &Outcome::ResourceDeleted);
	}

	pub fn snapshot(&self) -> TokenBucketSnapshot {
		let mut st = self.state.lock().unwrap();
		let now = crate::clock::now();
		st.refill(now);
		TokenBucketSnapshot {
			capacity: st.capacity,
			available: st.available,
			interval_ms: st.interval_ms,
			stats: st.stats.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn first_acquire_binds_capacity_and_interval() {
		let tb = TokenBucket::new();
		let cancel = CancellationToken::new();
		tb.acquire(10, 1000, WaitPolicy::NoWait, &cancel).await.unwrap();
		let snap = tb.snapshot();
		assert_eq!(snap.capacity, 10);
		assert_eq!(snap.available, 0);
		assert_eq!(snap.stats.acquired, 1);
	}

	#[tokio::test(start_paused = true)]
	async fn burst_of_twenty_splits_ten_and_ten_no_wait() {
		let tb = TokenBucket::new();
		let cancel = CancellationToken::new();
		let mut ok = 0;
		let mut failed = 0;
		for _ in 0..20 {
			match tb.acquire(1, 1000, WaitPolicy::NoWait, &cancel).await {
				Ok(()) => ok += 1,
				Err(_) => failed += 1,
			}
		}
		assert_eq!(ok, 10);
		assert_eq!(failed, 10);
	}

	#[tokio::test(start_paused = true)]
	async fn zero_size_is_rejected() {
		let tb = TokenBucket::new();
		let cancel = CancellationToken::new();
		let err = tb.acquire(0, 1000, WaitPolicy::NoWait, &cancel).await.unwrap_err();
		assert!(matches!(err, BouncerError::InvalidParameter(_)));
	}

	#[tokio::test(start_paused = true)]
	async fn waiter_is_served_once_bucket_refills() {
		let tb = TokenBucket::new();
		let cancel = CancellationToken::new();
		tb.acquire(5, 1000, WaitPolicy::NoWait, &cancel).await.unwrap();
		assert!(tb.acquire(5, 1000, WaitPolicy::NoWait, &cancel).await.is_err());

		let tb2 = tb.clone();
		let cancel2 = cancel.clone();
		let handle = tokio::spawn(async move { tb2.acquire(5, 1000, WaitPolicy::Forever, &cancel2).await });

		tokio::time::advance(Duration::from_millis(1100)).await;
		let result = handle.await.unwrap();
		assert!(result.is_ok());
		assert_eq!(tb.snapshot().stats.acquired, 2);
	}

	#[tokio::test(start_paused = true)]
	async fn head_of_line_blocking_large_request_not_starved() {
		let tb = TokenBucket::new();
		let cancel = CancellationToken::new();
		tb.acquire(10, 1000, WaitPolicy::NoWait, &cancel).await.unwrap();

		let tb_big = tb.clone();
		let cancel_big = cancel.clone();
		let big = tokio::spawn(async move { tb_big.acquire(10, 1000, WaitPolicy::Forever, &cancel_big).await });

		tokio::task::yield_now().await;
		// small requests arriving after the big one must not cut in line
		let err = tb.acquire(1, 1000, WaitPolicy::NoWait, &cancel).await;
		assert!(err.is_err());

		tokio::time::advance(Duration::from_secs(1)).await;
		assert!(big.await.unwrap().is_ok());
	}

	#[tokio::test(start_paused = true)]
	async fn deadline_exceeded_increments_timed_out() {
		let tb = TokenBucket::new();
		let cancel = CancellationToken::new();
		tb.acquire(1, 1000, WaitPolicy::NoWait, &cancel).await.unwrap();

		let deadline = crate::clock::after_ms(10);
		let fut = tb.acquire(1, 1000, WaitPolicy::Deadline(deadline), &cancel);
		tokio::pin!(fut);
		tokio::time::advance(Duration::from_millis(20)).await;
		let result = fut.await;
		assert!(matches!(result, Err(BouncerError::DeadlineExceeded)));
		assert_eq!(tb.snapshot().stats.timed_out, 1);
	}
}
