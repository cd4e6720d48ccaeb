//! Semaphore primitive.
//!
//! `size` is fixed by the first successful acquire. Leases are identified by
//! an opaque key (`crate::keygen`); release and expiry both free a slot and
//! try to serve the queue head. A single rearm-on-demand timer (the same
//! shape as the token bucket's) fires at the earliest `expires_at` among
//! active leases.
//!
//! `reacquired` is credited on the acquire side, specifically to a waiter
//! who is granted a lease as a direct result of *another* lease's expiry (as
//! opposed to a clean release) — see `DESIGN.md` for the full rationale.

use crate::clock::Instant;
use crate::error::BouncerError;
use crate::wait::{self, Outcome, WaitPolicy, Waiter};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SemaphoreStats {
	pub acquired: u64,
	pub released: u64,
	pub reacquired: u64,
	pub expired: u64,
	pub timed_out: u64,
	pub max_ever_held: u64,
	pub total_wait_time_ms: u64,
	pub average_wait_time_ms: f64,
}

impl SemaphoreStats {
	fn record_acquired(&mut self, wait_ms: u64) {
		self.acquired += 1;
		self.total_wait_time_ms += wait_ms;
		self.average_wait_time_ms = self.total_wait_time_ms as f64 / self.acquired as f64;
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct SemaphoreSnapshot {
	pub size: u64,
	pub active: u64,
	#[serde(flatten)]
	pub stats: SemaphoreStats,
}

struct State {
	initialized: bool,
	size: u64,
	active: HashMap<String, Option<Instant>>,
	queue: VecDeque<Arc<Waiter<Option<u64>, String>>>,
	stats: SemaphoreStats,
	timer_armed: bool,
}

pub struct Semaphore {
	state: Mutex<State>,
}

impl Semaphore {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			state: Mutex::new(State {
				initialized: false,
				size: 0,
				active: HashMap::new(),
				queue: VecDeque::new(),
				stats: SemaphoreStats::default(),
				timer_armed: false,
			}),
		})
	}

	/// `GET /semaphore/{name}/acquire?size=N&expires=E&maxwait=M`
	pub async fn acquire(self: &Arc<Self>, size: u64, expires_ms: Option<u64>, policy: WaitPolicy, cancel: &CancellationToken) -> Result<String, BouncerError> {
		if size < 1 {
			return Err(BouncerError::InvalidParameter("size must be >= 1".to_string()));
		}

		let granted_or_waiter = {
			let mut st = self.state.lock().unwrap();
			if !st.initialized {
				st.size = size;
				st.initialized = true;
			}
			self.expire_locked(&mut st);

			if (st.active.len() as u64) < st.size && st.queue.is_empty() {
				Ok(Self::mint_locked(&mut st, expires_ms, 0))
			} else if policy.is_no_wait() {
				return Err(BouncerError::DeadlineExceeded);
			} else {
				let waiter = Waiter::new(expires_ms);
				st.queue.push_back(waiter.clone());
				Err(waiter)
			}
		};

		if granted_or_waiter.is_err() {
			crate::metrics::record_suspended_waiter("semaphore");
		}

		// A fresh lease's own expiry, or a freshly queued waiter, both need
		// the expiry timer (re)armed for the earliest deadline in play.
		self.arm_timer();

		let waiter = match granted_or_waiter {
			Ok(key) => return Ok(key),
			Err(waiter) => waiter,
		};

		let this = self.clone();
		let waiter_id = waiter.id;
		let _dequeue = wait::DequeueGuard::new(move || {
			let mut st = this.state.lock().unwrap();
			wait::remove_by_id(&mut st.queue, waiter_id);
		});

		let outcome = waiter.wait(policy.deadline(), cancel).await;
		match outcome {
			Outcome::Satisfied(key) => Ok(key),
			Outcome::TimedOut => {
				let mut st = self.state.lock().unwrap();
				st.stats.timed_out += 1;
				Err(BouncerError::DeadlineExceeded)
			}
			Outcome::ResourceDeleted => Err(BouncerError::DeadlineExceeded),
			Outcome::Cancelled => Err(BouncerError::Cancelled),
		}
	}

	/// Mint a fresh lease directly into the active set, updating stats.
	/// `reacquired_delta` is 1 when this grant is a direct result of another
	/// lease's expiry, 0 for a clean immediate or release-driven grant. An
	/// immediate grant never waited, so `wait_ms` is always 0 here.
	fn mint_locked(st: &mut State, expires_ms: Option<u64>, reacquired_delta: u64) -> String {
		let key = crate::keygen::issue();
		Self::insert_active_locked(st, key.clone(), expires_ms, reacquired_delta, 0);
		key
	}

	fn insert_active_locked(st: &mut State, key: String, expires_ms: Option<u64>, reacquired_delta: u64, wait_ms: u64) {
		let expires_at = expires_ms.map(crate::clock::after_ms);
		st.active.insert(key, expires_at);
		st.stats.record_acquired(wait_ms);
		st.stats.reacquired += reacquired_delta;
		st.stats.max_ever_held = st.stats.max_ever_held.max(st.active.len() as u64);
	}

	/// `GET /semaphore/{name}/release?key=K`
	pub fn release(self: &Arc<Self>, key: &str) -> Result<(), BouncerError> {
		{
			let mut st = self.state.lock().unwrap();
			self.expire_locked(&mut st);
			if st.active.remove(key).is_none() {
				return Err(BouncerError::Conflict("unknown or expired lease key".to_string()));
			}
			st.stats.released += 1;
		}
		self.drain(0);
		Ok(())
	}

	/// Serve queued waiters with whatever headroom currently exists, minting
	/// each a lease whose TTL is the `expires` the waiter originally asked
	/// for when it was enqueued.
	fn drain(self: &Arc<Self>, reacquired_delta: u64) {
		let mut st = self.state.lock().unwrap();
		let now = crate::clock::now();
		while (st.active.len() as u64) < st.size {
			let Some(head) = st.queue.pop_front() else {
				break;
			};
			let key = crate::keygen::issue();
			let expires_ms = head.request;
			let wait_ms = now.saturating_duration_since(head.enqueued_at).as_millis() as u64;
			if head.try_satisfy(key.clone()) {
				Self::insert_active_locked(&mut st, key, expires_ms, reacquired_delta, wait_ms);
			}
		}
	}

	fn arm_timer(self: &Arc<Self>) {
		let wait_ms = {
			let mut st = self.state.lock().unwrap();
			self.expire_locked(&mut st);

			if st.timer_armed {
				return;
			}
			let Some(earliest) = st.active.values().filter_map(|e| *e).min() else {
				return;
			};
			let now = crate::clock::now();
			st.timer_armed = true;
			earliest.saturating_duration_since(now).as_millis() as u64
		};

		let this = self.clone();
		tokio::spawn(async move {
			crate::clock::sleep_until(crate::clock::after_ms(wait_ms)).await;
			{
				let mut st = this.state.lock().unwrap();
				st.timer_armed = false;
				this.expire_locked(&mut st);
			}
			this.drain(1);
			this.arm_timer();
		});
	}

	fn expire_locked(&self, st: &mut State) {
		let now = crate::clock::now();
		let expired: Vec<String> = st
			.active
			.iter()
			.filter_map(|(k, exp)| exp.filter(|e| *e <= now).map(|_| k.clone()))
			.collect();
		for key in expired {
			st.active.remove(&key);
			st.stats.expired += 1;
		}
	}

	pub fn delete(&self) {
		let mut st = self.state.lock().unwrap();
		wait::broadcast(&mut st.queue, &Outcome::ResourceDeleted);
	}

	pub fn snapshot(&self) -> SemaphoreSnapshot {
		let mut st = self.state.lock().unwrap();
		self.expire_locked(&mut st);
		SemaphoreSnapshot {
			size: st.size,
			active: st.active.len() as u64,
			stats: st.stats.clone(),
		}
	}
}
