//! The waiter core shared by every blocking primitive.
//!
//! A `Waiter<R, T>` is enqueued by a primitive and polled by the request
//! handler that owns it. Exactly one of {the primitive delivering
//! `Satisfied`, the handler's own deadline firing, the handler's own
//! cancellation firing} wins the race to resolve it — guarded by a single
//! `std::sync::Mutex<Slot<T>>` so outcome transitions stay monotonic even
//! under concurrent wake-vs-timeout.

use crate::clock::Instant;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

static NEXT_WAITER_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
	NEXT_WAITER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Terminal outcome of a suspended wait; exactly one is ever observed.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
	Satisfied(T),
	TimedOut,
	Cancelled,
	ResourceDeleted,
}

impl<T> Outcome<T> {
	pub const fn is_satisfied(&self) -> bool {
		matches!(self, Self::Satisfied(_))
	}
}

enum Slot<T> {
	Pending,
	Resolved(Outcome<T>),
}

/// A suspended request queued by a primitive.
///
/// `R` is the immutable request payload the primitive consults to decide
/// whether this waiter is satisfiable (a token bucket's `size_needed`; `()`
/// for primitives whose waiters carry no per-waiter request, i.e. event,
/// watchdog, barrier). `T` is the payload delivered on `Satisfied` (a
/// semaphore lease key, an event message); `()` when satisfaction carries no
/// payload.
pub struct Waiter<R, T> {
	pub id: u64,
	pub request: R,
	pub enqueued_at: Instant,
	slot: Mutex<Slot<T>>,
	notify: Notify,
}

impl<R, T> Waiter<R, T> {
	pub fn new(request: R) -> Arc<Self> {
		Arc::new(Self {
			id: next_id(),
			request,
			enqueued_at: crate::clock::now(),
			slot: Mutex::new(Slot::Pending),
			notify: Notify::new(),
		})
	}

	/// Called by the owning primitive to deliver success. Returns `false` if
	/// the waiter already resolved (timed out / cancelled / deleted
	/// concurrently) — the primitive must not treat its capacity as consumed
	/// in that case and should offer it to the next waiter instead.
	pub fn try_satisfy(&self, payload: T) -> bool {
		self.resolve_if_pending(Outcome::Satisfied(payload))
	}

	/// Called by the owning primitive on broadcast wake (event send, watchdog
	/// kick, barrier trip, delete). Same race semantics as `try_satisfy`.
	pub fn try_resolve(&self, outcome: Outcome<T>) -> bool {
		self.resolve_if_pending(outcome)
	}

	fn resolve_if_pending(&self, outcome: Outcome<T>) -> bool {
		let mut slot = self.slot.lock().unwrap();
		if matches!(*slot, Slot::Pending) {
			*slot = Slot::Resolved(outcome);
			drop(slot);
			self.notify.notify_one();
			true
		} else {
			false
		}
	}

	/// Suspend until a terminal outcome is available, racing `deadline` (if
	/// any) and `cancel` against the primitive delivering one directly. The
	/// caller (the primitive's wait operation) is still responsible for
	/// removing this waiter from its queue once this returns anything other
	/// than `Satisfied`.
	pub async fn wait(self: &Arc<Self>, deadline: Option<Instant>, cancel: &CancellationToken) -> Outcome<T>
	where
		T: Clone,
	{
		loop {
			if let Some(outcome) = self.resolved() {
				return outcome;
			}

			let notified = self.notify.notified();
			tokio::pin!(notified);

			if let Some(deadline) = deadline {
				tokio::select! {
					() = &mut notified => continue,
					() = crate::clock::sleep_until(deadline) => {
						if self.try_resolve(Outcome::TimedOut) {
							return Outcome::TimedOut;
						}
					}
					() = cancel.cancelled() => {
						if self.try_resolve(Outcome::Cancelled) {
							return Outcome::Cancelled;
						}
					}
				}
			} else {
				tokio::select! {
					() = &mut notified => continue,
					() = cancel.cancelled() => {
						if self.try_resolve(Outcome::Cancelled) {
							return Outcome::Cancelled;
						}
					}
				}
			}
		}
	}

	fn resolved(&self) -> Option<Outcome<T>>
	where
		T: Clone,
	{
		match &*self.slot.lock().unwrap() {
			Slot::Pending => None,
			Slot::Resolved(outcome) => Some(outcome.clone()),
		}
	}
}

/// Remove a waiter by id from a FIFO queue, if still present. Invoked by
/// every primitive on a non-satisfied wait exit.
pub fn remove_by_id<R, T>(queue: &mut VecDeque<Arc<Waiter<R, T>>>, id: u64) {
	queue.retain(|w| w.id != id);
}

/// RAII dequeue guard. A primitive's wait future can be dropped outright
/// mid-suspend — a client socket closing is not a `TimedOut`/`Cancelled`
/// outcome, it's the future never being polled to completion again, so none
/// of a `match` on `Outcome` ever runs. Holding one of these across the
/// `.await` guarantees the waiter still comes off its queue in that case.
/// `remove_by_id` is idempotent, so it's safe for this to also fire after a
/// normal exit that already removed the waiter itself.
pub struct DequeueGuard {
	cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl DequeueGuard {
	pub fn new(cleanup: impl FnOnce() + Send + 'static) -> Self {
		Self { cleanup: Some(Box::new(cleanup)) }
	}
}

impl Drop for DequeueGuard {
	fn drop(&mut self) {
		if let Some(cleanup) = self.cleanup.take() {
			cleanup();
		}
	}
}

/// Deliver `outcome` to every waiter in `queue` and drain it. Used by event
/// send, watchdog kick-past-expiry, barrier trip, and resource delete.
pub fn broadcast<R, T: Clone>(queue: &mut VecDeque<Arc<Waiter<R, T>>>, outcome: &Outcome<T>) {
	for waiter in queue.drain(..) {
		waiter.try_resolve(outcome.clone());
	}
}

/// The wait policy derived from the `maxwait` query parameter.
#[derive(Debug, Clone, Copy)]
pub enum WaitPolicy {
	/// `maxwait` absent: wait indefinitely.
	Forever,
	/// `maxwait=0`: try-only, never enqueue.
	NoWait,
	/// `maxwait=N`, N > 0: a real deadline N ms from receipt.
	Deadline(Instant),
}

impl WaitPolicy {
	pub fn from_maxwait_ms(maxwait: Option<u64>) -> Self {
		match maxwait {
			None => Self::Forever,
			Some(0) => Self::NoWait,
			Some(ms) => Self::Deadline(crate::clock::after_ms(ms)),
		}
	}

	pub const fn is_no_wait(self) -> bool {
		matches!(self, Self::NoWait)
	}

	pub const fn deadline(self) -> Option<Instant> {
		match self {
			Self::Forever | Self::NoWait => None,
			Self::Deadline(instant) => Some(instant),
		}
	}
}
