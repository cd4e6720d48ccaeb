//! Monotonic time source, millisecond resolution.
//!
//! Wraps `tokio::time::Instant` rather than `std::time::Instant` so that
//! tests can drive time deterministically with `tokio::time::pause` and
//! `tokio::time::advance` instead of real sleeps — every timer in the
//! primitive engine (refill, lease expiry, watchdog expiry, `maxwait`
//! deadlines) goes through this module's `Instant`/`sleep_until` so a single
//! `#[tokio::test(start_paused = true)]` controls all of them at once.

use std::time::Duration;
pub use tokio::time::Instant;

/// Current monotonic instant, as seen by the coordination engine.
pub fn now() -> Instant {
	Instant::now()
}

/// `now() + millis`, saturating rather than overflowing on absurd inputs.
pub fn after_ms(millis: u64) -> Instant {
	now() + Duration::from_millis(millis)
}

/// Suspend the calling task until `deadline`. A no-op if `deadline` has
/// already passed.
pub async fn sleep_until(deadline: Instant) {
	tokio::time::sleep_until(deadline).await;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn advancing_time_moves_now_forward() {
		let t0 = now();
		tokio::time::advance(Duration::from_millis(250)).await;
		let t1 = now();
		assert_eq!(t1 - t0, Duration::from_millis(250));
	}

	#[tokio::test(start_paused = true)]
	async fn after_ms_is_relative_to_now() {
		let deadline = after_ms(100);
		assert_eq!(deadline - now(), Duration::from_millis(100));
	}
}
