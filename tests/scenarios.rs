//! End-to-end scenarios exercised directly against the primitive engine,
//! bypassing the HTTP shell, with virtual time so real wall-clock waits
//! never happen.

use bouncer::primitives::{Barrier, Event, Semaphore, TokenBucket, Watchdog};
use bouncer::wait::WaitPolicy;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn token_bucket_burst_then_refill() {
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

	let mut handles = Vec::new();
	for _ in 0..20 {
		let tb2 = tb.clone();
		let cancel2 = cancel.clone();
		handles.push(tokio::spawn(async move { tb2.acquire(1, 1000, WaitPolicy::Forever, &cancel2).await }));
	}
	tokio::task::yield_now().await;

	tokio::time::advance(Duration::from_millis(1500)).await;
	for h in handles {
		assert!(h.await.unwrap().is_ok());
	}
	assert_eq!(tb.snapshot().stats.acquired, 30);
}

#[tokio::test(start_paused = true)]
async fn semaphore_mutual_exclusion_over_five_holders() {
	let sem = Semaphore::new();
	let cancel = CancellationToken::new();

	for _ in 0..5 {
		let key = sem.acquire(1, None, WaitPolicy::Forever, &cancel).await.unwrap();
		tokio::time::sleep(Duration::from_millis(100)).await;
		sem.release(&key).unwrap();
	}

	let snap = sem.snapshot();
	assert_eq!(snap.stats.acquired, 5);
	assert_eq!(snap.stats.released, 5);
	assert_eq!(snap.stats.max_ever_held, 1);
}

#[tokio::test(start_paused = true)]
async fn semaphore_expiration_frees_capacity_for_a_new_acquire() {
	let sem = Semaphore::new();
	let cancel = CancellationToken::new();

	let key1 = sem.acquire(1, Some(100), WaitPolicy::NoWait, &cancel).await.unwrap();
	tokio::time::sleep(Duration::from_millis(200)).await;

	let key2 = sem.acquire(1, Some(100), WaitPolicy::NoWait, &cancel).await.unwrap();
	assert_ne!(key1, key2);

	assert!(sem.release(&key1).is_err());

	let snap = sem.snapshot();
	assert_eq!(snap.stats.acquired, 2);
	assert_eq!(snap.stats.released, 0);
	assert_eq!(snap.stats.expired, 1);
}

#[tokio::test(start_paused = true)]
async fn event_send_before_wait_delivers_message_to_ten_waiters() {
	let event = Event::new();
	let cancel = CancellationToken::new();
	event.send(Some("hurry".to_string()));

	for _ in 0..10 {
		let msg = event.wait(WaitPolicy::Deadline(bouncer::clock::after_ms(100)), &cancel).await.unwrap();
		assert_eq!(msg, "hurry");
	}

	let snap = event.snapshot();
	assert_eq!(snap.stats.triggered, 1);
	assert_eq!(snap.stats.waited, 10);
}

#[tokio::test(start_paused = true)]
async fn watchdog_kick_then_ten_short_waits_time_out_then_ten_long_waits_succeed() {
	let wd = Watchdog::new();
	let cancel = CancellationToken::new();
	wd.kick(1000);

	for _ in 0..10 {
		let err = wd.wait(WaitPolicy::Deadline(bouncer::clock::after_ms(500)), &cancel).await;
		assert!(err.is_err());
	}

	let mut handles = Vec::new();
	for _ in 0..10 {
		let wd2 = wd.clone();
		let cancel2 = cancel.clone();
		handles.push(tokio::spawn(async move { wd2.wait(WaitPolicy::Deadline(bouncer::clock::after_ms(2000)), &cancel2).await }));
	}
	tokio::task::yield_now().await;
	tokio::time::advance(Duration::from_millis(600)).await;

	for h in handles {
		assert!(h.await.unwrap().is_ok());
	}

	let snap = wd.snapshot();
	assert_eq!(snap.stats.kicks, 1);
	assert_eq!(snap.stats.waited, 10);
	assert_eq!(snap.stats.timed_out, 10);
}

#[tokio::test(start_paused = true)]
async fn barrier_rendezvous_of_ten_then_rejects_reentry() {
	let barrier = Barrier::new();
	let cancel = CancellationToken::new();

	let mut handles = Vec::new();
	for _ in 0..9 {
		let b = barrier.clone();
		let c = cancel.clone();
		handles.push(tokio::spawn(async move { b.wait(10, WaitPolicy::Forever, &c).await }));
	}
	tokio::task::yield_now().await;

	barrier.wait(10, WaitPolicy::NoWait, &cancel).await.unwrap();
	for h in handles {
		assert!(h.await.unwrap().is_ok());
	}

	let err = barrier.wait(10, WaitPolicy::NoWait, &cancel).await;
	assert!(err.is_err());

	let snap = barrier.snapshot();
	assert_eq!(snap.stats.triggered, 1);
	assert_eq!(snap.stats.total_waited, 10);
}
