//! Counter primitive: a monotonic, resettable integer with no suspension
//! points. Every mutating operation takes the same lock, so readers always
//! see a consistent snapshot.

use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CounterStats {
	pub value: u64,
	pub increments: u64,
	pub resets: u64,
}

struct State {
	value: u64,
	stats: CounterStats,
}

pub struct Counter {
	state: Mutex<State>,
}

impl Counter {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(State {
				value: 0,
				stats: CounterStats::default(),
			}),
		}
	}

	/// `GET /counter/{name}/count` — returns the post-increment value.
	pub fn count(&self) -> u64 {
		let mut st = self.state.lock().unwrap();
		st.value += 1;
		st.stats.increments += 1;
		st.value
	}

	/// `GET /counter/{name}/value`
	pub fn value(&self) -> u64 {
		self.state.lock().unwrap().value
	}

	/// `GET /counter/{name}/reset`
	pub fn reset(&self) {
		let mut st = self.state.lock().unwrap();
		st.value = 0;
		st.stats.resets += 1;
	}

	pub fn snapshot(&self) -> CounterStats {
		let st = self.state.lock().unwrap();
		let mut stats = st.stats.clone();
		stats.value = st.value;
		stats
	}
}

impl Default for Counter {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

	#[test]
	fn count_is_monotonic_until_reset() {
		let counter = Counter::new();
		assert_eq!(counter.count(), 1);
		assert_eq!(counter.count(), 2);
		assert_eq!(counter.count(), 3);
		counter.reset();
		assert_eq!(counter.value(), 0);
		assert_eq!(counter.count(), 1);

		let snap = counter.snapshot();
		assert_eq!(snap.increments, 4);
		assert_eq!(snap.resets, 1);
	}

	#[test]
	fn concurrent_counts_return_all_distinct_consecutive_values() {
		let counter = Arc::new(Counter::new());
		let mut handles = Vec::new();
		for _ in 0..8 {
			let c = counter.clone();
			handles.push(std::thread::spawn(move || {
				let mut seen = Vec::new();
				for _ in 0..100 {
					seen.push(c.count());
				}
				seen
			}));
		}
		let mut all: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
		all.sort_unstable();
		let expected: Vec<u64> = (1..=800).collect();
		assert_eq!(all, expected);
	}
}
