pub mod barrier;
pub mod counter;
pub mod event;
pub mod semaphore;
pub mod token_bucket;
pub mod watchdog;

pub use barrier::Barrier;
pub use counter::Counter;
pub use event::Event;
pub use semaphore::Semaphore;
pub use token_bucket::TokenBucket;
pub use watchdog::Watchdog;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The six addressable primitive kinds, as they appear in the URL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
	TokenBucket,
	Semaphore,
	Event,
	Counter,
	Watchdog,
	Barrier,
}

impl fmt::Display for Kind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::TokenBucket => "tokenbucket",
			Self::Semaphore => "semaphore",
			Self::Event => "event",
			Self::Counter => "counter",
			Self::Watchdog => "watchdog",
			Self::Barrier => "barrier",
		})
	}
}

impl FromStr for Kind {
	type Err = crate::error::BouncerError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"tokenbucket" => Ok(Self::TokenBucket),
			"semaphore" => Ok(Self::Semaphore),
			"event" => Ok(Self::Event),
			"counter" => Ok(Self::Counter),
			"watchdog" => Ok(Self::Watchdog),
			"barrier" => Ok(Self::Barrier),
			other => Err(crate::error::BouncerError::InvalidParameter(format!("unknown resource kind {other:?}"))),
		}
	}
}

/// Dispatch is a match on `Kind`, never duck-typed attribute access — each
/// variant owns the one primitive instance it names.
#[derive(Clone)]
pub enum Primitive {
	TokenBucket(std::sync::Arc<TokenBucket>),
	Semaphore(std::sync::Arc<Semaphore>),
	Event(std::sync::Arc<Event>),
	Counter(std::sync::Arc<Counter>),
	Watchdog(std::sync::Arc<Watchdog>),
	Barrier(std::sync::Arc<Barrier>),
}

impl Primitive {
	pub fn new(kind: Kind) -> Self {
		match kind {
			Kind::TokenBucket => Self::TokenBucket(TokenBucket::new()),
			Kind::Semaphore => Self::Semaphore(Semaphore::new()),
			Kind::Event => Self::Event(Event::new()),
			Kind::Counter => Self::Counter(std::sync::Arc::new(Counter::new())),
			Kind::Watchdog => Self::Watchdog(Watchdog::new()),
			Kind::Barrier => Self::Barrier(Barrier::new()),
		}
	}

	pub fn delete(&self) {
		match self {
			Self::TokenBucket(p) => p.delete(),
			Self::Semaphore(p) => p.delete(),
			Self::Event(p) => p.delete(),
			Self::Counter(_) => {}
			Self::Watchdog(p) => p.delete(),
			Self::Barrier(p) => p.delete(),
		}
	}

	pub fn stats_json(&self) -> serde_json::Value {
		match self {
			Self::TokenBucket(p) => serde_json::to_value(p.snapshot()),
			Self::Semaphore(p) => serde_json::to_value(p.snapshot()),
			Self::Event(p) => serde_json::to_value(p.snapshot()),
			Self::Counter(p) => serde_json::to_value(p.snapshot()),
			Self::Watchdog(p) => serde_json::to_value(p.snapshot()),
			Self::Barrier(p) => serde_json::to_value(p.snapshot()),
		}
		.expect("primitive snapshots always serialize")
	}
}
