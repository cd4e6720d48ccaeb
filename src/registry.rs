//! Process-wide `(kind, name) -> instance` mapping.
//!
//! Scoped to a single owning object rather than ambient process state so
//! tests can build a fresh, hermetic registry per case. Backed by `DashMap`
//! for per-bucket locking: lookups of distinct resources never contend.

use crate::error::BouncerError;
use crate::primitives::{Kind, Primitive};
use dashmap::DashMap;

pub struct Registry {
	instances: DashMap<(Kind, String), Primitive>,
}

impl Registry {
	pub fn new() -> Self {
		Self { instances: DashMap::new() }
	}

	/// Any operation other than `stats`/`delete` implicitly creates the
	/// instance on first touch.
	pub fn get_or_create(&self, kind: Kind, name: &str) -> Primitive {
		self.instances.entry((kind, name.to_string())).or_insert_with(|| Primitive::new(kind)).clone()
	}

	/// `stats`/`delete` on a resource that was never touched is `404`.
	pub fn get(&self, kind: Kind, name: &str) -> Result<Primitive, BouncerError> {
		self.instances.get(&(kind, name.to_string())).map(|entry| entry.clone()).ok_or(BouncerError::NotFound)
	}

	/// Wakes every waiter with `resource_deleted` and removes the entry; a
	/// subsequent operation on the same `(kind, name)` re-creates fresh state.
	pub fn delete(&self, kind: Kind, name: &str) -> Result<(), BouncerError> {
		let (_, primitive) = self.instances.remove(&(kind, name.to_string())).ok_or(BouncerError::NotFound)?;
		primitive.delete();
		Ok(())
	}

	/// Count of distinct `(kind, name)` resources currently held, for the
	/// `bouncer_primitives_total` gauge.
	pub fn len(&self) -> usize {
		self.instances.len()
	}
}

impl Default for Registry {
	fn default() -> Self {
		Self::new()
	}
}
