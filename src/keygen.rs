//! Opaque, unguessable key issuance for semaphore leases.
//!
//! Each acquired lease is identified by a fresh UUIDv4 rendered in simple
//! (no-hyphen) form — short enough to hand back as a plain-text body, and
//! with enough entropy that guessing an active lease key is infeasible.

use uuid::Uuid;

pub fn issue() -> String {
	Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	#[test]
	fn issued_keys_are_unique() {
		let keys: HashSet<String> = (0..1000).map(|_| issue()).collect();
		assert_eq!(keys.len(), 1000);
	}

	#[test]
	fn issued_keys_have_no_separators() {
		let key = issue();
		assert!(!key.contains('-'));
		assert_eq!(key.len(), 32);
	}
}
