//! Shared key/TTL store contracts and built-in implementations.
//!
//! Both contracts model external shared state (Redis in the usual deployment). Atomicity is the
//! store's responsibility: the core never layers its own locking on top, so an implementation
//! must make `increment` a single atomic increment-with-expiry and `revoke` a single
//! set-with-expiry.

pub mod file;
pub mod memory;

pub use file::FileRevocationStore;
pub use memory::{MemoryCounterStore, MemoryRevocationStore};

// self
use crate::_prelude::*;

/// Boxed future returned by store contracts.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Records tokens revoked before their natural expiry.
pub trait RevocationStore
where
	Self: Send + Sync,
{
	/// Inserts `key` at `now`, expiring it at `expires_at`.
	///
	/// Implementations may drop entries already lapsed at `now`; they must judge that by the
	/// caller's `now`, the same clock [`is_revoked`](Self::is_revoked) is asked with.
	fn revoke<'a>(
		&'a self,
		key: &'a str,
		expires_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> StoreFuture<'a, ()>;

	/// Returns `true` when `key` is present and unexpired at `now`.
	fn is_revoked<'a>(&'a self, key: &'a str, now: OffsetDateTime) -> StoreFuture<'a, bool>;
}

/// Shared counters backing rate windows.
pub trait CounterStore
where
	Self: Send + Sync,
{
	/// Atomically increments `key` and returns the new count.
	///
	/// A counter missing or expired at `now` restarts from zero and expires at `reset_at`.
	fn increment<'a>(
		&'a self,
		key: &'a str,
		now: OffsetDateTime,
		reset_at: OffsetDateTime,
	) -> StoreFuture<'a, u64>;

	/// Reads the count of `key` at `now` without incrementing it.
	fn peek<'a>(&'a self, key: &'a str, now: OffsetDateTime) -> StoreFuture<'a, u64>;
}

/// Error type produced by store implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Builds the namespaced revocation key for a token id.
pub fn revocation_key(namespace: &str, jti: &str) -> String {
	format!("{namespace}:invalid-token:{jti}")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn revocation_keys_are_namespaced() {
		assert_eq!(revocation_key("shop", "abc"), "shop:invalid-token:abc");
	}

	#[test]
	fn store_error_can_be_serialized() {
		let error = StoreError::Backend { message: "timeout".into() };
		let payload = serde_json::to_string(&error).expect("StoreError should serialize to JSON.");
		let round_trip: StoreError =
			serde_json::from_str(&payload).expect("Serialized error should deserialize from JSON.");

		assert_eq!(round_trip, error);
	}
}
