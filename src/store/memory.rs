//! Thread-safe in-memory stores for local development, single-node deployments, and tests.

// self
use crate::{
	_prelude::*,
	store::{CounterStore, RevocationStore, StoreError, StoreFuture},
};

type RevocationMap = Arc<RwLock<HashMap<String, OffsetDateTime>>>;
type CounterMap = Arc<Mutex<HashMap<String, CounterEntry>>>;

/// In-process revocation store whose entries expire at the token's original expiry.
#[derive(Clone, Debug, Default)]
pub struct MemoryRevocationStore(RevocationMap);
impl MemoryRevocationStore {
	/// Returns `true` when `key` is present and unexpired at `now`.
	pub fn is_revoked_at(&self, key: &str, now: OffsetDateTime) -> bool {
		Self::lookup_now(&self.0, key, now)
	}

	/// Number of entries that are still live at `now`.
	pub fn live_entries_at(&self, now: OffsetDateTime) -> usize {
		self.0.read().values().filter(|expires_at| **expires_at > now).count()
	}

	/// Number of entries physically held, expired or not.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is held.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn insert_now(
		map: &RevocationMap,
		key: &str,
		expires_at: OffsetDateTime,
		now: OffsetDateTime,
	) {
		let mut guard = map.write();

		guard.retain(|_, entry_expiry| *entry_expiry > now);
		guard.insert(key.to_owned(), expires_at);
	}

	fn lookup_now(map: &RevocationMap, key: &str, now: OffsetDateTime) -> bool {
		map.read().get(key).is_some_and(|expires_at| *expires_at > now)
	}
}
impl RevocationStore for MemoryRevocationStore {
	fn revoke<'a>(
		&'a self,
		key: &'a str,
		expires_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			Self::insert_now(&self.0, key, expires_at, now);

			Ok(())
		})
	}

	fn is_revoked<'a>(&'a self, key: &'a str, now: OffsetDateTime) -> StoreFuture<'a, bool> {
		Box::pin(async move { Ok(Self::lookup_now(&self.0, key, now)) })
	}
}

#[derive(Clone, Copy, Debug)]
struct CounterEntry {
	count: u64,
	reset_at: OffsetDateTime,
}

/// In-process counter store; each operation holds the map lock for its full
/// read-modify-write so increments are atomic.
#[derive(Clone, Debug, Default)]
pub struct MemoryCounterStore(CounterMap);
impl MemoryCounterStore {
	/// Number of counters physically held, expired or not.
	pub fn len(&self) -> usize {
		self.0.lock().len()
	}

	/// Returns `true` when no counters are held.
	pub fn is_empty(&self) -> bool {
		self.0.lock().is_empty()
	}

	fn increment_now(
		map: &CounterMap,
		key: &str,
		now: OffsetDateTime,
		reset_at: OffsetDateTime,
	) -> Result<u64, StoreError> {
		let mut guard = map.lock();

		guard.retain(|_, entry| entry.reset_at > now);

		let entry =
			guard.entry(key.to_owned()).or_insert(CounterEntry { count: 0, reset_at });

		entry.count = entry.count.checked_add(1).ok_or_else(|| StoreError::Backend {
			message: format!("Counter {key} overflowed"),
		})?;

		Ok(entry.count)
	}

	fn peek_now(map: &CounterMap, key: &str, now: OffsetDateTime) -> u64 {
		map.lock().get(key).filter(|entry| entry.reset_at > now).map_or(0, |entry| entry.count)
	}
}
impl CounterStore for MemoryCounterStore {
	fn increment<'a>(
		&'a self,
		key: &'a str,
		now: OffsetDateTime,
		reset_at: OffsetDateTime,
	) -> StoreFuture<'a, u64> {
		Box::pin(async move { Self::increment_now(&self.0, key, now, reset_at) })
	}

	fn peek<'a>(&'a self, key: &'a str, now: OffsetDateTime) -> StoreFuture<'a, u64> {
		Box::pin(async move { Ok(Self::peek_now(&self.0, key, now)) })
	}
}
