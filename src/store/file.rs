//! File-backed [`RevocationStore`] for single-node deployments that must survive restarts.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{RevocationStore, StoreError, StoreFuture},
};

type Entries = HashMap<String, i64>;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
	key: String,
	expires_at: i64,
}

/// Revocation entries mirrored to a JSON snapshot after every write.
///
/// Lapsed entries are discarded on open and before each write, so the snapshot only ever
/// holds live revocations.
#[derive(Clone, Debug)]
pub struct FileRevocationStore {
	path: PathBuf,
	entries: Arc<RwLock<Entries>>,
}
impl FileRevocationStore {
	/// Opens the snapshot at `path`, creating parent directories as needed.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
			fs::create_dir_all(dir).map_err(io_failure("create directory", dir))?;
		}

		let mut entries = read_snapshot(&path)?;
		let now = OffsetDateTime::now_utc().unix_timestamp();

		entries.retain(|_, expires_at| *expires_at > now);

		Ok(Self { path, entries: Arc::new(RwLock::new(entries)) })
	}

	/// Number of entries currently held.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	/// Returns `true` when nothing is held.
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	fn write_snapshot(&self, entries: &Entries) -> Result<(), StoreError> {
		let mut snapshot = entries
			.iter()
			.map(|(key, expires_at)| SnapshotEntry { key: key.clone(), expires_at: *expires_at })
			.collect::<Vec<_>>();

		snapshot.sort_unstable_by(|a, b| a.key.cmp(&b.key));

		let bytes = serde_json::to_vec(&snapshot).map_err(|e| StoreError::Serialization {
			message: format!("revocation snapshot could not be encoded: {e}"),
		})?;
		let staging = self.path.with_extension("tmp");
		let mut file = File::create(&staging).map_err(io_failure("create", &staging))?;

		file.write_all(&bytes).map_err(io_failure("write", &staging))?;
		file.sync_all().map_err(io_failure("sync", &staging))?;
		fs::rename(&staging, &self.path).map_err(io_failure("replace", &self.path))
	}
}
impl RevocationStore for FileRevocationStore {
	fn revoke<'a>(
		&'a self,
		key: &'a str,
		expires_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let now = now.unix_timestamp();
			let mut entries = self.entries.write();

			entries.retain(|_, lapse| *lapse > now);
			entries.insert(key.to_owned(), expires_at.unix_timestamp());

			self.write_snapshot(&entries)
		})
	}

	fn is_revoked<'a>(&'a self, key: &'a str, now: OffsetDateTime) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			let now = now.unix_timestamp();

			Ok(self.entries.read().get(key).is_some_and(|expires_at| *expires_at > now))
		})
	}
}

fn read_snapshot(path: &Path) -> Result<Entries, StoreError> {
	let bytes = match fs::read(path) {
		Ok(bytes) => bytes,
		Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
		Err(e) => return Err(io_failure("read", path)(e)),
	};

	if bytes.is_empty() {
		return Ok(Entries::new());
	}

	let snapshot: Vec<SnapshotEntry> =
		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("{} is not a revocation snapshot: {e}", path.display()),
		})?;

	Ok(snapshot.into_iter().map(|entry| (entry.key, entry.expires_at)).collect())
}

fn io_failure(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> StoreError {
	let path = path.display().to_string();

	move |e| StoreError::Backend { message: format!("could not {action} {path}: {e}") }
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn scratch_path(label: &str) -> PathBuf {
		env::temp_dir().join(format!(
			"access_core_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		))
	}

	#[tokio::test]
	async fn revocations_survive_reopen() {
		let path = scratch_path("reopen");
		let store = FileRevocationStore::open(&path).expect("Snapshot store should open.");
		let now = OffsetDateTime::now_utc();

		store
			.revoke("app:invalid-token:live", now + Duration::hours(1), now)
			.await
			.expect("Live revocation should persist.");
		drop(store);

		let reopened = FileRevocationStore::open(&path).expect("Snapshot store should reopen.");

		assert!(
			reopened
				.is_revoked("app:invalid-token:live", now)
				.await
				.expect("Lookup should succeed.")
		);
		assert_eq!(reopened.len(), 1);

		fs::remove_file(&path).expect("Scratch snapshot should be removable.");
	}

	#[test]
	fn lapsed_entries_are_dropped_on_open() {
		let path = scratch_path("lapsed");
		let now = OffsetDateTime::now_utc().unix_timestamp();
		let snapshot = serde_json::to_vec(&[
			SnapshotEntry { key: "app:invalid-token:old".into(), expires_at: now - 60 },
			SnapshotEntry { key: "app:invalid-token:new".into(), expires_at: now + 600 },
		])
		.expect("Snapshot fixture should encode.");

		fs::write(&path, snapshot).expect("Snapshot fixture should be writable.");

		let store = FileRevocationStore::open(&path).expect("Seeded store should open.");

		assert_eq!(store.len(), 1);

		fs::remove_file(&path).expect("Scratch snapshot should be removable.");
	}

	#[test]
	fn corrupt_snapshots_are_reported() {
		let path = scratch_path("corrupt");

		fs::write(&path, b"not json").expect("Corrupt fixture should be writable.");

		assert!(matches!(
			FileRevocationStore::open(&path),
			Err(StoreError::Serialization { .. })
		));

		fs::remove_file(&path).expect("Scratch snapshot should be removable.");
	}
}
