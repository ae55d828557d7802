//! Simple file-backed [`AuthStateStore`] for desktop and CLI hosts of the console.
//!
//! Browser deployments persist the auth blob in localStorage; hosts without one use this
//! backend, which mirrors the same key/blob shape in a JSON file rewritten atomically
//! after each mutation.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{AuthStateStore, StoreError, StoreFuture},
};

/// Persists auth blobs to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileAuthStore {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<String, String>>>,
}
impl FileAuthStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = if path.exists() { Self::load_snapshot(&path)? } else { HashMap::new() };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<String, String>, StoreError> {
		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &HashMap<String, String>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl AuthStateStore for FileAuthStore {
	fn load<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move { Ok(self.inner.read().get(key).cloned()) })
	}

	fn save<'a>(&'a self, key: &'a str, blob: String) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.insert(key.to_owned(), blob);
			self.persist_locked(&guard)?;

			Ok(())
		})
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let removed = guard.remove(key);

			if removed.is_some() {
				self.persist_locked(&guard)?;
			}

			Ok(removed)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{
		env, process,
		time::{SystemTime, UNIX_EPOCH},
	};
	// self
	use super::*;
	use crate::store::AUTH_STATE_KEY;

	fn temp_path() -> PathBuf {
		let nanos = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.expect("System clock should be past the epoch.")
			.as_nanos();
		let unique = format!("kuskul_auth_store_{}_{nanos}.json", process::id());

		env::temp_dir().join(unique)
	}

	#[tokio::test]
	async fn save_and_reload_round_trip() {
		let path = temp_path();
		let store = FileAuthStore::open(&path).expect("Failed to open file store snapshot.");

		store
			.save(AUTH_STATE_KEY, "{\"activeSchoolId\":\"school-1\"}".into())
			.await
			.expect("Failed to save auth blob to file store.");
		drop(store);

		let reopened = FileAuthStore::open(&path).expect("Failed to reopen file store snapshot.");
		let blob = reopened
			.load(AUTH_STATE_KEY)
			.await
			.expect("Failed to load auth blob from file store.")
			.expect("File store lost blob after reopen.");

		assert_eq!(blob, "{\"activeSchoolId\":\"school-1\"}");

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary store snapshot {}: {e}", path.display())
		});
	}

	#[tokio::test]
	async fn remove_persists_the_deletion() {
		let path = temp_path();
		let store = FileAuthStore::open(&path).expect("Failed to open file store snapshot.");

		store
			.save(AUTH_STATE_KEY, "{}".into())
			.await
			.expect("Failed to save auth blob to file store.");

		let removed = store
			.remove(AUTH_STATE_KEY)
			.await
			.expect("Failed to remove auth blob from file store.");

		assert_eq!(removed.as_deref(), Some("{}"));

		let reopened = FileAuthStore::open(&path).expect("Failed to reopen file store snapshot.");
		let blob = reopened
			.load(AUTH_STATE_KEY)
			.await
			.expect("Failed to load auth blob from reopened store.");

		assert!(blob.is_none());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary store snapshot {}: {e}", path.display())
		});
	}
}
