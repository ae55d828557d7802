//! Thread-safe in-memory [`AuthStateStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{AuthStateStore, StoreError, StoreFuture},
};

type BlobMap = Arc<RwLock<HashMap<String, String>>>;

/// Storage backend that keeps blobs in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryAuthStore(BlobMap);
impl MemoryAuthStore {
	/// Seeds the store with a blob under the provided key, bypassing the async contract.
	pub fn seed(&self, key: impl Into<String>, blob: impl Into<String>) {
		self.0.write().insert(key.into(), blob.into());
	}

	fn load_now(map: BlobMap, key: String) -> Option<String> {
		map.read().get(&key).cloned()
	}

	fn save_now(map: BlobMap, key: String, blob: String) -> Result<(), StoreError> {
		map.write().insert(key, blob);

		Ok(())
	}

	fn remove_now(map: BlobMap, key: String) -> Option<String> {
		map.write().remove(&key)
	}
}
impl AuthStateStore for MemoryAuthStore {
	fn load<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Ok(Self::load_now(map, key)) })
	}

	fn save<'a>(&'a self, key: &'a str, blob: String) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Self::save_now(map, key, blob) })
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Ok(Self::remove_now(map, key)) })
	}
}
