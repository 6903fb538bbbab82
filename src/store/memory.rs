//! Thread-safe in-memory [`SessionStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{SessionKey, SessionRecord, SessionStore, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<SessionKey, SessionRecord>>>;

/// Thread-safe storage backend that keeps records in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	fn save_now(map: StoreMap, record: SessionRecord) -> Result<(), StoreError> {
		map.write().insert(record.key.clone(), record);

		Ok(())
	}

	fn load_now(map: StoreMap, key: SessionKey) -> Option<SessionRecord> {
		map.read().get(&key).cloned()
	}

	fn clear_now(map: StoreMap, key: SessionKey) -> Option<SessionRecord> {
		map.write().remove(&key)
	}
}
impl SessionStore for MemoryStore {
	fn save(&self, record: SessionRecord) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::save_now(map, record) })
	}

	fn load<'a>(&'a self, key: &'a SessionKey) -> StoreFuture<'a, Option<SessionRecord>> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Ok(Self::load_now(map, key)) })
	}

	fn clear<'a>(&'a self, key: &'a SessionKey) -> StoreFuture<'a, Option<SessionRecord>> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Ok(Self::clear_now(map, key)) })
	}
}
