//! Storage contracts and built-in store implementations for login sessions.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::AccessToken};

/// Persistence contract for tokens obtained through a login.
///
/// Implementations must be safe to share across tasks. Every method returns a boxed
/// future so the trait stays object-safe and callers can hold a `dyn SessionStore`.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Inserts or replaces the record stored under the record's own key.
	fn save(&self, record: SessionRecord) -> StoreFuture<'_, ()>;

	/// Loads the record stored under the key, if any.
	fn load<'a>(&'a self, key: &'a SessionKey) -> StoreFuture<'a, Option<SessionRecord>>;

	/// Removes the record stored under the key, returning the evicted record.
	fn clear<'a>(&'a self, key: &'a SessionKey) -> StoreFuture<'a, Option<SessionRecord>>;
}

/// Boxed future type used by [`SessionStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Failures surfaced by a [`SessionStore`] implementation.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StoreError {
	/// A record could not be serialized or deserialized.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable description of the underlying serde failure.
		message: String,
	},
	/// The backing storage rejected the operation.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable description of the backend failure.
		message: String,
	},
}

/// Identifies where a session belongs: one provider host, one client application.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
	/// Fully qualified provider host the token was issued by.
	pub host: String,
	/// Client identifier the token was issued to.
	pub client_id: String,
}

/// A stored login outcome: the token plus the audience it was requested for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
	/// Key the record is stored under.
	pub key: SessionKey,
	/// API audience the token was requested for.
	pub audience: String,
	/// The token itself.
	pub token: AccessToken,
}
