//! Persistent key-value storage seam.
//!
//! The host backs this with whatever survives a page reload (session storage,
//! extension storage). Values are strings; timestamps are stored as decimal
//! milliseconds since the Unix epoch.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::Result;

/// Async key-value store surviving page reloads.
#[async_trait]
pub trait PersistentStore: Send + Sync + 'static {
	/// Reads a value.
	async fn get(&self, key: &str) -> Result<Option<String>>;

	/// Writes a value, replacing any previous one.
	async fn set(&self, key: &str, value: String) -> Result<()>;

	/// Deletes a value; deleting a missing key is not an error.
	async fn remove(&self, key: &str) -> Result<()>;
}

/// Key of the persisted lockout expiry for `user_id`.
pub fn limited_until_key(user_id: &str) -> String {
	format!("{user_id}_limited_until")
}

/// In-process [`PersistentStore`].
///
/// Clones share the same map, so a test or headless host can keep a handle and
/// inspect what the engine persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
	entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Synchronously inserts a value.
	pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
		self.entries.lock().insert(key.into(), value.into());
	}

	/// Synchronously reads a value.
	pub fn value(&self, key: &str) -> Option<String> {
		self.entries.lock().get(key).cloned()
	}

	/// Number of stored entries.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Returns true when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}
}

#[async_trait]
impl PersistentStore for MemoryStore {
	async fn get(&self, key: &str) -> Result<Option<String>> {
		Ok(self.value(key))
	}

	async fn set(&self, key: &str, value: String) -> Result<()> {
		self.entries.lock().insert(key.to_owned(), value);
		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<()> {
		self.entries.lock().remove(key);
		Ok(())
	}
}
