//! Index of what the backup store already holds
//!
//! Built once per run from paginated prefix listings and then progressively
//! drained: every node confirmed present at the source removes its keys from
//! the map. Whatever is left after the walk has no live counterpart and is
//! deleted by the orphan pass.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::BackupError;
use crate::store::BackupStore;
use crate::types::{DOCUMENT_PREFIX, FOLDER_PREFIX};

/// Page size requested from the store listing
pub const PAGE_SIZE: usize = 1000;

/// Last-known state of one backed-up object
#[derive(Debug, Clone, PartialEq)]
pub struct DepotEntry {
	pub last_modified: DateTime<Utc>,
	pub filename: Option<String>,
	pub filepath: Option<String>,
}

pub struct DepotIndex {
	entries: Mutex<HashMap<String, DepotEntry>>,
}

impl DepotIndex {
	/// Build the index from the `document/` and `folder/` prefixes.
	///
	/// An empty store is a normal, successful terminal case.
	pub async fn build(store: &dyn BackupStore) -> Result<DepotIndex, BackupError> {
		let mut entries = HashMap::new();
		for prefix in [DOCUMENT_PREFIX, FOLDER_PREFIX] {
			Self::load_prefix(store, prefix, &mut entries).await?;
		}
		Ok(DepotIndex { entries: Mutex::new(entries) })
	}

	async fn load_prefix(
		store: &dyn BackupStore,
		prefix: &str,
		entries: &mut HashMap<String, DepotEntry>,
	) -> Result<(), BackupError> {
		let mut marker: Option<String> = None;
		loop {
			let page = store
				.list_objects(prefix, marker.as_deref(), PAGE_SIZE)
				.await
				.map_err(|e| BackupError::Enumeration {
					system: "store",
					message: e.to_string(),
				})?;

			let count = page.len();
			if let Some(last) = page.last() {
				marker = Some(last.key.clone());
			}
			for object in page {
				entries.insert(
					object.key,
					DepotEntry {
						last_modified: object.last_modified,
						filename: object.metadata.filename,
						filepath: object.metadata.filepath,
					},
				);
			}

			// A short page is the termination signal
			if count < PAGE_SIZE {
				return Ok(());
			}
		}
	}

	/// Look up an entry, cloning it out of the shared map
	pub fn get(&self, key: &str) -> Option<DepotEntry> {
		self.lock().get(key).cloned()
	}

	/// Mark keys as confirmed present, removing them from the map.
	/// Removing an absent key is a no-op.
	pub fn confirm(&self, keys: &[&str]) {
		let mut entries = self.lock();
		for key in keys {
			entries.remove(*key);
		}
	}

	/// Keys never confirmed during the walk, in ascending order
	pub fn remaining(&self) -> Vec<String> {
		let mut keys: Vec<String> = self.lock().keys().cloned().collect();
		keys.sort();
		keys
	}

	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, DepotEntry>> {
		// Held only across synchronous map operations, never across an await
		self.entries.lock().expect("depot index lock poisoned")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::{BackupStore, MemoryStore, ObjectMetadata};

	#[tokio::test]
	async fn test_build_from_empty_store() {
		let store = MemoryStore::new();
		let depot = DepotIndex::build(&store).await.unwrap();
		assert!(depot.is_empty());
	}

	#[tokio::test]
	async fn test_build_collects_both_prefixes() {
		let store = MemoryStore::new();
		let meta = ObjectMetadata::default();
		store.put_object("document/aaa", b"x", &meta).await.unwrap();
		store.put_object("folder/bbb", b"", &meta).await.unwrap();
		store.put_object("attributes/aaa", b"{}", &meta).await.unwrap();

		let depot = DepotIndex::build(&store).await.unwrap();
		assert_eq!(depot.len(), 2);
		assert!(depot.get("document/aaa").is_some());
		assert!(depot.get("folder/bbb").is_some());
		assert!(depot.get("attributes/aaa").is_none());
	}

	#[tokio::test]
	async fn test_confirm_drains_entries() {
		let store = MemoryStore::new();
		let meta = ObjectMetadata::default();
		store.put_object("document/aaa", b"x", &meta).await.unwrap();
		store.put_object("document/bbb", b"y", &meta).await.unwrap();

		let depot = DepotIndex::build(&store).await.unwrap();
		depot.confirm(&["document/aaa", "attributes/aaa"]);

		assert_eq!(depot.remaining(), vec!["document/bbb".to_string()]);
	}
}

// vim: ts=4
