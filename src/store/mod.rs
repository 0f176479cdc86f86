//! Backup-store interface and implementations
//!
//! The store is a flat, key-addressed object namespace. Keys may contain
//! slashes but carry no directory semantics; listing is by string prefix
//! with marker-based pagination. Large objects go through a multipart
//! session: create, upload numbered parts, complete with the ordered list
//! of part tags.

mod local;
mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable name/path pair attached to an object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectMetadata {
	pub filename: Option<String>,
	pub filepath: Option<String>,
}

/// One object as reported by a listing or an existence probe
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEntry {
	pub key: String,
	pub last_modified: DateTime<Utc>,
	pub metadata: ObjectMetadata,
}

/// Acknowledged part of a multipart session
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedPart {
	/// 1-based position of the part within the object
	pub part_number: u32,

	/// Opaque integrity tag returned by the store on acceptance
	pub tag: String,
}

#[async_trait]
pub trait BackupStore: Send + Sync {
	async fn container_exists(&self) -> StoreResult<bool>;

	async fn create_container(&self) -> StoreResult<()>;

	/// List up to `max_keys` objects under `prefix`, in ascending key order,
	/// starting strictly after `marker`. A page shorter than `max_keys`
	/// means there is nothing further.
	async fn list_objects(
		&self,
		prefix: &str,
		marker: Option<&str>,
		max_keys: usize,
	) -> StoreResult<Vec<ObjectEntry>>;

	/// Atomically write an object and its metadata
	async fn put_object(&self, key: &str, body: &[u8], metadata: &ObjectMetadata)
		-> StoreResult<()>;

	async fn head_object(&self, key: &str) -> StoreResult<Option<ObjectEntry>>;

	async fn get_object(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

	/// Rewrite an object's metadata in place without touching its content
	async fn update_metadata(&self, key: &str, metadata: &ObjectMetadata) -> StoreResult<()>;

	/// Delete an object. Deleting a missing key is not an error.
	async fn delete_object(&self, key: &str) -> StoreResult<()>;

	/// Open a multipart session, returning its upload identifier
	async fn create_multipart(&self, key: &str, metadata: &ObjectMetadata) -> StoreResult<String>;

	/// Upload one part, returning its integrity tag
	async fn upload_part(
		&self,
		key: &str,
		upload_id: &str,
		part_number: u32,
		body: &[u8],
	) -> StoreResult<String>;

	/// Assemble the object from the ordered list of acknowledged parts
	async fn complete_multipart(
		&self,
		key: &str,
		upload_id: &str,
		parts: &[CompletedPart],
	) -> StoreResult<()>;

	/// Discard a multipart session and any uploaded parts
	async fn abort_multipart(&self, key: &str, upload_id: &str) -> StoreResult<()>;
}

// vim: ts=4
