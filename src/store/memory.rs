//! In-memory backup store used by the test suite
//!
//! Behaves like the real store down to marker pagination and multipart
//! sessions, and additionally keeps an operation log plus controllable
//! last-modified timestamps so tests can assert on exact store traffic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use super::{BackupStore, CompletedPart, ObjectEntry, ObjectMetadata, StoreResult};
use crate::error::StoreError;

struct StoredObject {
	body: Vec<u8>,
	last_modified: DateTime<Utc>,
	metadata: ObjectMetadata,
}

struct Upload {
	key: String,
	metadata: ObjectMetadata,
	parts: BTreeMap<u32, (String, Vec<u8>)>,
}

struct Inner {
	container: bool,
	objects: BTreeMap<String, StoredObject>,
	uploads: HashMap<String, Upload>,
	ops: Vec<String>,
	fail_parts: HashSet<u32>,
	fail_puts: HashSet<String>,
}

pub struct MemoryStore {
	inner: Mutex<Inner>,
}

impl MemoryStore {
	pub fn new() -> Self {
		MemoryStore {
			inner: Mutex::new(Inner {
				container: true,
				objects: BTreeMap::new(),
				uploads: HashMap::new(),
				ops: Vec::new(),
				fail_parts: HashSet::new(),
				fail_puts: HashSet::new(),
			}),
		}
	}

	/// A store whose container does not exist yet
	pub fn without_container() -> Self {
		let store = Self::new();
		store.lock().container = false;
		store
	}

	/// Chronological log of every mutating or listing call
	pub fn ops(&self) -> Vec<String> {
		self.lock().ops.clone()
	}

	pub fn clear_ops(&self) {
		self.lock().ops.clear();
	}

	/// Count logged operations starting with the given prefix
	pub fn op_count(&self, prefix: &str) -> usize {
		self.lock().ops.iter().filter(|op| op.starts_with(prefix)).count()
	}

	/// Override an object's last-modified timestamp
	pub fn set_last_modified(&self, key: &str, last_modified: DateTime<Utc>) {
		if let Some(obj) = self.lock().objects.get_mut(key) {
			obj.last_modified = last_modified;
		}
	}

	pub fn contains(&self, key: &str) -> bool {
		self.lock().objects.contains_key(key)
	}

	pub fn object(&self, key: &str) -> Option<(Vec<u8>, ObjectMetadata)> {
		self.lock().objects.get(key).map(|o| (o.body.clone(), o.metadata.clone()))
	}

	pub fn len(&self) -> usize {
		self.lock().objects.len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().objects.is_empty()
	}

	/// Make uploads of this part number fail
	pub fn fail_part(&self, part_number: u32) {
		self.lock().fail_parts.insert(part_number);
	}

	/// Make single puts of this key fail
	pub fn fail_put(&self, key: &str) {
		self.lock().fail_puts.insert(key.to_string());
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
		self.inner.lock().expect("memory store lock poisoned")
	}

	fn tag_for(body: &[u8]) -> String {
		hex::encode(blake3::hash(body).as_bytes())
	}
}

impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl BackupStore for MemoryStore {
	async fn container_exists(&self) -> StoreResult<bool> {
		Ok(self.lock().container)
	}

	async fn create_container(&self) -> StoreResult<()> {
		let mut inner = self.lock();
		inner.container = true;
		inner.ops.push("CREATE-CONTAINER".to_string());
		Ok(())
	}

	async fn list_objects(
		&self,
		prefix: &str,
		marker: Option<&str>,
		max_keys: usize,
	) -> StoreResult<Vec<ObjectEntry>> {
		let mut inner = self.lock();
		inner.ops.push(format!("LIST {}", prefix));
		let entries = inner
			.objects
			.iter()
			.filter(|(key, _)| key.starts_with(prefix))
			.filter(|(key, _)| match marker {
				Some(marker) => key.as_str() > marker,
				None => true,
			})
			.take(max_keys)
			.map(|(key, obj)| ObjectEntry {
				key: key.clone(),
				last_modified: obj.last_modified,
				metadata: obj.metadata.clone(),
			})
			.collect();
		Ok(entries)
	}

	async fn put_object(
		&self,
		key: &str,
		body: &[u8],
		metadata: &ObjectMetadata,
	) -> StoreResult<()> {
		let mut inner = self.lock();
		if inner.fail_puts.contains(key) {
			return Err(StoreError::Write {
				key: key.to_string(),
				message: "injected failure".to_string(),
			});
		}
		inner.ops.push(format!("PUT {}", key));
		inner.objects.insert(
			key.to_string(),
			StoredObject {
				body: body.to_vec(),
				last_modified: Utc::now(),
				metadata: metadata.clone(),
			},
		);
		Ok(())
	}

	async fn head_object(&self, key: &str) -> StoreResult<Option<ObjectEntry>> {
		let mut inner = self.lock();
		inner.ops.push(format!("HEAD {}", key));
		Ok(inner.objects.get(key).map(|obj| ObjectEntry {
			key: key.to_string(),
			last_modified: obj.last_modified,
			metadata: obj.metadata.clone(),
		}))
	}

	async fn get_object(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
		Ok(self.lock().objects.get(key).map(|obj| obj.body.clone()))
	}

	async fn update_metadata(&self, key: &str, metadata: &ObjectMetadata) -> StoreResult<()> {
		let mut inner = self.lock();
		inner.ops.push(format!("COPY {}", key));
		match inner.objects.get_mut(key) {
			Some(obj) => {
				obj.metadata = metadata.clone();
				Ok(())
			}
			None => Err(StoreError::Write {
				key: key.to_string(),
				message: "no such object".to_string(),
			}),
		}
	}

	async fn delete_object(&self, key: &str) -> StoreResult<()> {
		let mut inner = self.lock();
		inner.ops.push(format!("DELETE {}", key));
		inner.objects.remove(key);
		Ok(())
	}

	async fn create_multipart(&self, key: &str, metadata: &ObjectMetadata) -> StoreResult<String> {
		let mut inner = self.lock();
		inner.ops.push(format!("CREATE-MULTIPART {}", key));
		let upload_id = Uuid::new_v4().to_string();
		inner.uploads.insert(
			upload_id.clone(),
			Upload { key: key.to_string(), metadata: metadata.clone(), parts: BTreeMap::new() },
		);
		Ok(upload_id)
	}

	async fn upload_part(
		&self,
		key: &str,
		upload_id: &str,
		part_number: u32,
		body: &[u8],
	) -> StoreResult<String> {
		let mut inner = self.lock();
		if inner.fail_parts.contains(&part_number) {
			return Err(StoreError::Multipart {
				key: key.to_string(),
				message: format!("injected failure on part {}", part_number),
			});
		}
		inner.ops.push(format!("UPLOAD-PART {} {}", key, part_number));
		let tag = Self::tag_for(body);
		match inner.uploads.get_mut(upload_id) {
			Some(upload) => {
				upload.parts.insert(part_number, (tag.clone(), body.to_vec()));
				Ok(tag)
			}
			None => Err(StoreError::Multipart {
				key: key.to_string(),
				message: format!("no such upload: {}", upload_id),
			}),
		}
	}

	async fn complete_multipart(
		&self,
		key: &str,
		upload_id: &str,
		parts: &[CompletedPart],
	) -> StoreResult<()> {
		let mut inner = self.lock();
		inner.ops.push(format!("COMPLETE-MULTIPART {}", key));

		let upload = inner.uploads.remove(upload_id).ok_or_else(|| StoreError::Multipart {
			key: key.to_string(),
			message: format!("no such upload: {}", upload_id),
		})?;

		if parts.len() != upload.parts.len() {
			return Err(StoreError::Multipart {
				key: key.to_string(),
				message: format!(
					"part count mismatch: {} submitted, {} uploaded",
					parts.len(),
					upload.parts.len()
				),
			});
		}

		let mut body = Vec::new();
		for (index, part) in parts.iter().enumerate() {
			if part.part_number as usize != index + 1 {
				return Err(StoreError::Multipart {
					key: key.to_string(),
					message: format!("parts out of order at position {}", index + 1),
				});
			}
			let (tag, data) =
				upload.parts.get(&part.part_number).ok_or_else(|| StoreError::Multipart {
					key: key.to_string(),
					message: format!("part {} was never uploaded", part.part_number),
				})?;
			if tag != &part.tag {
				return Err(StoreError::Multipart {
					key: key.to_string(),
					message: format!("tag mismatch on part {}", part.part_number),
				});
			}
			body.extend_from_slice(data);
		}

		inner.objects.insert(
			upload.key,
			StoredObject { body, last_modified: Utc::now(), metadata: upload.metadata },
		);
		Ok(())
	}

	async fn abort_multipart(&self, key: &str, upload_id: &str) -> StoreResult<()> {
		let mut inner = self.lock();
		inner.ops.push(format!("ABORT-MULTIPART {}", key));
		inner.uploads.remove(upload_id);
		Ok(())
	}
}

// vim: ts=4
