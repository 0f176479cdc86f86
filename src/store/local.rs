//! Local-directory backup store
//!
//! Lays a flat key namespace out on disk: object bodies under `objects/`,
//! their name/path metadata as JSON side files under `meta/`, and in-flight
//! multipart sessions under `uploads/`. Last-modified timestamps come from
//! the body file's mtime, so a metadata rewrite leaves them untouched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use super::{BackupStore, CompletedPart, ObjectEntry, ObjectMetadata, StoreResult};
use crate::error::StoreError;

pub struct LocalStore {
	root: PathBuf,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadManifest {
	key: String,
	metadata: ObjectMetadata,
}

impl LocalStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		LocalStore { root: root.into() }
	}

	fn objects_dir(&self) -> PathBuf {
		self.root.join("objects")
	}

	fn object_path(&self, key: &str) -> PathBuf {
		self.objects_dir().join(key)
	}

	fn meta_path(&self, key: &str) -> PathBuf {
		self.root.join("meta").join(format!("{}.json", key))
	}

	fn upload_dir(&self, upload_id: &str) -> PathBuf {
		self.root.join("uploads").join(upload_id)
	}

	async fn ensure_parent(path: &Path) -> io::Result<()> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).await?;
		}
		Ok(())
	}

	async fn read_metadata(&self, key: &str) -> StoreResult<ObjectMetadata> {
		match fs::read(self.meta_path(key)).await {
			Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::Read {
				key: key.to_string(),
				message: format!("corrupt metadata side file: {}", e),
			}),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ObjectMetadata::default()),
			Err(e) => Err(StoreError::Io(e)),
		}
	}

	async fn write_metadata(&self, key: &str, metadata: &ObjectMetadata) -> StoreResult<()> {
		let path = self.meta_path(key);
		Self::ensure_parent(&path).await?;
		let json = serde_json::to_vec(metadata).map_err(|e| StoreError::Write {
			key: key.to_string(),
			message: format!("cannot encode metadata: {}", e),
		})?;
		fs::write(&path, json).await.map_err(StoreError::Io)
	}

	async fn entry_for(&self, key: &str) -> StoreResult<Option<ObjectEntry>> {
		let meta = match fs::metadata(self.object_path(key)).await {
			Ok(meta) => meta,
			Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(StoreError::Io(e)),
		};
		let modified = meta.modified().map_err(StoreError::Io)?;
		Ok(Some(ObjectEntry {
			key: key.to_string(),
			last_modified: DateTime::<Utc>::from(modified),
			metadata: self.read_metadata(key).await?,
		}))
	}

	/// Every key currently stored, in ascending order
	async fn all_keys(&self) -> StoreResult<Vec<String>> {
		let objects_dir = self.objects_dir();
		match fs::metadata(&objects_dir).await {
			Ok(_) => {}
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				return Err(StoreError::ContainerNotFound {
					container: self.root.display().to_string(),
				})
			}
			Err(e) => return Err(StoreError::Io(e)),
		}

		let mut keys = Vec::new();
		let mut stack = vec![objects_dir.clone()];
		while let Some(dir) = stack.pop() {
			let mut entries = fs::read_dir(&dir).await.map_err(StoreError::Io)?;
			while let Some(entry) = entries.next_entry().await.map_err(StoreError::Io)? {
				let file_type = entry.file_type().await.map_err(StoreError::Io)?;
				if file_type.is_dir() {
					stack.push(entry.path());
				} else {
					let rel = entry.path();
					let rel = rel.strip_prefix(&objects_dir).unwrap_or(&rel);
					let key = rel
						.iter()
						.map(|c| c.to_string_lossy().into_owned())
						.collect::<Vec<_>>()
						.join("/");
					keys.push(key);
				}
			}
		}
		keys.sort();
		Ok(keys)
	}

	async fn remove_if_present(path: &Path) -> StoreResult<()> {
		match fs::remove_file(path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StoreError::Io(e)),
		}
	}
}

#[async_trait]
impl BackupStore for LocalStore {
	async fn container_exists(&self) -> StoreResult<bool> {
		match fs::metadata(self.objects_dir()).await {
			Ok(meta) => Ok(meta.is_dir()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
			Err(e) => Err(StoreError::Io(e)),
		}
	}

	async fn create_container(&self) -> StoreResult<()> {
		fs::create_dir_all(self.objects_dir()).await.map_err(StoreError::Io)?;
		fs::create_dir_all(self.root.join("meta")).await.map_err(StoreError::Io)?;
		fs::create_dir_all(self.root.join("uploads")).await.map_err(StoreError::Io)?;
		Ok(())
	}

	async fn list_objects(
		&self,
		prefix: &str,
		marker: Option<&str>,
		max_keys: usize,
	) -> StoreResult<Vec<ObjectEntry>> {
		let keys = self.all_keys().await?;
		let mut page = Vec::new();
		for key in keys {
			if !key.starts_with(prefix) {
				continue;
			}
			if let Some(marker) = marker {
				if key.as_str() <= marker {
					continue;
				}
			}
			if let Some(entry) = self.entry_for(&key).await? {
				page.push(entry);
			}
			if page.len() == max_keys {
				break;
			}
		}
		Ok(page)
	}

	async fn put_object(
		&self,
		key: &str,
		body: &[u8],
		metadata: &ObjectMetadata,
	) -> StoreResult<()> {
		let path = self.object_path(key);
		Self::ensure_parent(&path).await?;
		fs::write(&path, body).await.map_err(|e| StoreError::Write {
			key: key.to_string(),
			message: e.to_string(),
		})?;
		self.write_metadata(key, metadata).await
	}

	async fn head_object(&self, key: &str) -> StoreResult<Option<ObjectEntry>> {
		self.entry_for(key).await
	}

	async fn get_object(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
		match fs::read(self.object_path(key)).await {
			Ok(body) => Ok(Some(body)),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(StoreError::Io(e)),
		}
	}

	async fn update_metadata(&self, key: &str, metadata: &ObjectMetadata) -> StoreResult<()> {
		match fs::metadata(self.object_path(key)).await {
			Ok(_) => {}
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				return Err(StoreError::Write {
					key: key.to_string(),
					message: "no such object".to_string(),
				})
			}
			Err(e) => return Err(StoreError::Io(e)),
		}
		self.write_metadata(key, metadata).await
	}

	async fn delete_object(&self, key: &str) -> StoreResult<()> {
		Self::remove_if_present(&self.object_path(key)).await?;
		Self::remove_if_present(&self.meta_path(key)).await
	}

	async fn create_multipart(&self, key: &str, metadata: &ObjectMetadata) -> StoreResult<String> {
		let upload_id = Uuid::new_v4().to_string();
		let dir = self.upload_dir(&upload_id);
		fs::create_dir_all(&dir).await.map_err(StoreError::Io)?;

		let manifest =
			UploadManifest { key: key.to_string(), metadata: metadata.clone() };
		let json = serde_json::to_vec(&manifest).map_err(|e| StoreError::Multipart {
			key: key.to_string(),
			message: format!("cannot encode manifest: {}", e),
		})?;
		fs::write(dir.join("manifest.json"), json).await.map_err(StoreError::Io)?;
		Ok(upload_id)
	}

	async fn upload_part(
		&self,
		key: &str,
		upload_id: &str,
		part_number: u32,
		body: &[u8],
	) -> StoreResult<String> {
		let dir = self.upload_dir(upload_id);
		match fs::metadata(&dir).await {
			Ok(_) => {}
			Err(_) => {
				return Err(StoreError::Multipart {
					key: key.to_string(),
					message: format!("no such upload: {}", upload_id),
				})
			}
		}
		fs::write(dir.join(format!("part-{:05}", part_number)), body)
			.await
			.map_err(StoreError::Io)?;
		Ok(hex::encode(blake3::hash(body).as_bytes()))
	}

	async fn complete_multipart(
		&self,
		key: &str,
		upload_id: &str,
		parts: &[CompletedPart],
	) -> StoreResult<()> {
		let dir = self.upload_dir(upload_id);
		let manifest_bytes = fs::read(dir.join("manifest.json")).await.map_err(|_| {
			StoreError::Multipart {
				key: key.to_string(),
				message: format!("no such upload: {}", upload_id),
			}
		})?;
		let manifest: UploadManifest =
			serde_json::from_slice(&manifest_bytes).map_err(|e| StoreError::Multipart {
				key: key.to_string(),
				message: format!("corrupt manifest: {}", e),
			})?;

		let mut body = Vec::new();
		for (index, part) in parts.iter().enumerate() {
			if part.part_number as usize != index + 1 {
				return Err(StoreError::Multipart {
					key: key.to_string(),
					message: format!("parts out of order at position {}", index + 1),
				});
			}
			let data = fs::read(dir.join(format!("part-{:05}", part.part_number)))
				.await
				.map_err(|_| StoreError::Multipart {
					key: key.to_string(),
					message: format!("part {} was never uploaded", part.part_number),
				})?;
			if hex::encode(blake3::hash(&data).as_bytes()) != part.tag {
				return Err(StoreError::Multipart {
					key: key.to_string(),
					message: format!("tag mismatch on part {}", part.part_number),
				});
			}
			body.extend_from_slice(&data);
		}

		self.put_object(&manifest.key, &body, &manifest.metadata).await?;
		fs::remove_dir_all(&dir).await.map_err(StoreError::Io)
	}

	async fn abort_multipart(&self, _key: &str, upload_id: &str) -> StoreResult<()> {
		match fs::remove_dir_all(self.upload_dir(upload_id)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StoreError::Io(e)),
		}
	}
}

// vim: ts=4
