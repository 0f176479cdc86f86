//! In-memory source system used by the test suite
//!
//! The tree is scripted through the builder methods; listing and download
//! calls are counted so tests can assert on traffic, and the peak number of
//! concurrent listing calls is tracked to verify bounded traversal.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{ContentSink, SourceResult, SourceSystem};
use crate::error::SourceError;
use crate::types::{AccountIdentity, Credentials, Node, NodeKind};

struct FolderRecord {
	node: Node,
	parent: Option<String>,
	child_folders: Vec<String>,
	documents: Vec<String>,
}

struct DocumentRecord {
	node: Node,
	parent: String,
	content: Vec<u8>,
}

struct Inner {
	folders: HashMap<String, FolderRecord>,
	documents: HashMap<String, DocumentRecord>,
	download_counts: HashMap<String, usize>,
	fail_listing: Option<String>,
	reject_credentials: bool,
}

pub struct MemorySource {
	inner: Mutex<Inner>,
	root_id: String,
	in_flight: AtomicUsize,
	max_in_flight: AtomicUsize,
}

impl MemorySource {
	pub fn new() -> Self {
		let root_id = Uuid::new_v4().to_string();
		let root = Node {
			id: root_id.clone(),
			name: String::new(),
			path: "/".to_string(),
			updated: DateTime::<Utc>::UNIX_EPOCH,
			attributes: serde_json::json!({}),
			kind: NodeKind::Folder,
		};

		let mut folders = HashMap::new();
		folders.insert(
			root_id.clone(),
			FolderRecord { node: root, parent: None, child_folders: vec![], documents: vec![] },
		);

		MemorySource {
			inner: Mutex::new(Inner {
				folders,
				documents: HashMap::new(),
				download_counts: HashMap::new(),
				fail_listing: None,
				reject_credentials: false,
			}),
			root_id,
			in_flight: AtomicUsize::new(0),
			max_in_flight: AtomicUsize::new(0),
		}
	}

	pub fn root_id(&self) -> String {
		self.root_id.clone()
	}

	pub fn add_folder(&self, parent: &str, name: &str, updated: DateTime<Utc>) -> String {
		let mut inner = self.lock();
		let id = Uuid::new_v4().to_string();
		let parent_path = match inner.folders.get(parent) {
			Some(rec) => rec.node.path.clone(),
			None => "/".to_string(),
		};
		let node = Node {
			id: id.clone(),
			name: name.to_string(),
			path: format!("{}{}/", parent_path, name),
			updated,
			attributes: serde_json::json!({}),
			kind: NodeKind::Folder,
		};
		inner.folders.insert(
			id.clone(),
			FolderRecord {
				node,
				parent: Some(parent.to_string()),
				child_folders: vec![],
				documents: vec![],
			},
		);
		if let Some(rec) = inner.folders.get_mut(parent) {
			rec.child_folders.push(id.clone());
		}
		id
	}

	pub fn add_document(
		&self,
		parent: &str,
		name: &str,
		updated: DateTime<Utc>,
		content: &[u8],
	) -> String {
		let mut inner = self.lock();
		let id = Uuid::new_v4().to_string();
		let parent_path = match inner.folders.get(parent) {
			Some(rec) => rec.node.path.clone(),
			None => "/".to_string(),
		};
		let node = Node {
			id: id.clone(),
			name: name.to_string(),
			path: format!("{}{}", parent_path, name),
			updated,
			attributes: serde_json::json!({}),
			kind: NodeKind::Document,
		};
		inner.documents.insert(
			id.clone(),
			DocumentRecord { node, parent: parent.to_string(), content: content.to_vec() },
		);
		if let Some(rec) = inner.folders.get_mut(parent) {
			rec.documents.push(id.clone());
		}
		id
	}

	pub fn set_attributes(&self, id: &str, attributes: serde_json::Value) {
		let mut inner = self.lock();
		if let Some(rec) = inner.folders.get_mut(id) {
			rec.node.attributes = attributes;
		} else if let Some(rec) = inner.documents.get_mut(id) {
			rec.node.attributes = attributes;
		}
	}

	pub fn set_updated(&self, id: &str, updated: DateTime<Utc>) {
		let mut inner = self.lock();
		if let Some(rec) = inner.folders.get_mut(id) {
			rec.node.updated = updated;
		} else if let Some(rec) = inner.documents.get_mut(id) {
			rec.node.updated = updated;
		}
	}

	pub fn set_content(&self, id: &str, content: &[u8]) {
		let mut inner = self.lock();
		if let Some(rec) = inner.documents.get_mut(id) {
			rec.content = content.to_vec();
		}
	}

	/// Rename a document, adjusting the final path component
	pub fn rename_document(&self, id: &str, new_name: &str) {
		let mut inner = self.lock();
		if let Some(rec) = inner.documents.get_mut(id) {
			let dir = match rec.node.path.rsplit_once('/') {
				Some((dir, _)) => dir.to_string(),
				None => String::new(),
			};
			rec.node.name = new_name.to_string();
			rec.node.path = format!("{}/{}", dir, new_name);
		}
	}

	pub fn set_path(&self, id: &str, path: &str) {
		let mut inner = self.lock();
		if let Some(rec) = inner.folders.get_mut(id) {
			rec.node.path = path.to_string();
		} else if let Some(rec) = inner.documents.get_mut(id) {
			rec.node.path = path.to_string();
		}
	}

	pub fn remove_document(&self, id: &str) {
		let mut inner = self.lock();
		if let Some(rec) = inner.documents.remove(id) {
			if let Some(parent) = inner.folders.get_mut(&rec.parent) {
				parent.documents.retain(|d| d.as_str() != id);
			}
		}
	}

	pub fn remove_folder(&self, id: &str) {
		let mut inner = self.lock();
		if let Some(rec) = inner.folders.remove(id) {
			if let Some(parent_id) = rec.parent {
				if let Some(parent) = inner.folders.get_mut(&parent_id) {
					parent.child_folders.retain(|f| f.as_str() != id);
				}
			}
		}
	}

	/// Make listing calls on this folder fail, for fail-fast tests
	pub fn fail_listing_for(&self, id: &str) {
		self.lock().fail_listing = Some(id.to_string());
	}

	/// Make the next authenticate call fail
	pub fn reject_credentials(&self) {
		self.lock().reject_credentials = true;
	}

	pub fn download_count(&self, id: &str) -> usize {
		self.lock().download_counts.get(id).copied().unwrap_or(0)
	}

	/// Peak number of listing calls observed in flight at once
	pub fn max_in_flight(&self) -> usize {
		self.max_in_flight.load(Ordering::SeqCst)
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
		self.inner.lock().expect("memory source lock poisoned")
	}

	fn enter(&self) -> FlightGuard<'_> {
		let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
		self.max_in_flight.fetch_max(current, Ordering::SeqCst);
		FlightGuard { source: self }
	}
}

impl Default for MemorySource {
	fn default() -> Self {
		Self::new()
	}
}

struct FlightGuard<'a> {
	source: &'a MemorySource,
}

impl Drop for FlightGuard<'_> {
	fn drop(&mut self) {
		self.source.in_flight.fetch_sub(1, Ordering::SeqCst);
	}
}

#[async_trait]
impl SourceSystem for MemorySource {
	async fn authenticate(&self, _credentials: &Credentials) -> SourceResult<AccountIdentity> {
		if self.lock().reject_credentials {
			return Err(SourceError::Authentication {
				message: "invalid client credentials".to_string(),
			});
		}
		Ok(AccountIdentity {
			account_id: "acct-0000".to_string(),
			account_name: Some("In-memory account".to_string()),
		})
	}

	async fn root_folder(&self) -> SourceResult<Node> {
		let inner = self.lock();
		match inner.folders.get(&self.root_id) {
			Some(rec) => Ok(rec.node.clone()),
			None => Err(SourceError::Listing {
				what: "root folder".to_string(),
				message: "missing".to_string(),
			}),
		}
	}

	async fn child_folders(&self, folder: &Node) -> SourceResult<Vec<Node>> {
		let _guard = self.enter();
		tokio::task::yield_now().await;

		let inner = self.lock();
		if inner.fail_listing.as_deref() == Some(folder.id.as_str()) {
			return Err(SourceError::Listing {
				what: format!("folders of {}", folder.path),
				message: "injected failure".to_string(),
			});
		}
		let rec = inner.folders.get(&folder.id).ok_or_else(|| SourceError::Listing {
			what: format!("folders of {}", folder.path),
			message: "no such folder".to_string(),
		})?;
		Ok(rec
			.child_folders
			.iter()
			.filter_map(|id| inner.folders.get(id).map(|r| r.node.clone()))
			.collect())
	}

	async fn documents(&self, folder: &Node) -> SourceResult<Vec<Node>> {
		let _guard = self.enter();
		tokio::task::yield_now().await;

		let inner = self.lock();
		let rec = inner.folders.get(&folder.id).ok_or_else(|| SourceError::Listing {
			what: format!("documents of {}", folder.path),
			message: "no such folder".to_string(),
		})?;
		Ok(rec
			.documents
			.iter()
			.filter_map(|id| inner.documents.get(id).map(|r| r.node.clone()))
			.collect())
	}

	async fn attributes(&self, node: &Node) -> SourceResult<serde_json::Value> {
		let inner = self.lock();
		if let Some(rec) = inner.folders.get(&node.id) {
			return Ok(rec.node.attributes.clone());
		}
		if let Some(rec) = inner.documents.get(&node.id) {
			return Ok(rec.node.attributes.clone());
		}
		Err(SourceError::Attributes { id: node.id.clone(), message: "no such node".to_string() })
	}

	async fn download(&self, document: &Node, sink: &mut ContentSink) -> SourceResult<()> {
		let content = {
			let mut inner = self.lock();
			*inner.download_counts.entry(document.id.clone()).or_insert(0) += 1;
			match inner.documents.get(&document.id) {
				Some(rec) => rec.content.clone(),
				None => {
					return Err(SourceError::Download {
						id: document.id.clone(),
						message: "no such document".to_string(),
					})
				}
			}
		};
		sink.write_all(&content).await.map_err(|e| SourceError::Download {
			id: document.id.clone(),
			message: e.to_string(),
		})?;
		Ok(())
	}
}

// vim: ts=4
