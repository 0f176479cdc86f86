//! Per-node reconciliation and orphan cleanup
//!
//! Every node coming out of the traversal resolves to one of three actions:
//! skip (the stored copy is strictly newer), a metadata-only rewrite (the
//! content is current but the name or path moved), or a content transfer.
//! Timestamp comparison is strictly-after, so an equal timestamp
//! re-transfers rather than silently skipping a boundary update. Each
//! reconciled node removes its keys from the depot index; the keys left
//! over after the walk are deleted by the orphan pass, which is the only
//! deletion path and runs strictly after traversal drains.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::context::RunContext;
use crate::depot::DepotEntry;
use crate::error::BackupError;
use crate::logging::{debug, info};
use crate::source::SourceSystem;
use crate::store::{BackupStore, ObjectMetadata};
use crate::transfer;
use crate::types::{Node, NodeKind, ATTRIBUTES_PREFIX};

pub struct Reconciler {
	source: Arc<dyn SourceSystem>,
	store: Arc<dyn BackupStore>,
	ctx: Arc<RunContext>,
}

impl Reconciler {
	pub fn new(
		source: Arc<dyn SourceSystem>,
		store: Arc<dyn BackupStore>,
		ctx: Arc<RunContext>,
	) -> Self {
		Reconciler { source, store, ctx }
	}

	/// Drain the node channel with a bounded worker pool.
	///
	/// Returns when the traversal side closes the channel and every
	/// in-flight node has been reconciled, or on the first failure.
	pub async fn run(&self, rx: mpsc::Receiver<Node>) -> Result<(), BackupError> {
		let nodes =
			stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|node| (node, rx)) });
		nodes
			.map(Ok::<Node, BackupError>)
			.try_for_each_concurrent(self.ctx.config.parallelism, |node| self.reconcile(node))
			.await
	}

	async fn reconcile(&self, node: Node) -> Result<(), BackupError> {
		let key = node.content_key();
		let attributes_key = node.attributes_key();

		match self.ctx.depot.get(&key) {
			Some(entry) if !self.ctx.config.force && entry.last_modified > node.updated => {
				if metadata_differs(&entry, &node) {
					debug!("{} up-to-date; updating tags", key);
					self.store
						.update_metadata(&key, &desired_metadata(&node))
						.await
						.map_err(|e| BackupError::Transfer {
							key: key.clone(),
							message: e.to_string(),
						})?;
					self.ctx.count_metadata_update();
				} else {
					debug!("{} up-to-date; nothing changed", key);
					self.ctx.count_skip();
				}
			}
			_ => {
				self.transfer(&node, &key).await?;
				self.write_attributes(&node, &attributes_key).await?;
			}
		}

		// Confirmed present: these keys are no longer orphan candidates
		self.ctx.depot.confirm(&[key.as_str(), attributes_key.as_str()]);
		Ok(())
	}

	async fn transfer(&self, node: &Node, key: &str) -> Result<(), BackupError> {
		debug!("backing up {} to {}", node.path, key);
		match node.kind {
			NodeKind::Folder => {
				self.store
					.put_object(key, &[], &desired_metadata(node))
					.await
					.map_err(|e| BackupError::Transfer {
						key: key.to_string(),
						message: e.to_string(),
					})?;
				self.ctx.count_folder();
			}
			NodeKind::Document => {
				let buffer = transfer::download(self.source.as_ref(), node).await?;
				transfer::store_object(self.store.as_ref(), key, buffer, &desired_metadata(node))
					.await?;
				self.ctx.count_document();
			}
		}
		Ok(())
	}

	async fn write_attributes(&self, node: &Node, key: &str) -> Result<(), BackupError> {
		let body = serde_json::to_vec(&node.attributes).map_err(|e| BackupError::Transfer {
			key: key.to_string(),
			message: format!("cannot encode attributes: {}", e),
		})?;
		let metadata = match node.kind {
			NodeKind::Folder => {
				ObjectMetadata { filename: None, filepath: Some(node.path.clone()) }
			}
			NodeKind::Document => ObjectMetadata::default(),
		};
		self.store.put_object(key, &body, &metadata).await.map_err(|e| BackupError::Transfer {
			key: key.to_string(),
			message: e.to_string(),
		})
	}

	/// Delete every depot entry that no traversal handler confirmed,
	/// together with its attribute side-record.
	pub async fn delete_orphans(&self) -> Result<(), BackupError> {
		let remaining = self.ctx.depot.remaining();
		if remaining.is_empty() {
			return Ok(());
		}
		info!("removing {} orphaned backup entries", remaining.len());

		stream::iter(remaining.into_iter().map(Ok::<String, BackupError>))
			.try_for_each_concurrent(self.ctx.config.parallelism, |key| async move {
				self.store.delete_object(&key).await?;
				if let Some((_, id)) = key.split_once('/') {
					self.store.delete_object(&format!("{}{}", ATTRIBUTES_PREFIX, id)).await?;
				}
				debug!("{} not found at source; removed from backup", key);
				self.ctx.count_orphan();
				Ok(())
			})
			.await
	}
}

fn desired_metadata(node: &Node) -> ObjectMetadata {
	match node.kind {
		NodeKind::Folder => ObjectMetadata { filename: None, filepath: Some(node.path.clone()) },
		NodeKind::Document => ObjectMetadata {
			filename: Some(node.name.clone()),
			filepath: Some(node.path.clone()),
		},
	}
}

fn metadata_differs(entry: &DepotEntry, node: &Node) -> bool {
	match node.kind {
		NodeKind::Folder => entry.filepath.as_deref() != Some(node.path.as_str()),
		NodeKind::Document => {
			entry.filename.as_deref() != Some(node.name.as_str())
				|| entry.filepath.as_deref() != Some(node.path.as_str())
		}
	}
}

// vim: ts=4
