//! Concurrency-bounded walk of the source tree
//!
//! A work queue seeded with the root folder feeds a pool of at most
//! `parallelism` in-flight folder visits. Each visit lists the folder's
//! children, filters the excluded subtree, queues the surviving folders and
//! emits the folder plus its documents (attributes attached) into the node
//! channel. The walk is complete when the queue is empty and nothing is in
//! flight. The first listing failure aborts the whole walk.

use futures::stream::{self, TryStreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::BackupError;
use crate::exclusion::Exclusion;
use crate::logging::debug;
use crate::source::SourceSystem;
use crate::types::Node;

pub struct Traversal {
	source: Arc<dyn SourceSystem>,
	exclusion: Arc<Exclusion>,
	parallelism: usize,
}

impl Traversal {
	pub fn new(
		source: Arc<dyn SourceSystem>,
		exclusion: Arc<Exclusion>,
		parallelism: usize,
	) -> Self {
		Traversal { source, exclusion, parallelism: parallelism.max(1) }
	}

	/// Walk the tree from `root`, sending every surviving node into `tx`.
	///
	/// Visitation order is a scheduling artifact; callers must not rely
	/// on it.
	pub async fn run(&self, root: Node, tx: mpsc::Sender<Node>) -> Result<(), BackupError> {
		let mut queue: VecDeque<Node> = VecDeque::new();
		queue.push_back(root);

		let mut inflight: JoinSet<Result<Vec<Node>, BackupError>> = JoinSet::new();

		loop {
			while inflight.len() < self.parallelism {
				let Some(folder) = queue.pop_front() else { break };
				debug!("visiting {}", folder.path);
				inflight.spawn(visit_folder(
					Arc::clone(&self.source),
					Arc::clone(&self.exclusion),
					folder,
					tx.clone(),
					self.parallelism,
				));
			}

			match inflight.join_next().await {
				Some(joined) => {
					let children = joined.map_err(|e| BackupError::Enumeration {
						system: "source",
						message: format!("traversal worker failed: {}", e),
					})??;
					queue.extend(children);
				}
				// Queue empty and nothing in flight: the walk has drained
				None => break,
			}
		}

		Ok(())
	}
}

async fn visit_folder(
	source: Arc<dyn SourceSystem>,
	exclusion: Arc<Exclusion>,
	mut folder: Node,
	tx: mpsc::Sender<Node>,
	limit: usize,
) -> Result<Vec<Node>, BackupError> {
	folder.attributes = source.attributes(&folder).await?;

	let children = source.child_folders(&folder).await.map_err(|e| BackupError::Enumeration {
		system: "source",
		message: e.to_string(),
	})?;
	let children: Vec<Node> = children
		.into_iter()
		.filter(|child| !exclusion.excludes(&child.name, &child.path))
		.collect();

	let documents = source.documents(&folder).await.map_err(|e| BackupError::Enumeration {
		system: "source",
		message: e.to_string(),
	})?;
	let documents: Vec<Node> = documents
		.into_iter()
		.filter(|doc| !exclusion.excludes(&doc.name, &doc.path))
		.collect();

	tx.send(folder).await.map_err(|_| BackupError::Aborted)?;

	stream::iter(documents.into_iter().map(Ok::<Node, BackupError>))
		.try_for_each_concurrent(limit, |mut document| {
			let source = Arc::clone(&source);
			let tx = tx.clone();
			async move {
				document.attributes = source.attributes(&document).await?;
				tx.send(document).await.map_err(|_| BackupError::Aborted)?;
				Ok(())
			}
		})
		.await?;

	Ok(children)
}

// vim: ts=4
