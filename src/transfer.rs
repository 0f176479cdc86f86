//! Content transfer into the backup store
//!
//! Documents are buffered in full before the store write; a single put
//! carries anything below the multipart threshold, everything else goes
//! through a create/upload-parts/complete session.

use futures::future;

use crate::error::BackupError;
use crate::logging::debug;
use crate::source::SourceSystem;
use crate::store::{BackupStore, CompletedPart, ObjectMetadata};
use crate::types::Node;

/// Part size and single-put cutoff (10 MiB)
pub const PART_SIZE: usize = 10 * 1024 * 1024;

/// Download a document's content into an in-memory buffer
pub async fn download(
	source: &dyn SourceSystem,
	document: &Node,
) -> Result<Vec<u8>, BackupError> {
	let mut buffer: Vec<u8> = Vec::new();
	source.download(document, &mut buffer).await.map_err(|e| BackupError::Transfer {
		key: document.content_key(),
		message: e.to_string(),
	})?;
	Ok(buffer)
}

/// Persist a buffer under `key` with its metadata pair
pub async fn store_object(
	store: &dyn BackupStore,
	key: &str,
	body: Vec<u8>,
	metadata: &ObjectMetadata,
) -> Result<(), BackupError> {
	if body.len() < PART_SIZE {
		return store.put_object(key, &body, metadata).await.map_err(|e| {
			BackupError::Transfer { key: key.to_string(), message: e.to_string() }
		});
	}
	multipart(store, key, &body, metadata).await
}

async fn multipart(
	store: &dyn BackupStore,
	key: &str,
	body: &[u8],
	metadata: &ObjectMetadata,
) -> Result<(), BackupError> {
	debug!("creating multipart upload for {}", key);
	let upload_id = store.create_multipart(key, metadata).await.map_err(|e| {
		BackupError::MultipartIntegrity { key: key.to_string(), message: e.to_string() }
	})?;

	let uploads = body.chunks(PART_SIZE).enumerate().map(|(index, chunk)| {
		let part_number = index as u32 + 1;
		let upload_id = upload_id.clone();
		async move {
			let tag = store.upload_part(key, &upload_id, part_number, chunk).await?;
			Ok::<CompletedPart, crate::error::StoreError>(CompletedPart { part_number, tag })
		}
	});

	let parts = match future::try_join_all(uploads).await {
		Ok(parts) => parts,
		Err(e) => {
			// One failed chunk invalidates the whole session
			let _ = store.abort_multipart(key, &upload_id).await;
			return Err(BackupError::MultipartIntegrity {
				key: key.to_string(),
				message: e.to_string(),
			});
		}
	};

	if let Err(e) = store.complete_multipart(key, &upload_id, &parts).await {
		let _ = store.abort_multipart(key, &upload_id).await;
		return Err(BackupError::MultipartIntegrity {
			key: key.to_string(),
			message: e.to_string(),
		});
	}

	debug!("completed multipart upload for {} ({} parts)", key, parts.len());
	Ok(())
}

// vim: ts=4
