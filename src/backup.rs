//! One backup pass from end to end
//!
//! Stage order: authenticate, verify or create the target container, index
//! the existing backup objects, walk the source tree while reconciling each
//! node as it is discovered, delete the orphans, report counts and record
//! the run. The first failure at any stage short-circuits the rest; there
//! are no automatic retries. Because nothing survives a run and the skip
//! test is timestamp-based, re-invoking the whole pass is the recovery
//! mechanism.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::audit::AuditLog;
use crate::config::Config;
use crate::context::{BackupSummary, RunContext};
use crate::depot::DepotIndex;
use crate::error::BackupError;
use crate::exclusion::Exclusion;
use crate::logging::{info, warn};
use crate::reconcile::Reconciler;
use crate::source::SourceSystem;
use crate::store::BackupStore;
use crate::traverse::Traversal;

pub async fn run(
	source: Arc<dyn SourceSystem>,
	store: Arc<dyn BackupStore>,
	audit: Arc<dyn AuditLog>,
	config: Config,
) -> Result<BackupSummary, BackupError> {
	config.validate()?;

	info!("authenticating with source system");
	let account = source
		.authenticate(&config.credentials())
		.await
		.map_err(|e| BackupError::Authentication { message: e.to_string() })?;

	ensure_container(store.as_ref(), &config.bucket).await?;

	info!("indexing existing backup objects");
	let depot = DepotIndex::build(store.as_ref()).await?;
	info!("{} objects currently backed up", depot.len());

	let root = source.root_folder().await.map_err(|e| BackupError::Enumeration {
		system: "source",
		message: e.to_string(),
	})?;

	let exclusion = Arc::new(Exclusion::new(&config.exclude, &config.exclude_patterns)?);
	let ctx = Arc::new(RunContext::new(config.clone(), depot));

	let traversal = Traversal::new(Arc::clone(&source), exclusion, config.parallelism);
	let reconciler = Reconciler::new(Arc::clone(&source), Arc::clone(&store), Arc::clone(&ctx));

	// The channel closes when the walk drains, which in turn ends the
	// reconcile pool; the orphan pass must not start before both are done.
	let (tx, rx) = mpsc::channel(config.parallelism.max(1) * 4);
	let (walk_result, reconcile_result) =
		tokio::join!(traversal.run(root, tx), reconciler.run(rx));
	match (walk_result, reconcile_result) {
		(Ok(()), Ok(())) => {}
		(Err(e), Ok(())) => return Err(e),
		(Ok(()), Err(e)) => return Err(e),
		// A dropped channel on one side is a symptom of the other side's
		// failure; prefer the root cause
		(Err(walk_err), Err(reconcile_err)) => {
			if matches!(walk_err, BackupError::Aborted) {
				return Err(reconcile_err);
			}
			return Err(walk_err);
		}
	}

	reconciler.delete_orphans().await?;

	let summary = ctx.summary();
	info!(
		"{} folders and {} documents transferred, {} metadata updates, {} skipped, {} orphans removed",
		summary.folders_transferred,
		summary.documents_transferred,
		summary.metadata_updates,
		summary.skipped,
		summary.orphans_removed,
	);

	if config.skip_audit {
		info!("audit record skipped by configuration");
	} else {
		audit.record_successful_run(&account, Utc::now()).await?;
	}

	Ok(summary)
}

async fn ensure_container(store: &dyn BackupStore, bucket: &str) -> Result<(), BackupError> {
	let exists = store.container_exists().await.map_err(|e| BackupError::Enumeration {
		system: "store",
		message: e.to_string(),
	})?;
	if exists {
		return Ok(());
	}
	warn!("container {} not found; creating it", bucket);
	store.create_container().await.map_err(|e| BackupError::Store(e))
}

// vim: ts=4
