use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use depotr::audit::NoopAudit;
use depotr::backup;
use depotr::config::Config;
use depotr::context::BackupSummary;
use depotr::error::BackupError;
use depotr::source::{MemorySource, SourceSystem};
use depotr::store::{BackupStore, MemoryStore, ObjectMetadata};

fn ts(secs: i64) -> DateTime<Utc> {
	Utc.timestamp_opt(secs, 0).unwrap()
}

fn test_config() -> Config {
	Config {
		bucket: "test-depot".to_string(),
		parallelism: 4,
		skip_audit: true,
		..Config::default()
	}
}

async fn run(source: &Arc<MemorySource>, store: &Arc<MemoryStore>) -> BackupSummary {
	run_with(source, store, test_config()).await.expect("backup run failed")
}

async fn run_with(
	source: &Arc<MemorySource>,
	store: &Arc<MemoryStore>,
	config: Config,
) -> Result<BackupSummary, BackupError> {
	backup::run(
		Arc::clone(source) as Arc<dyn SourceSystem>,
		Arc::clone(store) as Arc<dyn BackupStore>,
		Arc::new(NoopAudit),
		config,
	)
	.await
}

#[tokio::test]
async fn test_first_run_transfers_everything() {
	let source = Arc::new(MemorySource::new());
	let store = Arc::new(MemoryStore::new());

	let legal = source.add_folder(&source.root_id(), "Legal", ts(100));
	let doc = source.add_document(&legal, "report.pdf", ts(200), b"contract text");

	let summary = run(&source, &store).await;

	assert_eq!(summary.folders_transferred, 2); // root and Legal
	assert_eq!(summary.documents_transferred, 1);
	assert_eq!(summary.orphans_removed, 0);

	assert!(store.contains(&format!("folder/{}", source.root_id())));
	assert!(store.contains(&format!("folder/{}", legal)));
	assert!(store.contains(&format!("document/{}", doc)));
	assert!(store.contains(&format!("attributes/{}", doc)));
	assert!(store.contains(&format!("attributes/{}", legal)));

	let (body, metadata) = store.object(&format!("document/{}", doc)).unwrap();
	assert_eq!(body, b"contract text");
	assert_eq!(metadata.filename.as_deref(), Some("report.pdf"));
	assert_eq!(metadata.filepath.as_deref(), Some("/Legal/report.pdf"));

	let (_, folder_meta) = store.object(&format!("folder/{}", legal)).unwrap();
	assert_eq!(folder_meta.filename, None);
	assert_eq!(folder_meta.filepath.as_deref(), Some("/Legal/"));
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
	let source = Arc::new(MemorySource::new());
	let store = Arc::new(MemoryStore::new());

	let legal = source.add_folder(&source.root_id(), "Legal", ts(100));
	source.add_document(&legal, "report.pdf", ts(200), b"contract text");

	run(&source, &store).await;
	store.clear_ops();

	let summary = run(&source, &store).await;

	assert_eq!(summary.folders_transferred, 0);
	assert_eq!(summary.documents_transferred, 0);
	assert_eq!(summary.metadata_updates, 0);
	assert_eq!(summary.orphans_removed, 0);
	assert_eq!(summary.skipped, 3);

	assert_eq!(store.op_count("PUT "), 0);
	assert_eq!(store.op_count("COPY "), 0);
	assert_eq!(store.op_count("DELETE "), 0);
}

#[tokio::test]
async fn test_stale_document_is_retransferred() {
	let source = Arc::new(MemorySource::new());
	let store = Arc::new(MemoryStore::new());

	let legal = source.add_folder(&source.root_id(), "Legal", ts(100));
	let doc = source.add_document(&legal, "report.pdf", ts(2000), b"v2");
	let key = format!("document/{}", doc);

	run(&source, &store).await;

	// Pretend the stored copy predates the source update
	store.set_last_modified(&key, ts(1000));
	store.clear_ops();

	let summary = run(&source, &store).await;

	assert_eq!(summary.documents_transferred, 1);
	assert_eq!(summary.metadata_updates, 0);
	assert_eq!(store.op_count(&format!("PUT {}", key)), 1);
	assert_eq!(source.download_count(&doc), 2);
}

#[tokio::test]
async fn test_equal_timestamps_retransfer() {
	let source = Arc::new(MemorySource::new());
	let store = Arc::new(MemoryStore::new());

	let legal = source.add_folder(&source.root_id(), "Legal", ts(100));
	let doc = source.add_document(&legal, "report.pdf", ts(2000), b"v1");
	let key = format!("document/{}", doc);

	run(&source, &store).await;
	store.set_last_modified(&key, ts(2000));
	store.clear_ops();

	let summary = run(&source, &store).await;

	assert_eq!(summary.documents_transferred, 1);
	assert_eq!(store.op_count(&format!("PUT {}", key)), 1);
}

#[tokio::test]
async fn test_force_overwrite_ignores_timestamps() {
	let source = Arc::new(MemorySource::new());
	let store = Arc::new(MemoryStore::new());

	let legal = source.add_folder(&source.root_id(), "Legal", ts(100));
	source.add_document(&legal, "report.pdf", ts(200), b"v1");

	run(&source, &store).await;
	store.clear_ops();

	let config = Config { force: true, ..test_config() };
	let summary = run_with(&source, &store, config).await.unwrap();

	assert_eq!(summary.folders_transferred, 2);
	assert_eq!(summary.documents_transferred, 1);
	assert_eq!(summary.skipped, 0);
}

#[tokio::test]
async fn test_renamed_document_gets_metadata_only_update() {
	let source = Arc::new(MemorySource::new());
	let store = Arc::new(MemoryStore::new());

	let legal = source.add_folder(&source.root_id(), "Legal", ts(100));
	let doc = source.add_document(&legal, "report.pdf", ts(200), b"contract text");
	let key = format!("document/{}", doc);

	run(&source, &store).await;
	assert_eq!(source.download_count(&doc), 1);

	source.rename_document(&doc, "contract.pdf");
	store.clear_ops();

	let summary = run(&source, &store).await;

	// Exactly one copy-in-place, no content traffic
	assert_eq!(summary.metadata_updates, 1);
	assert_eq!(summary.documents_transferred, 0);
	assert_eq!(store.op_count(&format!("COPY {}", key)), 1);
	assert_eq!(store.op_count("PUT "), 0);
	assert_eq!(source.download_count(&doc), 1);

	let (body, metadata) = store.object(&key).unwrap();
	assert_eq!(body, b"contract text");
	assert_eq!(metadata.filename.as_deref(), Some("contract.pdf"));
	assert_eq!(metadata.filepath.as_deref(), Some("/Legal/contract.pdf"));
}

#[tokio::test]
async fn test_moved_folder_gets_metadata_only_update() {
	let source = Arc::new(MemorySource::new());
	let store = Arc::new(MemoryStore::new());

	let legal = source.add_folder(&source.root_id(), "Legal", ts(100));
	let key = format!("folder/{}", legal);

	run(&source, &store).await;

	source.set_path(&legal, "/Archive/Legal/");
	store.clear_ops();

	let summary = run(&source, &store).await;

	assert_eq!(summary.metadata_updates, 1);
	assert_eq!(store.op_count(&format!("COPY {}", key)), 1);

	let (_, metadata) = store.object(&key).unwrap();
	assert_eq!(metadata.filepath.as_deref(), Some("/Archive/Legal/"));
}

#[tokio::test]
async fn test_orphan_cleanup_deletes_exactly_once() {
	let source = Arc::new(MemorySource::new());
	let store = Arc::new(MemoryStore::new());

	let legal = source.add_folder(&source.root_id(), "Legal", ts(100));
	let doc = source.add_document(&legal, "report.pdf", ts(200), b"contract text");
	let key = format!("document/{}", doc);

	run(&source, &store).await;

	source.remove_document(&doc);
	store.clear_ops();

	let summary = run(&source, &store).await;

	assert_eq!(summary.orphans_removed, 1);
	assert_eq!(store.op_count(&format!("DELETE {}", key)), 1);
	assert_eq!(store.op_count(&format!("DELETE attributes/{}", doc)), 1);
	assert!(!store.contains(&key));
	assert!(!store.contains(&format!("attributes/{}", doc)));

	// Still-reachable keys are never deleted
	assert_eq!(store.op_count(&format!("DELETE folder/{}", legal)), 0);
	assert!(store.contains(&format!("folder/{}", legal)));
}

#[tokio::test]
async fn test_scenario_single_stale_document() {
	// Source holds one document updated at T2; the depot has it at T1 < T2.
	// The engine issues one content transfer, no metadata updates and no
	// deletions.
	let source = Arc::new(MemorySource::new());
	let store = Arc::new(MemoryStore::new());

	let doc = source.add_document(&source.root_id(), "x.bin", ts(2000), b"new bytes");
	let key = format!("document/{}", doc);

	let metadata = ObjectMetadata {
		filename: Some("x.bin".to_string()),
		filepath: Some("/x.bin".to_string()),
	};
	store.put_object(&key, b"old bytes", &metadata).await.unwrap();
	store.set_last_modified(&key, ts(1000));
	store.clear_ops();

	let summary = run(&source, &store).await;

	assert_eq!(summary.documents_transferred, 1);
	assert_eq!(summary.metadata_updates, 0);
	assert_eq!(summary.orphans_removed, 0);
	assert_eq!(store.op_count("DELETE "), 0);
	assert_eq!(store.object(&key).unwrap().0, b"new bytes");
}

#[tokio::test]
async fn test_scenario_unmatched_depot_entry_is_deleted() {
	// The depot holds document/Y with no matching source document anywhere;
	// exactly one delete is issued for it after the walk.
	let source = Arc::new(MemorySource::new());
	let store = Arc::new(MemoryStore::new());

	store
		.put_object("document/Y", b"stale", &ObjectMetadata::default())
		.await
		.unwrap();
	store.clear_ops();

	let summary = run(&source, &store).await;

	assert_eq!(summary.orphans_removed, 1);
	assert_eq!(store.op_count("DELETE document/Y"), 1);
	assert!(!store.contains("document/Y"));
}

#[tokio::test]
async fn test_excluded_subtree_never_appears() {
	let source = Arc::new(MemorySource::new());
	let store = Arc::new(MemoryStore::new());

	let legal = source.add_folder(&source.root_id(), "Legal", ts(100));
	source.add_document(&legal, "keep.pdf", ts(200), b"keep");

	let trash = source.add_folder(&source.root_id(), "Trash", ts(100));
	let junk = source.add_document(&trash, "junk.pdf", ts(200), b"junk");
	let nested = source.add_folder(&trash, "Old", ts(100));
	let nested_junk = source.add_document(&nested, "old.pdf", ts(200), b"old");

	let summary = run(&source, &store).await;

	assert_eq!(summary.folders_transferred, 2);
	assert_eq!(summary.documents_transferred, 1);

	for id in [&trash, &junk, &nested, &nested_junk] {
		assert!(!store.contains(&format!("folder/{}", id)));
		assert!(!store.contains(&format!("document/{}", id)));
		assert!(!store.contains(&format!("attributes/{}", id)));
		for op in store.ops() {
			assert!(!op.contains(id.as_str()), "excluded node {} appeared in op {}", id, op);
		}
	}
	assert_eq!(source.download_count(&junk), 0);
	assert_eq!(source.download_count(&nested_junk), 0);
}

#[tokio::test]
async fn test_exclusion_by_folder_name() {
	let source = Arc::new(MemorySource::new());
	let store = Arc::new(MemoryStore::new());

	let projects = source.add_folder(&source.root_id(), "Projects", ts(100));
	let scratch = source.add_folder(&projects, "Scratch", ts(100));
	source.add_document(&scratch, "tmp.bin", ts(200), b"tmp");

	let config = Config { exclude: "Scratch".to_string(), ..test_config() };
	let summary = run_with(&source, &store, config).await.unwrap();

	assert_eq!(summary.folders_transferred, 2); // root and Projects
	assert_eq!(summary.documents_transferred, 0);
	assert!(!store.contains(&format!("folder/{}", scratch)));
}

#[tokio::test]
async fn test_missing_container_is_created() {
	let source = Arc::new(MemorySource::new());
	let store = Arc::new(MemoryStore::without_container());

	source.add_document(&source.root_id(), "a.txt", ts(100), b"a");

	let summary = run(&source, &store).await;

	assert_eq!(summary.documents_transferred, 1);
	assert_eq!(store.op_count("CREATE-CONTAINER"), 1);
}

#[tokio::test]
async fn test_attribute_payload_is_stored_as_json() {
	let source = Arc::new(MemorySource::new());
	let store = Arc::new(MemoryStore::new());

	let doc = source.add_document(&source.root_id(), "a.txt", ts(100), b"a");
	source.set_attributes(&doc, serde_json::json!({"owner": "legal", "tags": ["q3"]}));

	run(&source, &store).await;

	let (body, _) = store.object(&format!("attributes/{}", doc)).unwrap();
	let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
	assert_eq!(value["owner"], "legal");
	assert_eq!(value["tags"][0], "q3");
}

#[tokio::test]
async fn test_authentication_failure_aborts_run() {
	let source = Arc::new(MemorySource::new());
	let store = Arc::new(MemoryStore::new());
	source.reject_credentials();

	let result = run_with(&source, &store, test_config()).await;

	assert!(matches!(result, Err(BackupError::Authentication { .. })));
	assert_eq!(store.op_count("LIST "), 0);
}

#[tokio::test]
async fn test_transfer_failure_aborts_run() {
	let source = Arc::new(MemorySource::new());
	let store = Arc::new(MemoryStore::new());

	let doc = source.add_document(&source.root_id(), "a.txt", ts(100), b"a");
	store.fail_put(&format!("document/{}", doc));

	let result = run_with(&source, &store, test_config()).await;

	assert!(matches!(result, Err(BackupError::Transfer { .. })));
}

// vim: ts=4
