use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

use depotr::error::BackupError;
use depotr::exclusion::Exclusion;
use depotr::source::{MemorySource, SourceSystem};
use depotr::traverse::Traversal;
use depotr::types::{Node, NodeKind};

fn ts(secs: i64) -> DateTime<Utc> {
	Utc.timestamp_opt(secs, 0).unwrap()
}

async fn walk(
	source: &Arc<MemorySource>,
	exclude: &str,
	parallelism: usize,
) -> Result<Vec<Node>, BackupError> {
	let exclusion = Arc::new(Exclusion::new(exclude, &[]).unwrap());
	let traversal =
		Traversal::new(Arc::clone(source) as Arc<dyn SourceSystem>, exclusion, parallelism);
	let root = source.root_folder().await.unwrap();

	let (tx, mut rx) = mpsc::channel(64);
	let collector = tokio::spawn(async move {
		let mut nodes = Vec::new();
		while let Some(node) = rx.recv().await {
			nodes.push(node);
		}
		nodes
	});

	traversal.run(root, tx).await?;
	Ok(collector.await.unwrap())
}

#[tokio::test]
async fn test_walk_yields_every_node_exactly_once() {
	let source = Arc::new(MemorySource::new());
	let mut expected = HashSet::new();
	expected.insert(source.root_id());

	for i in 0..3 {
		let level1 = source.add_folder(&source.root_id(), &format!("a{}", i), ts(100));
		expected.insert(level1.clone());
		for j in 0..3 {
			let level2 = source.add_folder(&level1, &format!("b{}", j), ts(100));
			expected.insert(level2.clone());
			let doc = source.add_document(&level2, "doc.txt", ts(200), b"x");
			expected.insert(doc);
		}
	}

	let nodes = walk(&source, "/Trash/", 4).await.unwrap();

	let ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
	let unique: HashSet<String> = ids.iter().cloned().collect();
	assert_eq!(ids.len(), unique.len(), "a node was emitted twice");
	assert_eq!(unique, expected);
}

#[tokio::test]
async fn test_excluded_subtree_is_never_visited() {
	let source = Arc::new(MemorySource::new());

	let keep = source.add_folder(&source.root_id(), "Keep", ts(100));
	source.add_document(&keep, "keep.txt", ts(200), b"x");

	let trash = source.add_folder(&source.root_id(), "Trash", ts(100));
	let nested = source.add_folder(&trash, "Nested", ts(100));
	let junk = source.add_document(&nested, "junk.txt", ts(200), b"x");

	let nodes = walk(&source, "/Trash/", 4).await.unwrap();

	let ids: HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();
	assert!(ids.contains(&keep));
	assert!(!ids.contains(&trash));
	assert!(!ids.contains(&nested));
	assert!(!ids.contains(&junk));
}

#[tokio::test]
async fn test_listing_concurrency_is_bounded() {
	let source = Arc::new(MemorySource::new());
	for i in 0..20 {
		let folder = source.add_folder(&source.root_id(), &format!("f{}", i), ts(100));
		source.add_document(&folder, "doc.txt", ts(200), b"x");
	}

	walk(&source, "/Trash/", 3).await.unwrap();

	assert!(
		source.max_in_flight() <= 3,
		"observed {} concurrent listing calls",
		source.max_in_flight()
	);
}

#[tokio::test]
async fn test_document_attributes_are_attached() {
	let source = Arc::new(MemorySource::new());
	let doc = source.add_document(&source.root_id(), "doc.txt", ts(200), b"x");
	source.set_attributes(&doc, serde_json::json!({"color": "green"}));

	let nodes = walk(&source, "/Trash/", 2).await.unwrap();

	let node = nodes.iter().find(|n| n.id == doc).unwrap();
	assert_eq!(node.kind, NodeKind::Document);
	assert_eq!(node.attributes["color"], "green");
}

#[tokio::test]
async fn test_listing_failure_aborts_the_walk() {
	let source = Arc::new(MemorySource::new());
	let folder = source.add_folder(&source.root_id(), "Flaky", ts(100));
	source.fail_listing_for(&folder);

	let result = walk(&source, "/Trash/", 4).await;

	assert!(matches!(result, Err(BackupError::Enumeration { system: "source", .. })));
}

// vim: ts=4
