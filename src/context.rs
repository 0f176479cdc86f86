//! Per-run shared state
//!
//! One `RunContext` is created per backup pass and handed to every task as
//! an `Arc`; nothing in it survives the run.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::Config;
use crate::depot::DepotIndex;

pub struct RunContext {
	pub config: Config,
	pub depot: DepotIndex,
	documents_transferred: AtomicU64,
	folders_transferred: AtomicU64,
	metadata_updates: AtomicU64,
	skipped: AtomicU64,
	orphans_removed: AtomicU64,
}

impl RunContext {
	pub fn new(config: Config, depot: DepotIndex) -> Self {
		RunContext {
			config,
			depot,
			documents_transferred: AtomicU64::new(0),
			folders_transferred: AtomicU64::new(0),
			metadata_updates: AtomicU64::new(0),
			skipped: AtomicU64::new(0),
			orphans_removed: AtomicU64::new(0),
		}
	}

	pub fn count_document(&self) {
		self.documents_transferred.fetch_add(1, Ordering::Relaxed);
	}

	pub fn count_folder(&self) {
		self.folders_transferred.fetch_add(1, Ordering::Relaxed);
	}

	pub fn count_metadata_update(&self) {
		self.metadata_updates.fetch_add(1, Ordering::Relaxed);
	}

	pub fn count_skip(&self) {
		self.skipped.fetch_add(1, Ordering::Relaxed);
	}

	pub fn count_orphan(&self) {
		self.orphans_removed.fetch_add(1, Ordering::Relaxed);
	}

	pub fn summary(&self) -> BackupSummary {
		BackupSummary {
			folders_transferred: self.folders_transferred.load(Ordering::Relaxed),
			documents_transferred: self.documents_transferred.load(Ordering::Relaxed),
			metadata_updates: self.metadata_updates.load(Ordering::Relaxed),
			skipped: self.skipped.load(Ordering::Relaxed),
			orphans_removed: self.orphans_removed.load(Ordering::Relaxed),
		}
	}
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSummary {
	pub folders_transferred: u64,
	pub documents_transferred: u64,
	pub metadata_updates: u64,
	pub skipped: u64,
	pub orphans_removed: u64,
}

// vim: ts=4
