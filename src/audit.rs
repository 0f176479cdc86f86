//! Usage-reporting hook invoked after a successful run

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

use crate::error::AuditError;
use crate::types::AccountIdentity;

#[async_trait]
pub trait AuditLog: Send + Sync {
	/// Record one successful run. Called at most once per run; a
	/// configuration toggle can skip it entirely.
	async fn record_successful_run(
		&self,
		account: &AccountIdentity,
		timestamp: DateTime<Utc>,
	) -> Result<(), AuditError>;
}

/// Audit sink that records nothing
pub struct NoopAudit;

#[async_trait]
impl AuditLog for NoopAudit {
	async fn record_successful_run(
		&self,
		_account: &AccountIdentity,
		_timestamp: DateTime<Utc>,
	) -> Result<(), AuditError> {
		Ok(())
	}
}

/// Appends one JSON line per run to a log file
pub struct FileAudit {
	path: PathBuf,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunRecord<'a> {
	account_id: &'a str,
	account_name: Option<&'a str>,
	timestamp: DateTime<Utc>,
	outcome: &'static str,
}

impl FileAudit {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		FileAudit { path: path.into() }
	}
}

#[async_trait]
impl AuditLog for FileAudit {
	async fn record_successful_run(
		&self,
		account: &AccountIdentity,
		timestamp: DateTime<Utc>,
	) -> Result<(), AuditError> {
		let record = RunRecord {
			account_id: &account.account_id,
			account_name: account.account_name.as_deref(),
			timestamp,
			outcome: "success",
		};
		let mut line = serde_json::to_string(&record)
			.map_err(|e| AuditError::Write { message: e.to_string() })?;
		line.push('\n');

		let mut file = tokio::fs::OpenOptions::new()
			.create(true)
			.append(true)
			.open(&self.path)
			.await
			.map_err(|e| AuditError::Write {
				message: format!("cannot open {}: {}", self.path.display(), e),
			})?;
		file.write_all(line.as_bytes())
			.await
			.map_err(|e| AuditError::Write { message: e.to_string() })?;
		file.flush().await.map_err(|e| AuditError::Write { message: e.to_string() })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_file_audit_appends_one_line_per_run() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("audit.log");
		let audit = FileAudit::new(&path);
		let account = AccountIdentity {
			account_id: "acct-1".to_string(),
			account_name: Some("Test".to_string()),
		};

		audit.record_successful_run(&account, Utc::now()).await.unwrap();
		audit.record_successful_run(&account, Utc::now()).await.unwrap();

		let contents = std::fs::read_to_string(&path).unwrap();
		let lines: Vec<&str> = contents.lines().collect();
		assert_eq!(lines.len(), 2);
		assert!(lines[0].contains("\"accountId\":\"acct-1\""));
		assert!(lines[0].contains("\"outcome\":\"success\""));
	}
}

// vim: ts=4
