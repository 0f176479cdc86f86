//! Unified configuration for backup runs
//!
//! All knobs live in a single `Config` struct. The priority chain is:
//! 1. Built-in defaults (Config::default())
//! 2. Config file (~/.depotr/config.toml)
//! 3. CLI flags (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::BackupError;
use crate::types::Credentials;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	/// Home directory for state and the audit log (~/.depotr)
	pub state_dir: PathBuf,

	/// Log every skip/transfer/delete decision as it happens
	pub verbose: bool,

	/// Worker-pool size per queue (traversal, reconciliation, deletion)
	pub parallelism: usize,

	/// Re-transfer every node regardless of stored timestamps
	pub force: bool,

	/// Do not record the run in the audit log
	pub skip_audit: bool,

	/// Backup store identifier (bucket name or depot directory)
	pub bucket: String,

	/// Base URL of the source system API
	pub endpoint: String,

	/// Data-center selector forwarded during authentication
	pub data_center: Option<String>,

	/// API client id
	pub client_id: String,

	/// API client secret
	pub client_secret: String,

	/// Subtree excluded from the mirror, matched by exact name or path
	pub exclude: String,

	/// Extra glob patterns matched against node paths
	pub exclude_patterns: Vec<String>,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			state_dir: std::env::var("HOME")
				.ok()
				.map(|h| PathBuf::from(h).join(".depotr"))
				.unwrap_or_else(|| PathBuf::from(".depotr")),
			verbose: false,
			parallelism: 15,
			force: false,
			skip_audit: false,
			bucket: String::new(),
			endpoint: String::new(),
			data_center: None,
			client_id: String::new(),
			client_secret: String::new(),
			exclude: "/Trash/".to_string(),
			exclude_patterns: vec![],
		}
	}
}

impl Config {
	/// Load configuration from a TOML file
	pub fn load(path: &Path) -> Result<Config, BackupError> {
		let contents = std::fs::read_to_string(path).map_err(|e| BackupError::InvalidConfig {
			message: format!("cannot read {}: {}", path.display(), e),
		})?;
		toml::from_str(&contents).map_err(|e| BackupError::InvalidConfig {
			message: format!("cannot parse {}: {}", path.display(), e),
		})
	}

	/// Load the config file if it exists, otherwise start from defaults
	pub fn load_or_default(path: &Path) -> Result<Config, BackupError> {
		if path.exists() {
			Config::load(path)
		} else {
			Ok(Config::default())
		}
	}

	pub fn validate(&self) -> Result<(), BackupError> {
		if self.parallelism < 1 {
			return Err(BackupError::InvalidConfig {
				message: "parallelism must be at least 1".to_string(),
			});
		}
		if self.bucket.is_empty() {
			return Err(BackupError::InvalidConfig {
				message: "bucket (backup store identifier) is required".to_string(),
			});
		}
		Ok(())
	}

	pub fn credentials(&self) -> Credentials {
		Credentials {
			client_id: self.client_id.clone(),
			client_secret: self.client_secret.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_config_default() {
		let config = Config::default();
		assert_eq!(config.parallelism, 15);
		assert_eq!(config.exclude, "/Trash/");
		assert!(!config.force);
		assert!(!config.skip_audit);
	}

	#[test]
	fn test_validate_rejects_zero_parallelism() {
		let config = Config { parallelism: 0, bucket: "b".to_string(), ..Config::default() };
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_validate_requires_bucket() {
		let config = Config::default();
		assert!(config.validate().is_err());

		let config = Config { bucket: "depot".to_string(), ..Config::default() };
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_config_serialization() {
		let config = Config { bucket: "depot".to_string(), ..Config::default() };
		let json = serde_json::to_string(&config).expect("Failed to serialize");
		let deserialized: Config = serde_json::from_str(&json).expect("Failed to deserialize");
		assert_eq!(config.bucket, deserialized.bucket);
		assert_eq!(config.parallelism, deserialized.parallelism);
	}

	#[test]
	fn test_partial_file_fills_defaults() {
		let config: Config = toml::from_str("bucket = \"depot\"\nparallelism = 4\n")
			.expect("Failed to parse");
		assert_eq!(config.bucket, "depot");
		assert_eq!(config.parallelism, 4);
		assert_eq!(config.exclude, "/Trash/");
	}
}

// vim: ts=4
