//! Error types for backup operations

use std::error::Error;
use std::fmt;
use std::io;

/// Main error type for a backup run
#[derive(Debug)]
pub enum BackupError {
	/// Source system rejected the credentials or the endpoint is wrong
	Authentication { message: String },

	/// A listing call failed on either system
	Enumeration { system: &'static str, message: String },

	/// Download or store write failed for one node
	Transfer { key: String, message: String },

	/// A chunk upload or the completion call of a multipart session failed
	MultipartIntegrity { key: String, message: String },

	/// Target container is absent
	StoreNotFound { container: String },

	/// Invalid configuration
	InvalidConfig { message: String },

	/// Run cancelled because another task already failed
	Aborted,

	/// Source system error (nested)
	Source(SourceError),

	/// Backup store error (nested)
	Store(StoreError),

	/// Audit log error (nested)
	Audit(AuditError),

	/// I/O error
	Io(io::Error),
}

impl fmt::Display for BackupError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			BackupError::Authentication { message } => {
				write!(f, "Authentication failed: {}", message)
			}
			BackupError::Enumeration { system, message } => {
				write!(f, "Enumeration failed on {}: {}", system, message)
			}
			BackupError::Transfer { key, message } => {
				write!(f, "Transfer failed for {}: {}", key, message)
			}
			BackupError::MultipartIntegrity { key, message } => {
				write!(f, "Multipart upload failed for {}: {}", key, message)
			}
			BackupError::StoreNotFound { container } => {
				write!(f, "No such container: {}", container)
			}
			BackupError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			BackupError::Aborted => write!(f, "Run aborted"),
			BackupError::Source(e) => write!(f, "Source system error: {}", e),
			BackupError::Store(e) => write!(f, "Store error: {}", e),
			BackupError::Audit(e) => write!(f, "Audit log error: {}", e),
			BackupError::Io(e) => write!(f, "I/O error: {}", e),
		}
	}
}

impl Error for BackupError {}

impl From<io::Error> for BackupError {
	fn from(e: io::Error) -> Self {
		BackupError::Io(e)
	}
}

impl From<SourceError> for BackupError {
	fn from(e: SourceError) -> Self {
		BackupError::Source(e)
	}
}

impl From<StoreError> for BackupError {
	fn from(e: StoreError) -> Self {
		match e {
			StoreError::ContainerNotFound { container } => {
				BackupError::StoreNotFound { container }
			}
			e => BackupError::Store(e),
		}
	}
}

impl From<AuditError> for BackupError {
	fn from(e: AuditError) -> Self {
		BackupError::Audit(e)
	}
}

/// Source-system specific errors
#[derive(Debug)]
pub enum SourceError {
	/// Login rejected or no token available
	Authentication { message: String },

	/// Folder or document listing failed
	Listing { what: String, message: String },

	/// Attribute fetch failed for a node
	Attributes { id: String, message: String },

	/// Content download failed for a document
	Download { id: String, message: String },

	/// Transport-level error (invalid URL, connection refused, bad payload)
	Http { message: String },
}

impl fmt::Display for SourceError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SourceError::Authentication { message } => {
				write!(f, "Login failed: {}", message)
			}
			SourceError::Listing { what, message } => {
				write!(f, "Failed to list {}: {}", what, message)
			}
			SourceError::Attributes { id, message } => {
				write!(f, "Failed to fetch attributes of {}: {}", id, message)
			}
			SourceError::Download { id, message } => {
				write!(f, "Failed to download {}: {}", id, message)
			}
			SourceError::Http { message } => write!(f, "HTTP error: {}", message),
		}
	}
}

impl Error for SourceError {}

/// Backup-store specific errors
#[derive(Debug)]
pub enum StoreError {
	/// Target container does not exist
	ContainerNotFound { container: String },

	/// Listing a key prefix failed
	Listing { prefix: String, message: String },

	/// Writing an object failed
	Write { key: String, message: String },

	/// Reading an object failed
	Read { key: String, message: String },

	/// Deleting an object failed
	Delete { key: String, message: String },

	/// Multipart session error (create, part upload, complete or abort)
	Multipart { key: String, message: String },

	/// I/O error from a filesystem-backed store
	Io(io::Error),
}

impl fmt::Display for StoreError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StoreError::ContainerNotFound { container } => {
				write!(f, "Container not found: {}", container)
			}
			StoreError::Listing { prefix, message } => {
				write!(f, "Failed to list '{}': {}", prefix, message)
			}
			StoreError::Write { key, message } => {
				write!(f, "Failed to write {}: {}", key, message)
			}
			StoreError::Read { key, message } => {
				write!(f, "Failed to read {}: {}", key, message)
			}
			StoreError::Delete { key, message } => {
				write!(f, "Failed to delete {}: {}", key, message)
			}
			StoreError::Multipart { key, message } => {
				write!(f, "Multipart error on {}: {}", key, message)
			}
			StoreError::Io(e) => write!(f, "I/O error: {}", e),
		}
	}
}

impl Error for StoreError {}

impl From<io::Error> for StoreError {
	fn from(e: io::Error) -> Self {
		StoreError::Io(e)
	}
}

/// Audit logging errors
#[derive(Debug)]
pub enum AuditError {
	/// Appending the run record failed
	Write { message: String },
}

impl fmt::Display for AuditError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AuditError::Write { message } => {
				write!(f, "Failed to record run: {}", message)
			}
		}
	}
}

impl Error for AuditError {}

// vim: ts=4
