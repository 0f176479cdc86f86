//! # Depotr - Incremental Document Repository Mirror
//!
//! Depotr mirrors a hierarchical document repository (folders and documents
//! behind a remote API) into a flat, key-addressed backup store. Repeated
//! runs transfer only what changed at the source and remove what
//! disappeared; a run against an unchanged tree performs no transfers.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use depotr::audit::NoopAudit;
//! use depotr::config::Config;
//! use depotr::source::RestSource;
//! use depotr::store::LocalStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config { bucket: "/srv/depot".into(), ..Config::default() };
//!     let source = Arc::new(RestSource::new("https://api.example.com/v2", None));
//!     let store = Arc::new(LocalStore::new(&config.bucket));
//!     let summary = depotr::backup::run(source, store, Arc::new(NoopAudit), config).await?;
//!     println!("{} documents transferred", summary.documents_transferred);
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod backup;
pub mod config;
pub mod context;
pub mod depot;
pub mod error;
pub mod exclusion;
pub mod logging;
pub mod reconcile;
pub mod source;
pub mod store;
pub mod transfer;
pub mod traverse;
pub mod types;

// Re-export commonly used types and functions
pub use config::Config;
pub use context::BackupSummary;
pub use error::{AuditError, BackupError, SourceError, StoreError};
pub use types::{AccountIdentity, Credentials, Node, NodeKind};

// vim: ts=4
