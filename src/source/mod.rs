//! Source-system interface and implementations
//!
//! The engine only depends on the [`SourceSystem`] trait; the concrete REST
//! client and the in-memory test double live in submodules.

mod memory;
mod rest;

pub use memory::MemorySource;
pub use rest::RestSource;

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::error::SourceError;
use crate::types::{AccountIdentity, Credentials, Node};

/// Result type for source-system operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Caller-supplied sink that document content is streamed into
pub type ContentSink = dyn AsyncWrite + Send + Unpin;

/// Capabilities the engine needs from the hierarchical document repository.
///
/// Listing order of children is whatever the source reports; callers must
/// not rely on any particular visitation order.
#[async_trait]
pub trait SourceSystem: Send + Sync {
	/// Exchange credentials for a session and report the account identity
	async fn authenticate(&self, credentials: &Credentials) -> SourceResult<AccountIdentity>;

	/// The root folder of the account
	async fn root_folder(&self) -> SourceResult<Node>;

	/// Immediate child folders of a folder
	async fn child_folders(&self, folder: &Node) -> SourceResult<Vec<Node>>;

	/// Documents directly inside a folder
	async fn documents(&self, folder: &Node) -> SourceResult<Vec<Node>>;

	/// Free-form attribute payload of a folder or document
	async fn attributes(&self, node: &Node) -> SourceResult<serde_json::Value>;

	/// Stream a document's content into the sink
	async fn download(&self, document: &Node, sink: &mut ContentSink) -> SourceResult<()>;
}

// vim: ts=4
