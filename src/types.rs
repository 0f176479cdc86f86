use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key prefix for folder presence markers
pub const FOLDER_PREFIX: &str = "folder/";

/// Key prefix for document content
pub const DOCUMENT_PREFIX: &str = "document/";

/// Key prefix for attribute side-records
pub const ATTRIBUTES_PREFIX: &str = "attributes/";

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
	Folder,
	Document,
}

impl NodeKind {
	/// Key prefix for this kind, without the trailing slash
	pub fn key_prefix(&self) -> &'static str {
		match self {
			NodeKind::Folder => "folder",
			NodeKind::Document => "document",
		}
	}
}

/// One source-tree entry discovered during traversal.
///
/// Nodes are transient: they are created while walking the source tree and
/// dropped once reconciled. Nothing is kept between runs.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
	/// Stable identifier derived from the source self-reference
	pub id: String,

	/// Display name
	pub name: String,

	/// Full hierarchical path; folder paths carry a trailing slash
	pub path: String,

	/// Last update timestamp reported by the source system
	pub updated: DateTime<Utc>,

	/// Opaque attribute payload, fetched separately per node
	pub attributes: serde_json::Value,

	pub kind: NodeKind,
}

impl Node {
	/// Backup key of the node's content object
	pub fn content_key(&self) -> String {
		format!("{}/{}", self.kind.key_prefix(), self.id)
	}

	/// Backup key of the node's attribute side-record
	pub fn attributes_key(&self) -> String {
		format!("{}{}", ATTRIBUTES_PREFIX, self.id)
	}
}

/// Derive a node identifier from a source self-reference.
///
/// The source system embeds a 36-character identity token at the end of every
/// self URL; shorter references are used verbatim.
pub fn id_from_ref(href: &str) -> String {
	if href.len() <= 36 {
		return href.to_string();
	}
	match href.get(href.len() - 36..) {
		Some(tail) => tail.to_string(),
		None => href.to_string(),
	}
}

/// API credentials for the source system
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
	pub client_id: String,
	pub client_secret: String,
}

/// Identity of the authenticated account, as reported by the source system
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountIdentity {
	pub account_id: String,
	pub account_name: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	fn node(kind: NodeKind) -> Node {
		Node {
			id: "0f8fad5b-d9cb-469f-a165-70867728950e".to_string(),
			name: "report.pdf".to_string(),
			path: "/Legal/report.pdf".to_string(),
			updated: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
			attributes: serde_json::Value::Null,
			kind,
		}
	}

	#[test]
	fn test_content_key_document() {
		let n = node(NodeKind::Document);
		assert_eq!(n.content_key(), "document/0f8fad5b-d9cb-469f-a165-70867728950e");
	}

	#[test]
	fn test_content_key_folder() {
		let n = node(NodeKind::Folder);
		assert_eq!(n.content_key(), "folder/0f8fad5b-d9cb-469f-a165-70867728950e");
	}

	#[test]
	fn test_attributes_key() {
		let n = node(NodeKind::Document);
		assert_eq!(n.attributes_key(), "attributes/0f8fad5b-d9cb-469f-a165-70867728950e");
	}

	#[test]
	fn test_id_from_ref_takes_trailing_token() {
		let href = "https://api.example.com/v2/documents/0f8fad5b-d9cb-469f-a165-70867728950e";
		assert_eq!(id_from_ref(href), "0f8fad5b-d9cb-469f-a165-70867728950e");
	}

	#[test]
	fn test_id_from_ref_short_reference() {
		assert_eq!(id_from_ref("abc"), "abc");
	}
}

// vim: ts=4
