//! REST client for the hosted document repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::RwLock;
use tokio::io::AsyncWriteExt;

use super::{ContentSink, SourceResult, SourceSystem};
use crate::error::SourceError;
use crate::types::{id_from_ref, AccountIdentity, Credentials, Node, NodeKind};

pub struct RestSource {
	client: reqwest::Client,
	base_url: String,
	data_center: Option<String>,
	token: RwLock<Option<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
	access_token: String,
	account_id: String,
	account_name: Option<String>,
}

#[derive(Deserialize)]
struct HrefDto {
	#[serde(rename = "self")]
	self_ref: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryDto {
	href: HrefDto,
	name: String,
	path: String,
	updated: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ListResponse {
	items: Vec<EntryDto>,
}

impl RestSource {
	pub fn new(base_url: &str, data_center: Option<String>) -> Self {
		RestSource {
			client: reqwest::Client::new(),
			base_url: base_url.trim_end_matches('/').to_string(),
			data_center,
			token: RwLock::new(None),
		}
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	fn bearer(&self) -> SourceResult<String> {
		match self.token.read() {
			Ok(guard) => guard.clone().ok_or_else(|| SourceError::Authentication {
				message: "not authenticated".to_string(),
			}),
			Err(_) => Err(SourceError::Http { message: "token lock poisoned".to_string() }),
		}
	}

	async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, String> {
		let token = self.bearer().map_err(|e| e.to_string())?;
		let response = self
			.client
			.get(self.url(path))
			.bearer_auth(&token)
			.send()
			.await
			.map_err(|e| e.to_string())?
			.error_for_status()
			.map_err(|e| e.to_string())?;
		response.json::<T>().await.map_err(|e| e.to_string())
	}

	fn node_from(dto: EntryDto, kind: NodeKind) -> Node {
		Node {
			id: id_from_ref(&dto.href.self_ref),
			name: dto.name,
			path: dto.path,
			updated: dto.updated,
			attributes: serde_json::Value::Null,
			kind,
		}
	}

	fn kind_segment(kind: NodeKind) -> &'static str {
		match kind {
			NodeKind::Folder => "folders",
			NodeKind::Document => "documents",
		}
	}
}

#[async_trait]
impl SourceSystem for RestSource {
	async fn authenticate(&self, credentials: &Credentials) -> SourceResult<AccountIdentity> {
		let body = serde_json::json!({
			"clientId": credentials.client_id,
			"clientSecret": credentials.client_secret,
			"dataCenter": self.data_center,
		});

		let response = self
			.client
			.post(self.url("/auth/token"))
			.json(&body)
			.send()
			.await
			.map_err(|e| SourceError::Authentication { message: e.to_string() })?
			.error_for_status()
			.map_err(|e| SourceError::Authentication { message: e.to_string() })?;

		let auth: AuthResponse = response
			.json()
			.await
			.map_err(|e| SourceError::Authentication { message: e.to_string() })?;

		match self.token.write() {
			Ok(mut guard) => *guard = Some(auth.access_token),
			Err(_) => {
				return Err(SourceError::Http { message: "token lock poisoned".to_string() })
			}
		}

		Ok(AccountIdentity { account_id: auth.account_id, account_name: auth.account_name })
	}

	async fn root_folder(&self) -> SourceResult<Node> {
		let dto: EntryDto = self.get_json("/folders/root").await.map_err(|message| {
			SourceError::Listing { what: "root folder".to_string(), message }
		})?;
		Ok(Self::node_from(dto, NodeKind::Folder))
	}

	async fn child_folders(&self, folder: &Node) -> SourceResult<Vec<Node>> {
		let path = format!("/folders/{}/folders", folder.id);
		let list: ListResponse = self.get_json(&path).await.map_err(|message| {
			SourceError::Listing { what: format!("folders of {}", folder.path), message }
		})?;
		Ok(list.items.into_iter().map(|d| Self::node_from(d, NodeKind::Folder)).collect())
	}

	async fn documents(&self, folder: &Node) -> SourceResult<Vec<Node>> {
		let path = format!("/folders/{}/documents", folder.id);
		let list: ListResponse = self.get_json(&path).await.map_err(|message| {
			SourceError::Listing { what: format!("documents of {}", folder.path), message }
		})?;
		Ok(list.items.into_iter().map(|d| Self::node_from(d, NodeKind::Document)).collect())
	}

	async fn attributes(&self, node: &Node) -> SourceResult<serde_json::Value> {
		let path = format!("/{}/{}/attributes", Self::kind_segment(node.kind), node.id);
		self.get_json(&path).await.map_err(|message| SourceError::Attributes {
			id: node.id.clone(),
			message,
		})
	}

	async fn download(&self, document: &Node, sink: &mut ContentSink) -> SourceResult<()> {
		let token = self.bearer()?;
		let url = self.url(&format!("/documents/{}/content", document.id));

		let response = self
			.client
			.get(url)
			.bearer_auth(&token)
			.send()
			.await
			.map_err(|e| SourceError::Download { id: document.id.clone(), message: e.to_string() })?
			.error_for_status()
			.map_err(|e| SourceError::Download { id: document.id.clone(), message: e.to_string() })?;

		let mut stream = response.bytes_stream();
		while let Some(chunk) = stream.next().await {
			let chunk = chunk.map_err(|e| SourceError::Download {
				id: document.id.clone(),
				message: e.to_string(),
			})?;
			sink.write_all(&chunk).await.map_err(|e| SourceError::Download {
				id: document.id.clone(),
				message: e.to_string(),
			})?;
		}
		sink.flush().await.map_err(|e| SourceError::Download {
			id: document.id.clone(),
			message: e.to_string(),
		})?;

		Ok(())
	}
}

// vim: ts=4
