use gloo_net::http::{Request, RequestBuilder};
use log::debug;
use serde::de::DeserializeOwned;

use super::wire::{AuthStatus, HealthStatus, RawGraph};
use crate::error::GraphError;

/// Thin REST client for the retrieval backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
	base_url: String,
	token: Option<String>,
}

impl ApiClient {
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into(),
			token: None,
		}
	}

	pub fn with_token(mut self, token: Option<String>) -> Self {
		self.token = token;
		self
	}

	fn url(&self, path: &str) -> String {
		format!(
			"{}/{}",
			self.base_url.trim_end_matches('/'),
			path.trim_start_matches('/')
		)
	}

	fn get(&self, path: &str) -> RequestBuilder {
		let request = Request::get(&self.url(path));
		match &self.token {
			Some(token) => request.header("Authorization", &format!("Bearer {token}")),
			None => request,
		}
	}

	async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, GraphError> {
		let response = request.send().await?;
		match response.status() {
			401 | 403 => return Err(GraphError::Unauthenticated),
			_ if !response.ok() => {
				return Err(GraphError::Status {
					status: response.status(),
					message: response.text().await.unwrap_or_default(),
				});
			}
			_ => {}
		}
		response
			.json::<T>()
			.await
			.map_err(|e| GraphError::Decode(e.to_string()))
	}

	/// Subgraph rooted at entities matching `label` (`*` for everything).
	pub async fn query_graph(&self, label: &str, max_depth: u32) -> Result<RawGraph, GraphError> {
		if self.token.is_none() {
			return Err(GraphError::Unauthenticated);
		}
		debug!("GET graphs label={label:?} max_depth={max_depth}");
		let depth = max_depth.to_string();
		Self::send_json(
			self.get("/graphs")
				.query([("label", label), ("max_depth", depth.as_str())]),
		)
		.await
	}

	pub async fn health(&self) -> Result<HealthStatus, GraphError> {
		Self::send_json(self.get("/health")).await
	}

	pub async fn auth_status(&self) -> Result<AuthStatus, GraphError> {
		Self::send_json(self.get("/auth-status")).await
	}
}
