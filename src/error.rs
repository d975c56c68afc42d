//! Error types for the graph subsystem.

use thiserror::Error;

/// Failures the graph view can run into. None of them escape the view; they
/// are turned into store state (a notice or the render error) at the boundary.
#[derive(Error, Debug)]
pub enum GraphError {
	#[error("network error: {0}")]
	Network(#[from] gloo_net::Error),

	#[error("backend returned {status}: {message}")]
	Status { status: u16, message: String },

	#[error("could not decode backend response: {0}")]
	Decode(String),

	#[error("not signed in")]
	Unauthenticated,

	#[error("canvas unavailable: {0}")]
	RenderInit(String),
}

impl GraphError {
	/// Whether the failure means the backend could not be reached at all.
	pub fn is_unreachable(&self) -> bool {
		match self {
			Self::Network(_) => true,
			Self::Status { status, .. } => matches!(status, 502..=504),
			_ => false,
		}
	}
}
