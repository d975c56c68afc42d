//! REST access to the retrieval backend.

mod client;
mod wire;

pub use client::ApiClient;
pub use wire::{AuthStatus, HealthStatus, RawEdge, RawGraph, RawNode};
