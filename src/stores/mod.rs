//! Shared client-side state.

mod graph;
mod settings;

pub use graph::{
	GraphStore, Notice, NoticeLevel, RenderFlags, RendererHandle, SelectionState, StoreChange,
	SubscriptionId,
};
pub use settings::{LayoutKind, Settings};
