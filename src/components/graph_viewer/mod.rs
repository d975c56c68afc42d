mod camera;
mod component;
mod controls;
mod focus;
mod interaction;
mod lifecycle;
mod loader;
mod render;
mod state;
mod status;
mod types;

pub use camera::{BBox, Camera, ViewTransform};
pub use component::GraphViewer;
pub use focus::{
	SearchHit, SearchKind, SearchOption, apply_camera_moves, auto_focused_node, on_search_focus,
	on_search_select, search_nodes,
};
pub use interaction::{DragState, InteractionController, KeyCommand, PointerOutcome};
pub use lifecycle::{FetchTicket, LifecycleAction, LifecycleManager, Visibility};
pub use loader::{FetchOutcome, PendingFetch, finish_fetch, spawn_graph_fetch, start_fetch};
pub use state::GraphSurface;
pub use status::ViewStatus;
pub use types::{
	Edge, EdgeProgram, EdgeStyle, GraphSnapshot, Metadata, Node, NodeProgram, NodeStyle,
};
