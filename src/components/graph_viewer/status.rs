use crate::stores::GraphStore;

/// What the graph tab shows over (or instead of) the canvas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewStatus {
	/// The canvas could not be set up; the rest of the app keeps working.
	RenderError(String),
	SignedOut,
	/// First load still running, nothing to show yet.
	Loading,
	/// Loaded, but the graph has no nodes.
	Empty,
	Ready,
}

impl ViewStatus {
	pub fn of(store: &GraphStore) -> Self {
		if let Some(err) = store.render_error() {
			return Self::RenderError(err);
		}
		if !store.is_authenticated() {
			return Self::SignedOut;
		}
		let empty = store.snapshot().is_empty();
		match (empty, store.render_flags().is_fetching) {
			(true, true) => Self::Loading,
			(true, false) => Self::Empty,
			(false, _) => Self::Ready,
		}
	}

	/// Overlay text, or `None` when the canvas alone says it all.
	pub fn message(&self) -> Option<String> {
		match self {
			Self::RenderError(err) => Some(format!("The graph cannot be displayed: {err}")),
			Self::SignedOut => Some("Sign in to load the knowledge graph.".into()),
			Self::Loading => Some("Loading knowledge graph data…".into()),
			Self::Empty => Some("No graph data. Upload documents to build the knowledge graph.".into()),
			Self::Ready => None,
		}
	}
}
