//! Bridges the node search box to the store, and store camera requests to the surface.

use log::debug;
use serde::{Deserialize, Serialize};

use super::state::GraphSurface;
use super::types::GraphSnapshot;
use crate::stores::GraphStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
	Nodes,
	Edges,
}

/// An entry picked or hovered in the search box.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOption {
	#[serde(rename = "type")]
	pub kind: SearchKind,
	pub id: String,
}

impl SearchOption {
	pub fn node(id: impl Into<String>) -> Self {
		Self {
			kind: SearchKind::Nodes,
			id: id.into(),
		}
	}
}

/// Search hover: preview a node, or clear the preview.
pub fn on_search_focus(store: &GraphStore, value: Option<&SearchOption>) {
	match value {
		None => store.set_focused_node(None),
		Some(option) if option.kind == SearchKind::Nodes => store.set_focused_node(Some(&option.id)),
		Some(_) => {}
	}
}

/// Search commit: select a node and fly the camera to it, or clear the selection.
pub fn on_search_select(store: &GraphStore, value: Option<&SearchOption>) {
	match value {
		None => store.set_selected_node(None, false),
		Some(option) if option.kind == SearchKind::Nodes => {
			store.set_selected_node(Some(&option.id), true)
		}
		Some(_) => {}
	}
}

/// The node the view emphasises: the previewed one, else the committed one.
pub fn auto_focused_node(store: &GraphStore) -> Option<String> {
	store.focused_node().or_else(|| store.selected_node())
}

/// Consume every queued camera move and animate the surface toward each in turn.
/// Returns how many animations were started.
pub fn apply_camera_moves(store: &GraphStore, surface: &mut GraphSurface) -> usize {
	store
		.take_camera_moves()
		.into_iter()
		.filter(|id| {
			let started = surface.move_camera_to(id);
			if !started {
				debug!("camera move to {id:?} skipped: not on the surface");
			}
			started
		})
		.count()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchHit {
	pub id: String,
	pub label: String,
}

/// Case-insensitive label/id search. Prefix matches rank first, then shorter
/// labels, then snapshot order.
pub fn search_nodes(snapshot: &GraphSnapshot, query: &str, limit: usize) -> Vec<SearchHit> {
	let query = query.trim().to_lowercase();
	if query.is_empty() {
		return Vec::new();
	}
	let mut hits: Vec<(bool, usize, usize, SearchHit)> = snapshot
		.nodes()
		.iter()
		.enumerate()
		.filter_map(|(i, node)| {
			let label = node.label.to_lowercase();
			let id = node.id.to_lowercase();
			let prefix = label.starts_with(&query) || id.starts_with(&query);
			(prefix || label.contains(&query) || id.contains(&query)).then(|| {
				(
					!prefix,
					node.label.len(),
					i,
					SearchHit {
						id: node.id.clone(),
						label: node.label.clone(),
					},
				)
			})
		})
		.collect();
	hits.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));
	hits.into_iter().take(limit).map(|(_, _, _, hit)| hit).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::graph_viewer::test_support::{identity_surface, loaded_store};

	#[test]
	fn focus_and_select_are_independent() {
		let store = loaded_store(&["n1", "n42"], &[("n1", "n42")]);
		on_search_select(&store, Some(&SearchOption::node("n42")));
		assert_eq!(store.selected_node().as_deref(), Some("n42"));
		assert_eq!(store.focused_node(), None);

		on_search_focus(&store, Some(&SearchOption::node("n1")));
		assert_eq!(auto_focused_node(&store).as_deref(), Some("n1"));
		on_search_focus(&store, None);
		assert_eq!(auto_focused_node(&store).as_deref(), Some("n42"));

		on_search_select(&store, None);
		assert_eq!(store.selected_node(), None);
		assert!(store.take_camera_moves().len() == 1);
	}

	#[test]
	fn non_node_options_are_ignored() {
		let store = loaded_store(&["a", "b"], &[("a", "b")]);
		let edge = SearchOption {
			kind: SearchKind::Edges,
			id: "a".into(),
		};
		on_search_select(&store, Some(&edge));
		on_search_focus(&store, Some(&edge));
		assert_eq!(store.selected_node(), None);
		assert_eq!(store.focused_node(), None);
	}

	#[test]
	fn selecting_same_node_twice_animates_twice() {
		let store = loaded_store(&["n1", "n42"], &[]);
		let mut surface = identity_surface(&["n1", "n42"], &[]);

		on_search_select(&store, Some(&SearchOption::node("n42")));
		assert_eq!(apply_camera_moves(&store, &mut surface), 1);
		while surface.camera.advance(0.1) {}

		on_search_select(&store, Some(&SearchOption::node("n42")));
		assert_eq!(apply_camera_moves(&store, &mut surface), 1);
		assert!(surface.camera.is_animating());

		assert_eq!(apply_camera_moves(&store, &mut surface), 0);
	}

	#[test]
	fn search_option_wire_shape() {
		let option: SearchOption =
			serde_json::from_str(r#"{"type":"nodes","id":"n7"}"#).expect("valid option");
		assert_eq!(option, SearchOption::node("n7"));
	}

	#[test]
	fn search_ranks_prefix_matches_first() {
		let store = loaded_store(&["rice blast", "brown rice", "rice", "wheat"], &[]);
		let hits = search_nodes(&store.snapshot(), "RICE", 10);
		let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
		assert_eq!(ids, vec!["rice", "rice blast", "brown rice"]);
		assert!(search_nodes(&store.snapshot(), "  ", 10).is_empty());
		assert_eq!(search_nodes(&store.snapshot(), "rice", 1).len(), 1);
	}
}
