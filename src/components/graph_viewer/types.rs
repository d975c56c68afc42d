use std::collections::{BTreeMap, HashMap, HashSet};

use log::warn;
use serde::{Deserialize, Serialize};

/// Arbitrary per-node or per-edge properties returned by the backend.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// How a node is drawn on the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeProgram {
	/// Small filled dot, no border, no glow.
	Point,
	/// Filled disc.
	Circle,
	/// Filled disc with a contrasting ring.
	#[default]
	Bordered,
}

/// How an edge is drawn on the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeProgram {
	/// Straight line with an arrow head.
	Arrow,
	/// Quadratic curve with an arrow head.
	#[default]
	CurvedArrow,
	/// Quadratic curve without a head.
	CurvedNoArrow,
}

impl EdgeProgram {
	/// Whether the program bends the edge.
	pub fn is_curved(self) -> bool {
		matches!(self, Self::CurvedArrow | Self::CurvedNoArrow)
	}

	/// Whether the program draws an arrow head at the target.
	pub fn has_arrow(self) -> bool {
		matches!(self, Self::Arrow | Self::CurvedArrow)
	}
}

/// Visual attributes of a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
	pub color: String,
	pub size: f64,
	pub border_color: Option<String>,
	pub program: NodeProgram,
}

impl Default for NodeStyle {
	fn default() -> Self {
		Self {
			color: "#1f77b4".into(),
			size: 6.0,
			border_color: None,
			program: NodeProgram::default(),
		}
	}
}

/// Visual attributes of an edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeStyle {
	pub color: String,
	pub size: f64,
	pub program: EdgeProgram,
}

impl Default for EdgeStyle {
	fn default() -> Self {
		Self {
			color: "#9ca3af".into(),
			size: 1.0,
			program: EdgeProgram::default(),
		}
	}
}

/// A node of the knowledge graph as delivered to the view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
	pub id: String,
	pub label: String,
	/// Graph-space position; `None` until a layout pass or a drag places the node.
	pub position: Option<(f64, f64)>,
	pub style: NodeStyle,
	pub metadata: Metadata,
}

impl Node {
	/// Node with default style and no position.
	pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			label: label.into(),
			position: None,
			style: NodeStyle::default(),
			metadata: Metadata::new(),
		}
	}
}

/// A directed relation between two nodes of the same snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
	pub id: String,
	pub source: String,
	pub target: String,
	pub label: Option<String>,
	pub style: EdgeStyle,
	pub metadata: Metadata,
}

impl Edge {
	/// Edge with default style.
	pub fn new(
		id: impl Into<String>,
		source: impl Into<String>,
		target: impl Into<String>,
	) -> Self {
		Self {
			id: id.into(),
			source: source.into(),
			target: target.into(),
			label: None,
			style: EdgeStyle::default(),
			metadata: Metadata::new(),
		}
	}
}

/// The complete node/edge set the view displays.
///
/// A snapshot is only ever built through [`GraphSnapshot::new`], which enforces
/// unique node ids, unique edge ids, and that both endpoints of every edge exist.
#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
	nodes: Vec<Node>,
	edges: Vec<Edge>,
	index: HashMap<String, usize>,
}

impl GraphSnapshot {
	/// Build a snapshot, repairing input that would break its invariants.
	///
	/// Duplicate node ids keep their first occurrence; duplicate edge ids and
	/// edges with a missing endpoint are dropped.
	pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
		let mut index = HashMap::with_capacity(nodes.len());
		let mut kept = Vec::with_capacity(nodes.len());
		for node in nodes {
			if index.contains_key(&node.id) {
				warn!("dropping duplicate node id {:?}", node.id);
				continue;
			}
			index.insert(node.id.clone(), kept.len());
			kept.push(node);
		}

		let mut edge_ids = HashSet::with_capacity(edges.len());
		let edges = edges
			.into_iter()
			.filter(|edge| {
				if !index.contains_key(&edge.source) || !index.contains_key(&edge.target) {
					warn!(
						"dropping edge {:?}: endpoint {:?} -> {:?} not in snapshot",
						edge.id, edge.source, edge.target
					);
					return false;
				}
				if !edge_ids.insert(edge.id.clone()) {
					warn!("dropping duplicate edge id {:?}", edge.id);
					return false;
				}
				true
			})
			.collect();

		Self {
			nodes: kept,
			edges,
			index,
		}
	}

	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	pub fn edges(&self) -> &[Edge] {
		&self.edges
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn contains_node(&self, id: &str) -> bool {
		self.index.contains_key(id)
	}

	pub fn node(&self, id: &str) -> Option<&Node> {
		self.index.get(id).map(|&i| &self.nodes[i])
	}

	/// Number of edges touching `id`, self-loops counted once.
	pub fn degree(&self, id: &str) -> usize {
		self.edges
			.iter()
			.filter(|e| e.source == id || e.target == id)
			.count()
	}

	/// Ids of nodes adjacent to `id`, in edge order, without repeats.
	pub fn neighbors(&self, id: &str) -> Vec<&str> {
		let mut seen = HashSet::new();
		self.edges
			.iter()
			.filter_map(|e| {
				if e.source == id {
					Some(e.target.as_str())
				} else if e.target == id {
					Some(e.source.as_str())
				} else {
					None
				}
			})
			.filter(|n| *n != id && seen.insert(*n))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;

	#[test]
	fn dangling_and_duplicate_input_is_repaired() {
		let snapshot = GraphSnapshot::new(
			vec![Node::new("a", "A"), Node::new("b", "B"), Node::new("a", "A again")],
			vec![
				Edge::new("e1", "a", "b"),
				Edge::new("e2", "a", "ghost"),
				Edge::new("e1", "b", "a"),
			],
		);

		assert_eq!(snapshot.nodes().len(), 2);
		assert_eq!(snapshot.node("a").map(|n| n.label.as_str()), Some("A"));
		assert_eq!(snapshot.edges().len(), 1);
		assert_eq!(snapshot.edges()[0].id, "e1");
		assert_eq!(snapshot.edges()[0].source, "a");
	}

	#[test]
	fn neighbors_and_degree() {
		let snapshot = GraphSnapshot::new(
			vec![Node::new("a", "A"), Node::new("b", "B"), Node::new("c", "C")],
			vec![
				Edge::new("ab", "a", "b"),
				Edge::new("ca", "c", "a"),
				Edge::new("ba", "b", "a"),
			],
		);
		assert_eq!(snapshot.degree("a"), 3);
		assert_eq!(snapshot.neighbors("a"), vec!["b", "c"]);
		assert!(snapshot.neighbors("zzz").is_empty());
	}

	#[test]
	fn empty_snapshot() {
		let snapshot = GraphSnapshot::new(Vec::new(), vec![Edge::new("e", "a", "b")]);
		assert!(snapshot.is_empty());
		assert!(snapshot.edges().is_empty());
	}

	proptest! {
		#[test]
		fn every_edge_references_snapshot_nodes(
			node_ids in proptest::collection::vec(0u8..20, 0..20),
			edges in proptest::collection::vec((0u8..30, 0u8..30), 0..40),
		) {
			let nodes = node_ids.iter().map(|i| Node::new(format!("n{i}"), "")).collect();
			let edges = edges
				.iter()
				.enumerate()
				.map(|(i, (s, t))| Edge::new(format!("e{i}"), format!("n{s}"), format!("n{t}")))
				.collect();
			let snapshot = GraphSnapshot::new(nodes, edges);

			let mut ids = HashSet::new();
			for node in snapshot.nodes() {
				prop_assert!(ids.insert(node.id.clone()));
			}
			for edge in snapshot.edges() {
				prop_assert!(snapshot.contains_node(&edge.source));
				prop_assert!(snapshot.contains_node(&edge.target));
			}
		}
	}
}
