use std::collections::{BTreeSet, HashMap};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData};
use log::debug;

use super::camera::{BBox, Camera};
use super::types::{EdgeProgram, GraphSnapshot, NodeProgram};
use crate::config::SimulationConfig;
use crate::stores::LayoutKind;

pub const HIT_RADIUS: f64 = 8.0;
const LAYOUT_RADIUS: f64 = 100.0;
const ALPHA_DECAY: f64 = 0.985;
const ALPHA_MIN: f64 = 0.01;

#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	pub id: String,
	pub label: String,
	pub color: String,
	pub border_color: Option<String>,
	pub size: f64,
	pub program: NodeProgram,
	pub highlighted: bool,
}

#[derive(Clone, Debug)]
pub struct SurfaceEdge {
	pub source: DefaultNodeIdx,
	pub target: DefaultNodeIdx,
	pub label: Option<String>,
	pub color: String,
	pub size: f64,
	pub program: EdgeProgram,
}

/// Live rendering state: the force simulation graph built from the current
/// snapshot plus the camera looking at it.
///
/// Nothing outside the render surface writes to `graph`; the rest of the app
/// changes graph data through the store and the surface picks it up with
/// [`GraphSurface::sync`].
pub struct GraphSurface {
	pub graph: ForceGraph<NodeInfo, ()>,
	pub camera: Camera,
	pub width: f64,
	pub height: f64,
	pub layout: LayoutKind,
	edges: Vec<SurfaceEdge>,
	id_to_idx: HashMap<String, DefaultNodeIdx>,
	synced_revision: Option<u64>,
	/// Node and edge ids of the last synced snapshot.
	topology: (BTreeSet<String>, BTreeSet<String>),
	simulation: SimulationConfig,
	alpha: f64,
	dirty: bool,
	disposed: bool,
}

/// Deterministic pseudo-random value in `[0, 1)` derived from a string.
fn seeded_unit(seed: &str, salt: u64) -> f64 {
	let mut h: u64 = 0xcbf2_9ce4_8422_2325 ^ salt;
	for b in seed.bytes() {
		h ^= b as u64;
		h = h.wrapping_mul(0x0100_0000_01b3);
	}
	((h >> 11) as f64) / ((1u64 << 53) as f64)
}

/// Placement of the `i`-th of `n` nodes under `layout`, in graph space.
pub fn layout_position(layout: LayoutKind, id: &str, i: usize, n: usize) -> (f64, f64) {
	let radius = LAYOUT_RADIUS * (n.max(1) as f64).sqrt() / 2.0;
	match layout {
		LayoutKind::ForceDirected | LayoutKind::Circular => {
			let angle = (i as f64) * 2.0 * PI / n.max(1) as f64;
			(radius * angle.cos(), radius * angle.sin())
		}
		LayoutKind::Random => (
			(seeded_unit(id, 1) * 2.0 - 1.0) * radius,
			(seeded_unit(id, 2) * 2.0 - 1.0) * radius,
		),
	}
}

impl GraphSurface {
	pub fn new(width: f64, height: f64, simulation: SimulationConfig) -> Self {
		Self {
			graph: ForceGraph::new(simulation.parameters()),
			camera: Camera::default(),
			width,
			height,
			layout: LayoutKind::default(),
			edges: Vec::new(),
			id_to_idx: HashMap::new(),
			synced_revision: None,
			topology: Default::default(),
			simulation,
			alpha: 0.0,
			dirty: true,
			disposed: false,
		}
	}

	/// Revision of the snapshot the surface was last rebuilt from.
	pub fn synced_revision(&self) -> Option<u64> {
		self.synced_revision
	}

	/// Rebuild the simulation graph from `snapshot`.
	///
	/// The graph is rebuilt in snapshot order every time. Nodes whose id
	/// survives keep their current position, pin and highlight; new nodes take
	/// the position carried by the snapshot, or the active layout's.
	pub fn sync(&mut self, snapshot: &GraphSnapshot, revision: u64) {
		let mut previous: HashMap<String, (f32, f32, bool, bool)> = HashMap::new();
		self.graph.visit_nodes(|node| {
			previous.insert(
				node.data.user_data.id.clone(),
				(
					node.x(),
					node.y(),
					node.data.is_anchor,
					node.data.user_data.highlighted,
				),
			);
		});

		let mut graph = ForceGraph::new(self.simulation.parameters());
		let mut id_to_idx = HashMap::with_capacity(snapshot.nodes().len());
		let n = snapshot.nodes().len();
		for (i, node) in snapshot.nodes().iter().enumerate() {
			let (x, y, is_anchor, highlighted) = match previous.get(&node.id) {
				Some(&carried) => carried,
				None => {
					let (x, y) = node
						.position
						.unwrap_or_else(|| layout_position(self.layout, &node.id, i, n));
					(x as f32, y as f32, !self.layout.simulates(), false)
				}
			};
			let idx = graph.add_node(NodeData {
				x,
				y,
				mass: 10.0,
				is_anchor,
				user_data: NodeInfo {
					id: node.id.clone(),
					label: node.label.clone(),
					color: node.style.color.clone(),
					border_color: node.style.border_color.clone(),
					size: node.style.size,
					program: node.style.program,
					highlighted,
				},
			});
			id_to_idx.insert(node.id.clone(), idx);
		}

		let mut edges = Vec::with_capacity(snapshot.edges().len());
		for edge in snapshot.edges() {
			if let (Some(&src), Some(&tgt)) =
				(id_to_idx.get(&edge.source), id_to_idx.get(&edge.target))
			{
				// The simulation cannot hold self-loops; they are only drawn.
				if src != tgt {
					graph.add_edge(src, tgt, EdgeData::default());
				}
				edges.push(SurfaceEdge {
					source: src,
					target: tgt,
					label: edge.label.clone(),
					color: edge.style.color.clone(),
					size: edge.style.size,
					program: edge.style.program,
				});
			}
		}

		debug!(
			"surface rebuilt from r{revision}: {} nodes ({} carried over), {} edges",
			n,
			snapshot
				.nodes()
				.iter()
				.filter(|node| previous.contains_key(&node.id))
				.count(),
			edges.len()
		);
		self.graph = graph;
		self.id_to_idx = id_to_idx;
		self.edges = edges;
		self.synced_revision = Some(revision);
		let topology = (
			snapshot.nodes().iter().map(|n| n.id.clone()).collect(),
			snapshot.edges().iter().map(|e| e.id.clone()).collect(),
		);
		// A poll that returns the same graph must not restart the layout.
		if topology != self.topology {
			self.topology = topology;
			self.reheat();
		} else {
			self.dirty = true;
		}
	}

	/// Reposition every unpinned node according to `layout`.
	pub fn apply_layout(&mut self, layout: LayoutKind) {
		self.layout = layout;
		let mut order: Vec<(DefaultNodeIdx, String)> = Vec::with_capacity(self.id_to_idx.len());
		self.graph
			.visit_nodes(|node| order.push((node.index(), node.data.user_data.id.clone())));
		let n = order.len();
		let positions: HashMap<DefaultNodeIdx, (f64, f64)> = order
			.iter()
			.enumerate()
			.map(|(i, (idx, id))| (*idx, layout_position(layout, id, i, n)))
			.collect();
		let simulates = layout.simulates();
		self.graph.visit_nodes_mut(|node| {
			if let Some(&(x, y)) = positions.get(&node.index()) {
				node.data.x = x as f32;
				node.data.y = y as f32;
				node.data.is_anchor = !simulates;
			}
		});
		self.camera.reset();
		self.reheat();
	}

	fn reheat(&mut self) {
		self.alpha = if self.layout.simulates() { 1.0 } else { 0.0 };
		self.dirty = true;
	}

	pub fn contains(&self, id: &str) -> bool {
		self.id_to_idx.contains_key(id)
	}

	pub fn is_empty(&self) -> bool {
		self.id_to_idx.is_empty()
	}

	pub fn node_count(&self) -> usize {
		self.id_to_idx.len()
	}

	pub fn edges(&self) -> &[SurfaceEdge] {
		&self.edges
	}

	pub fn node_position(&self, id: &str) -> Option<(f64, f64)> {
		let idx = *self.id_to_idx.get(id)?;
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				found = Some((node.x() as f64, node.y() as f64));
			}
		});
		found
	}

	/// Positions of every node, keyed by simulation index.
	pub fn positions(&self) -> HashMap<DefaultNodeIdx, (f64, f64)> {
		let mut out = HashMap::with_capacity(self.id_to_idx.len());
		self.graph.visit_nodes(|node| {
			out.insert(node.index(), (node.x() as f64, node.y() as f64));
		});
		out
	}

	/// Move `id` to a graph-space point and pin it there.
	pub fn set_node_position(&mut self, id: &str, x: f64, y: f64) -> bool {
		let Some(&idx) = self.id_to_idx.get(id) else {
			return false;
		};
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.x = x as f32;
				node.data.y = y as f32;
				node.data.is_anchor = true;
			}
		});
		self.dirty = true;
		true
	}

	pub fn set_highlighted(&mut self, id: &str, highlighted: bool) -> bool {
		let Some(&idx) = self.id_to_idx.get(id) else {
			return false;
		};
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.user_data.highlighted = highlighted;
			}
		});
		self.dirty = true;
		true
	}

	pub fn is_highlighted(&self, id: &str) -> bool {
		let Some(&idx) = self.id_to_idx.get(id) else {
			return false;
		};
		let mut highlighted = false;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				highlighted = node.data.user_data.highlighted;
			}
		});
		highlighted
	}

	/// Topmost node under a screen point.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<String> {
		let (gx, gy) = self.camera.screen_to_graph(sx, sy);
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			// Hit area is in graph space so it scales with zoom like the nodes.
			if (dx * dx + dy * dy).sqrt() < HIT_RADIUS.max(node.data.user_data.size) {
				found = Some(node.data.user_data.id.clone());
			}
		});
		found
	}

	pub fn bbox(&self) -> Option<BBox> {
		let mut points = Vec::with_capacity(self.id_to_idx.len());
		self.graph
			.visit_nodes(|node| points.push((node.x() as f64, node.y() as f64)));
		BBox::around(points)
	}

	/// Pin the camera at the current graph bounds.
	pub fn fix_camera(&mut self) {
		let bbox = self.bbox();
		self.camera.fix_bbox(bbox);
	}

	/// Start the camera move to `id`; false if the node is not on the surface.
	pub fn move_camera_to(&mut self, id: &str) -> bool {
		let Some((gx, gy)) = self.node_position(id) else {
			return false;
		};
		self.fix_camera();
		self.camera.animate_to(gx, gy, self.width, self.height);
		self.dirty = true;
		true
	}

	pub fn is_settled(&self) -> bool {
		self.alpha < ALPHA_MIN
	}

	/// Advance simulation and camera by `dt` seconds.
	pub fn tick(&mut self, dt: f32) {
		if self.disposed {
			return;
		}
		if self.layout.simulates() && !self.is_settled() {
			self.graph.update(dt);
			self.alpha *= ALPHA_DECAY;
			self.dirty = true;
		}
		if self.camera.advance(dt as f64) {
			self.dirty = true;
		}
		let bbox = self.bbox();
		if self.camera.auto_fit(bbox, self.width, self.height) {
			self.dirty = true;
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.dirty = true;
	}

	pub fn mark_dirty(&mut self) {
		self.dirty = true;
	}

	/// Whether a redraw is due; clears the flag.
	pub fn take_dirty(&mut self) -> bool {
		std::mem::take(&mut self.dirty)
	}

	pub fn is_disposed(&self) -> bool {
		self.disposed
	}

	/// Release the simulation graph for good. Returns true only on the first call.
	pub fn dispose(&mut self) -> bool {
		if self.disposed {
			return false;
		}
		self.disposed = true;
		self.graph = ForceGraph::new(self.simulation.parameters());
		self.edges.clear();
		self.id_to_idx.clear();
		self.synced_revision = None;
		self.topology = Default::default();
		self.dirty = false;
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::graph_viewer::test_support::snapshot;
	use crate::components::graph_viewer::types::Node;

	fn surface() -> GraphSurface {
		GraphSurface::new(800.0, 600.0, SimulationConfig::default())
	}

	#[test]
	fn sync_builds_nodes_and_edges() {
		let mut s = surface();
		s.sync(&snapshot(&["a", "b", "c"], &[("a", "b"), ("b", "c")]), 1);
		assert_eq!(s.node_count(), 3);
		assert_eq!(s.edges().len(), 2);
		assert_eq!(s.synced_revision(), Some(1));
		assert!(s.take_dirty());
		assert!(!s.take_dirty());
	}

	#[test]
	fn resync_carries_positions_of_surviving_nodes() {
		let mut s = surface();
		s.sync(&snapshot(&["a", "b"], &[("a", "b")]), 1);
		assert!(s.set_node_position("a", 42.0, -7.0));
		s.set_highlighted("a", true);

		s.sync(&snapshot(&["c", "a"], &[("c", "a")]), 2);

		assert_eq!(s.node_position("a"), Some((42.0, -7.0)));
		assert!(s.is_highlighted("a"));
		assert!(!s.contains("b"));
		assert_eq!(s.edges().len(), 1);
	}

	#[test]
	fn rebuild_is_deterministic() {
		let snap = snapshot(&["x", "y", "z"], &[("x", "y")]);
		let (mut first, mut second) = (surface(), surface());
		first.sync(&snap, 1);
		first.sync(&snapshot(&["x", "y", "z", "w"], &[]), 2);
		second.sync(&snap, 1);
		second.sync(&snapshot(&["x", "y", "z", "w"], &[]), 2);
		for id in ["x", "y", "z", "w"] {
			assert_eq!(first.node_position(id), second.node_position(id));
		}
	}

	#[test]
	fn snapshot_positions_win_over_layout() {
		let mut node = Node::new("p", "P");
		node.position = Some((3.0, 4.0));
		let mut s = surface();
		s.sync(&GraphSnapshot::new(vec![node], Vec::new()), 1);
		assert_eq!(s.node_position("p"), Some((3.0, 4.0)));
	}

	#[test]
	fn static_layouts_do_not_simulate() {
		let mut s = surface();
		s.sync(&snapshot(&["a", "b", "c"], &[("a", "b")]), 1);
		s.apply_layout(LayoutKind::Random);
		let before = s.node_position("a");
		s.tick(0.016);
		assert_eq!(s.node_position("a"), before);
		assert!(s.is_settled());
		assert_eq!(
			before,
			Some(layout_position(LayoutKind::Random, "a", 0, 3))
				.map(|(x, y)| (x as f32 as f64, y as f32 as f64))
		);
	}

	#[test]
	fn self_loops_are_drawn_but_not_simulated() {
		let mut s = surface();
		s.sync(&snapshot(&["a", "b"], &[("a", "a"), ("a", "b")]), 1);
		assert_eq!(s.edges().len(), 2);
		for _ in 0..200 {
			s.tick(0.016);
		}
		let (x, y) = s.node_position("a").expect("a placed");
		assert!(x.is_finite() && y.is_finite());
	}

	#[test]
	fn identical_snapshot_does_not_restart_layout() {
		let mut s = surface();
		let snap = snapshot(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
		s.sync(&snap, 1);
		while !s.is_settled() {
			s.tick(0.016);
		}
		s.sync(&snap, 2);
		assert!(s.is_settled());
		assert!(s.take_dirty());

		s.sync(&snapshot(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c")]), 3);
		assert!(!s.is_settled());
	}

	#[test]
	fn empty_snapshot_is_fine() {
		let mut s = surface();
		s.sync(&GraphSnapshot::default(), 1);
		s.tick(0.016);
		assert!(s.is_empty());
		assert!(s.bbox().is_none());
		assert!(s.node_at_position(400.0, 300.0).is_none());
	}

	#[test]
	fn dispose_runs_once() {
		let mut s = surface();
		s.sync(&snapshot(&["a"], &[]), 1);
		assert!(s.dispose());
		assert!(!s.dispose());
		assert!(s.is_empty());
		assert!(s.is_disposed());
	}

	#[test]
	fn camera_move_needs_a_known_node() {
		let mut s = surface();
		s.sync(&snapshot(&["a"], &[]), 1);
		assert!(s.move_camera_to("a"));
		assert!(s.camera.is_animating());
		assert!(s.camera.custom_bbox().is_some());
		assert!(!s.move_camera_to("b"));
	}
}
