//! Pointer handling for the canvas: node dragging, background panning, wheel zoom.

use log::debug;

use super::camera::ZOOM_STEP;
use super::state::GraphSurface;

/// Node drag state machine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DragState {
	#[default]
	Idle,
	Dragging(String),
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub last_x: f64,
	pub last_y: f64,
}

/// What a pointer event did, so the caller knows whether to stop the browser default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerOutcome {
	Ignored,
	Panned,
	DraggedNode,
}

/// Keyboard shortcuts understood by the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyCommand {
	ZoomIn,
	ZoomOut,
	ResetView,
	/// Drop the selection and cancel any drag.
	Escape,
}

impl KeyCommand {
	pub fn from_key(key: &str) -> Option<Self> {
		match key {
			"+" | "=" => Some(Self::ZoomIn),
			"-" | "_" => Some(Self::ZoomOut),
			"0" => Some(Self::ResetView),
			"Escape" => Some(Self::Escape),
			_ => None,
		}
	}
}

#[derive(Debug, Default)]
pub struct InteractionController {
	pub drag: DragState,
	pub pan: PanState,
	pub hovered: Option<String>,
	/// The current or last press dragged a node or panned the view.
	moved: bool,
}

impl InteractionController {
	pub fn dragged_node(&self) -> Option<&str> {
		match &self.drag {
			DragState::Dragging(id) => Some(id),
			DragState::Idle => None,
		}
	}

	/// Pointer pressed at screen point `(sx, sy)`.
	///
	/// With dragging enabled a press on a node starts a drag. Any other press
	/// pins the camera bounds and starts panning the background.
	pub fn pointer_down(&mut self, surface: &mut GraphSurface, sx: f64, sy: f64, enable_drag: bool) {
		surface.fix_camera();
		self.moved = false;
		if enable_drag && let Some(id) = surface.node_at_position(sx, sy) {
			debug!("drag start {id:?}");
			surface.set_highlighted(&id, true);
			self.drag = DragState::Dragging(id);
			self.pan.active = false;
			return;
		}
		self.pan = PanState {
			active: true,
			last_x: sx,
			last_y: sy,
		};
	}

	pub fn pointer_move(&mut self, surface: &mut GraphSurface, sx: f64, sy: f64) -> PointerOutcome {
		if let DragState::Dragging(id) = &self.drag {
			if !surface.contains(id) {
				debug!("dragged node {id:?} left the graph");
				self.drag = DragState::Idle;
				return PointerOutcome::Ignored;
			}
			let (gx, gy) = surface.camera.screen_to_graph(sx, sy);
			surface.set_node_position(id, gx, gy);
			self.moved = true;
			return PointerOutcome::DraggedNode;
		}

		if self.pan.active {
			if sx != self.pan.last_x || sy != self.pan.last_y {
				self.moved = true;
			}
			surface
				.camera
				.pan_by(sx - self.pan.last_x, sy - self.pan.last_y);
			self.pan.last_x = sx;
			self.pan.last_y = sy;
			surface.mark_dirty();
			return PointerOutcome::Panned;
		}

		let hovered = surface.node_at_position(sx, sy);
		if hovered != self.hovered {
			self.hovered = hovered;
			surface.mark_dirty();
		}
		PointerOutcome::Ignored
	}

	pub fn pointer_up(&mut self, surface: &mut GraphSurface) {
		if let DragState::Dragging(id) = std::mem::take(&mut self.drag) {
			debug!("drag end {id:?}");
			surface.set_highlighted(&id, false);
		}
		self.pan.active = false;
	}

	pub fn pointer_leave(&mut self, surface: &mut GraphSurface) {
		self.pointer_up(surface);
		if self.hovered.take().is_some() {
			surface.mark_dirty();
		}
	}

	/// Whether the click closing the last press should change the selection.
	/// Clicks that end a pan or a drag do not.
	pub fn take_click(&mut self) -> bool {
		!std::mem::take(&mut self.moved)
	}

	pub fn key(&mut self, surface: &mut GraphSurface, command: KeyCommand) {
		match command {
			KeyCommand::ZoomIn | KeyCommand::ZoomOut => {
				surface.fix_camera();
				let factor = if command == KeyCommand::ZoomIn {
					ZOOM_STEP
				} else {
					1.0 / ZOOM_STEP
				};
				surface
					.camera
					.zoom_at(surface.width / 2.0, surface.height / 2.0, factor);
			}
			KeyCommand::ResetView => surface.camera.reset(),
			KeyCommand::Escape => self.pointer_up(surface),
		}
		surface.mark_dirty();
	}

	/// Zoom around the pointer; scrolling down zooms out.
	pub fn wheel(&mut self, surface: &mut GraphSurface, sx: f64, sy: f64, delta_y: f64) {
		surface.fix_camera();
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		surface.camera.zoom_at(sx, sy, factor);
		surface.mark_dirty();
	}

	/// Drop references to nodes the latest rebuild removed.
	pub fn on_surface_synced(&mut self, surface: &GraphSurface) {
		if let DragState::Dragging(id) = &self.drag
			&& !surface.contains(id)
		{
			debug!("dragged node {id:?} removed by refresh");
			self.drag = DragState::Idle;
		}
		if self.hovered.as_deref().is_some_and(|id| !surface.contains(id)) {
			self.hovered = None;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::graph_viewer::test_support::{identity_surface, snapshot};

	#[test]
	fn drag_moves_node_to_pointer_and_clears_highlight() {
		let mut surface = identity_surface(&["a", "b"], &[("a", "b")]);
		let (ax, ay) = surface.node_position("a").expect("a placed");
		let mut ctl = InteractionController::default();

		ctl.pointer_down(&mut surface, ax, ay, true);
		assert_eq!(ctl.drag, DragState::Dragging("a".into()));
		assert!(surface.is_highlighted("a"));

		assert_eq!(ctl.pointer_move(&mut surface, 250.0, -125.0), PointerOutcome::DraggedNode);
		ctl.pointer_up(&mut surface);

		assert_eq!(ctl.drag, DragState::Idle);
		assert_eq!(surface.node_position("a"), Some((250.0, -125.0)));
		assert!(!surface.is_highlighted("a"));
	}

	#[test]
	fn dragging_suppresses_panning() {
		let mut surface = identity_surface(&["a"], &[]);
		let (ax, ay) = surface.node_position("a").expect("a placed");
		let before = surface.camera.transform;
		let mut ctl = InteractionController::default();
		ctl.pointer_down(&mut surface, ax, ay, true);
		ctl.pointer_move(&mut surface, ax + 30.0, ay + 30.0);
		assert_eq!(surface.camera.transform, before);
	}

	#[test]
	fn disabled_drag_pins_camera_and_pans() {
		let mut surface = identity_surface(&["a"], &[]);
		surface.camera.reset();
		let (ax, ay) = surface.node_position("a").expect("a placed");
		let mut ctl = InteractionController::default();

		ctl.pointer_down(&mut surface, ax, ay, false);
		assert_eq!(ctl.drag, DragState::Idle);
		assert!(surface.camera.custom_bbox().is_some());

		assert_eq!(ctl.pointer_move(&mut surface, ax + 10.0, ay), PointerOutcome::Panned);
		assert_eq!(surface.node_position("a"), Some((ax, ay)));
		assert_eq!(surface.camera.transform.x, 10.0);
	}

	#[test]
	fn node_removed_mid_drag_returns_to_idle() {
		let mut surface = identity_surface(&["a", "b"], &[]);
		let (ax, ay) = surface.node_position("a").expect("a placed");
		let mut ctl = InteractionController::default();
		ctl.pointer_down(&mut surface, ax, ay, true);

		surface.sync(&snapshot(&["b"], &[]), 2);
		assert_eq!(ctl.pointer_move(&mut surface, 1.0, 1.0), PointerOutcome::Ignored);
		assert_eq!(ctl.drag, DragState::Idle);
		ctl.pointer_up(&mut surface);

		ctl.pointer_down(&mut surface, 1000.0, 1000.0, true);
		surface.sync(&snapshot(&[], &[]), 3);
		ctl.on_surface_synced(&surface);
		assert_eq!(ctl.drag, DragState::Idle);
	}

	#[test]
	fn hover_tracks_node_under_pointer() {
		let mut surface = identity_surface(&["a"], &[]);
		let (ax, ay) = surface.node_position("a").expect("a placed");
		let mut ctl = InteractionController::default();
		ctl.pointer_move(&mut surface, ax, ay);
		assert_eq!(ctl.hovered.as_deref(), Some("a"));
		ctl.pointer_leave(&mut surface);
		assert_eq!(ctl.hovered, None);
	}

	#[test]
	fn click_after_pan_or_drag_keeps_selection() {
		let mut surface = identity_surface(&["a"], &[]);
		let mut ctl = InteractionController::default();
		let node_on_screen = |surface: &GraphSurface| {
			let (gx, gy) = surface.node_position("a").expect("a placed");
			surface.camera.graph_to_screen(gx, gy)
		};

		let (sx, sy) = node_on_screen(&surface);
		ctl.pointer_down(&mut surface, sx + 200.0, sy + 200.0, true);
		ctl.pointer_move(&mut surface, sx + 240.0, sy + 200.0);
		ctl.pointer_up(&mut surface);
		assert!(!ctl.take_click());

		let (sx, sy) = node_on_screen(&surface);
		ctl.pointer_down(&mut surface, sx + 200.0, sy + 200.0, true);
		ctl.pointer_up(&mut surface);
		assert!(ctl.take_click());

		let (sx, sy) = node_on_screen(&surface);
		ctl.pointer_down(&mut surface, sx, sy, true);
		assert_eq!(ctl.drag, DragState::Dragging("a".into()));
		ctl.pointer_move(&mut surface, sx + 5.0, sy);
		ctl.pointer_up(&mut surface);
		assert!(!ctl.take_click());
	}

	#[test]
	fn keyboard_zoom_and_escape() {
		assert_eq!(KeyCommand::from_key("+"), Some(KeyCommand::ZoomIn));
		assert_eq!(KeyCommand::from_key("Escape"), Some(KeyCommand::Escape));
		assert_eq!(KeyCommand::from_key("x"), None);

		let mut surface = identity_surface(&["a"], &[]);
		let mut ctl = InteractionController::default();
		let (ax, ay) = surface.node_position("a").expect("a placed");
		ctl.pointer_down(&mut surface, ax, ay, true);
		assert!(surface.is_highlighted("a"));
		ctl.key(&mut surface, KeyCommand::Escape);
		assert_eq!(ctl.drag, DragState::Idle);
		assert!(!surface.is_highlighted("a"));

		ctl.key(&mut surface, KeyCommand::ZoomIn);
		assert_eq!(surface.camera.transform.k, ZOOM_STEP);
		ctl.key(&mut surface, KeyCommand::ResetView);
		assert!(surface.camera.custom_bbox().is_none());
	}
}
