//! Process-wide client state shared by the graph view and its collaborators.
//!
//! The store is the only place graph data lives outside the render surface.
//! Every mutation goes through a fixed set of methods, each of which applies
//! its change in one step and then notifies subscribers before returning.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use log::{debug, info, warn};

use super::settings::Settings;
use crate::components::graph_viewer::{Edge, GraphSnapshot, Node};

/// What part of the store a notification is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreChange {
	Auth,
	Backend,
	Snapshot,
	Selection,
	Focus,
	RenderFlags,
	Renderer,
	Settings,
	Notice,
}

/// Opaque handle for the live rendering context, held while a canvas exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RendererHandle(u32);

impl RendererHandle {
	/// Allocate a handle unique for this page load.
	pub fn next() -> Self {
		thread_local! {
			static NEXT: Cell<u32> = const { Cell::new(1) };
		}
		NEXT.with(|n| {
			let id = n.get();
			n.set(id.wrapping_add(1));
			Self(id)
		})
	}

	pub fn id(self) -> u32 {
		self.0
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderFlags {
	pub is_fetching: bool,
	pub should_render: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
	/// The committed, user-chosen node.
	pub selected_node: Option<String>,
	/// The node previewed by search hover.
	pub focused_node: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
	Info,
	Error,
}

/// Toast-style message for the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
	pub level: NoticeLevel,
	pub message: String,
}

/// Token returned by [`GraphStore::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Observer = Rc<dyn Fn(StoreChange)>;

struct StoreState {
	authenticated: bool,
	token: Option<String>,
	/// Bumped on every sign-in and sign-out.
	session: u64,
	backend_healthy: bool,
	snapshot: Rc<GraphSnapshot>,
	snapshot_revision: u64,
	selection: SelectionState,
	flags: RenderFlags,
	camera_moves: VecDeque<String>,
	renderer: Option<RendererHandle>,
	render_error: Option<String>,
	settings: Settings,
	notice: Option<Notice>,
}

impl StoreState {
	fn new(settings: Settings) -> Self {
		Self {
			authenticated: false,
			token: None,
			session: 0,
			backend_healthy: true,
			snapshot: Rc::new(GraphSnapshot::default()),
			snapshot_revision: 0,
			selection: SelectionState::default(),
			flags: RenderFlags::default(),
			camera_moves: VecDeque::new(),
			renderer: None,
			render_error: None,
			settings,
			notice: None,
		}
	}

	/// Drop selection, focus and queued camera moves that point outside the snapshot.
	fn prune_dangling(&mut self) -> (bool, bool) {
		let snapshot = Rc::clone(&self.snapshot);
		let dangling = |id: &Option<String>| id.as_deref().is_some_and(|id| !snapshot.contains_node(id));

		let selection_changed = dangling(&self.selection.selected_node);
		if selection_changed {
			debug!("clearing stale selection {:?}", self.selection.selected_node);
			self.selection.selected_node = None;
		}
		let focus_changed = dangling(&self.selection.focused_node);
		if focus_changed {
			debug!("clearing stale focus {:?}", self.selection.focused_node);
			self.selection.focused_node = None;
		}
		self.camera_moves.retain(|id| snapshot.contains_node(id));
		(selection_changed, focus_changed)
	}
}

pub struct GraphStore {
	state: RefCell<StoreState>,
	observers: RefCell<Vec<(SubscriptionId, Observer)>>,
	next_subscription: Cell<u64>,
}

impl Default for GraphStore {
	fn default() -> Self {
		Self::new(Settings::default())
	}
}

impl GraphStore {
	pub fn new(settings: Settings) -> Self {
		Self {
			state: RefCell::new(StoreState::new(settings)),
			observers: RefCell::new(Vec::new()),
			next_subscription: Cell::new(0),
		}
	}

	/// Register `observer`; it runs after every mutation, with the store
	/// already in its new state and free to be read.
	pub fn subscribe(&self, observer: impl Fn(StoreChange) + 'static) -> SubscriptionId {
		let id = SubscriptionId(self.next_subscription.get());
		self.next_subscription.set(id.0 + 1);
		self.observers.borrow_mut().push((id, Rc::new(observer)));
		id
	}

	pub fn unsubscribe(&self, id: SubscriptionId) {
		self.observers.borrow_mut().retain(|(sid, _)| *sid != id);
	}

	fn notify(&self, change: StoreChange) {
		// Observers may subscribe or mutate in turn, so iterate over a copy.
		let observers: Vec<Observer> = self
			.observers
			.borrow()
			.iter()
			.map(|(_, o)| Rc::clone(o))
			.collect();
		for observer in observers {
			observer(change);
		}
	}

	// Readers

	pub fn is_authenticated(&self) -> bool {
		self.state.borrow().authenticated
	}

	/// Identifies the current sign-in. Work started under an older session
	/// must not touch the store.
	pub fn session(&self) -> u64 {
		self.state.borrow().session
	}

	pub fn token(&self) -> Option<String> {
		self.state.borrow().token.clone()
	}

	pub fn backend_healthy(&self) -> bool {
		self.state.borrow().backend_healthy
	}

	/// The current snapshot. Cheap to clone and never observed half-replaced.
	pub fn snapshot(&self) -> Rc<GraphSnapshot> {
		Rc::clone(&self.state.borrow().snapshot)
	}

	/// Bumped on every snapshot replacement, including clears.
	pub fn snapshot_revision(&self) -> u64 {
		self.state.borrow().snapshot_revision
	}

	pub fn selection(&self) -> SelectionState {
		self.state.borrow().selection.clone()
	}

	pub fn selected_node(&self) -> Option<String> {
		self.state.borrow().selection.selected_node.clone()
	}

	pub fn focused_node(&self) -> Option<String> {
		self.state.borrow().selection.focused_node.clone()
	}

	pub fn render_flags(&self) -> RenderFlags {
		self.state.borrow().flags
	}

	/// Whether a camera move toward a selected node is waiting to be consumed.
	pub fn move_to_selected_node(&self) -> bool {
		!self.state.borrow().camera_moves.is_empty()
	}

	pub fn renderer(&self) -> Option<RendererHandle> {
		self.state.borrow().renderer
	}

	pub fn render_error(&self) -> Option<String> {
		self.state.borrow().render_error.clone()
	}

	pub fn settings(&self) -> Settings {
		self.state.borrow().settings.clone()
	}

	pub fn notice(&self) -> Option<Notice> {
		self.state.borrow().notice.clone()
	}

	// Mutators

	/// Replace the snapshot wholesale. Input is validated first, so observers
	/// only ever see a complete, consistent snapshot.
	pub fn set_snapshot(&self, nodes: Vec<Node>, edges: Vec<Edge>) {
		let snapshot = Rc::new(GraphSnapshot::new(nodes, edges));
		let (selection_changed, focus_changed) = {
			let mut state = self.state.borrow_mut();
			state.snapshot = snapshot;
			state.snapshot_revision += 1;
			debug!(
				"snapshot r{}: {} nodes, {} edges",
				state.snapshot_revision,
				state.snapshot.nodes().len(),
				state.snapshot.edges().len()
			);
			state.prune_dangling()
		};
		self.notify(StoreChange::Snapshot);
		if selection_changed {
			self.notify(StoreChange::Selection);
		}
		if focus_changed {
			self.notify(StoreChange::Focus);
		}
	}

	/// Empty the snapshot, e.g. when the owning view goes away.
	pub fn clear_snapshot(&self) {
		self.set_snapshot(Vec::new(), Vec::new());
	}

	/// Commit a selection. With `pan_to`, also queue one camera move to the node;
	/// every call queues its own move, even for an unchanged selection.
	/// An id missing from the snapshot is ignored.
	pub fn set_selected_node(&self, id: Option<&str>, pan_to: bool) {
		{
			let mut state = self.state.borrow_mut();
			match id {
				Some(id) if !state.snapshot.contains_node(id) => {
					warn!("ignoring selection of unknown node {id:?}");
					return;
				}
				Some(id) => {
					state.selection.selected_node = Some(id.to_string());
					if pan_to {
						state.camera_moves.push_back(id.to_string());
					}
				}
				None => state.selection.selected_node = None,
			}
		}
		self.notify(StoreChange::Selection);
		if pan_to && id.is_some() {
			self.notify(StoreChange::RenderFlags);
		}
	}

	/// Set or clear the previewed node. An id missing from the snapshot is ignored.
	pub fn set_focused_node(&self, id: Option<&str>) {
		{
			let mut state = self.state.borrow_mut();
			match id {
				Some(id) if !state.snapshot.contains_node(id) => {
					warn!("ignoring focus of unknown node {id:?}");
					return;
				}
				id => state.selection.focused_node = id.map(String::from),
			}
		}
		self.notify(StoreChange::Focus);
	}

	/// Hand out every queued camera move, oldest first. Each move is returned
	/// exactly once.
	pub fn take_camera_moves(&self) -> Vec<String> {
		self.state.borrow_mut().camera_moves.drain(..).collect()
	}

	pub fn set_should_render(&self, value: bool) {
		self.state.borrow_mut().flags.should_render = value;
		self.notify(StoreChange::RenderFlags);
	}

	pub fn set_fetching(&self, value: bool) {
		self.state.borrow_mut().flags.is_fetching = value;
		self.notify(StoreChange::RenderFlags);
	}

	/// Record or release the live rendering context.
	pub fn set_renderer(&self, handle: Option<RendererHandle>) {
		{
			let mut state = self.state.borrow_mut();
			if state.renderer == handle {
				return;
			}
			debug!("renderer {:?} -> {:?}", state.renderer, handle);
			state.renderer = handle;
			if handle.is_some() {
				state.render_error = None;
			}
		}
		self.notify(StoreChange::Renderer);
	}

	pub fn set_render_error(&self, error: Option<String>) {
		self.state.borrow_mut().render_error = error;
		self.notify(StoreChange::Renderer);
	}

	pub fn set_backend_health(&self, healthy: bool) {
		{
			let mut state = self.state.borrow_mut();
			if state.backend_healthy == healthy {
				return;
			}
			info!("backend {}", if healthy { "reachable" } else { "unreachable" });
			state.backend_healthy = healthy;
		}
		self.notify(StoreChange::Backend);
	}

	pub fn update_settings(&self, f: impl FnOnce(&mut Settings)) {
		f(&mut self.state.borrow_mut().settings);
		self.notify(StoreChange::Settings);
	}

	pub fn set_notice(&self, notice: Option<Notice>) {
		self.state.borrow_mut().notice = notice;
		self.notify(StoreChange::Notice);
	}

	pub fn login(&self, token: impl Into<String>) {
		{
			let mut state = self.state.borrow_mut();
			state.authenticated = true;
			state.token = Some(token.into());
			state.session += 1;
		}
		info!("signed in");
		self.notify(StoreChange::Auth);
	}

	/// Sign out and reset every piece of session state. The renderer handle is
	/// left alone: the canvas outlives the session.
	pub fn logout(&self) {
		{
			let mut state = self.state.borrow_mut();
			state.authenticated = false;
			state.token = None;
			state.session += 1;
			state.snapshot = Rc::new(GraphSnapshot::default());
			state.snapshot_revision += 1;
			state.selection = SelectionState::default();
			state.flags = RenderFlags::default();
			state.camera_moves.clear();
			state.notice = None;
		}
		info!("signed out");
		self.notify(StoreChange::Auth);
		self.notify(StoreChange::Snapshot);
		self.notify(StoreChange::Selection);
		self.notify(StoreChange::Focus);
		self.notify(StoreChange::RenderFlags);
	}
}
