use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo_timers::callback::Interval;
use leptos::prelude::*;
use log::{debug, error, warn};
use send_wrapper::SendWrapper;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent, WheelEvent};

use super::controls::{
	NodeDetails, NoticeText, PropertiesPanel, SearchBar, SearchEvent, StatusOverlay,
};
use super::focus::{self, SearchHit};
use super::interaction::{InteractionController, KeyCommand, PointerOutcome};
use super::lifecycle::{LifecycleAction, LifecycleManager};
use super::loader::spawn_graph_fetch;
use super::render::{self, RenderView};
use super::state::GraphSurface;
use super::status::ViewStatus;
use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::error::GraphError;
use crate::stores::{GraphStore, Notice, RendererHandle, Settings, StoreChange, SubscriptionId};

const FRAME_DT: f32 = 0.016;
const SEARCH_LIMIT: usize = 8;

type SurfaceCell = Rc<RefCell<Option<GraphSurface>>>;
type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Store state mirrored into signals for the reactive parts of the view.
#[derive(Clone, Copy)]
struct ViewSignals {
	status: RwSignal<ViewStatus>,
	is_fetching: RwSignal<bool>,
	settings: RwSignal<Settings>,
	notice: RwSignal<Option<Notice>>,
	details: RwSignal<Option<NodeDetails>>,
	/// Bumped whenever auth, backend health or render flags change.
	lifecycle_inputs: RwSignal<u64>,
	/// Bumped on every snapshot replacement.
	snapshot_revision: RwSignal<u64>,
}

fn set_if_changed<T: PartialEq + Send + Sync + 'static>(signal: RwSignal<T>, value: T) {
	if signal.with_untracked(|current| *current != value) {
		signal.set(value);
	}
}

impl ViewSignals {
	fn new(store: &GraphStore) -> Self {
		Self {
			status: RwSignal::new(ViewStatus::of(store)),
			is_fetching: RwSignal::new(store.render_flags().is_fetching),
			settings: RwSignal::new(store.settings()),
			notice: RwSignal::new(store.notice()),
			details: RwSignal::new(None),
			lifecycle_inputs: RwSignal::new(0),
			snapshot_revision: RwSignal::new(store.snapshot_revision()),
		}
	}

	fn pull(&self, store: &GraphStore, change: StoreChange) {
		set_if_changed(self.status, ViewStatus::of(store));
		set_if_changed(self.is_fetching, store.render_flags().is_fetching);
		match change {
			StoreChange::Settings => set_if_changed(self.settings, store.settings()),
			StoreChange::Notice => set_if_changed(self.notice, store.notice()),
			StoreChange::Auth | StoreChange::Backend | StoreChange::RenderFlags => {
				self.lifecycle_inputs.update(|n| *n = n.wrapping_add(1))
			}
			_ => {}
		}
		if matches!(
			change,
			StoreChange::Snapshot | StoreChange::Selection | StoreChange::Focus
		) {
			let details = focus::auto_focused_node(store)
				.and_then(|id| NodeDetails::from_snapshot(&store.snapshot(), &id));
			set_if_changed(self.details, details);
		}
		if change == StoreChange::Snapshot {
			set_if_changed(self.snapshot_revision, store.snapshot_revision());
		}
	}
}

/// Shared handles the event handlers, timers and effects work through.
#[derive(Clone)]
struct Viewer {
	store: Rc<GraphStore>,
	lifecycle: Rc<RefCell<LifecycleManager>>,
	surface: SurfaceCell,
	controller: Rc<RefCell<InteractionController>>,
	poll: Rc<RefCell<Option<Interval>>>,
	client: ApiClient,
	poll_interval_ms: u32,
}

impl Viewer {
	fn fetch(&self) {
		spawn_graph_fetch(
			Rc::clone(&self.store),
			Rc::clone(&self.lifecycle),
			self.client.clone(),
		);
	}

	fn perform(&self, actions: Vec<LifecycleAction>) {
		for action in actions {
			debug!("lifecycle: {action:?}");
			match action {
				LifecycleAction::EnableRendering => {}
				LifecycleAction::Fetch => self.fetch(),
				LifecycleAction::StartPolling => {
					let viewer = self.clone();
					*self.poll.borrow_mut() =
						Some(Interval::new(self.poll_interval_ms, move || viewer.fetch()));
				}
				LifecycleAction::StopPolling => {
					// Dropping the interval cancels it.
					self.poll.borrow_mut().take();
				}
				LifecycleAction::ReleaseRenderer => {
					if let Some(ref mut s) = *self.surface.borrow_mut() {
						s.dispose();
					}
				}
			}
		}
	}

	fn set_visible(&self, visible: bool) {
		let actions = self.lifecycle.borrow_mut().set_visible(visible, &self.store);
		self.perform(actions);
	}

	fn refresh_lifecycle(&self) {
		let actions = self.lifecycle.borrow_mut().refresh(&self.store);
		self.perform(actions);
	}

	fn requery(&self) {
		let actions = self.lifecycle.borrow_mut().requery();
		self.perform(actions);
	}

	fn unmount(&self) {
		let actions = self.lifecycle.borrow_mut().unmount(&self.store);
		self.perform(actions);
	}

	fn with_surface(&self, f: impl FnOnce(&mut GraphSurface)) {
		if let Some(ref mut s) = *self.surface.borrow_mut() {
			f(s);
		}
	}
}

/// One animation frame: pick up a new snapshot, consume camera moves, advance
/// the simulation, and redraw if anything changed.
fn frame(viewer: &Viewer, ctx: &CanvasRenderingContext2d, redraw: &Cell<bool>) -> bool {
	let store = &viewer.store;
	let mut guard = viewer.surface.borrow_mut();
	let Some(s) = guard.as_mut() else {
		return true;
	};
	if s.is_disposed() {
		return false;
	}
	let revision = store.snapshot_revision();
	if s.synced_revision() != Some(revision) {
		s.sync(&store.snapshot(), revision);
		viewer.controller.borrow_mut().on_surface_synced(s);
	}
	focus::apply_camera_moves(store, s);

	let on_screen = viewer.lifecycle.borrow().state().is_on_screen();
	if !on_screen || !store.render_flags().should_render {
		return true;
	}
	if redraw.replace(false) {
		s.mark_dirty();
	}
	s.tick(FRAME_DT);
	if s.take_dirty() {
		let (selected, focused) = (store.selected_node(), store.focused_node());
		let controller = viewer.controller.borrow();
		let show_edge_labels = store.settings().show_edge_labels;
		render::render(
			s,
			ctx,
			&RenderView {
				selected: selected.as_deref(),
				focused: focused.as_deref(),
				hovered: controller
					.dragged_node()
					.or(controller.hovered.as_deref()),
				show_edge_labels,
			},
		);
	}
	true
}

fn canvas_context(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, GraphError> {
	canvas
		.get_context("2d")
		.map_err(|e| GraphError::RenderInit(format!("{e:?}")))?
		.ok_or_else(|| GraphError::RenderInit("2d context not supported".into()))?
		.dyn_into()
		.map_err(|_| GraphError::RenderInit("unexpected context type".into()))
}

fn container_size(canvas: &HtmlCanvasElement) -> (f64, f64) {
	canvas
		.parent_element()
		.map(|p| (p.client_width() as f64, p.client_height() as f64))
		.filter(|(w, h)| *w > 0.0 && *h > 0.0)
		.unwrap_or((800.0, 600.0))
}

/// Match the canvas backing store to its container and tell the surface.
fn fit_to_container(viewer: &Viewer, canvas: &HtmlCanvasElement) {
	let (w, h) = container_size(canvas);
	canvas.set_width(w as u32);
	canvas.set_height(h as u32);
	viewer.with_surface(|s| s.resize(w, h));
}

fn pointer_position(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

/// Knowledge-graph tab: canvas, controls and overlays bound to `store`.
///
/// `visible` says whether the tab is on screen. The canvas and its surface
/// survive the tab being hidden and are released only when the component is
/// dropped.
#[component]
pub fn GraphViewer(
	store: Rc<GraphStore>,
	config: AppConfig,
	#[prop(into)] visible: Signal<bool>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let container_ref = NodeRef::<leptos::html::Div>::new();
	let viewer = Viewer {
		store: Rc::clone(&store),
		lifecycle: Rc::new(RefCell::new(LifecycleManager::default())),
		surface: Rc::new(RefCell::new(None)),
		controller: Rc::new(RefCell::new(InteractionController::default())),
		poll: Rc::new(RefCell::new(None)),
		client: ApiClient::new(config.api_base.clone()),
		poll_interval_ms: config.poll_interval_ms,
	};
	let redraw = Rc::new(Cell::new(true));
	let animate: FrameCallback = Rc::new(RefCell::new(None));
	let resize_cb: FrameCallback = Rc::new(RefCell::new(None));

	let signals = ViewSignals::new(&store);
	let subscription: SubscriptionId = {
		let (store_obs, redraw_obs) = (Rc::clone(&store), Rc::clone(&redraw));
		store.subscribe(move |change| {
			redraw_obs.set(true);
			signals.pull(&store_obs, change);
		})
	};

	// Search box state; selections are applied to the store by an effect below.
	let query = RwSignal::new(String::new());
	let hits = RwSignal::new(Vec::<SearchHit>::new());
	let search_events = RwSignal::new(None::<SearchEvent>);

	let (viewer_init, animate_init, resize_init, redraw_init) = (
		viewer.clone(),
		animate.clone(),
		resize_cb.clone(),
		redraw.clone(),
	);
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if viewer_init.surface.borrow().is_some() {
			return;
		}
		let ctx = match canvas_context(&canvas) {
			Ok(ctx) => ctx,
			Err(err) => {
				error!("graph canvas unavailable: {err}");
				viewer_init.store.set_render_error(Some(err.to_string()));
				return;
			}
		};
		let (w, h) = container_size(&canvas);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		let mut surface = GraphSurface::new(w, h, config.simulation);
		surface.layout = viewer_init.store.settings().layout;
		*viewer_init.surface.borrow_mut() = Some(surface);
		viewer_init.store.set_renderer(Some(RendererHandle::next()));

		let (viewer_resize, canvas_resize) = (viewer_init.clone(), canvas.clone());
		*resize_init.borrow_mut() =
			Some(Closure::new(move || fit_to_container(&viewer_resize, &canvas_resize)));
		if let (Some(window), Some(cb)) = (web_sys::window(), resize_init.borrow().as_ref()) {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (viewer_anim, animate_inner, redraw_anim) =
			(viewer_init.clone(), animate_init.clone(), redraw_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if !frame(&viewer_anim, &ctx, &redraw_anim) {
				debug!("render loop stopped");
				return;
			}
			if let (Some(window), Some(cb)) = (web_sys::window(), animate_inner.borrow().as_ref()) {
				let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let (Some(window), Some(cb)) = (web_sys::window(), animate_init.borrow().as_ref()) {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let viewer_vis = viewer.clone();
	Effect::new(move |_| {
		let visible = visible.get();
		viewer_vis.set_visible(visible);
		// The container has no size while hidden.
		if visible && let Some(canvas) = canvas_ref.get_untracked() {
			fit_to_container(&viewer_vis, &canvas);
		}
	});

	let viewer_refresh = viewer.clone();
	Effect::new(move |_| {
		signals.lifecycle_inputs.track();
		viewer_refresh.refresh_lifecycle();
	});

	let store_search = Rc::clone(&store);
	Effect::new(move |_| {
		let q = query.get();
		signals.snapshot_revision.track();
		hits.set(focus::search_nodes(&store_search.snapshot(), &q, SEARCH_LIMIT));
	});

	let store_events = Rc::clone(&store);
	Effect::new(move |_| match search_events.get() {
		Some(SearchEvent::Focus(option)) => focus::on_search_focus(&store_events, option.as_ref()),
		Some(SearchEvent::Select(option)) => {
			focus::on_search_select(&store_events, option.as_ref())
		}
		None => {}
	});

	let teardown = SendWrapper::new({
		let (viewer, resize_cb) = (viewer.clone(), resize_cb.clone());
		move || {
			// The view's signals may already be gone.
			viewer.store.unsubscribe(subscription);
			viewer.unmount();
			if let (Some(window), Some(cb)) = (web_sys::window(), resize_cb.borrow().as_ref()) {
				let _ =
					window.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
			resize_cb.borrow_mut().take();
		}
	});
	on_cleanup(move || (teardown.take())());

	// Canvas input.
	let (viewer_md, viewer_mm, viewer_mu, viewer_ml, viewer_wh) = (
		viewer.clone(),
		viewer.clone(),
		viewer.clone(),
		viewer.clone(),
		viewer.clone(),
	);
	let on_mousedown = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = pointer_position(&canvas, &ev);
		let enable_drag = viewer_md.store.settings().enable_node_drag;
		let controller = &viewer_md.controller;
		viewer_md.with_surface(|s| controller.borrow_mut().pointer_down(s, x, y, enable_drag));
	};
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = pointer_position(&canvas, &ev);
		let controller = &viewer_mm.controller;
		let mut outcome = PointerOutcome::Ignored;
		viewer_mm.with_surface(|s| outcome = controller.borrow_mut().pointer_move(s, x, y));
		if outcome == PointerOutcome::DraggedNode {
			ev.prevent_default();
			ev.stop_propagation();
		}
	};
	let on_mouseup = move |_: MouseEvent| {
		let controller = &viewer_mu.controller;
		viewer_mu.with_surface(|s| controller.borrow_mut().pointer_up(s));
	};
	let on_mouseleave = move |_: MouseEvent| {
		let controller = &viewer_ml.controller;
		viewer_ml.with_surface(|s| controller.borrow_mut().pointer_leave(s));
	};
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = pointer_position(&canvas, &ev);
		let controller = &viewer_wh.controller;
		viewer_wh.with_surface(|s| controller.borrow_mut().wheel(s, x, y, ev.delta_y()));
	};
	let on_click = {
		let store = Rc::clone(&store);
		let viewer = viewer.clone();
		move |ev: MouseEvent| {
			let Some(canvas) = canvas_ref.get() else {
				return;
			};
			if !viewer.controller.borrow_mut().take_click() {
				return;
			}
			let (x, y) = pointer_position(&canvas, &ev);
			let mut hit = None;
			viewer.with_surface(|s| hit = s.node_at_position(x, y));
			// Clicking the background clears the selection.
			store.set_selected_node(hit.as_deref(), false);
		}
	};
	let on_keydown = {
		let viewer = viewer.clone();
		move |ev: KeyboardEvent| {
			let Some(command) = KeyCommand::from_key(&ev.key()) else {
				return;
			};
			ev.prevent_default();
			let controller = &viewer.controller;
			viewer.with_surface(|s| controller.borrow_mut().key(s, command));
			if command == KeyCommand::Escape {
				viewer.store.set_selected_node(None, false);
			}
		}
	};

	// Toolbar.
	let zoom = |viewer: Viewer, command: KeyCommand| {
		move |_: MouseEvent| {
			let controller = &viewer.controller;
			viewer.with_surface(|s| controller.borrow_mut().key(s, command));
		}
	};
	let on_zoom_in = zoom(viewer.clone(), KeyCommand::ZoomIn);
	let on_zoom_out = zoom(viewer.clone(), KeyCommand::ZoomOut);
	let on_zoom_reset = zoom(viewer.clone(), KeyCommand::ResetView);
	let on_fullscreen = {
		let viewer = viewer.clone();
		move |_: MouseEvent| {
			let Some(document) = web_sys::window().and_then(|w| w.document()) else {
				return;
			};
			if document.fullscreen_element().is_some() {
				document.exit_fullscreen();
				viewer.with_surface(|s| s.camera.fullscreen = false);
			} else if let Some(container) = container_ref.get() {
				match container.request_fullscreen() {
					Ok(()) => viewer.with_surface(|s| s.camera.fullscreen = true),
					Err(e) => warn!("fullscreen refused: {e:?}"),
				}
			}
		}
	};
	let on_layout = {
		let viewer = viewer.clone();
		move |_: MouseEvent| {
			let next = viewer.store.settings().layout.next();
			viewer.store.update_settings(|s| s.layout = next);
			viewer.with_surface(|s| s.apply_layout(next));
		}
	};
	// Query form; applying it reloads the graph for the new root label.
	let query_label = RwSignal::new(store.settings().query_label);
	let query_depth = RwSignal::new(store.settings().max_query_depth.to_string());
	let on_query = {
		let viewer = viewer.clone();
		move |ev: leptos::ev::SubmitEvent| {
			ev.prevent_default();
			let mut next = viewer.store.settings();
			if next.set_query(&query_label.get_untracked(), &query_depth.get_untracked()) {
				viewer.store.update_settings(|s| *s = next);
				viewer.requery();
			}
			let applied = viewer.store.settings();
			query_label.set(applied.query_label);
			query_depth.set(applied.max_query_depth.to_string());
		}
	};
	let on_refresh = {
		let viewer = viewer.clone();
		move |_: MouseEvent| viewer.fetch()
	};
	let toggle = |store: Rc<GraphStore>, f: fn(&mut Settings)| {
		move |_: MouseEvent| store.update_settings(f)
	};
	let on_toggle_panel = toggle(Rc::clone(&store), |s| {
		s.show_property_panel = !s.show_property_panel
	});
	let on_toggle_search = toggle(Rc::clone(&store), |s| {
		s.show_node_search_bar = !s.show_node_search_bar
	});
	let on_toggle_drag = toggle(Rc::clone(&store), |s| s.enable_node_drag = !s.enable_node_drag);
	let on_toggle_edge_labels =
		toggle(Rc::clone(&store), |s| s.show_edge_labels = !s.show_edge_labels);
	let on_dismiss_notice = {
		let store = Rc::clone(&store);
		move |_: MouseEvent| store.set_notice(None)
	};

	let settings = signals.settings;
	let shown = |on: bool, display: &'static str| if on { display } else { "none" };

	view! {
		<div node_ref=container_ref class="graph-viewer">
			<canvas
				node_ref=canvas_ref
				class="graph-canvas"
				tabindex="0"
				on:keydown=on_keydown
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				on:click=on_click
				style="display: block; cursor: grab;"
			/>

			<div class="graph-top-left">
				<span class="graph-layout-label">
					{move || format!("Layout: {}", settings.get().layout.label())}
				</span>
				<form class="graph-query" on:submit=on_query>
					<input
						type="text"
						title="Root label (* for everything)"
						prop:value=move || query_label.get()
						on:input=move |ev| query_label.set(event_target_value(&ev))
					/>
					<input
						type="number"
						min="1"
						title="Max depth"
						prop:value=move || query_depth.get()
						on:input=move |ev| query_depth.set(event_target_value(&ev))
					/>
					<button type="submit">"Load"</button>
				</form>
				<div style:display=move || shown(settings.get().show_node_search_bar, "block")>
					<SearchBar query=query hits=hits events=search_events />
				</div>
			</div>

			<div class="graph-toolbar">
				<button title="Cycle layout" on:click=on_layout>"⟳"</button>
				<button title="Zoom in" on:click=on_zoom_in>"+"</button>
				<button title="Zoom out" on:click=on_zoom_out>"−"</button>
				<button title="Fit graph" on:click=on_zoom_reset>"⤢"</button>
				<button title="Fullscreen" on:click=on_fullscreen>"⛶"</button>
				<button title="Reload graph" on:click=on_refresh>"↻"</button>
			</div>

			<div class="graph-settings">
				<label>
					<input
						type="checkbox"
						prop:checked=move || settings.get().show_property_panel
						on:click=on_toggle_panel
					/>
					"Properties"
				</label>
				<label>
					<input
						type="checkbox"
						prop:checked=move || settings.get().show_node_search_bar
						on:click=on_toggle_search
					/>
					"Search"
				</label>
				<label>
					<input
						type="checkbox"
						prop:checked=move || settings.get().enable_node_drag
						on:click=on_toggle_drag
					/>
					"Drag nodes"
				</label>
				<label>
					<input
						type="checkbox"
						prop:checked=move || settings.get().show_edge_labels
						on:click=on_toggle_edge_labels
					/>
					"Edge labels"
				</label>
			</div>

			<div
				class="graph-top-right"
				style:display=move || shown(settings.get().show_property_panel, "block")
			>
				<PropertiesPanel details=signals.details />
			</div>

			<div
				class="graph-notice"
				style:display=move || shown(signals.notice.get().is_some(), "flex")
			>
				<NoticeText notice=signals.notice />
				<button on:click=on_dismiss_notice>"×"</button>
			</div>

			<StatusOverlay status=signals.status />
			<Show when=move || signals.is_fetching.get() && !matches!(signals.status.get(), ViewStatus::Loading)>
				<div class="graph-fetching">"Refreshing…"</div>
			</Show>
		</div>
	}
}
