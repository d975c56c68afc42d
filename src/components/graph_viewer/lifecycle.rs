//! Ties rendering and polling to whether the graph tab is on screen.

use log::{debug, info};

use crate::stores::GraphStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Visibility {
	#[default]
	Hidden,
	/// On screen, but polling is not allowed right now.
	VisibleIdle,
	/// On screen and polling.
	VisibleActive,
	/// Torn down for good.
	Unmounted,
}

impl Visibility {
	pub fn is_on_screen(self) -> bool {
		matches!(self, Self::VisibleIdle | Self::VisibleActive)
	}
}

/// Side effects the owner of the timers and the canvas has to carry out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleAction {
	/// Rendering was just enabled.
	EnableRendering,
	/// Load the graph now rather than on the next poll.
	Fetch,
	StartPolling,
	StopPolling,
	/// Dispose the render surface.
	ReleaseRenderer,
}

/// Proof that a fetch was started in the current visibility generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchTicket(u64);

#[derive(Debug, Default)]
pub struct LifecycleManager {
	state: Visibility,
	/// Store session in which rendering was last enabled. Rendering is
	/// enabled at most once per session.
	init_session: Option<u64>,
	generation: u64,
}

impl LifecycleManager {
	pub fn state(&self) -> Visibility {
		self.state
	}

	pub fn is_polling(&self) -> bool {
		self.state == Visibility::VisibleActive
	}

	/// The graph tab became visible or hidden.
	pub fn set_visible(&mut self, visible: bool, store: &GraphStore) -> Vec<LifecycleAction> {
		match (self.state, visible) {
			(Visibility::Unmounted, _) => Vec::new(),
			(Visibility::Hidden, false) => Vec::new(),
			(_, false) => {
				let was_polling = self.is_polling();
				self.state = Visibility::Hidden;
				self.generation += 1;
				debug!("graph tab hidden, generation {}", self.generation);
				if was_polling {
					vec![LifecycleAction::StopPolling]
				} else {
					Vec::new()
				}
			}
			(Visibility::Hidden, true) => {
				self.state = Visibility::VisibleIdle;
				debug!("graph tab shown");
				self.refresh(store)
			}
			(_, true) => self.refresh(store),
		}
	}

	/// Re-evaluate after auth, backend health, or render flags changed.
	pub fn refresh(&mut self, store: &GraphStore) -> Vec<LifecycleAction> {
		if !self.state.is_on_screen() {
			return Vec::new();
		}
		let mut actions = Vec::new();

		let flags = store.render_flags();
		// Once per view, and again after every later sign-in.
		let session = store.session();
		let armed = match self.init_session {
			None => true,
			Some(done) => store.is_authenticated() && done != session,
		};
		if armed && !flags.should_render && !flags.is_fetching {
			self.init_session = Some(session);
			store.set_should_render(true);
			info!("graph viewer initialized");
			actions.push(LifecycleAction::EnableRendering);
		}

		let may_poll = store.is_authenticated()
			&& store.backend_healthy()
			&& store.render_flags().should_render;
		match (self.state, may_poll) {
			(Visibility::VisibleIdle, true) => {
				self.state = Visibility::VisibleActive;
				actions.push(LifecycleAction::StartPolling);
			}
			(Visibility::VisibleActive, false) => {
				self.state = Visibility::VisibleIdle;
				actions.push(LifecycleAction::StopPolling);
			}
			_ => {}
		}
		if !actions.is_empty() && !actions.contains(&LifecycleAction::StopPolling) {
			actions.push(LifecycleAction::Fetch);
		}
		actions
	}

	/// The graph query changed: results of fetches already in flight no
	/// longer apply, and the graph is reloaded if on screen.
	pub fn requery(&mut self) -> Vec<LifecycleAction> {
		if !self.state.is_on_screen() {
			return Vec::new();
		}
		self.generation += 1;
		debug!("graph query changed, generation {}", self.generation);
		vec![LifecycleAction::Fetch]
	}

	/// Permanent teardown: stop polling, invalidate in-flight fetches, release
	/// the renderer, and clear the graph. Later calls do nothing.
	pub fn unmount(&mut self, store: &GraphStore) -> Vec<LifecycleAction> {
		if self.state == Visibility::Unmounted {
			return Vec::new();
		}
		let mut actions = Vec::new();
		if self.is_polling() {
			actions.push(LifecycleAction::StopPolling);
		}
		self.state = Visibility::Unmounted;
		self.generation += 1;
		store.set_renderer(None);
		store.clear_snapshot();
		info!("graph viewer unmounted");
		actions.push(LifecycleAction::ReleaseRenderer);
		actions
	}

	/// Ticket for a fetch started now, or `None` while off screen.
	pub fn begin_fetch(&self) -> Option<FetchTicket> {
		self.state
			.is_on_screen()
			.then_some(FetchTicket(self.generation))
	}

	/// Whether a fetch started with `ticket` may still apply its result.
	pub fn accepts(&self, ticket: FetchTicket) -> bool {
		ticket.0 == self.generation && self.state.is_on_screen()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::stores::RendererHandle;

	fn authed() -> GraphStore {
		let store = GraphStore::default();
		store.login("t");
		store
	}

	#[test]
	fn rendering_is_enabled_exactly_once() {
		let store = authed();
		let mut lc = LifecycleManager::default();
		let mut enables = 0;
		for visible in [false, true, false, true, false, true] {
			enables += lc
				.set_visible(visible, &store)
				.iter()
				.filter(|a| **a == LifecycleAction::EnableRendering)
				.count();
			// Somebody else turning rendering off must not re-arm the guard.
			store.set_should_render(false);
		}
		assert_eq!(enables, 1);
	}

	#[test]
	fn init_waits_for_in_flight_fetch() {
		let store = authed();
		store.set_fetching(true);
		let mut lc = LifecycleManager::default();
		assert!(lc.set_visible(true, &store).is_empty());
		assert!(!store.render_flags().should_render);

		store.set_fetching(false);
		assert_eq!(
			lc.refresh(&store),
			vec![
				LifecycleAction::EnableRendering,
				LifecycleAction::StartPolling,
				LifecycleAction::Fetch
			]
		);
	}

	#[test]
	fn polling_follows_visibility_auth_and_health() {
		let store = GraphStore::default();
		let mut lc = LifecycleManager::default();
		lc.set_visible(true, &store);
		assert_eq!(lc.state(), Visibility::VisibleIdle);

		store.login("t");
		assert_eq!(
			lc.refresh(&store),
			vec![LifecycleAction::StartPolling, LifecycleAction::Fetch]
		);
		assert!(lc.is_polling());

		store.set_backend_health(false);
		assert_eq!(lc.refresh(&store), vec![LifecycleAction::StopPolling]);
		store.set_backend_health(true);
		assert_eq!(
			lc.refresh(&store),
			vec![LifecycleAction::StartPolling, LifecycleAction::Fetch]
		);

		assert_eq!(lc.set_visible(false, &store), vec![LifecycleAction::StopPolling]);
		assert!(lc.set_visible(false, &store).is_empty());
		assert!(lc.refresh(&store).is_empty());
	}

	#[test]
	fn hiding_and_unmounting_invalidate_tickets() {
		let store = authed();
		let mut lc = LifecycleManager::default();
		assert_eq!(lc.begin_fetch(), None);

		lc.set_visible(true, &store);
		let ticket = lc.begin_fetch().expect("visible");
		assert!(lc.accepts(ticket));
		lc.set_visible(false, &store);
		lc.set_visible(true, &store);
		assert!(!lc.accepts(ticket));

		let ticket = lc.begin_fetch().expect("visible");
		store.set_renderer(Some(RendererHandle::next()));
		let actions = lc.unmount(&store);
		assert_eq!(
			actions,
			vec![LifecycleAction::StopPolling, LifecycleAction::ReleaseRenderer]
		);
		assert!(!lc.accepts(ticket));
		assert_eq!(store.renderer(), None);
		assert!(lc.unmount(&store).is_empty());
		assert!(lc.set_visible(true, &store).is_empty());
	}

	#[test]
	fn first_fetch_follows_sign_in_immediately() {
		let store = GraphStore::default();
		let mut lc = LifecycleManager::default();
		let shown = lc.set_visible(true, &store);
		assert_eq!(
			shown,
			vec![LifecycleAction::EnableRendering, LifecycleAction::Fetch]
		);

		store.login("t");
		assert!(lc.refresh(&store).contains(&LifecycleAction::Fetch));
	}

	#[test]
	fn signing_out_and_back_in_resumes_rendering_and_polling() {
		let store = authed();
		let mut lc = LifecycleManager::default();
		assert_eq!(
			lc.set_visible(true, &store),
			vec![
				LifecycleAction::EnableRendering,
				LifecycleAction::StartPolling,
				LifecycleAction::Fetch
			]
		);

		store.logout();
		assert_eq!(lc.refresh(&store), vec![LifecycleAction::StopPolling]);

		assert!(!store.render_flags().should_render);

		store.login("t2");
		assert_eq!(
			lc.refresh(&store),
			vec![
				LifecycleAction::EnableRendering,
				LifecycleAction::StartPolling,
				LifecycleAction::Fetch
			]
		);
		assert!(store.render_flags().should_render);
		assert!(lc.is_polling());
	}

	#[test]
	fn requery_invalidates_in_flight_fetches() {
		let store = authed();
		let mut lc = LifecycleManager::default();
		assert!(lc.requery().is_empty());

		lc.set_visible(true, &store);
		let ticket = lc.begin_fetch().expect("visible");
		assert_eq!(lc.requery(), vec![LifecycleAction::Fetch]);
		assert!(!lc.accepts(ticket));
		assert!(lc.begin_fetch().is_some_and(|t| lc.accepts(t)));
	}
}
