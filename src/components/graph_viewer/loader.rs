//! Loading graph data into the store without ever applying a stale result.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::task::spawn_local;
use log::{debug, error};

use super::lifecycle::{FetchTicket, LifecycleManager};
use super::types::{Edge, Node};
use crate::api::ApiClient;
use crate::error::GraphError;
use crate::stores::{GraphStore, Notice, NoticeLevel};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
	Applied,
	/// The view went away while the request was in flight.
	Discarded,
	/// The previous snapshot was kept and a notice raised.
	Failed,
}

/// A fetch that was allowed to start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingFetch {
	pub ticket: FetchTicket,
	/// Store session the request was made under.
	pub session: u64,
}

/// Mark a fetch as started, unless one is running, the user is signed out,
/// or the view is off screen (`ticket` is `None`).
pub fn start_fetch(store: &GraphStore, ticket: Option<FetchTicket>) -> Option<PendingFetch> {
	if !store.is_authenticated() {
		debug!("not fetching graph: signed out");
		return None;
	}
	if store.render_flags().is_fetching {
		debug!("not fetching graph: request already in flight");
		return None;
	}
	let ticket = ticket?;
	store.set_fetching(true);
	Some(PendingFetch {
		ticket,
		session: store.session(),
	})
}

/// Apply a fetch result. `accepted` is the lifecycle's verdict on the fetch's
/// ticket, taken when the response arrived.
///
/// A result from an earlier session is dropped without touching the store:
/// sign-out already reset the fetching flag and a newer fetch may own it.
pub fn finish_fetch(
	store: &GraphStore,
	pending: PendingFetch,
	accepted: bool,
	result: Result<(Vec<Node>, Vec<Edge>), GraphError>,
) -> FetchOutcome {
	if store.session() != pending.session {
		debug!("discarding graph fetched before the session changed");
		return FetchOutcome::Discarded;
	}
	store.set_fetching(false);
	if !accepted {
		debug!("discarding graph fetched for a view that is gone");
		return FetchOutcome::Discarded;
	}
	match result {
		Ok((nodes, edges)) => {
			store.set_snapshot(nodes, edges);
			if store
				.notice()
				.is_some_and(|n| n.level == NoticeLevel::Error)
			{
				store.set_notice(None);
			}
			FetchOutcome::Applied
		}
		Err(err) => {
			error!("graph fetch failed: {err}");
			if err.is_unreachable() {
				store.set_backend_health(false);
			}
			if matches!(err, GraphError::Unauthenticated) {
				store.logout();
			}
			store.set_notice(Some(Notice {
				level: NoticeLevel::Error,
				message: format!("Failed to load graph: {err}"),
			}));
			FetchOutcome::Failed
		}
	}
}

/// Fetch the graph for the current settings and feed it through [`finish_fetch`].
pub fn spawn_graph_fetch(
	store: Rc<GraphStore>,
	lifecycle: Rc<RefCell<LifecycleManager>>,
	client: ApiClient,
) {
	// Never hold the lifecycle borrow across a store mutation: observers may need it.
	let ticket = lifecycle.borrow().begin_fetch();
	let Some(pending) = start_fetch(&store, ticket) else {
		return;
	};
	let settings = store.settings();
	let client_retry = client.clone();
	let client = client.with_token(store.token());
	spawn_local(async move {
		let result = client
			.query_graph(&settings.query_label, settings.max_query_depth)
			.await
			.map(|raw| raw.into_parts());
		let accepted = lifecycle.borrow().accepts(pending.ticket);
		let outcome = finish_fetch(&store, pending, accepted, result);
		// Any fetch asked for while this one was in flight was refused; run
		// it now if the view is still on screen under the same session.
		let on_screen = lifecycle.borrow().begin_fetch().is_some();
		if outcome == FetchOutcome::Discarded && on_screen && store.session() == pending.session {
			spawn_graph_fetch(store, lifecycle, client_retry);
		}
	});
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::graph_viewer::LifecycleAction;
	use crate::components::graph_viewer::test_support::nodes;

	fn visible_store() -> (GraphStore, LifecycleManager) {
		let store = GraphStore::default();
		store.login("t");
		let mut lc = LifecycleManager::default();
		lc.set_visible(true, &store);
		(store, lc)
	}

	fn finish(
		store: &GraphStore,
		lc: &LifecycleManager,
		pending: PendingFetch,
		result: Result<(Vec<Node>, Vec<Edge>), GraphError>,
	) -> FetchOutcome {
		finish_fetch(store, pending, lc.accepts(pending.ticket), result)
	}

	#[test]
	fn fetch_applies_snapshot() {
		let (store, lc) = visible_store();
		let pending = start_fetch(&store, lc.begin_fetch()).expect("fetch allowed");
		assert!(store.render_flags().is_fetching);
		assert!(start_fetch(&store, lc.begin_fetch()).is_none());

		let outcome = finish(&store, &lc, pending, Ok((nodes(&["a", "b"]), Vec::new())));
		assert_eq!(outcome, FetchOutcome::Applied);
		assert_eq!(store.snapshot().nodes().len(), 2);
		assert!(!store.render_flags().is_fetching);
	}

	#[test]
	fn no_fetch_when_signed_out() {
		let (store, lc) = visible_store();
		store.logout();
		assert!(start_fetch(&store, lc.begin_fetch()).is_none());
	}

	#[test]
	fn stale_result_after_unmount_is_discarded() {
		let (store, mut lc) = visible_store();
		let pending = start_fetch(&store, lc.begin_fetch()).expect("fetch allowed");
		lc.unmount(&store);
		let revision = store.snapshot_revision();

		let outcome = finish(&store, &lc, pending, Ok((nodes(&["late"]), Vec::new())));

		assert_eq!(outcome, FetchOutcome::Discarded);
		assert_eq!(store.snapshot_revision(), revision);
		assert!(store.snapshot().is_empty());
	}

	#[test]
	fn stale_result_after_hide_is_discarded() {
		let (store, mut lc) = visible_store();
		store.set_snapshot(nodes(&["kept"]), Vec::new());
		let pending = start_fetch(&store, lc.begin_fetch()).expect("fetch allowed");
		lc.set_visible(false, &store);
		lc.set_visible(true, &store);

		let outcome = finish(&store, &lc, pending, Ok((nodes(&["late"]), Vec::new())));
		assert_eq!(outcome, FetchOutcome::Discarded);
		assert!(store.snapshot().contains_node("kept"));
	}

	#[test]
	fn failure_keeps_previous_snapshot() {
		let (store, lc) = visible_store();
		store.set_snapshot(nodes(&["kept"]), Vec::new());
		let pending = start_fetch(&store, lc.begin_fetch()).expect("fetch allowed");

		let outcome = finish(
			&store,
			&lc,
			pending,
			Err(GraphError::Status {
				status: 502,
				message: "bad gateway".into(),
			}),
		);

		assert_eq!(outcome, FetchOutcome::Failed);
		assert!(store.snapshot().contains_node("kept"));
		assert!(!store.backend_healthy());
		assert_eq!(store.notice().map(|n| n.level), Some(NoticeLevel::Error));

		store.set_backend_health(true);
		let pending = start_fetch(&store, lc.begin_fetch()).expect("fetch allowed");
		finish(&store, &lc, pending, Ok((nodes(&["fresh"]), Vec::new())));
		assert_eq!(store.notice(), None);
	}

	#[test]
	fn rejected_token_signs_out() {
		let (store, lc) = visible_store();
		let pending = start_fetch(&store, lc.begin_fetch()).expect("fetch allowed");
		finish(&store, &lc, pending, Err(GraphError::Unauthenticated));
		assert!(!store.is_authenticated());
	}

	#[test]
	fn result_arriving_after_sign_out_is_discarded() {
		let (store, lc) = visible_store();
		let pending = start_fetch(&store, lc.begin_fetch()).expect("fetch allowed");
		store.logout();

		let outcome = finish(&store, &lc, pending, Ok((nodes(&["secret"]), Vec::new())));

		assert_eq!(outcome, FetchOutcome::Discarded);
		assert!(store.snapshot().is_empty());
		assert!(!store.is_authenticated());
	}

	#[test]
	fn old_session_result_leaves_new_fetch_alone() {
		let (store, lc) = visible_store();
		let old = start_fetch(&store, lc.begin_fetch()).expect("fetch allowed");
		store.logout();
		store.login("t2");
		let new = start_fetch(&store, lc.begin_fetch()).expect("new session may fetch");

		assert_eq!(
			finish(&store, &lc, old, Ok((nodes(&["old"]), Vec::new()))),
			FetchOutcome::Discarded
		);
		assert!(store.render_flags().is_fetching);

		assert_eq!(
			finish(&store, &lc, new, Ok((nodes(&["new"]), Vec::new()))),
			FetchOutcome::Applied
		);
		assert!(store.snapshot().contains_node("new"));
		assert!(!store.snapshot().contains_node("old"));
	}

	#[test]
	fn requery_discards_the_old_result_and_allows_a_new_fetch() {
		let (store, mut lc) = visible_store();
		let old = start_fetch(&store, lc.begin_fetch()).expect("fetch allowed");
		store.update_settings(|s| s.query_label = "Rice".into());
		assert_eq!(lc.requery(), vec![LifecycleAction::Fetch]);

		assert_eq!(
			finish(&store, &lc, old, Ok((nodes(&["everything"]), Vec::new()))),
			FetchOutcome::Discarded
		);
		let new = start_fetch(&store, lc.begin_fetch()).expect("fetch allowed again");
		assert_eq!(
			finish(&store, &lc, new, Ok((nodes(&["rice"]), Vec::new()))),
			FetchOutcome::Applied
		);
		assert!(store.snapshot().contains_node("rice"));
	}
}
