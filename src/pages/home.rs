use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Interval;
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{info, warn};
use send_wrapper::SendWrapper;

use crate::api::ApiClient;
use crate::components::graph_viewer::GraphViewer;
use crate::config::AppConfig;
use crate::stores::{GraphStore, Notice, NoticeLevel, Settings, StoreChange};

/// Workspace tabs. Only the knowledge graph is implemented here; the other
/// two are owned by separate features.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Tab {
	#[default]
	Documents,
	KnowledgeGraph,
	Retrieval,
}

impl Tab {
	const ALL: [Tab; 3] = [Tab::Documents, Tab::KnowledgeGraph, Tab::Retrieval];

	fn title(self) -> &'static str {
		match self {
			Tab::Documents => "Documents",
			Tab::KnowledgeGraph => "Knowledge Graph",
			Tab::Retrieval => "Retrieval",
		}
	}
}

/// Sign in with the backend's guest token, falling back to the configured one.
fn sign_in(store: Rc<GraphStore>, client: ApiClient, fallback: Option<String>) {
	spawn_local(async move {
		let guest = match client.auth_status().await {
			Ok(status) => status.access_token.filter(|_| !status.auth_configured),
			Err(err) => {
				warn!("auth status unavailable: {err}");
				if err.is_unreachable() {
					store.set_backend_health(false);
				}
				None
			}
		};
		match guest.or(fallback) {
			Some(token) => store.login(token),
			None => {
				info!("no token available, staying signed out");
				store.set_notice(Some(Notice {
					level: NoticeLevel::Info,
					message: "Sign-in required to view the knowledge graph.".into(),
				}));
			}
		}
	});
}

fn probe_health(store: Rc<GraphStore>, client: ApiClient) {
	spawn_local(async move {
		let healthy = match client.health().await {
			Ok(status) => status.is_healthy(),
			Err(err) => {
				warn!("health check failed: {err}");
				false
			}
		};
		store.set_backend_health(healthy);
	});
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let config = AppConfig::from_env();
	let store = Rc::new(GraphStore::new(Settings::from_config(&config)));
	let client = ApiClient::new(config.api_base.clone());

	let tab = RwSignal::new(Tab::default());
	let authenticated = RwSignal::new(store.is_authenticated());
	let healthy = RwSignal::new(store.backend_healthy());
	let subscription = {
		let store_obs = Rc::clone(&store);
		store.subscribe(move |change| match change {
			StoreChange::Auth => authenticated.set(store_obs.is_authenticated()),
			StoreChange::Backend => healthy.set(store_obs.backend_healthy()),
			_ => {}
		})
	};

	sign_in(Rc::clone(&store), client.clone(), config.api_token.clone());
	probe_health(Rc::clone(&store), client.clone());
	let health_timer = {
		let (store, client) = (Rc::clone(&store), client.clone());
		Interval::new(config.poll_interval_ms, move || {
			probe_health(Rc::clone(&store), client.clone())
		})
	};
	let health_timer = Rc::new(RefCell::new(Some(health_timer)));

	let teardown = SendWrapper::new({
		let store = Rc::clone(&store);
		move || {
			health_timer.borrow_mut().take();
			store.unsubscribe(subscription);
		}
	});
	on_cleanup(move || (teardown.take())());

	let on_sign_in = {
		let (store, client, token) = (Rc::clone(&store), client.clone(), config.api_token.clone());
		move |_| sign_in(Rc::clone(&store), client.clone(), token.clone())
	};
	let on_sign_out = {
		let store = Rc::clone(&store);
		move |_| store.logout()
	};

	view! {
		<div class="workspace">
			<header class="workspace-header">
				<nav class="workspace-tabs">
					{Tab::ALL
						.into_iter()
						.map(|t| {
							view! {
								<button
									class="workspace-tab"
									class:active=move || tab.get() == t
									on:click=move |_| tab.set(t)
								>
									{t.title()}
								</button>
							}
						})
						.collect_view()}
				</nav>
				<span
					class="backend-status"
					class:offline=move || !healthy.get()
					title=move || if healthy.get() { "Backend healthy" } else { "Backend unreachable" }
				></span>
				<button
					style:display=move || if authenticated.get() { "none" } else { "inline-block" }
					on:click=on_sign_in
				>
					"Sign in"
				</button>
				<button
					style:display=move || if authenticated.get() { "inline-block" } else { "none" }
					on:click=on_sign_out
				>
					"Sign out"
				</button>
			</header>

			<main class="workspace-body">
				<section style:display=move || if tab.get() == Tab::Documents { "block" } else { "none" }>
					<p class="placeholder">"Document management lives in its own module."</p>
				</section>
				// Kept mounted while hidden so the graph survives tab switches.
				<section
					class="graph-tab"
					style:display=move || if tab.get() == Tab::KnowledgeGraph { "block" } else { "none" }
				>
					<GraphViewer
						store=store
						config=config
						visible=Signal::derive(move || tab.get() == Tab::KnowledgeGraph)
					/>
				</section>
				<section style:display=move || if tab.get() == Tab::Retrieval { "block" } else { "none" }>
					<p class="placeholder">"Retrieval testing lives in its own module."</p>
				</section>
			</main>
		</div>
	}
}
