//! Overlay widgets drawn over the canvas. Everything here is driven by signals
//! only; handlers that need the store live in the viewer component.

use leptos::prelude::*;

use super::focus::{SearchHit, SearchOption};
use super::status::ViewStatus;
use super::types::GraphSnapshot;
use crate::stores::{Notice, NoticeLevel};

const MAX_PROPERTY_LEN: usize = 240;

/// What the property panel shows for one node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeDetails {
	pub id: String,
	pub label: String,
	pub degree: usize,
	pub neighbors: Vec<String>,
	pub properties: Vec<(String, String)>,
}

impl NodeDetails {
	pub fn from_snapshot(snapshot: &GraphSnapshot, id: &str) -> Option<Self> {
		let node = snapshot.node(id)?;
		let properties = node
			.metadata
			.iter()
			.map(|(k, v)| {
				let mut text = match v {
					serde_json::Value::String(s) => s.clone(),
					other => other.to_string(),
				};
				if text.chars().count() > MAX_PROPERTY_LEN {
					text = text.chars().take(MAX_PROPERTY_LEN).collect::<String>() + "…";
				}
				(k.clone(), text)
			})
			.collect();
		Some(Self {
			id: node.id.clone(),
			label: node.label.clone(),
			degree: snapshot.degree(id),
			neighbors: snapshot
				.neighbors(id)
				.into_iter()
				.filter_map(|n| snapshot.node(n).map(|n| n.label.clone()))
				.collect(),
			properties,
		})
	}
}

/// A search box interaction, consumed by the viewer.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchEvent {
	Focus(Option<SearchOption>),
	Select(Option<SearchOption>),
}

#[component]
pub fn SearchBar(
	query: RwSignal<String>,
	hits: RwSignal<Vec<SearchHit>>,
	events: RwSignal<Option<SearchEvent>>,
) -> impl IntoView {
	let clear = move |_| {
		query.set(String::new());
		events.set(Some(SearchEvent::Select(None)));
	};

	view! {
		<div class="graph-search">
			<input
				type="search"
				placeholder="Search nodes…"
				prop:value=move || query.get()
				on:input=move |ev| query.set(event_target_value(&ev))
			/>
			<button class="graph-search-clear" on:click=clear>"×"</button>
			<ul class="graph-search-results" on:mouseleave=move |_| events.set(Some(SearchEvent::Focus(None)))>
				{move || {
					hits.get()
						.into_iter()
						.map(|hit| {
							let (focus_id, select_id) = (hit.id.clone(), hit.id.clone());
							view! {
								<li
									on:mouseenter=move |_| {
										events.set(Some(SearchEvent::Focus(Some(SearchOption::node(focus_id.clone())))))
									}
									on:click=move |_| {
										events.set(Some(SearchEvent::Select(Some(SearchOption::node(select_id.clone())))))
									}
								>
									{hit.label}
								</li>
							}
						})
						.collect_view()
				}}
			</ul>
		</div>
	}
}

#[component]
pub fn PropertiesPanel(details: RwSignal<Option<NodeDetails>>) -> impl IntoView {
	view! {
		<Show when=move || details.get().is_some()>
			{move || {
				details.get().map(|d| {
					view! {
						<div class="graph-properties">
							<h3>{d.label.clone()}</h3>
							<dl>
								<dt>"Id"</dt>
								<dd>{d.id.clone()}</dd>
								<dt>"Degree"</dt>
								<dd>{d.degree}</dd>
								{d.properties
									.into_iter()
									.map(|(k, v)| view! { <dt>{k}</dt><dd>{v}</dd> })
									.collect_view()}
							</dl>
							<h4>"Neighbors"</h4>
							<ul>
								{d.neighbors
									.into_iter()
									.map(|n| view! { <li>{n}</li> })
									.collect_view()}
							</ul>
						</div>
					}
				})
			}}
		</Show>
	}
}

/// Loading, empty, signed-out and error states over the canvas.
#[component]
pub fn StatusOverlay(status: RwSignal<ViewStatus>) -> impl IntoView {
	view! {
		{move || {
			let status = status.get();
			status.message().map(|message| {
				let class = match status {
					ViewStatus::RenderError(_) => "graph-status graph-status-error",
					ViewStatus::Loading => "graph-status graph-status-loading",
					_ => "graph-status",
				};
				view! {
					<div class=class>
						<Show when=move || matches!(status, ViewStatus::Loading)>
							<div class="graph-spinner"></div>
						</Show>
						<p>{message}</p>
					</div>
				}
			})
		}}
	}
}

#[component]
pub fn NoticeText(notice: RwSignal<Option<Notice>>) -> impl IntoView {
	view! {
		{move || {
			notice.get().map(|n| {
				let class = match n.level {
					NoticeLevel::Error => "graph-notice-text graph-notice-error",
					NoticeLevel::Info => "graph-notice-text",
				};
				view! { <span class=class>{n.message}</span> }
			})
		}}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::graph_viewer::types::{Edge, Node};

	#[test]
	fn details_for_selected_node() {
		let mut rice = Node::new("1", "Rice");
		rice.metadata
			.insert("entity_type".into(), serde_json::json!("crop"));
		rice.metadata.insert("weight".into(), serde_json::json!(2.5));
		rice.metadata
			.insert("description".into(), serde_json::json!("x".repeat(500)));
		let snapshot = GraphSnapshot::new(
			vec![rice, Node::new("2", "Blast")],
			vec![Edge::new("e", "2", "1")],
		);

		let details = NodeDetails::from_snapshot(&snapshot, "1").expect("node exists");
		assert_eq!(details.degree, 1);
		assert_eq!(details.neighbors, vec!["Blast".to_string()]);
		let props: std::collections::HashMap<_, _> = details.properties.into_iter().collect();
		assert_eq!(props["entity_type"], "crop");
		assert_eq!(props["weight"], "2.5");
		assert_eq!(props["description"].chars().count(), MAX_PROPERTY_LEN + 1);

		assert!(NodeDetails::from_snapshot(&snapshot, "missing").is_none());
	}
}
