//! Display toggles and query parameters for the graph view.

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

/// Initial placement strategy applied by the render surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
	/// Nodes start on a circle and the force simulation settles them.
	#[default]
	ForceDirected,
	/// Static circle ordered by snapshot order.
	Circular,
	/// Static scatter seeded from each node id.
	Random,
}

impl LayoutKind {
	/// All layouts, in the order the layout switcher cycles through them.
	pub const ALL: [LayoutKind; 3] = [Self::ForceDirected, Self::Circular, Self::Random];

	/// Whether the force simulation keeps moving nodes under this layout.
	pub fn simulates(self) -> bool {
		self == Self::ForceDirected
	}

	pub fn label(self) -> &'static str {
		match self {
			Self::ForceDirected => "Force",
			Self::Circular => "Circle",
			Self::Random => "Random",
		}
	}

	/// The layout after this one in [`LayoutKind::ALL`], wrapping around.
	pub fn next(self) -> Self {
		let i = Self::ALL.iter().position(|l| *l == self).unwrap_or(0);
		Self::ALL[(i + 1) % Self::ALL.len()]
	}
}

const MAX_QUERY_DEPTH: u32 = 10;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
	pub show_property_panel: bool,
	pub show_node_search_bar: bool,
	pub enable_node_drag: bool,
	pub show_edge_labels: bool,
	pub layout: LayoutKind,
	/// Entity label the graph query is rooted at; `*` loads everything.
	pub query_label: String,
	pub max_query_depth: u32,
}

impl Settings {
	pub fn from_config(config: &AppConfig) -> Self {
		Self {
			query_label: config.default_query_label.clone(),
			max_query_depth: config.default_max_depth,
			..Self::default()
		}
	}

	/// Take a query typed by the user. A blank label means `*`; a depth that
	/// does not parse keeps the current one. Returns whether anything changed.
	pub fn set_query(&mut self, label: &str, depth: &str) -> bool {
		let label = match label.trim() {
			"" => "*",
			l => l,
		};
		let depth = depth
			.trim()
			.parse::<u32>()
			.map(|d| d.clamp(1, MAX_QUERY_DEPTH))
			.unwrap_or(self.max_query_depth);
		let changed = label != self.query_label || depth != self.max_query_depth;
		self.query_label = label.to_string();
		self.max_query_depth = depth;
		changed
	}
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			show_property_panel: true,
			show_node_search_bar: true,
			enable_node_drag: true,
			show_edge_labels: false,
			layout: LayoutKind::default(),
			query_label: "*".into(),
			max_query_depth: 3,
		}
	}
}
