//! Backend JSON payloads and their conversion into styled graph data.

use std::collections::HashMap;

use serde::Deserialize;

use crate::components::graph_viewer::{Edge, EdgeProgram, Metadata, Node, NodeProgram};

const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];
const MIN_NODE_SIZE: f64 = 4.0;
const MAX_NODE_SIZE: f64 = 16.0;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawGraph {
	#[serde(default)]
	pub nodes: Vec<RawNode>,
	#[serde(default)]
	pub edges: Vec<RawEdge>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawNode {
	pub id: String,
	#[serde(default)]
	pub labels: Vec<String>,
	#[serde(default)]
	pub properties: Metadata,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawEdge {
	pub id: String,
	pub source: String,
	pub target: String,
	#[serde(rename = "type", default)]
	pub kind: Option<String>,
	#[serde(default)]
	pub properties: Metadata,
}

#[derive(Clone, Debug, Deserialize)]
pub struct HealthStatus {
	pub status: String,
}

impl HealthStatus {
	pub fn is_healthy(&self) -> bool {
		self.status.eq_ignore_ascii_case("healthy")
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct AuthStatus {
	pub auth_configured: bool,
	#[serde(default)]
	pub access_token: Option<String>,
}

fn property_str<'a>(properties: &'a Metadata, key: &str) -> Option<&'a str> {
	properties
		.get(key)
		.and_then(|v| v.as_str())
		.map(str::trim)
		.filter(|s| !s.is_empty())
}

/// Stable palette slot for an entity type.
fn color_for(kind: &str) -> &'static str {
	let hash = kind
		.bytes()
		.fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(b as u32));
	COLORS[hash as usize % COLORS.len()]
}

impl RawGraph {
	/// Styled nodes and edges ready for the store. Node size grows with degree;
	/// color is picked from the entity type.
	pub fn into_parts(self) -> (Vec<Node>, Vec<Edge>) {
		let mut degree: HashMap<&str, usize> = HashMap::new();
		for edge in &self.edges {
			*degree.entry(edge.source.as_str()).or_default() += 1;
			*degree.entry(edge.target.as_str()).or_default() += 1;
		}
		let max_degree = degree.values().copied().max().unwrap_or(0).max(1) as f64;

		let nodes = self
			.nodes
			.iter()
			.map(|raw| {
				let label = property_str(&raw.properties, "entity_id")
					.or_else(|| raw.labels.first().map(String::as_str))
					.unwrap_or(&raw.id)
					.to_string();
				let kind = property_str(&raw.properties, "entity_type").unwrap_or("unknown");
				let d = degree.get(raw.id.as_str()).copied().unwrap_or(0) as f64;
				let mut node = Node::new(raw.id.clone(), label);
				node.style.color = color_for(kind).into();
				node.style.size =
					MIN_NODE_SIZE + (MAX_NODE_SIZE - MIN_NODE_SIZE) * (d / max_degree).sqrt();
				node.style.program = if d == 0.0 {
					NodeProgram::Circle
				} else {
					NodeProgram::Bordered
				};
				node.metadata = raw.properties.clone();
				node
			})
			.collect();

		let edges = self
			.edges
			.into_iter()
			.map(|raw| {
				let mut edge = Edge::new(raw.id, raw.source, raw.target);
				edge.label = property_str(&raw.properties, "keywords")
					.map(String::from)
					.or(raw.kind);
				if let Some(weight) = raw.properties.get("weight").and_then(|w| w.as_f64()) {
					edge.style.size = weight.clamp(0.5, 4.0);
				}
				if edge.source == edge.target {
					edge.style.program = EdgeProgram::CurvedNoArrow;
				}
				edge.metadata = raw.properties;
				edge
			})
			.collect();

		(nodes, edges)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const SAMPLE: &str = r#"{
		"nodes": [
			{"id": "1", "labels": ["Rice"], "properties": {"entity_id": "Rice", "entity_type": "crop"}},
			{"id": "2", "labels": ["Blast"], "properties": {"entity_type": "disease", "description": "fungal"}},
			{"id": "3", "labels": [], "properties": {}}
		],
		"edges": [
			{"id": "e1", "source": "2", "target": "1", "type": "DIRECTED", "properties": {"keywords": "infects", "weight": 9.0}},
			{"id": "e2", "source": "1", "target": "1", "properties": {}}
		]
	}"#;

	#[test]
	fn converts_backend_graph() {
		let raw: RawGraph = serde_json::from_str(SAMPLE).expect("sample parses");
		let (nodes, edges) = raw.into_parts();

		assert_eq!(nodes[0].label, "Rice");
		assert_eq!(nodes[1].label, "Blast");
		assert_eq!(nodes[2].label, "3");
		assert_eq!(nodes[0].style.size, MAX_NODE_SIZE);
		assert_eq!(nodes[2].style.size, MIN_NODE_SIZE);
		assert_eq!(nodes[2].style.program, NodeProgram::Circle);
		assert_eq!(nodes[0].style.color, color_for("crop"));
		assert_eq!(
			nodes[1].metadata.get("description").and_then(|v| v.as_str()),
			Some("fungal")
		);

		assert_eq!(edges[0].label.as_deref(), Some("infects"));
		assert_eq!(edges[0].style.size, 4.0);
		assert_eq!(edges[0].style.program, EdgeProgram::CurvedArrow);
		assert_eq!(edges[1].style.program, EdgeProgram::CurvedNoArrow);
		assert_eq!(edges[1].label, None);
	}

	#[test]
	fn missing_collections_default_to_empty() {
		let raw: RawGraph = serde_json::from_str("{}").expect("empty object parses");
		let (nodes, edges) = raw.into_parts();
		assert!(nodes.is_empty() && edges.is_empty());
	}

	#[test]
	fn health_status_is_case_insensitive() {
		let status: HealthStatus = serde_json::from_str(r#"{"status":"Healthy"}"#).expect("parses");
		assert!(status.is_healthy());
	}
}
