//! Build-time application configuration.
//!
//! Values come from environment variables captured when the WASM bundle is
//! compiled (`GRAPH_API_BASE`, `GRAPH_API_TOKEN`, `GRAPH_POLL_INTERVAL_MS`,
//! `GRAPH_QUERY_LABEL`, `GRAPH_MAX_DEPTH`); anything unset or unparsable falls
//! back to the defaults below.

use force_graph::SimulationParameters;
use log::warn;

const DEFAULT_API_BASE: &str = "/api";
const DEFAULT_POLL_INTERVAL_MS: u32 = 5_000;
const MIN_POLL_INTERVAL_MS: u32 = 500;

/// Force simulation tuning, mirrored into [`SimulationParameters`] on every rebuild.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationConfig {
	pub force_charge: f32,
	pub force_spring: f32,
	pub force_max: f32,
	pub node_speed: f32,
	pub damping_factor: f32,
}

impl Default for SimulationConfig {
	fn default() -> Self {
		Self {
			force_charge: 150.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		}
	}
}

impl SimulationConfig {
	pub fn parameters(&self) -> SimulationParameters {
		SimulationParameters {
			force_charge: self.force_charge,
			force_spring: self.force_spring,
			force_max: self.force_max,
			node_speed: self.node_speed,
			damping_factor: self.damping_factor,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
	/// Prefix for every backend request, without a trailing slash.
	pub api_base: String,
	/// Bearer token to use when the backend does not hand out a guest token.
	pub api_token: Option<String>,
	pub poll_interval_ms: u32,
	pub default_query_label: String,
	pub default_max_depth: u32,
	pub simulation: SimulationConfig,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			api_base: DEFAULT_API_BASE.into(),
			api_token: None,
			poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
			default_query_label: "*".into(),
			default_max_depth: 3,
			simulation: SimulationConfig::default(),
		}
	}
}

impl AppConfig {
	/// Configuration baked in at compile time.
	pub fn from_env() -> Self {
		Self::from_lookup(|key| match key {
			"GRAPH_API_BASE" => option_env!("GRAPH_API_BASE"),
			"GRAPH_API_TOKEN" => option_env!("GRAPH_API_TOKEN"),
			"GRAPH_POLL_INTERVAL_MS" => option_env!("GRAPH_POLL_INTERVAL_MS"),
			"GRAPH_QUERY_LABEL" => option_env!("GRAPH_QUERY_LABEL"),
			"GRAPH_MAX_DEPTH" => option_env!("GRAPH_MAX_DEPTH"),
			_ => None,
		})
	}

	fn from_lookup<'a>(lookup: impl Fn(&str) -> Option<&'a str>) -> Self {
		let mut config = Self::default();
		if let Some(base) = lookup("GRAPH_API_BASE").map(str::trim).filter(|s| !s.is_empty()) {
			config.api_base = base.trim_end_matches('/').to_string();
		}
		config.api_token = lookup("GRAPH_API_TOKEN")
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(String::from);
		if let Some(raw) = lookup("GRAPH_POLL_INTERVAL_MS") {
			match raw.trim().parse::<u32>() {
				Ok(ms) => config.poll_interval_ms = ms.max(MIN_POLL_INTERVAL_MS),
				Err(e) => warn!("ignoring GRAPH_POLL_INTERVAL_MS={raw:?}: {e}"),
			}
		}
		if let Some(label) = lookup("GRAPH_QUERY_LABEL").filter(|s| !s.trim().is_empty()) {
			config.default_query_label = label.trim().to_string();
		}
		if let Some(raw) = lookup("GRAPH_MAX_DEPTH") {
			match raw.trim().parse::<u32>() {
				Ok(depth) => config.default_max_depth = depth.max(1),
				Err(e) => warn!("ignoring GRAPH_MAX_DEPTH={raw:?}: {e}"),
			}
		}
		config
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_when_unset() {
		let config = AppConfig::from_lookup(|_| None);
		assert_eq!(config, AppConfig::default());
		assert_eq!(config.api_base, "/api");
	}

	#[test]
	fn overrides_are_normalised() {
		let config = AppConfig::from_lookup(|key| match key {
			"GRAPH_API_BASE" => Some("http://localhost:9621/"),
			"GRAPH_API_TOKEN" => Some("  "),
			"GRAPH_POLL_INTERVAL_MS" => Some("10"),
			"GRAPH_MAX_DEPTH" => Some("nope"),
			_ => None,
		});
		assert_eq!(config.api_base, "http://localhost:9621");
		assert_eq!(config.api_token, None);
		assert_eq!(config.poll_interval_ms, MIN_POLL_INTERVAL_MS);
		assert_eq!(config.default_max_depth, 3);
	}
}
