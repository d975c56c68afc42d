//! Reusable view components.

pub mod graph_viewer;
