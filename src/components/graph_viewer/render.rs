use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::{GraphSurface, NodeInfo, SurfaceEdge};
use super::types::NodeProgram;

const BACKGROUND: &str = "#f4faf6";
const LABEL_COLOR: &str = "#111827";
const EMPTY_COLOR: &str = "#6b7280";
const HIGHLIGHT_COLOR: &str = "rgba(16, 185, 129, 0.35)";
const SELECTED_RING: &str = "#059669";
const FOCUSED_RING: &str = "#f59e0b";
/// Labels are drawn once a node is at least this many pixels across.
const LABEL_SIZE_THRESHOLD: f64 = 8.0;
const CURVATURE: f64 = 0.2;

/// Per-frame inputs that live outside the surface.
#[derive(Clone, Debug, Default)]
pub struct RenderView<'a> {
	pub selected: Option<&'a str>,
	pub focused: Option<&'a str>,
	pub hovered: Option<&'a str>,
	pub show_edge_labels: bool,
}

pub fn render(surface: &GraphSurface, ctx: &CanvasRenderingContext2d, view: &RenderView) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, surface.width, surface.height);

	if surface.is_empty() {
		draw_empty(surface, ctx);
		return;
	}

	let t = surface.camera.transform;
	ctx.save();
	let _ = ctx.translate(t.x, t.y);
	let _ = ctx.scale(t.k, t.k);
	draw_edges(surface, ctx, view);
	draw_nodes(surface, ctx, view);
	ctx.restore();
}

fn draw_empty(surface: &GraphSurface, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(EMPTY_COLOR);
	ctx.set_font("14px sans-serif");
	ctx.set_text_align("center");
	let _ = ctx.fill_text("No nodes to display", surface.width / 2.0, surface.height / 2.0);
	ctx.set_text_align("start");
}

/// Control point of a curved edge, bent to the left of source -> target.
fn control_point(x1: f64, y1: f64, x2: f64, y2: f64) -> (f64, f64) {
	let (mx, my) = ((x1 + x2) / 2.0, (y1 + y2) / 2.0);
	(mx - (y2 - y1) * CURVATURE, my + (x2 - x1) * CURVATURE)
}

fn draw_edges(surface: &GraphSurface, ctx: &CanvasRenderingContext2d, view: &RenderView) {
	let k = surface.camera.transform.k;
	let positions = surface.positions();
	let mut info = std::collections::HashMap::new();
	surface.graph.visit_nodes(|node| {
		info.insert(node.index(), node.data.user_data.clone());
	});
	let emphasised = |n: &NodeInfo| {
		n.highlighted || view.selected == Some(n.id.as_str()) || view.focused == Some(n.id.as_str())
	};

	for edge in surface.edges() {
		let (Some(&(x1, y1)), Some(&(x2, y2))) =
			(positions.get(&edge.source), positions.get(&edge.target))
		else {
			continue;
		};
		let (Some(src), Some(tgt)) = (info.get(&edge.source), info.get(&edge.target)) else {
			continue;
		};
		if edge.source == edge.target {
			draw_loop(ctx, x1, y1, src.size, edge, k);
			continue;
		}
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}

		let active = emphasised(src) || emphasised(tgt);
		ctx.set_global_alpha(if active { 1.0 } else { 0.6 });
		ctx.set_stroke_style_str(&edge.color);
		ctx.set_fill_style_str(&edge.color);
		let weight = if active { 2.0 } else { 1.0 };
		ctx.set_line_width(edge.size * weight / k.max(0.5));

		let arrow_size = (4.0 + edge.size * 2.0) / k.max(0.5);
		let head = if edge.program.has_arrow() { arrow_size } else { 0.0 };

		// Direction the edge enters the target, used to trim and orient the head.
		let (cx, cy) = if edge.program.is_curved() {
			control_point(x1, y1, x2, y2)
		} else {
			(x1, y1)
		};
		let (ex, ey) = (x2 - cx, y2 - cy);
		let elen = (ex * ex + ey * ey).sqrt().max(0.001);
		let (ux, uy) = (ex / elen, ey / elen);
		let (tip_x, tip_y) = (x2 - ux * tgt.size, y2 - uy * tgt.size);
		let (end_x, end_y) = (tip_x - ux * head, tip_y - uy * head);

		ctx.begin_path();
		ctx.move_to(x1, y1);
		if edge.program.is_curved() {
			ctx.quadratic_curve_to(cx, cy, end_x, end_y);
		} else {
			ctx.line_to(end_x, end_y);
		}
		ctx.stroke();

		if head > 0.0 {
			let (px, py) = (-uy * head * 0.5, ux * head * 0.5);
			ctx.begin_path();
			ctx.move_to(tip_x, tip_y);
			ctx.line_to(end_x + px, end_y + py);
			ctx.line_to(end_x - px, end_y - py);
			ctx.close_path();
			ctx.fill();
		}

		if view.show_edge_labels
			&& let Some(label) = &edge.label
		{
			let (lx, ly) = if edge.program.is_curved() {
				// Midpoint of the quadratic curve.
				(
					0.25 * x1 + 0.5 * cx + 0.25 * x2,
					0.25 * y1 + 0.5 * cy + 0.25 * y2,
				)
			} else {
				((x1 + x2) / 2.0, (y1 + y2) / 2.0)
			};
			ctx.set_fill_style_str(LABEL_COLOR);
			ctx.set_font(&format!("{}px sans-serif", 8.0 / k.max(0.5)));
			let _ = ctx.fill_text(label, lx, ly);
		}
	}
	ctx.set_global_alpha(1.0);
}

fn draw_loop(
	ctx: &CanvasRenderingContext2d,
	x: f64,
	y: f64,
	node_size: f64,
	edge: &SurfaceEdge,
	k: f64,
) {
	let r = node_size * 0.9;
	ctx.set_global_alpha(0.6);
	ctx.set_stroke_style_str(&edge.color);
	ctx.set_line_width(edge.size / k.max(0.5));
	let _ = ctx.set_line_dash(&js_sys::Array::of2(
		&JsValue::from_f64(3.0 / k.max(0.5)),
		&JsValue::from_f64(2.0 / k.max(0.5)),
	));
	ctx.begin_path();
	let _ = ctx.arc(x + r, y - r, r, 0.0, 2.0 * PI);
	ctx.stroke();
	let _ = ctx.set_line_dash(&js_sys::Array::new());
	ctx.set_global_alpha(1.0);
}

fn draw_nodes(surface: &GraphSurface, ctx: &CanvasRenderingContext2d, view: &RenderView) {
	let k = surface.camera.transform.k;

	// Emphasised nodes go last so they sit on top.
	let mut deferred = Vec::new();
	surface.graph.visit_nodes(|node| {
		let data = &node.data.user_data;
		let (x, y) = (node.x() as f64, node.y() as f64);
		let emphasised = data.highlighted
			|| view.selected == Some(data.id.as_str())
			|| view.focused == Some(data.id.as_str())
			|| view.hovered == Some(data.id.as_str());
		if emphasised {
			deferred.push((x, y, data.clone()));
			return;
		}
		draw_node(ctx, x, y, data, k);
		if data.size * k >= LABEL_SIZE_THRESHOLD {
			draw_label(ctx, x, y, data, k);
		}
	});

	for (x, y, data) in deferred {
		if data.highlighted || view.hovered == Some(data.id.as_str()) {
			let glow = data.size * 2.2;
			let gradient = ctx.create_radial_gradient(x, y, data.size * 0.5, x, y, glow);
			if let Ok(gradient) = gradient {
				let _ = gradient.add_color_stop(0.0, HIGHLIGHT_COLOR);
				let _ = gradient.add_color_stop(1.0, "rgba(16, 185, 129, 0)");
				ctx.begin_path();
				let _ = ctx.arc(x, y, glow, 0.0, 2.0 * PI);
				#[allow(deprecated)]
				ctx.set_fill_style(&gradient);
				ctx.fill();
			}
		}
		draw_node(ctx, x, y, &data, k);

		let ring = if view.selected == Some(data.id.as_str()) {
			Some(SELECTED_RING)
		} else if view.focused == Some(data.id.as_str()) {
			Some(FOCUSED_RING)
		} else {
			None
		};
		if let Some(color) = ring {
			ctx.begin_path();
			let _ = ctx.arc(x, y, data.size + 3.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(color);
			ctx.set_line_width(2.0 / k);
			ctx.stroke();
		}
		draw_label(ctx, x, y, &data, k);
	}
}

fn draw_node(ctx: &CanvasRenderingContext2d, x: f64, y: f64, data: &NodeInfo, k: f64) {
	match data.program {
		NodeProgram::Point => {
			let r = (data.size * 0.5).max(1.0 / k);
			ctx.set_fill_style_str(&data.color);
			ctx.fill_rect(x - r, y - r, 2.0 * r, 2.0 * r);
		}
		NodeProgram::Circle => {
			ctx.begin_path();
			let _ = ctx.arc(x, y, data.size, 0.0, 2.0 * PI);
			ctx.set_fill_style_str(&data.color);
			ctx.fill();
		}
		NodeProgram::Bordered => {
			ctx.begin_path();
			let _ = ctx.arc(x, y, data.size, 0.0, 2.0 * PI);
			ctx.set_fill_style_str(&data.color);
			ctx.fill();
			ctx.set_stroke_style_str(data.border_color.as_deref().unwrap_or("#ffffff"));
			ctx.set_line_width((data.size * 0.2).max(1.0 / k));
			ctx.stroke();
		}
	}
}

fn draw_label(ctx: &CanvasRenderingContext2d, x: f64, y: f64, data: &NodeInfo, k: f64) {
	if data.label.is_empty() {
		return;
	}
	ctx.set_fill_style_str(LABEL_COLOR);
	ctx.set_font(&format!("{}px sans-serif", 12.0 / k.max(0.5)));
	let _ = ctx.fill_text(&data.label, x + data.size + 3.0 / k, y + 4.0 / k);
}
