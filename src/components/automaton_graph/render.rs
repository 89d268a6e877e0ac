use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::state::{AutomatonGraphState, LOOP_RADIUS, NODE_RADIUS};

const BACKGROUND: &str = "#1a1a2e";
const NODE_FILL: &str = "#1f77b4";
const HOVER_FILL: &str = "#ff7f0e";
const ARROW_SIZE: f64 = 8.0;

fn edge_color(hovered: bool) -> &'static str {
	if hovered {
		"rgba(255, 200, 120, 0.95)"
	} else {
		"rgba(100, 180, 255, 0.7)"
	}
}

pub fn render(state: &AutomatonGraphState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_transitions(state, ctx);
	draw_locations(state, ctx);
	ctx.restore();
}

fn draw_transitions(state: &AutomatonGraphState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
	ctx.set_text_align("center");

	for (edge, (x1, y1), (x2, y2)) in state.segments() {
		let hovered = state.hovered.as_deref() == Some(edge.id.as_str());
		let color = edge_color(hovered);
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		let (ux, uy) = (dx / dist, dy / dist);

		ctx.set_stroke_style_str(color);
		ctx.set_line_width(if hovered { 2.5 / k } else { 1.5 / k });
		ctx.begin_path();
		ctx.move_to(x1, y1);
		ctx.line_to(x2 - ux * ARROW_SIZE, y2 - uy * ARROW_SIZE);
		ctx.stroke();

		// arrowhead
		let (back_x, back_y) = (x2 - ux * ARROW_SIZE, y2 - uy * ARROW_SIZE);
		let (px, py) = (-uy * ARROW_SIZE * 0.5, ux * ARROW_SIZE * 0.5);
		ctx.set_fill_style_str(color);
		ctx.begin_path();
		ctx.move_to(x2, y2);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();

		let _ = ctx.fill_text(&edge.label, (x1 + x2) / 2.0 - uy * 8.0, (y1 + y2) / 2.0 + ux * 8.0);
	}

	for (edge, (cx, cy)) in state.loops() {
		let hovered = state.hovered.as_deref() == Some(edge.id.as_str());
		let color = edge_color(hovered);
		ctx.set_stroke_style_str(color);
		ctx.set_line_width(if hovered { 2.5 / k } else { 1.5 / k });
		ctx.begin_path();
		let _ = ctx.arc(cx, cy, LOOP_RADIUS, 0.0, 2.0 * PI);
		ctx.stroke();

		ctx.set_fill_style_str(color);
		let _ = ctx.fill_text(&edge.label, cx, cy - LOOP_RADIUS - 4.0);
	}
}

fn draw_locations(state: &AutomatonGraphState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	ctx.set_font(&format!("{}px sans-serif", 11.0 / k.max(0.5)));
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");

	state.graph.visit_nodes(|node| {
		let info = &node.data.user_data;
		let (x, y) = (node.x() as f64, node.y() as f64);
		let hovered = state.hovered.as_deref() == Some(info.id.as_str());

		ctx.begin_path();
		let _ = ctx.arc(x, y, NODE_RADIUS, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(if hovered { HOVER_FILL } else { NODE_FILL });
		ctx.fill();
		if hovered {
			ctx.set_stroke_style_str("rgba(255, 255, 255, 0.8)");
			ctx.set_line_width(1.5 / k);
			ctx.stroke();
		}

		ctx.set_fill_style_str("white");
		let _ = ctx.fill_text(&info.label.to_uppercase(), x, y);
	});
}
