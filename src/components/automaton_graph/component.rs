use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{debug, error};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent};

use super::element::{GraphHandle, GraphRegistry};
use super::render;
use super::types::AutomatonGraph;

const DEFAULT_WIDTH: f64 = 800.0;

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas.get_context("2d").ok().flatten()?.dyn_into().ok()
}

fn parent_width(canvas: &HtmlCanvasElement) -> f64 {
	canvas
		.parent_element()
		.map(|p| p.client_width() as f64)
		.filter(|w| *w > 0.0)
		.unwrap_or(DEFAULT_WIDTH)
}

/// Pointer position relative to the canvas.
fn pointer(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?;
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Force-directed canvas view of a hybrid automaton.
///
/// The graph is registered under `id` in [`GraphRegistry`] for as long as the
/// component lives, so page code can look it up as a tooltip container.
#[component]
pub fn AutomatonGraphCanvas(
	#[prop(into)] id: String,
	#[prop(into)] data: Signal<AutomatonGraph>,
	#[prop(default = 480.0)] height: f64,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let graph = GraphHandle::default();
	GraphRegistry::register(&id, graph.clone());
	let cleanup_id = id.clone();
	on_cleanup(move || GraphRegistry::unregister(&cleanup_id));

	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (graph_init, animate_init, resize_cb_init) =
		(graph.clone(), animate.clone(), resize_cb.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let Some(window) = web_sys::window() else {
			error!("No window, graph not started");
			return;
		};
		let Some(ctx) = context_2d(&canvas) else {
			error!("Canvas has no 2d context, graph not started");
			return;
		};

		let width = parent_width(&canvas);
		canvas.set_width(width as u32);
		canvas.set_height(height as u32);
		graph_init.set_canvas(canvas.clone());
		graph_init.replace_data(&data.get_untracked(), width, height);

		// Window callbacks outlive the component, so they only hold the graph weakly.
		let (graph_resize, canvas_resize) = (graph_init.downgrade(), canvas.clone());
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			let Some(graph) = graph_resize.upgrade() else {
				return;
			};
			let width = parent_width(&canvas_resize);
			canvas_resize.set_width(width as u32);
			if let Some(ref mut s) = *graph.state().borrow_mut() {
				s.resize(width, height);
			}
		}));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (graph_anim, animate_inner) = (graph_init.downgrade(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			let Some(graph) = graph_anim.upgrade() else {
				debug!("Graph dropped, animation stopped");
				return;
			};
			let settled = match *graph.state().borrow_mut() {
				Some(ref mut s) => {
					let settled = s.tick(0.016);
					render::render(s, &ctx);
					settled
				}
				None => false,
			};
			if settled {
				graph.mark_ready();
			}
			if let (Some(cb), Some(win)) = (&*animate_inner.borrow(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let graph_data = graph.clone();
	Effect::new(move |initialized: Option<bool>| {
		let next = data.get();
		if initialized.is_none() {
			return true;
		}
		let size = graph_data
			.state()
			.borrow()
			.as_ref()
			.map(|s| (s.width, s.height));
		if let Some((width, height)) = size {
			graph_data.replace_data(&next, width, height);
		}
		true
	});

	let graph_md = graph.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *graph_md.state().borrow_mut() {
			if let Some(idx) = s.node_at_position(x, y) {
				s.drag.node = Some(idx);
				s.drag.start = (x, y);
				let mut node_start = (0.0, 0.0);
				s.graph.visit_nodes(|node| {
					if node.index() == idx {
						node_start = (node.x(), node.y());
					}
				});
				s.drag.node_start = node_start;
			} else {
				s.pan.active = true;
				s.pan.start = (x, y);
				s.pan.transform_start = (s.transform.x, s.transform.y);
			}
		}
	};

	let graph_mm = graph.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		let change = match *graph_mm.state().borrow_mut() {
			Some(ref mut s) => {
				if let Some(idx) = s.drag.node {
					let (dx, dy) = (
						(x - s.drag.start.0) / s.transform.k,
						(y - s.drag.start.1) / s.transform.k,
					);
					let (nx, ny) = (
						s.drag.node_start.0 + dx as f32,
						s.drag.node_start.1 + dy as f32,
					);
					s.graph.visit_nodes_mut(|node| {
						if node.index() == idx {
							node.data.x = nx;
							node.data.y = ny;
							node.data.is_anchor = true;
						}
					});
					None
				} else {
					if s.pan.active {
						s.transform.x = s.pan.transform_start.0 + (x - s.pan.start.0);
						s.transform.y = s.pan.transform_start.1 + (y - s.pan.start.1);
					}
					let hovered = s.element_at_position(x, y).map(|(id, _)| id);
					s.set_hover(hovered)
				}
			}
			None => None,
		};
		// Handlers may read the graph state, so the borrow ends first.
		if let Some(change) = change {
			debug!("Hover moved {:?} -> {:?}", change.left, change.entered);
			graph_mm.apply_hover(change);
		}
	};

	let graph_mu = graph.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(ref mut s) = *graph_mu.state().borrow_mut() {
			s.drag.node = None;
			s.pan.active = false;
		}
	};

	let graph_ml = graph.clone();
	let on_mouseleave = move |_: MouseEvent| {
		let change = match *graph_ml.state().borrow_mut() {
			Some(ref mut s) => {
				s.drag.node = None;
				s.pan.active = false;
				s.set_hover(None)
			}
			None => None,
		};
		if let Some(change) = change {
			graph_ml.apply_hover(change);
		}
	};

	let graph_wh = graph.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *graph_wh.state().borrow_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			let new_k = (s.transform.k * factor).clamp(0.2, 5.0);
			let ratio = new_k / s.transform.k;
			s.transform.x = x - (x - s.transform.x) * ratio;
			s.transform.y = y - (y - s.transform.y) * ratio;
			s.transform.k = new_k;
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			id=id
			class="automaton-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
