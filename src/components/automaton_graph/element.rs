use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use log::debug;
use web_sys::HtmlCanvasElement;

use super::state::{AutomatonGraphState, HoverChange};
use super::types::AutomatonGraph;
use crate::tooltips::{
	ContainerLookup, ElementChange, GraphContainer, GraphElement, HoverEvent, HoverHandler,
	PopperRef, ReferenceRect,
};

type ChangeListener = Rc<dyn Fn(ElementChange<GraphElementRef>)>;

#[derive(Default)]
struct Inner {
	state: RefCell<Option<AutomatonGraphState>>,
	canvas: RefCell<Option<HtmlCanvasElement>>,
	listeners: RefCell<HashMap<String, HashMap<HoverEvent, Vec<HoverHandler>>>>,
	ready: Cell<bool>,
	pending: RefCell<Vec<Box<dyn FnOnce()>>>,
	watchers: RefCell<Vec<ChangeListener>>,
}

/// Shared handle to one rendered automaton graph. This is what tooltip code
/// sees as the graph container.
#[derive(Clone, Default)]
pub struct GraphHandle(Rc<Inner>);

impl GraphHandle {
	pub fn state(&self) -> &RefCell<Option<AutomatonGraphState>> {
		&self.0.state
	}

	pub fn set_canvas(&self, canvas: HtmlCanvasElement) {
		*self.0.canvas.borrow_mut() = Some(canvas);
	}

	pub fn downgrade(&self) -> WeakGraphHandle {
		WeakGraphHandle(Rc::downgrade(&self.0))
	}

	pub fn element(&self, id: &str) -> GraphElementRef {
		GraphElementRef {
			id: id.to_string(),
			graph: self.downgrade(),
		}
	}

	pub fn is_ready(&self) -> bool {
		self.0.ready.get()
	}

	/// Flags the layout as ready and runs the queued ready callbacks once.
	pub fn mark_ready(&self) {
		if self.0.ready.replace(true) {
			return;
		}
		let pending: Vec<_> = self.0.pending.borrow_mut().drain(..).collect();
		debug!("Graph ready, running {} callbacks", pending.len());
		for callback in pending {
			callback();
		}
	}

	/// Invokes the handlers bound to `event` on element `id`.
	pub fn dispatch(&self, id: &str, event: HoverEvent) {
		let handlers = self
			.0
			.listeners
			.borrow()
			.get(id)
			.and_then(|events| events.get(&event))
			.cloned()
			.unwrap_or_default();
		for handler in handlers {
			handler();
		}
	}

	pub fn apply_hover(&self, change: HoverChange) {
		if let Some(left) = change.left {
			self.dispatch(&left, HoverEvent::MouseOut);
		}
		if let Some(entered) = change.entered {
			self.dispatch(&entered, HoverEvent::MouseOver);
		}
	}

	/// Swaps in new graph data. Surviving nodes keep their positions; once a
	/// previous graph existed, additions and removals are reported to the
	/// change listeners.
	pub fn replace_data(&self, data: &AutomatonGraph, width: f64, height: f64) {
		let (previous_ids, mut next) = {
			let state = self.0.state.borrow();
			match state.as_ref() {
				Some(previous) => {
					let mut next =
						AutomatonGraphState::new(data, width, height, &previous.positions());
					next.inherit(previous);
					(Some(previous.element_ids()), next)
				}
				None => (
					None,
					AutomatonGraphState::new(data, width, height, &HashMap::new()),
				),
			}
		};
		let current = data.element_ids();
		next.resize(width, height);
		*self.0.state.borrow_mut() = Some(next);

		let Some(previous_ids) = previous_ids else {
			return;
		};
		let (before, after): (HashSet<_>, HashSet<_>) =
			(previous_ids.iter().collect(), current.iter().collect());
		let removed: Vec<&String> = previous_ids.iter().filter(|id| !after.contains(id)).collect();
		let added: Vec<&String> = current.iter().filter(|id| !before.contains(id)).collect();

		{
			let mut listeners = self.0.listeners.borrow_mut();
			for id in &removed {
				listeners.remove(*id);
			}
		}
		debug!(
			"Graph now shows '{}': {} added, {} removed",
			data.name,
			added.len(),
			removed.len()
		);

		let watchers = self.0.watchers.borrow().clone();
		for watcher in &watchers {
			for id in &removed {
				watcher(ElementChange::Removed((*id).clone()));
			}
			for id in &added {
				watcher(ElementChange::Added(self.element(id)));
			}
		}
	}

	/// Viewport rectangle of an element; the canvas origin is added when
	/// the canvas is mounted.
	fn client_rect(&self, id: &str) -> ReferenceRect {
		let bounds = self
			.0
			.state
			.borrow()
			.as_ref()
			.and_then(|state| state.element_bounds(id));
		let Some((x, y, width, height)) = bounds else {
			return ReferenceRect::default();
		};
		let (left, top) = self
			.0
			.canvas
			.borrow()
			.as_ref()
			.map(|canvas| {
				let rect = canvas.get_bounding_client_rect();
				(rect.left(), rect.top())
			})
			.unwrap_or((0.0, 0.0));
		ReferenceRect {
			left: left + x,
			top: top + y,
			width,
			height,
		}
	}
}

impl GraphContainer for GraphHandle {
	type Element = GraphElementRef;

	fn ready(&self, callback: Box<dyn FnOnce()>) {
		if self.is_ready() {
			callback();
		} else {
			self.0.pending.borrow_mut().push(callback);
		}
	}

	fn elements(&self) -> Vec<GraphElementRef> {
		let ids = self
			.0
			.state
			.borrow()
			.as_ref()
			.map(AutomatonGraphState::element_ids)
			.unwrap_or_default();
		ids.iter().map(|id| self.element(id)).collect()
	}

	fn on_change(&self, listener: Box<dyn Fn(ElementChange<GraphElementRef>)>) {
		self.0.watchers.borrow_mut().push(Rc::from(listener));
	}
}

/// Non-owning graph reference, held by anything the graph itself keeps
/// alive (hover handlers, tooltips, frame callbacks).
#[derive(Clone, Default)]
pub struct WeakGraphHandle(Weak<Inner>);

impl WeakGraphHandle {
	pub fn upgrade(&self) -> Option<GraphHandle> {
		self.0.upgrade().map(GraphHandle)
	}
}

/// A location or transition of a [`GraphHandle`], addressed by id. Once the
/// graph is gone, binding does nothing and the position is the origin.
#[derive(Clone)]
pub struct GraphElementRef {
	id: String,
	graph: WeakGraphHandle,
}

impl GraphElement for GraphElementRef {
	fn id(&self) -> String {
		self.id.clone()
	}

	fn popper_ref(&self) -> PopperRef {
		let (graph, id) = (self.graph.clone(), self.id.clone());
		Rc::new(move || {
			graph
				.upgrade()
				.map(|graph| graph.client_rect(&id))
				.unwrap_or_default()
		})
	}

	fn bind(&self, event: HoverEvent, handler: HoverHandler) {
		let Some(graph) = self.graph.upgrade() else {
			return;
		};
		graph
			.0
			.listeners
			.borrow_mut()
			.entry(self.id.clone())
			.or_default()
			.entry(event)
			.or_default()
			.push(handler);
	}

	fn unbind(&self, event: HoverEvent) {
		if let Some(graph) = self.graph.upgrade() {
			if let Some(events) = graph.0.listeners.borrow_mut().get_mut(&self.id) {
				events.remove(&event);
			}
		}
	}
}

thread_local! {
	static GRAPHS: RefCell<HashMap<String, GraphHandle>> = RefCell::default();
}

/// Page-wide table of mounted graphs, keyed by container id.
pub struct GraphRegistry;

impl GraphRegistry {
	pub fn register(id: &str, graph: GraphHandle) {
		GRAPHS.with(|graphs| graphs.borrow_mut().insert(id.to_string(), graph));
	}

	pub fn unregister(id: &str) {
		GRAPHS.with(|graphs| graphs.borrow_mut().remove(id));
	}
}

impl ContainerLookup for GraphRegistry {
	type Container = GraphHandle;

	fn container_by_id(&self, id: &str) -> Option<GraphHandle> {
		GRAPHS.with(|graphs| graphs.borrow().get(id).cloned())
	}
}
