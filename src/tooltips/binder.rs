use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, error, info};

use super::collab::{
	ContainerLookup, ElementChange, GraphContainer, GraphElement, HoverEvent, Placement,
	TooltipFactory, TooltipHandle, TooltipOptions, Trigger,
};
use super::error::TooltipError;

/// Identifier of the graph container on the dashboard page.
pub const AUTOMATON_GRAPH_ID: &str = "automaton-graph";

/// Settings for [`install`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinderConfig {
	/// Container the binder looks up on install.
	pub container_id: String,
	/// Side of each element its tooltip appears on.
	pub placement: Placement,
}

impl Default for BinderConfig {
	fn default() -> Self {
		Self {
			container_id: AUTOMATON_GRAPH_ID.to_string(),
			placement: Placement::default(),
		}
	}
}

/// Wires hover events of graph elements to one tooltip per element.
///
/// Clones share the same registry of handles, keyed by element id.
pub struct TooltipBinder<F: TooltipFactory> {
	factory: Rc<F>,
	placement: Placement,
	handles: Rc<RefCell<HashMap<String, Rc<F::Handle>>>>,
}

impl<F: TooltipFactory> Clone for TooltipBinder<F> {
	fn clone(&self) -> Self {
		Self {
			factory: self.factory.clone(),
			placement: self.placement,
			handles: self.handles.clone(),
		}
	}
}

impl<F: TooltipFactory + 'static> TooltipBinder<F> {
	/// Binder creating tooltips through `factory`, all on the same side.
	pub fn new(factory: F, placement: Placement) -> Self {
		Self {
			factory: Rc::new(factory),
			placement,
			handles: Rc::new(RefCell::new(HashMap::new())),
		}
	}

	/// Attaches a tooltip to every element of `container` in a single pass.
	///
	/// Stops at the first factory failure; elements visited before it keep
	/// their tooltips. Returns the number of elements attached.
	pub fn bind_all<C: GraphContainer>(&self, container: &C) -> Result<usize, TooltipError> {
		let mut attached = 0;
		for element in container.elements() {
			self.attach(&element)?;
			attached += 1;
		}
		debug!("Bound tooltips to {} graph elements", attached);
		Ok(attached)
	}

	/// Gives `element` a tooltip (reusing one it already has) and replaces its
	/// hover bindings with show/hide of that tooltip.
	pub fn attach<E: GraphElement>(&self, element: &E) -> Result<(), TooltipError> {
		let id = element.id();
		let existing = self.handles.borrow().get(&id).cloned();
		let handle = match existing {
			Some(handle) => handle,
			None => {
				let source = element.clone();
				let options = TooltipOptions {
					content: Rc::new(move || source.id()),
					trigger: Trigger::Manual,
					placement: self.placement,
				};
				let handle = Rc::new(self.factory.create(element.popper_ref(), options)?);
				self.handles.borrow_mut().insert(id, handle.clone());
				handle
			}
		};

		let show = handle.clone();
		element.unbind(HoverEvent::MouseOver);
		element.bind(HoverEvent::MouseOver, Rc::new(move || show.show()));

		element.unbind(HoverEvent::MouseOut);
		element.bind(HoverEvent::MouseOut, Rc::new(move || handle.hide()));
		Ok(())
	}

	/// Hides and drops the tooltip of a removed element.
	pub fn release(&self, id: &str) -> bool {
		let Some(handle) = self.handles.borrow_mut().remove(id) else {
			return false;
		};
		handle.hide();
		debug!("Released tooltip of {}", id);
		true
	}

	/// Keeps tooltips in step with elements added to or removed from
	/// `container` after the initial pass.
	pub fn watch<C: GraphContainer>(&self, container: &C) {
		let binder = self.clone();
		container.on_change(Box::new(move |change| match change {
			ElementChange::Added(element) => {
				if let Err(err) = binder.attach(&element) {
					error!("Failed to attach tooltip to {}: {}", element.id(), err);
				}
			}
			ElementChange::Removed(id) => {
				binder.release(&id);
			}
		}));
	}

	/// Tooltip currently attached to element `id`.
	pub fn handle(&self, id: &str) -> Option<Rc<F::Handle>> {
		self.handles.borrow().get(id).cloned()
	}

	/// Number of elements with a tooltip.
	pub fn len(&self) -> usize {
		self.handles.borrow().len()
	}

	/// Whether no element has a tooltip.
	pub fn is_empty(&self) -> bool {
		self.handles.borrow().is_empty()
	}
}

/// Looks up the configured container and, once its graph is ready, binds
/// tooltips to all of its elements and follows later changes.
///
/// A missing container is not an error: nothing is created and `None` is
/// returned.
pub fn install<L, F>(lookup: &L, config: &BinderConfig, factory: F) -> Option<TooltipBinder<F>>
where
	L: ContainerLookup,
	L::Container: Clone + 'static,
	F: TooltipFactory + 'static,
{
	let Some(container) = lookup.container_by_id(&config.container_id) else {
		debug!("No graph container '{}', tooltips disabled", config.container_id);
		return None;
	};

	let binder = TooltipBinder::new(factory, config.placement);
	let (ready_binder, ready_container) = (binder.clone(), container.clone());
	container.ready(Box::new(move || match ready_binder.bind_all(&ready_container) {
		Ok(count) => {
			info!("Tooltips ready on {} elements", count);
			ready_binder.watch(&ready_container);
		}
		Err(err) => error!("Tooltip setup aborted: {}", err),
	}));
	Some(binder)
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;

	use super::*;
	use crate::tooltips::collab::{HoverHandler, PopperRef, ReferenceRect};

	#[derive(Clone)]
	struct MockElement {
		id: Rc<RefCell<String>>,
		handlers: Rc<RefCell<HashMap<HoverEvent, Vec<HoverHandler>>>>,
	}

	impl MockElement {
		fn new(id: &str) -> Self {
			Self {
				id: Rc::new(RefCell::new(id.to_string())),
				handlers: Rc::default(),
			}
		}

		fn fire(&self, event: HoverEvent) {
			let handlers = self.handlers.borrow().get(&event).cloned().unwrap_or_default();
			for handler in handlers {
				handler();
			}
		}

		fn handler_count(&self, event: HoverEvent) -> usize {
			self.handlers.borrow().get(&event).map_or(0, Vec::len)
		}
	}

	impl GraphElement for MockElement {
		fn id(&self) -> String {
			self.id.borrow().clone()
		}

		fn popper_ref(&self) -> PopperRef {
			Rc::new(ReferenceRect::default)
		}

		fn bind(&self, event: HoverEvent, handler: HoverHandler) {
			self.handlers.borrow_mut().entry(event).or_default().push(handler);
		}

		fn unbind(&self, event: HoverEvent) {
			self.handlers.borrow_mut().remove(&event);
		}
	}

	#[derive(Clone, Default)]
	struct MockGraph {
		elements: Rc<RefCell<Vec<MockElement>>>,
		ready: Rc<Cell<bool>>,
		pending: Rc<RefCell<Vec<Box<dyn FnOnce()>>>>,
		listeners: Rc<RefCell<Vec<Rc<dyn Fn(ElementChange<MockElement>)>>>>,
	}

	impl MockGraph {
		fn with(ids: &[&str]) -> Self {
			let graph = Self::default();
			graph
				.elements
				.borrow_mut()
				.extend(ids.iter().map(|id| MockElement::new(id)));
			graph
		}

		fn element(&self, id: &str) -> MockElement {
			self.elements
				.borrow()
				.iter()
				.find(|e| e.id() == id)
				.cloned()
				.expect("element present")
		}

		fn mark_ready(&self) {
			self.ready.set(true);
			let pending: Vec<_> = self.pending.borrow_mut().drain(..).collect();
			for callback in pending {
				callback();
			}
		}

		fn add(&self, id: &str) -> MockElement {
			let element = MockElement::new(id);
			self.elements.borrow_mut().push(element.clone());
			self.notify(|| ElementChange::Added(element.clone()));
			element
		}

		fn remove(&self, id: &str) {
			self.elements.borrow_mut().retain(|e| e.id() != id);
			self.notify(|| ElementChange::Removed(id.to_string()));
		}

		fn notify(&self, change: impl Fn() -> ElementChange<MockElement>) {
			let listeners = self.listeners.borrow().clone();
			for listener in listeners {
				listener(change());
			}
		}
	}

	impl GraphContainer for MockGraph {
		type Element = MockElement;

		fn ready(&self, callback: Box<dyn FnOnce()>) {
			if self.ready.get() {
				callback();
			} else {
				self.pending.borrow_mut().push(callback);
			}
		}

		fn elements(&self) -> Vec<MockElement> {
			self.elements.borrow().clone()
		}

		fn on_change(&self, listener: Box<dyn Fn(ElementChange<MockElement>)>) {
			self.listeners.borrow_mut().push(Rc::from(listener));
		}
	}

	struct MockLookup(Option<MockGraph>);

	impl ContainerLookup for MockLookup {
		type Container = MockGraph;

		fn container_by_id(&self, id: &str) -> Option<MockGraph> {
			(id == AUTOMATON_GRAPH_ID).then(|| self.0.clone()).flatten()
		}
	}

	struct MockTooltip {
		options: TooltipOptions,
		visible: Cell<bool>,
		shown: RefCell<Vec<String>>,
	}

	impl TooltipHandle for MockTooltip {
		fn show(&self) {
			self.shown.borrow_mut().push((self.options.content)());
			self.visible.set(true);
		}

		fn hide(&self) {
			self.visible.set(false);
		}

		fn is_visible(&self) -> bool {
			self.visible.get()
		}
	}

	#[derive(Clone, Default)]
	struct MockFactory {
		created: Rc<Cell<usize>>,
		fail_at: Option<usize>,
	}

	impl TooltipFactory for MockFactory {
		type Handle = MockTooltip;

		fn create(
			&self,
			_reference: PopperRef,
			options: TooltipOptions,
		) -> Result<MockTooltip, TooltipError> {
			if self.fail_at == Some(self.created.get()) {
				return Err(TooltipError::Factory("rejected".into()));
			}
			self.created.set(self.created.get() + 1);
			Ok(MockTooltip {
				options,
				visible: Cell::new(false),
				shown: RefCell::new(Vec::new()),
			})
		}
	}

	fn binder() -> (TooltipBinder<MockFactory>, Rc<Cell<usize>>) {
		let factory = MockFactory::default();
		let created = factory.created.clone();
		(TooltipBinder::new(factory, Placement::Top), created)
	}

	#[test]
	fn every_element_gets_exactly_one_tooltip() {
		let graph = MockGraph::with(&["q0", "q1", "q0-go->q1"]);
		let (binder, created) = binder();

		assert_eq!(binder.bind_all(&graph).unwrap(), 3);
		assert_eq!(binder.len(), 3);
		assert_eq!(created.get(), 3);
		for id in ["q0", "q1", "q0-go->q1"] {
			assert!(binder.handle(id).is_some());
		}
	}

	#[test]
	fn hover_shows_then_hides() {
		let graph = MockGraph::with(&["q0"]);
		let (binder, _) = binder();
		binder.bind_all(&graph).unwrap();

		let element = graph.element("q0");
		let tooltip = binder.handle("q0").unwrap();
		assert!(!tooltip.is_visible());

		element.fire(HoverEvent::MouseOver);
		assert!(tooltip.is_visible());
		assert_eq!(*tooltip.shown.borrow(), vec!["q0".to_string()]);

		element.fire(HoverEvent::MouseOut);
		assert!(!tooltip.is_visible());
	}

	#[test]
	fn rebinding_keeps_one_handler_and_one_tooltip_per_element() {
		let graph = MockGraph::with(&["q0", "q1"]);
		let (binder, created) = binder();
		binder.bind_all(&graph).unwrap();
		binder.bind_all(&graph).unwrap();

		assert_eq!(created.get(), 2);
		for id in ["q0", "q1"] {
			let element = graph.element(id);
			assert_eq!(element.handler_count(HoverEvent::MouseOver), 1);
			assert_eq!(element.handler_count(HoverEvent::MouseOut), 1);
		}

		graph.element("q0").fire(HoverEvent::MouseOver);
		assert_eq!(binder.handle("q0").unwrap().shown.borrow().len(), 1);
	}

	#[test]
	fn content_is_read_when_shown() {
		let graph = MockGraph::with(&["q0"]);
		let (binder, _) = binder();
		binder.bind_all(&graph).unwrap();

		let element = graph.element("q0");
		*element.id.borrow_mut() = "q0'".to_string();
		element.fire(HoverEvent::MouseOver);

		let tooltip = binder.handle("q0").unwrap();
		assert_eq!(*tooltip.shown.borrow(), vec!["q0'".to_string()]);
	}

	#[test]
	fn elements_toggle_independently() {
		let graph = MockGraph::with(&["q0", "q1"]);
		let (binder, _) = binder();
		binder.bind_all(&graph).unwrap();
		let (q0, q1) = (binder.handle("q0").unwrap(), binder.handle("q1").unwrap());

		graph.element("q0").fire(HoverEvent::MouseOver);
		assert!(q0.is_visible());
		assert!(!q1.is_visible());

		graph.element("q1").fire(HoverEvent::MouseOver);
		assert!(q0.is_visible() && q1.is_visible());

		graph.element("q0").fire(HoverEvent::MouseOut);
		assert!(!q0.is_visible());
		assert!(q1.is_visible());
	}

	#[test]
	fn missing_container_creates_nothing() {
		let factory = MockFactory::default();
		let created = factory.created.clone();

		let binder = install(&MockLookup(None), &BinderConfig::default(), factory);
		assert!(binder.is_none());
		assert_eq!(created.get(), 0);
	}

	#[test]
	fn other_container_id_is_not_found() {
		let lookup = MockLookup(Some(MockGraph::with(&["q0"])));
		let config = BinderConfig {
			container_id: "trajectory-graph".into(),
			..BinderConfig::default()
		};
		assert!(install(&lookup, &config, MockFactory::default()).is_none());
	}

	#[test]
	fn install_waits_for_ready() {
		let graph = MockGraph::with(&["q0", "q1"]);
		let lookup = MockLookup(Some(graph.clone()));
		let binder = install(&lookup, &BinderConfig::default(), MockFactory::default()).unwrap();

		assert!(binder.is_empty());
		assert_eq!(graph.element("q0").handler_count(HoverEvent::MouseOver), 0);

		graph.mark_ready();
		assert_eq!(binder.len(), 2);
		assert_eq!(graph.element("q1").handler_count(HoverEvent::MouseOut), 1);
	}

	#[test]
	fn install_on_ready_graph_binds_immediately() {
		let graph = MockGraph::with(&["q0"]);
		graph.mark_ready();
		let lookup = MockLookup(Some(graph));
		let binder = install(&lookup, &BinderConfig::default(), MockFactory::default()).unwrap();
		assert_eq!(binder.len(), 1);
	}

	#[test]
	fn factory_failure_stops_the_pass() {
		let graph = MockGraph::with(&["q0", "q1", "q2"]);
		let factory = MockFactory {
			fail_at: Some(1),
			..MockFactory::default()
		};
		let binder = TooltipBinder::new(factory, Placement::Top);

		let err = binder.bind_all(&graph).unwrap_err();
		assert_eq!(err, TooltipError::Factory("rejected".into()));
		assert_eq!(binder.len(), 1);
		assert_eq!(graph.element("q0").handler_count(HoverEvent::MouseOver), 1);
		assert_eq!(graph.element("q1").handler_count(HoverEvent::MouseOver), 0);
		assert_eq!(graph.element("q2").handler_count(HoverEvent::MouseOver), 0);
	}

	#[test]
	fn failed_install_does_not_watch() {
		let graph = MockGraph::with(&["q0"]);
		let factory = MockFactory {
			fail_at: Some(0),
			..MockFactory::default()
		};
		let lookup = MockLookup(Some(graph.clone()));
		let binder = install(&lookup, &BinderConfig::default(), factory).unwrap();
		graph.mark_ready();

		assert!(binder.is_empty());
		assert!(graph.listeners.borrow().is_empty());
	}

	#[test]
	fn watched_graph_tracks_additions_and_removals() {
		let graph = MockGraph::with(&["q0"]);
		graph.mark_ready();
		let lookup = MockLookup(Some(graph.clone()));
		let binder = install(&lookup, &BinderConfig::default(), MockFactory::default()).unwrap();

		let added = graph.add("q1");
		assert_eq!(binder.len(), 2);
		added.fire(HoverEvent::MouseOver);
		let tooltip = binder.handle("q1").unwrap();
		assert!(tooltip.is_visible());

		graph.remove("q1");
		assert!(binder.handle("q1").is_none());
		assert!(!tooltip.is_visible());
		assert_eq!(binder.len(), 1);
	}

	#[test]
	fn releasing_unknown_id_is_noop() {
		let (binder, _) = binder();
		assert!(!binder.release("q9"));
	}
}
