//! Contracts between the tooltip binder and its two collaborators: the graph
//! that owns the elements and the factory that owns the popups.

use std::fmt;
use std::rc::Rc;

use super::error::TooltipError;

/// Pointer events the binder subscribes to on every element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HoverEvent {
	/// Pointer entered the element.
	MouseOver,
	/// Pointer left the element.
	MouseOut,
}

impl HoverEvent {
	/// DOM name of the event.
	pub fn name(self) -> &'static str {
		match self {
			Self::MouseOver => "mouseover",
			Self::MouseOut => "mouseout",
		}
	}
}

impl fmt::Display for HoverEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Callback installed on an element for one hover event.
pub type HoverHandler = Rc<dyn Fn()>;

/// Bounding box of an element in viewport coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReferenceRect {
	/// Distance from the viewport's left edge.
	pub left: f64,
	/// Distance from the viewport's top edge.
	pub top: f64,
	/// Horizontal extent, zero for a point.
	pub width: f64,
	/// Vertical extent, zero for a point.
	pub height: f64,
}

impl ReferenceRect {
	/// Horizontal middle of the box.
	pub fn center_x(&self) -> f64 {
		self.left + self.width / 2.0
	}

	/// Vertical middle of the box.
	pub fn center_y(&self) -> f64 {
		self.top + self.height / 2.0
	}
}

/// Position source used only for placing a tooltip. Evaluated at show time.
pub type PopperRef = Rc<dyn Fn() -> ReferenceRect>;

/// One node or edge of a rendered graph.
pub trait GraphElement: Clone + 'static {
	/// Identifier of the element, also the text its tooltip displays.
	fn id(&self) -> String;

	/// Position reference that follows the element as the layout moves.
	fn popper_ref(&self) -> PopperRef;

	/// Adds `handler` for `event`.
	fn bind(&self, event: HoverEvent, handler: HoverHandler);

	/// Removes every handler bound for `event`.
	fn unbind(&self, event: HoverEvent);
}

/// Membership change reported by a live graph.
pub enum ElementChange<E> {
	/// A new element, already present in the graph.
	Added(E),
	/// Id of an element that left the graph.
	Removed(String),
}

/// A rendered graph that can be enumerated and observed.
pub trait GraphContainer {
	/// Node or edge type handed out by [`GraphContainer::elements`].
	type Element: GraphElement;

	/// Runs `callback` once the graph has laid out its elements. If the graph
	/// is already ready the callback runs immediately.
	fn ready(&self, callback: Box<dyn FnOnce()>);

	/// Every element currently in the graph, nodes and edges alike.
	fn elements(&self) -> Vec<Self::Element>;

	/// Subscribes to element additions and removals.
	fn on_change(&self, listener: Box<dyn Fn(ElementChange<Self::Element>)>);
}

/// Finds graph containers by their well-known identifier.
pub trait ContainerLookup {
	/// Graph type found by the lookup.
	type Container: GraphContainer;

	/// The container registered under `id`, if one is mounted.
	fn container_by_id(&self, id: &str) -> Option<Self::Container>;
}

/// How a tooltip becomes visible. Only explicit show/hide calls are supported;
/// the factory never watches the pointer itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Trigger {
	/// Shown and hidden only through [`TooltipHandle`] calls.
	#[default]
	Manual,
}

/// Side of the reference the popup is placed on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Placement {
	/// Above, horizontally centered.
	#[default]
	Top,
	/// Below, horizontally centered.
	Bottom,
	/// Left of, vertically centered.
	Left,
	/// Right of, vertically centered.
	Right,
}

/// Configuration handed to [`TooltipFactory::create`].
#[derive(Clone)]
pub struct TooltipOptions {
	/// Produces the displayed text each time the tooltip is shown.
	pub content: Rc<dyn Fn() -> String>,
	/// Always [`Trigger::Manual`] when created by the binder.
	pub trigger: Trigger,
	/// Side of the reference the popup appears on.
	pub placement: Placement,
}

/// A popup bound to one element.
pub trait TooltipHandle {
	/// Evaluates the content and position and makes the popup visible.
	fn show(&self);
	/// Hides the popup. Hiding a hidden popup does nothing.
	fn hide(&self);
	/// Whether the popup is currently shown.
	fn is_visible(&self) -> bool;
}

/// Creates tooltip popups.
pub trait TooltipFactory {
	/// Popup type produced by [`TooltipFactory::create`].
	type Handle: TooltipHandle + 'static;

	/// Builds a hidden popup placed against `reference`.
	fn create(&self, reference: PopperRef, options: TooltipOptions)
	-> Result<Self::Handle, TooltipError>;
}
