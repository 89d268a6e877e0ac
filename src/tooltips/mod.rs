//! Hover tooltips for the elements of a rendered graph.
//!
//! [`install`] finds the graph container, waits for it to report ready and
//! gives each node and edge a tooltip showing its identifier. The graph and
//! the popup implementation are injected through the traits in [`collab`].

mod binder;
pub mod collab;
mod dom;
mod error;

pub use binder::{AUTOMATON_GRAPH_ID, BinderConfig, TooltipBinder, install};
pub use collab::{
	ContainerLookup, ElementChange, GraphContainer, GraphElement, HoverEvent, HoverHandler,
	Placement, PopperRef, ReferenceRect, TooltipFactory, TooltipHandle, TooltipOptions, Trigger,
};
pub use dom::{DomTooltip, DomTooltipFactory};
pub use error::TooltipError;
