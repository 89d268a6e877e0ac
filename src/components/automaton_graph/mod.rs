mod component;
mod element;
mod render;
mod state;
mod types;

pub use component::AutomatonGraphCanvas;
pub use element::GraphRegistry;
pub use types::{AutomatonGraph, Location, Transition};
