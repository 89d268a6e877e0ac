//! Browser entry point: mounts the automaton dashboard.

use automaton_tooltips::{App, init_logging};
use leptos::mount::mount_to_body;

fn main() {
	init_logging();
	mount_to_body(App)
}
