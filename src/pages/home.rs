use leptos::prelude::*;
use log::{error, warn};

use crate::components::automaton_graph::{
	AutomatonGraph, AutomatonGraphCanvas, GraphRegistry, Location, Transition,
};
use crate::tooltips::{AUTOMATON_GRAPH_ID, BinderConfig, DomTooltipFactory, install};

fn automaton(name: &str, locations: &[&str], transitions: &[(&str, &str, &str)]) -> AutomatonGraph {
	AutomatonGraph {
		name: name.to_string(),
		locations: locations
			.iter()
			.map(|id| Location {
				id: id.to_string(),
				label: id.to_string(),
			})
			.collect(),
		transitions: transitions
			.iter()
			.map(|&(source, event, target)| Transition {
				source: source.to_string(),
				target: target.to_string(),
				event: event.to_string(),
			})
			.collect(),
	}
}

/// Automata of the water tank tutorial system.
fn sample_automata() -> Vec<AutomatonGraph> {
	vec![
		automaton(
			"controller",
			&["rising", "falling"],
			&[
				("falling", "can_open", "rising"),
				("rising", "can_close", "falling"),
			],
		),
		automaton("tank", &["tank"], &[]),
		automaton(
			"valve",
			&["opened", "closing", "closed", "opening"],
			&[
				("closed", "can_open", "opening"),
				("opening", "stop_opening", "opened"),
				("opened", "can_close", "closing"),
				("closing", "stop_closing", "closed"),
				("opening", "can_close", "closing"),
				("closing", "can_open", "opening"),
			],
		),
	]
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let automata = StoredValue::new(sample_automata());
	let (selected, set_selected) = signal("valve".to_string());
	let graph_data = Signal::derive(move || {
		automata.with_value(|all| {
			all.iter()
				.find(|a| a.name == selected.get())
				.cloned()
				.unwrap_or_default()
		})
	});

	Effect::new(move |_| match DomTooltipFactory::new() {
		Ok(factory) => {
			if install(&GraphRegistry, &BinderConfig::default(), factory).is_none() {
				warn!("Graph '{}' not mounted, no tooltips", AUTOMATON_GRAPH_ID);
			}
		}
		Err(err) => error!("Tooltips unavailable: {}", err),
	});

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="automaton-panel">
				<h1>"Hybrid automaton"</h1>
				<select
					id="automaton-selector"
					on:change=move |ev| set_selected.set(event_target_value(&ev))
				>
					{automata
						.with_value(|all| {
							all.iter()
								.map(|a| {
									let name = a.name.clone();
									let is_selected = name == selected.get_untracked();
									view! {
										<option value=name.clone() selected=is_selected>
											{name.clone()}
										</option>
									}
								})
								.collect_view()
						})}
				</select>
				<p class="subtitle">"Hover a location or transition to see its id."</p>
				<AutomatonGraphCanvas id=AUTOMATON_GRAPH_ID data=graph_data />
			</div>
		</ErrorBoundary>
	}
}
