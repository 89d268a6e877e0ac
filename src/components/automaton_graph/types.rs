/// A discrete location of a hybrid automaton, drawn as a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
	pub id: String,
	pub label: String,
}

/// A transition between two locations triggered by an event, drawn as an edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
	pub source: String,
	pub target: String,
	pub event: String,
}

impl Transition {
	pub fn id(&self) -> String {
		format!("{}-{}->{}", self.source, self.event, self.target)
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AutomatonGraph {
	pub name: String,
	pub locations: Vec<Location>,
	pub transitions: Vec<Transition>,
}

impl AutomatonGraph {
	/// Identifiers of every drawable element: locations first, then the
	/// transitions whose endpoints both exist.
	pub fn element_ids(&self) -> Vec<String> {
		let mut ids: Vec<String> = self.locations.iter().map(|l| l.id.clone()).collect();
		ids.extend(
			self.transitions
				.iter()
				.filter(|t| self.has_location(&t.source) && self.has_location(&t.target))
				.map(Transition::id),
		);
		ids
	}

	fn has_location(&self, id: &str) -> bool {
		self.locations.iter().any(|l| l.id == id)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
	Node,
	Edge,
}
