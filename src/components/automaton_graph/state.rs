use std::collections::HashMap;
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

use super::types::{AutomatonGraph, ElementKind};

pub const NODE_RADIUS: f64 = 18.0;
/// World-space distance within which a pointer counts as over an edge.
pub const EDGE_HIT_DISTANCE: f64 = 6.0;
/// Sideways shift of edges that have a reverse twin, so both stay visible.
const TWIN_OFFSET: f64 = 8.0;
/// Radius of the arc drawn above a node for a transition back to itself.
pub const LOOP_RADIUS: f64 = 12.0;
/// Simulation steps before the layout is considered ready.
pub const SETTLE_TICKS: u32 = 90;
const LAYOUT_RADIUS: f64 = 120.0;

#[derive(Clone, Debug)]
pub struct NodeInfo {
	pub id: String,
	pub label: String,
}

#[derive(Clone, Debug)]
pub struct EdgeInfo {
	pub id: String,
	pub label: String,
	pub source: DefaultNodeIdx,
	pub target: DefaultNodeIdx,
	twin: bool,
}

#[derive(Clone, Debug)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub node: Option<DefaultNodeIdx>,
	pub start: (f64, f64),
	pub node_start: (f32, f32),
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start: (f64, f64),
	pub transform_start: (f64, f64),
}

/// Elements the pointer just left and entered, in that order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoverChange {
	pub left: Option<String>,
	pub entered: Option<String>,
}

pub struct AutomatonGraphState {
	pub graph: ForceGraph<NodeInfo, ()>,
	pub edges: Vec<EdgeInfo>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hovered: Option<String>,
	pub width: f64,
	pub height: f64,
	ticks: u32,
}

impl AutomatonGraphState {
	/// Lays the locations out on a circle, except those with a position in
	/// `previous`, which keep it.
	pub fn new(
		data: &AutomatonGraph,
		width: f64,
		height: f64,
		previous: &HashMap<String, (f32, f32)>,
	) -> Self {
		let mut graph = ForceGraph::new(SimulationParameters {
			force_charge: 800.0,
			force_spring: 0.04,
			force_max: 100.0,
			node_speed: 2000.0,
			damping_factor: 0.85,
		});
		let mut id_to_idx = HashMap::new();
		let count = data.locations.len().max(1) as f64;

		for (i, location) in data.locations.iter().enumerate() {
			let (x, y) = previous.get(&location.id).copied().unwrap_or_else(|| {
				let angle = (i as f64) * 2.0 * PI / count - PI / 2.0;
				(
					(LAYOUT_RADIUS * angle.cos()) as f32,
					(LAYOUT_RADIUS * angle.sin()) as f32,
				)
			});
			let idx = graph.add_node(NodeData {
				x,
				y,
				mass: 10.0,
				is_anchor: false,
				user_data: NodeInfo {
					id: location.id.clone(),
					label: location.label.clone(),
				},
			});
			id_to_idx.insert(location.id.as_str(), idx);
		}

		let mut edges: Vec<EdgeInfo> = Vec::new();
		for transition in &data.transitions {
			let (Some(&source), Some(&target)) = (
				id_to_idx.get(transition.source.as_str()),
				id_to_idx.get(transition.target.as_str()),
			) else {
				continue;
			};
			if source != target {
				graph.add_edge(source, target, EdgeData::default());
			}
			edges.push(EdgeInfo {
				id: transition.id(),
				label: transition.event.clone(),
				source,
				target,
				twin: false,
			});
		}
		let pairs: Vec<_> = edges.iter().map(|e| (e.source, e.target)).collect();
		for edge in &mut edges {
			edge.twin = edge.source != edge.target && pairs.contains(&(edge.target, edge.source));
		}

		Self {
			graph,
			edges,
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			hovered: None,
			width,
			height,
			ticks: 0,
		}
	}

	pub fn element_ids(&self) -> Vec<String> {
		let mut ids = Vec::new();
		self.graph.visit_nodes(|node| ids.push(node.data.user_data.id.clone()));
		ids.extend(self.edges.iter().map(|e| e.id.clone()));
		ids
	}

	pub fn positions(&self) -> HashMap<String, (f32, f32)> {
		let mut positions = HashMap::new();
		self.graph.visit_nodes(|node| {
			positions.insert(node.data.user_data.id.clone(), (node.x(), node.y()));
		});
		positions
	}

	fn node_points(&self) -> HashMap<DefaultNodeIdx, (f64, f64)> {
		let mut points = HashMap::new();
		self.graph.visit_nodes(|node| {
			points.insert(node.index(), (node.x() as f64, node.y() as f64));
		});
		points
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn graph_to_screen(&self, gx: f64, gy: f64) -> (f64, f64) {
		(
			gx * self.transform.k + self.transform.x,
			gy * self.transform.k + self.transform.y,
		)
	}

	/// World-space segment an edge is drawn along, trimmed to the node rims
	/// when the nodes are far enough apart. `None` for self-loops and for
	/// nodes sitting on top of each other.
	pub fn edge_segment(
		&self,
		edge: &EdgeInfo,
		points: &HashMap<DefaultNodeIdx, (f64, f64)>,
	) -> Option<((f64, f64), (f64, f64))> {
		if edge.source == edge.target {
			return None;
		}
		let (&(x1, y1), &(x2, y2)) = (points.get(&edge.source)?, points.get(&edge.target)?);
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < f64::EPSILON {
			return None;
		}
		let (ux, uy) = (dx / dist, dy / dist);
		let shift = if edge.twin { TWIN_OFFSET } else { 0.0 };
		let (ox, oy) = (-uy * shift, ux * shift);
		let trim = if dist > 2.0 * NODE_RADIUS { NODE_RADIUS } else { 0.0 };
		Some((
			(x1 + ux * trim + ox, y1 + uy * trim + oy),
			(x2 - ux * trim + ox, y2 - uy * trim + oy),
		))
	}

	/// World-space center of the loop arc of a self-loop, which sits on top
	/// of its node.
	pub fn loop_center(
		&self,
		edge: &EdgeInfo,
		points: &HashMap<DefaultNodeIdx, (f64, f64)>,
	) -> Option<(f64, f64)> {
		if edge.source != edge.target {
			return None;
		}
		let &(x, y) = points.get(&edge.source)?;
		Some((x, y - NODE_RADIUS - LOOP_RADIUS / 2.0))
	}

	pub fn loops(&self) -> Vec<(&EdgeInfo, (f64, f64))> {
		let points = self.node_points();
		self.edges
			.iter()
			.filter_map(|edge| self.loop_center(edge, &points).map(|center| (edge, center)))
			.collect()
	}

	pub fn segments(&self) -> Vec<(&EdgeInfo, (f64, f64), (f64, f64))> {
		let points = self.node_points();
		self.edges
			.iter()
			.filter_map(|edge| {
				self.edge_segment(edge, &points)
					.map(|(from, to)| (edge, from, to))
			})
			.collect()
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			if (dx * dx + dy * dy).sqrt() < NODE_RADIUS {
				found = Some(node.index());
			}
		});
		found
	}

	/// Element under a canvas point. Nodes win over edges.
	pub fn element_at_position(&self, sx: f64, sy: f64) -> Option<(String, ElementKind)> {
		if let Some(idx) = self.node_at_position(sx, sy) {
			return self.node_id(idx).map(|id| (id, ElementKind::Node));
		}
		let point = self.screen_to_graph(sx, sy);
		let arcs = self.loops().into_iter().map(|(edge, (cx, cy))| {
			let to_center = ((point.0 - cx).powi(2) + (point.1 - cy).powi(2)).sqrt();
			(edge, (to_center - LOOP_RADIUS).abs())
		});
		self.segments()
			.into_iter()
			.map(|(edge, from, to)| (edge, distance_to_segment(point, from, to)))
			.chain(arcs)
			.filter(|&(_, dist)| dist < EDGE_HIT_DISTANCE)
			.min_by(|a, b| a.1.total_cmp(&b.1))
			.map(|(edge, _)| (edge.id.clone(), ElementKind::Edge))
	}

	pub fn node_id(&self, idx: DefaultNodeIdx) -> Option<String> {
		let mut id = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				id = Some(node.data.user_data.id.clone());
			}
		});
		id
	}

	/// Records the hovered element and reports what changed, if anything.
	pub fn set_hover(&mut self, id: Option<String>) -> Option<HoverChange> {
		if self.hovered == id {
			return None;
		}
		let left = std::mem::replace(&mut self.hovered, id.clone());
		Some(HoverChange { left, entered: id })
	}

	/// Canvas-space bounding box `(x, y, width, height)` of an element.
	pub fn element_bounds(&self, id: &str) -> Option<(f64, f64, f64, f64)> {
		let points = self.node_points();
		let k = self.transform.k;
		if let Some((_, &(gx, gy))) = points.iter().find(|(idx, _)| {
			self.node_id(**idx).as_deref() == Some(id)
		}) {
			let (x, y) = self.graph_to_screen(gx, gy);
			let r = NODE_RADIUS * k;
			return Some((x - r, y - r, 2.0 * r, 2.0 * r));
		}
		let edge = self.edges.iter().find(|e| e.id == id)?;
		let (gx, gy) = match self.loop_center(edge, &points) {
			// apex of the arc
			Some((cx, cy)) => (cx, cy - LOOP_RADIUS),
			None => {
				let ((x1, y1), (x2, y2)) = self.edge_segment(edge, &points)?;
				((x1 + x2) / 2.0, (y1 + y2) / 2.0)
			}
		};
		let (x, y) = self.graph_to_screen(gx, gy);
		Some((x, y, 0.0, 0.0))
	}

	/// Advances the simulation. Returns `true` on the step that settles the
	/// initial layout.
	pub fn tick(&mut self, dt: f32) -> bool {
		self.graph.update(dt);
		if self.ticks >= SETTLE_TICKS {
			return false;
		}
		self.ticks += 1;
		self.ticks == SETTLE_TICKS
	}

	pub fn is_settled(&self) -> bool {
		self.ticks >= SETTLE_TICKS
	}

	/// Carries settled status, view and hover over from a state being
	/// replaced. A hovered element that no longer exists is dropped.
	pub fn inherit(&mut self, previous: &AutomatonGraphState) {
		self.ticks = previous.ticks;
		self.transform = previous.transform.clone();
		self.hovered = previous
			.hovered
			.clone()
			.filter(|id| self.element_ids().contains(id));
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

fn distance_to_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
	let (abx, aby) = (b.0 - a.0, b.1 - a.1);
	let len2 = abx * abx + aby * aby;
	let t = if len2 == 0.0 {
		0.0
	} else {
		(((p.0 - a.0) * abx + (p.1 - a.1) * aby) / len2).clamp(0.0, 1.0)
	};
	let (cx, cy) = (a.0 + abx * t, a.1 + aby * t);
	((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::automaton_graph::types::{Location, Transition};

	fn valve() -> AutomatonGraph {
		let location = |id: &str| Location {
			id: id.into(),
			label: id.into(),
		};
		let transition = |source: &str, event: &str, target: &str| Transition {
			source: source.into(),
			target: target.into(),
			event: event.into(),
		};
		AutomatonGraph {
			name: "valve".into(),
			locations: vec![location("opened"), location("closed")],
			transitions: vec![
				transition("opened", "can_close", "closed"),
				transition("closed", "can_open", "opened"),
				transition("closed", "jam", "stuck"),
			],
		}
	}

	fn state() -> AutomatonGraphState {
		AutomatonGraphState::new(&valve(), 800.0, 600.0, &HashMap::new())
	}

	#[test]
	fn transitions_to_unknown_locations_are_skipped() {
		let state = state();
		let ids: Vec<_> = state.edges.iter().map(|e| e.id.as_str()).collect();
		assert_eq!(ids, vec!["opened-can_close->closed", "closed-can_open->opened"]);
		assert_eq!(valve().element_ids().len(), 4);
	}

	#[test]
	fn pointer_over_node_hits_node() {
		let state = state();
		let (gx, gy) = state.positions()["closed"];
		let (sx, sy) = state.graph_to_screen(gx as f64, gy as f64);
		assert_eq!(
			state.element_at_position(sx + 3.0, sy - 3.0),
			Some(("closed".to_string(), ElementKind::Node))
		);
	}

	#[test]
	fn pointer_over_edge_hits_edge() {
		let state = state();
		let (edge, from, to) = state
			.segments()
			.into_iter()
			.find(|(e, _, _)| e.id == "closed-can_open->opened")
			.unwrap();
		assert_eq!(edge.label, "can_open");
		let (sx, sy) = state.graph_to_screen((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0);
		assert_eq!(
			state.element_at_position(sx, sy),
			Some(("closed-can_open->opened".to_string(), ElementKind::Edge))
		);
	}

	fn ticking() -> AutomatonGraph {
		let mut graph = valve();
		graph.transitions.push(Transition {
			source: "opened".into(),
			target: "opened".into(),
			event: "tick".into(),
		});
		graph
	}

	#[test]
	fn self_loop_is_hoverable_on_its_arc() {
		let state = AutomatonGraphState::new(&ticking(), 800.0, 600.0, &HashMap::new());
		let loops = state.loops();
		assert_eq!(loops.len(), 1);
		assert_eq!(loops[0].0.id, "opened-tick->opened");
		assert!(state.segments().iter().all(|(e, _, _)| e.id != "opened-tick->opened"));

		let (x, y, _, _) = state.element_bounds("opened-tick->opened").unwrap();
		let (gx, gy) = state.positions()["opened"];
		let (nx, ny) = state.graph_to_screen(gx as f64, gy as f64);
		assert!((x - nx).abs() < 1e-6);
		assert!(y < ny - NODE_RADIUS);
		assert_eq!(
			state.element_at_position(x, y),
			Some(("opened-tick->opened".to_string(), ElementKind::Edge))
		);
	}

	#[test]
	fn nearby_nodes_still_get_an_edge() {
		let previous = HashMap::from([
			("opened".to_string(), (0.0_f32, 0.0_f32)),
			("closed".to_string(), (20.0_f32, 0.0_f32)),
		]);
		let state = AutomatonGraphState::new(&valve(), 800.0, 600.0, &previous);
		assert_eq!(state.segments().len(), 2);
		assert!(state.element_bounds("opened-can_close->closed").is_some());
	}

	#[test]
	fn empty_space_hits_nothing() {
		let state = state();
		assert_eq!(state.element_at_position(5.0, 5.0), None);
	}

	#[test]
	fn hover_changes_report_left_then_entered() {
		let mut state = state();
		assert_eq!(
			state.set_hover(Some("opened".into())),
			Some(HoverChange {
				left: None,
				entered: Some("opened".into())
			})
		);
		assert_eq!(state.set_hover(Some("opened".into())), None);
		assert_eq!(
			state.set_hover(Some("closed".into())),
			Some(HoverChange {
				left: Some("opened".into()),
				entered: Some("closed".into())
			})
		);
		assert_eq!(
			state.set_hover(None),
			Some(HoverChange {
				left: Some("closed".into()),
				entered: None
			})
		);
	}

	#[test]
	fn layout_settles_once() {
		let mut state = state();
		let settled: Vec<bool> = (0..SETTLE_TICKS + 5).map(|_| state.tick(0.016)).collect();
		assert_eq!(settled.iter().filter(|&&s| s).count(), 1);
		assert!(settled[SETTLE_TICKS as usize - 1]);
		assert!(state.is_settled());
	}

	#[test]
	fn rebuild_keeps_known_positions() {
		let previous = HashMap::from([("opened".to_string(), (42.0_f32, -7.0_f32))]);
		let state = AutomatonGraphState::new(&valve(), 800.0, 600.0, &previous);
		assert_eq!(state.positions()["opened"], (42.0, -7.0));
	}

	#[test]
	fn bounds_cover_nodes_and_edges() {
		let state = state();
		let (x, y, w, h) = state.element_bounds("opened").unwrap();
		assert_eq!((w, h), (2.0 * NODE_RADIUS, 2.0 * NODE_RADIUS));
		let (gx, gy) = state.positions()["opened"];
		assert_eq!((x + NODE_RADIUS, y + NODE_RADIUS), state.graph_to_screen(gx as f64, gy as f64));
		assert!(state.element_bounds("opened-can_close->closed").is_some());
		assert!(state.element_bounds("stuck").is_none());
	}
}
