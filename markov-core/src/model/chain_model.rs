use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::builder::ChainBuilder;
use super::edit::ChainEdit;
use super::state::State;
use super::transition::Transition;
use crate::error::{ChainError, check_weight};
use crate::io::{read_observations, snapshot_path};

/// Serialized form of a chain: states and transitions in insertion order.
///
/// Lookup indexes are derived data and are rebuilt on deserialization.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
struct ChainData {
	states: Vec<State>,
	transitions: Vec<Transition>,
}

/// Weighted directed graph of a first-order Markov chain.
///
/// # Responsibilities
/// - Own every `State` and `Transition` of the chain
/// - Count occurrences during import (`add_or_increment_*`)
/// - Apply drawing-mode edits (`apply`)
/// - Merge partial models built in parallel
///
/// # Invariants
/// - Exactly one `State` per distinct id
/// - At most one `Transition` per ordered `(from, to)` pair
/// - Every transition endpoint is a state of the model
/// - Iteration order of states and transitions is insertion order
///
/// A state's weight and the weights of its outgoing transitions are
/// independent counters: the former counts occurrences, the latter
/// consecutive pairs.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(from = "ChainData", into = "ChainData")]
pub struct ChainModel {
	states: Vec<State>,
	transitions: Vec<Transition>,
	state_index: HashMap<String, usize>,
	transition_index: HashMap<(String, String), usize>,
	/// Outgoing transition positions per source state id.
	outgoing: HashMap<String, Vec<usize>>,
}

impl From<ChainData> for ChainModel {
	fn from(data: ChainData) -> Self {
		let mut model = Self {
			states: data.states,
			transitions: data.transitions,
			..Self::default()
		};
		model.reindex();
		model
	}
}

impl From<ChainModel> for ChainData {
	fn from(model: ChainModel) -> Self {
		Self { states: model.states, transitions: model.transitions }
	}
}

impl PartialEq for ChainModel {
	fn eq(&self, other: &Self) -> bool {
		self.states == other.states && self.transitions == other.transitions
	}
}

impl ChainModel {
	/// Creates an empty chain.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a chain from an observation file, using a binary cache if present.
	///
	/// - `filepath` is the observation file (one value per line).
	/// - If a sibling `.bin` snapshot exists, it is loaded instead.
	/// - Otherwise the chain is built in parallel and the snapshot written.
	pub fn from_file<P: AsRef<Path>>(filepath: P) -> Result<Self, ChainError> {
		let snapshot = snapshot_path(filepath.as_ref())?;
		if snapshot.exists() {
			debug!("Loading chain snapshot {}", snapshot.display());
			return Self::load(snapshot);
		}

		let observations = read_observations(&filepath)?;
		let model = ChainBuilder::build_parallel(&observations);
		model.save(&snapshot)?;
		info!(
			"Built chain from {} ({} states, {} transitions)",
			filepath.as_ref().display(),
			model.state_count(),
			model.transition_count()
		);
		Ok(model)
	}

	/// Returns the existing state for `id`, creating it with weight 0 if
	/// absent, then increments its weight by 1.
	pub fn add_or_increment_state(&mut self, id: &str, label: &str) -> &State {
		let position = match self.state_index.get(id).copied() {
			Some(position) => position,
			None => self.push_state(State::new(id, label)),
		};
		let state = &mut self.states[position];
		state.increment();
		state
	}

	/// Returns the existing transition for `(from, to)`, creating it with
	/// weight 0 if absent, then increments its weight by 1.
	///
	/// Both endpoints are expected to be states of the model already; the
	/// builder always adds states before linking them.
	pub fn add_or_increment_transition(&mut self, from: &str, to: &str) -> &Transition {
		let position = match self.transition_index.get(&(from.to_owned(), to.to_owned())).copied() {
			Some(position) => position,
			None => self.push_transition(Transition::new(from, to)),
		};
		let transition = &mut self.transitions[position];
		transition.increment();
		transition
	}

	/// All states, in insertion order.
	pub fn states(&self) -> &[State] {
		&self.states
	}

	/// All transitions, in insertion order.
	pub fn transitions(&self) -> &[Transition] {
		&self.transitions
	}

	pub fn state(&self, id: &str) -> Option<&State> {
		self.state_index.get(id).map(|position| &self.states[*position])
	}

	pub fn contains_state(&self, id: &str) -> bool {
		self.state_index.contains_key(id)
	}

	pub fn transition(&self, from: &str, to: &str) -> Option<&Transition> {
		self.transition_index
			.get(&(from.to_owned(), to.to_owned()))
			.map(|position| &self.transitions[*position])
	}

	/// All transitions leaving `id` (including a self-loop), in insertion order.
	pub fn outgoing_transitions(&self, id: &str) -> Vec<&Transition> {
		self.outgoing
			.get(id)
			.map(|positions| positions.iter().map(|p| &self.transitions[*p]).collect())
			.unwrap_or_default()
	}

	/// Probability of taking `from → to` when leaving `from`.
	///
	/// Returns `None` if the transition does not exist or `from` has no
	/// outgoing weight.
	pub fn transition_probability(&self, from: &str, to: &str) -> Option<f64> {
		let weight = self.transition(from, to)?.weight();
		let total: f64 = self.outgoing_transitions(from).iter().map(|t| t.weight()).sum();
		if total > 0.0 { Some(weight / total) } else { None }
	}

	/// An empty chain has no states (and therefore no transitions).
	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	pub fn state_count(&self) -> usize {
		self.states.len()
	}

	pub fn transition_count(&self) -> usize {
		self.transitions.len()
	}

	/// Merges another chain into this one.
	///
	/// Weights of matching states and transitions are summed. Unseen states
	/// and transitions are appended in `other`'s insertion order, so merging
	/// partial models in input order reproduces a sequential build.
	pub fn merge(&mut self, other: &Self) {
		for state in &other.states {
			match self.state_index.get(state.id()).copied() {
				Some(position) => self.states[position].absorb(state),
				None => {
					self.push_state(state.clone());
				}
			}
		}

		for transition in &other.transitions {
			match self.transition_index.get(&transition.key()).copied() {
				Some(position) => self.transitions[position].absorb(transition),
				None => {
					self.push_transition(transition.clone());
				}
			}
		}
	}

	/// Applies a drawing-mode edit.
	///
	/// # Errors
	/// - `UnknownState` if an edit references a missing state
	/// - `UnknownTransition` when labelling or removing a missing transition
	/// - `DuplicateState` when adding an id that already exists
	/// - `InvalidWeight` for negative or non-finite weights
	pub fn apply(&mut self, edit: &ChainEdit) -> Result<(), ChainError> {
		match edit {
			ChainEdit::AddState { id, label, weight } => {
				if self.contains_state(id) {
					return Err(ChainError::DuplicateState(id.clone()));
				}
				let mut state = State::new(id, label.as_deref().unwrap_or(id));
				state.set_weight(check_weight(*weight)?);
				self.push_state(state);
			}
			ChainEdit::SetStateLabel { id, label } => {
				self.state_mut(id)?.set_label(label);
			}
			ChainEdit::SetStateWeight { id, weight } => {
				let weight = check_weight(*weight)?;
				self.state_mut(id)?.set_weight(weight);
			}
			ChainEdit::MoveState { id, position } => {
				self.state_mut(id)?.set_position(*position);
			}
			ChainEdit::RemoveState { id } => {
				if !self.contains_state(id) {
					return Err(ChainError::UnknownState(id.clone()));
				}
				self.states.retain(|state| state.id() != id);
				self.transitions.retain(|t| t.from() != id && t.to() != id);
				self.reindex();
			}
			ChainEdit::SetTransition { from, to, weight } => {
				let weight = check_weight(*weight)?;
				for id in [from, to] {
					if !self.contains_state(id) {
						return Err(ChainError::UnknownState(id.clone()));
					}
				}
				let position = match self.transition_index.get(&(from.clone(), to.clone())).copied() {
					Some(position) => position,
					None => self.push_transition(Transition::new(from, to)),
				};
				self.transitions[position].set_weight(weight);
			}
			ChainEdit::SetTransitionLabel { from, to, label } => {
				let Some(position) = self.transition_index.get(&(from.clone(), to.clone())).copied() else {
					return Err(ChainError::UnknownTransition(from.clone(), to.clone()));
				};
				self.transitions[position].set_label(label.clone());
			}
			ChainEdit::RemoveTransition { from, to } => {
				if self.transition(from, to).is_none() {
					return Err(ChainError::UnknownTransition(from.clone(), to.clone()));
				}
				self.transitions.retain(|t| t.from() != from || t.to() != to);
				self.reindex();
			}
		}
		Ok(())
	}

	/// Serializes the chain with `postcard`.
	pub fn to_bytes(&self) -> Result<Vec<u8>, ChainError> {
		Ok(postcard::to_stdvec(self)?)
	}

	pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
		Ok(postcard::from_bytes(bytes)?)
	}

	/// Writes a binary snapshot of the chain.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ChainError> {
		std::fs::write(path, self.to_bytes()?)?;
		Ok(())
	}

	/// Reads a binary snapshot written by `save`.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ChainError> {
		let bytes = std::fs::read(path)?;
		Self::from_bytes(&bytes)
	}

	fn state_mut(&mut self, id: &str) -> Result<&mut State, ChainError> {
		match self.state_index.get(id) {
			Some(position) => Ok(&mut self.states[*position]),
			None => Err(ChainError::UnknownState(id.to_owned())),
		}
	}

	fn push_state(&mut self, state: State) -> usize {
		let position = self.states.len();
		self.state_index.insert(state.id().to_owned(), position);
		self.states.push(state);
		position
	}

	fn push_transition(&mut self, transition: Transition) -> usize {
		let position = self.transitions.len();
		self.transition_index.insert(transition.key(), position);
		self.outgoing.entry(transition.from().to_owned()).or_default().push(position);
		self.transitions.push(transition);
		position
	}

	/// Rebuilds lookup indexes from the state and transition vectors.
	fn reindex(&mut self) {
		self.state_index.clear();
		self.transition_index.clear();
		self.outgoing.clear();
		for (position, state) in self.states.iter().enumerate() {
			self.state_index.insert(state.id().to_owned(), position);
		}
		for (position, transition) in self.transitions.iter().enumerate() {
			self.transition_index.insert(transition.key(), position);
			self.outgoing.entry(transition.from().to_owned()).or_default().push(position);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn weights(model: &ChainModel) -> Vec<(String, f64)> {
		model.states().iter().map(|s| (s.id().to_owned(), s.weight())).collect()
	}

	#[test]
	fn repeated_observations_increment_existing_entries() {
		let mut model = ChainModel::new();
		model.add_or_increment_state("A", "A");
		model.add_or_increment_state("B", "B");
		assert_eq!(model.add_or_increment_state("A", "A").weight(), 2.0);

		model.add_or_increment_transition("A", "B");
		assert_eq!(model.add_or_increment_transition("A", "B").weight(), 2.0);
		assert_eq!(model.state_count(), 2);
		assert_eq!(model.transition_count(), 1);
	}

	#[test]
	fn outgoing_includes_self_loops() {
		let mut model = ChainModel::new();
		model.add_or_increment_state("A", "A");
		model.add_or_increment_state("B", "B");
		model.add_or_increment_transition("A", "A");
		model.add_or_increment_transition("A", "B");
		model.add_or_increment_transition("B", "A");

		let outgoing: Vec<&str> = model.outgoing_transitions("A").iter().map(|t| t.to()).collect();
		assert_eq!(outgoing, vec!["A", "B"]);
		assert!(model.outgoing_transitions("missing").is_empty());
		assert_eq!(model.transition_probability("A", "B"), Some(0.5));
	}

	#[test]
	fn merge_sums_and_preserves_order() {
		let mut left = ChainBuilder::build(&["A", "B"]);
		let right = ChainBuilder::build(&["C", "A", "B"]);
		left.merge(&right);

		assert_eq!(weights(&left), vec![("A".into(), 2.0), ("B".into(), 2.0), ("C".into(), 1.0)]);
		assert_eq!(left.transition("A", "B").map(Transition::weight), Some(2.0));
		assert_eq!(left.transition("C", "A").map(Transition::weight), Some(1.0));
	}

	#[test]
	fn edits_validate_states_and_weights() {
		let mut model = ChainModel::new();
		model
			.apply(&ChainEdit::AddState { id: "A".into(), label: Some("Alpha".into()), weight: 1.0 })
			.unwrap();
		model.apply(&ChainEdit::AddState { id: "B".into(), label: None, weight: 0.0 }).unwrap();

		assert!(matches!(
			model.apply(&ChainEdit::AddState { id: "A".into(), label: None, weight: 1.0 }),
			Err(ChainError::DuplicateState(_))
		));
		assert!(matches!(
			model.apply(&ChainEdit::SetTransition { from: "A".into(), to: "Z".into(), weight: 1.0 }),
			Err(ChainError::UnknownState(_))
		));
		assert!(matches!(
			model.apply(&ChainEdit::SetStateWeight { id: "A".into(), weight: -1.0 }),
			Err(ChainError::InvalidWeight(_))
		));

		model.apply(&ChainEdit::SetTransition { from: "A".into(), to: "B".into(), weight: 0.7 }).unwrap();
		model.apply(&ChainEdit::SetTransition { from: "A".into(), to: "B".into(), weight: 0.3 }).unwrap();
		assert_eq!(model.transition_count(), 1);
		assert_eq!(model.transition("A", "B").map(Transition::weight), Some(0.3));
		assert_eq!(model.state("A").map(State::label), Some("Alpha"));
	}

	#[test]
	fn layout_edits_keep_weights() {
		let mut model = ChainBuilder::build(&["A", "B"]);
		model.apply(&ChainEdit::MoveState { id: "A".into(), position: Some((12.5, -3.0)) }).unwrap();
		model
			.apply(&ChainEdit::SetTransitionLabel { from: "A".into(), to: "B".into(), label: Some("wins".into()) })
			.unwrap();

		assert_eq!(model.state("A").unwrap().position(), Some((12.5, -3.0)));
		assert_eq!(model.state("A").unwrap().weight(), 1.0);
		assert_eq!(model.transition("A", "B").unwrap().label(), Some("wins"));
		assert_eq!(model.transition("A", "B").unwrap().weight(), 1.0);

		assert!(matches!(
			model.apply(&ChainEdit::MoveState { id: "Z".into(), position: None }),
			Err(ChainError::UnknownState(_))
		));
		assert!(matches!(
			model.apply(&ChainEdit::SetTransitionLabel { from: "B".into(), to: "A".into(), label: None }),
			Err(ChainError::UnknownTransition(..))
		));
	}

	#[test]
	fn removing_a_state_drops_incident_transitions() {
		let mut model = ChainBuilder::build(&["A", "B", "C", "A"]);
		model.apply(&ChainEdit::RemoveState { id: "B".into() }).unwrap();

		assert!(!model.contains_state("B"));
		assert_eq!(model.transition_count(), 1);
		assert!(model.transition("C", "A").is_some());
		assert_eq!(model.outgoing_transitions("C").len(), 1);
		assert!(model.outgoing_transitions("A").is_empty());
	}

	#[test]
	fn snapshot_restores_indexes() {
		let model = ChainBuilder::build(&["R", "P", "R", "P", "S", "R"]);
		let restored = ChainModel::from_bytes(&model.to_bytes().unwrap()).unwrap();

		assert_eq!(restored, model);
		assert_eq!(restored.outgoing_transitions("P").len(), 2);
		assert_eq!(restored.state("R").map(State::weight), Some(3.0));
	}
}
