use serde::{Deserialize, Serialize};

/// Represents a state (node) of a Markov chain.
///
/// A `State` corresponds to one distinct observed category. Its `weight`
/// counts how many times the category was observed (import mode) or holds a
/// user-assigned value (drawing mode).
///
/// ## Invariants
/// - `id` is unique within its `ChainModel`
/// - `weight` is finite and non-negative
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct State {
	/// Stable identifier, derived from the observed category label.
	id: String,
	/// Display label. Equal to `id` for imported chains.
	label: String,
	/// Occurrence count or user-assigned value.
	weight: f64,
	/// Position owned by the layout/editor, opaque to the chain.
	position: Option<(f32, f32)>,
}

impl State {
	/// Creates a new state with a weight of 0.
	pub fn new(id: &str, label: &str) -> Self {
		Self {
			id: id.to_owned(),
			label: label.to_owned(),
			weight: 0.0,
			position: None,
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn weight(&self) -> f64 {
		self.weight
	}

	pub fn position(&self) -> Option<(f32, f32)> {
		self.position
	}

	/// Records one more occurrence of this state.
	pub(crate) fn increment(&mut self) {
		self.weight += 1.0;
	}

	pub(crate) fn set_weight(&mut self, weight: f64) {
		self.weight = weight;
	}

	pub(crate) fn set_label(&mut self, label: &str) {
		self.label = label.to_owned();
	}

	pub(crate) fn set_position(&mut self, position: Option<(f32, f32)>) {
		self.position = position;
	}

	/// Adds the weight of another occurrence of the same state.
	pub(crate) fn absorb(&mut self, other: &Self) {
		self.weight += other.weight;
	}
}
