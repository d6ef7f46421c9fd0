use serde::{Deserialize, Serialize};

use super::state::State;

/// Ordered states visited by one walk (repeats allowed).
///
/// States are copied out of the chain, so a sequence stays valid after the
/// chain is rebuilt or edited. Immutable once produced.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct GeneratedSequence {
	states: Vec<State>,
}

impl GeneratedSequence {
	pub(crate) fn new(states: Vec<State>) -> Self {
		Self { states }
	}

	pub fn states(&self) -> &[State] {
		&self.states
	}

	pub fn get(&self, index: usize) -> Option<&State> {
		self.states.get(index)
	}

	pub fn len(&self) -> usize {
		self.states.len()
	}

	/// A zero-length sequence means "cannot generate".
	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	pub fn ids(&self) -> Vec<&str> {
		self.states.iter().map(State::id).collect()
	}

	/// State labels joined by `delimiter`.
	pub fn join(&self, delimiter: &str) -> String {
		join_labels(&self.states, delimiter)
	}
}

/// Labels of `states` joined by `delimiter`.
pub(crate) fn join_labels(states: &[State], delimiter: &str) -> String {
	states.iter().map(State::label).collect::<Vec<_>>().join(delimiter)
}
