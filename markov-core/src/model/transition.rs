use serde::{Deserialize, Serialize};

/// A directed, weighted transition (edge) between two states.
///
/// Self-loops (`from == to`) are allowed: they record a state repeating
/// itself consecutively.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Transition {
	from: String,
	to: String,
	/// Consecutive-pair count or user-assigned probability mass.
	weight: f64,
	label: Option<String>,
}

impl Transition {
	/// Creates a new transition with a weight of 0.
	pub fn new(from: &str, to: &str) -> Self {
		Self {
			from: from.to_owned(),
			to: to.to_owned(),
			weight: 0.0,
			label: None,
		}
	}

	pub fn from(&self) -> &str {
		&self.from
	}

	pub fn to(&self) -> &str {
		&self.to
	}

	pub fn weight(&self) -> f64 {
		self.weight
	}

	pub fn label(&self) -> Option<&str> {
		self.label.as_deref()
	}

	pub(crate) fn set_label(&mut self, label: Option<String>) {
		self.label = label;
	}

	pub fn is_self_loop(&self) -> bool {
		self.from == self.to
	}

	/// Ordered `(from, to)` pair identifying this transition.
	pub fn key(&self) -> (String, String) {
		(self.from.clone(), self.to.clone())
	}

	pub(crate) fn increment(&mut self) {
		self.weight += 1.0;
	}

	pub(crate) fn set_weight(&mut self, weight: f64) {
		self.weight = weight;
	}

	pub(crate) fn absorb(&mut self, other: &Self) {
		self.weight += other.weight;
	}
}
