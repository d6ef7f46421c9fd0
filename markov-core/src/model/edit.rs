use serde::{Deserialize, Serialize};

/// A drawing-mode edit applied to a `ChainModel` with `ChainModel::apply`.
///
/// Edits are the patch half of the model API; wholesale replacement from
/// observations goes through `ChainBuilder`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ChainEdit {
	/// Adds a new state. The label defaults to the id.
	AddState { id: String, label: Option<String>, weight: f64 },
	SetStateLabel { id: String, label: String },
	SetStateWeight { id: String, weight: f64 },
	/// Stores the layout position of a state; `None` lets the layout choose.
	MoveState { id: String, position: Option<(f32, f32)> },
	/// Removes a state together with every transition touching it.
	RemoveState { id: String },
	/// Creates `from → to` if absent, then sets its weight.
	SetTransition { from: String, to: String, weight: f64 },
	SetTransitionLabel { from: String, to: String, label: Option<String> },
	RemoveTransition { from: String, to: String },
}
