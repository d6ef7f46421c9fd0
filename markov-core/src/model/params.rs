use serde::{Deserialize, Serialize};

use crate::error::ChainError;

/// Default maximum number of states in a generated sequence.
pub const DEFAULT_LENGTH_LIMIT: usize = 10;

/// Default string used to join generated states for display.
pub const DEFAULT_DELIMITER: &str = " ";

/// Parameters of one generation request.
///
/// The triple also identifies the output group a finished sequence belongs
/// to: two requests land in the same group only if all three fields match.
///
/// # Invariants
/// - `length_limit >= 1`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GenerationParams {
	/// Forced first state. `None` draws it by occurrence weight.
	starting_state: Option<String>,
	/// Maximum number of states in the sequence.
	length_limit: usize,
	/// Display-only separator; never used by the sampler.
	delimiter: String,
}

impl Default for GenerationParams {
	fn default() -> Self {
		Self {
			starting_state: None,
			length_limit: DEFAULT_LENGTH_LIMIT,
			delimiter: DEFAULT_DELIMITER.to_owned(),
		}
	}
}

impl GenerationParams {
	/// Creates validated generation parameters.
	///
	/// # Errors
	/// Returns `InvalidLengthLimit` if `length_limit` is 0.
	pub fn new(
		starting_state: Option<String>,
		length_limit: usize,
		delimiter: &str,
	) -> Result<Self, ChainError> {
		if length_limit == 0 {
			return Err(ChainError::InvalidLengthLimit);
		}
		Ok(Self { starting_state, length_limit, delimiter: delimiter.to_owned() })
	}

	pub fn starting_state(&self) -> Option<&str> {
		self.starting_state.as_deref()
	}

	pub fn length_limit(&self) -> usize {
		self.length_limit
	}

	pub fn delimiter(&self) -> &str {
		&self.delimiter
	}
}
