use thiserror::Error;

/// Errors raised by chain construction, editing, snapshots and configuration.
///
/// Generation and playback never return these for degenerate inputs (empty
/// model, unknown starting state, dead ends); those yield empty output instead.
#[derive(Debug, Error)]
pub enum ChainError {
	#[error("Unknown state: {0}")]
	UnknownState(String),

	#[error("Unknown transition: {0} -> {1}")]
	UnknownTransition(String, String),

	#[error("State already exists: {0}")]
	DuplicateState(String),

	#[error("Length limit must be at least 1")]
	InvalidLengthLimit,

	#[error("Weight must be finite and non-negative, got {0}")]
	InvalidWeight(f64),

	#[error("I/O failure: {0}")]
	Io(#[from] std::io::Error),

	#[error("Snapshot encoding failed: {0}")]
	Snapshot(#[from] postcard::Error),

	#[error("Invalid configuration: {0}")]
	Config(#[from] toml::de::Error),
}

/// Validates a user-supplied weight (drawing mode).
pub(crate) fn check_weight(weight: f64) -> Result<f64, ChainError> {
	if weight.is_finite() && weight >= 0.0 {
		Ok(weight)
	} else {
		Err(ChainError::InvalidWeight(weight))
	}
}
