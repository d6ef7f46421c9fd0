use async_trait::async_trait;
use log::info;
use thiserror::Error;

use crate::model::state::State;

/// Failure reported by an export sink. Logged, never propagated.
#[derive(Debug, Error)]
pub enum SinkError {
	#[error("Export rejected: {0}")]
	Rejected(String),
	#[error("Export I/O failure: {0}")]
	Io(#[from] std::io::Error),
}

/// External destination of finished sequences (e.g. a dataset table).
///
/// Called once per finished, non-canceled playback with one entry per
/// visited state. Calls are fire-and-forget: the sequencer does not wait for
/// them and never retries.
#[async_trait]
pub trait SequenceSink: Send + Sync {
	async fn commit_sequence(&self, states: Vec<State>) -> Result<(), SinkError>;
}

/// Sink that writes one log line per exported row.
#[derive(Debug, Default)]
pub struct LoggingSink;

#[async_trait]
impl SequenceSink for LoggingSink {
	async fn commit_sequence(&self, states: Vec<State>) -> Result<(), SinkError> {
		for (position, state) in states.iter().enumerate() {
			info!("export row {}: {}", position + 1, state.label());
		}
		Ok(())
	}
}
