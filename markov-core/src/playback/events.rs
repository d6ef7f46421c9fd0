use serde::{Deserialize, Serialize};

use crate::model::sequence::GeneratedSequence;

/// State of the playback state machine.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
	#[default]
	Ready,
	Playing,
	Paused,
	Stepping,
}

/// Half of a hop: arriving at a node, or committing to the edge leaving it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
	Arrived,
	Committed,
}

/// Position of the animation within the in-progress sequence.
///
/// `Arrived(i)` shows state `i`; `Committed(i)` shows the edge from state `i`
/// to state `i + 1`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor {
	pub index: usize,
	pub phase: Phase,
}

impl Cursor {
	pub fn arrived(index: usize) -> Self {
		Self { index, phase: Phase::Arrived }
	}

	pub fn committed(index: usize) -> Self {
		Self { index, phase: Phase::Committed }
	}

	/// Number of states of the sequence visible at this cursor.
	pub fn visible_len(&self) -> usize {
		match self.phase {
			Phase::Arrived => self.index + 1,
			Phase::Committed => self.index + 2,
		}
	}
}

/// What the renderer should emphasize right now.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Highlight {
	/// Current node (the destination, once an edge is committed).
	pub node: Option<String>,
	/// Every possible next edge out of `node`, shown before the draw.
	pub candidates: Vec<(String, String)>,
	/// The edge actually taken.
	pub edge: Option<(String, String)>,
}

impl Highlight {
	pub fn is_empty(&self) -> bool {
		self.node.is_none() && self.candidates.is_empty() && self.edge.is_none()
	}
}

/// Notification published by the sequencer to its subscribers.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlaybackEvent {
	StateChanged { state: PlaybackState },
	Arrived { index: usize, state: String, candidates: Vec<(String, String)> },
	Committed { index: usize, from: String, to: String },
	Finished { group: usize, sequence: GeneratedSequence },
	Canceled,
	HighlightCleared,
	OutputCleared,
}
