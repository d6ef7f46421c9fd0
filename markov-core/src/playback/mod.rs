//! Animated playback of generated sequences.
//!
//! A sequence is revealed in two sub-steps per hop (arrived at a node, then
//! committed to the edge leaving it), either on a repeating timer or one
//! step at a time. Finished sequences go to the output history and to an
//! external export sink.

/// Single-task owner of the chain and sequencer, with a cloneable handle.
pub mod driver;

/// Playback states, cursor, highlight and published events.
pub mod events;

/// The playback state machine.
pub mod sequencer;

/// Export destination of finished sequences.
pub mod sink;

/// Cancellable fixed-delay repeating timer.
pub mod timer;
