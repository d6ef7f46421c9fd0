//! Markov chain construction and animated random-walk playback.
//!
//! This crate provides:
//! - Chain construction from categorical observation streams
//! - Hand-drawn chain editing
//! - Weighted random-walk sequence generation
//! - A timer-driven playback state machine with grouped output history
//!
//! Host messaging, layout and rendering live outside this crate; they talk
//! to it through the input feed, the export sink and the query surface of
//! `PlaybackHandle`.

/// Chain model, builder, edits and the random-walk generator.
pub mod model;

/// Playback state machine, timer, export sink and driver task.
pub mod playback;

/// Grouped log of finished sequences.
pub mod history;

/// Playback timing and TOML configuration loading.
pub mod config;

/// Crate error type.
pub mod error;

/// Observation files and text tokenizing.
pub mod io;

pub use config::{PlaybackConfig, Speed};
pub use error::ChainError;
pub use history::{OutputHistory, SequenceGroup};
pub use model::builder::ChainBuilder;
pub use model::chain_model::ChainModel;
pub use model::edit::ChainEdit;
pub use model::generator::SequenceGenerator;
pub use model::params::GenerationParams;
pub use model::sequence::GeneratedSequence;
pub use model::state::State;
pub use model::transition::Transition;
pub use playback::driver::{PlaybackDriver, PlaybackError, PlaybackHandle, PlaybackSnapshot};
pub use playback::events::{Cursor, Highlight, Phase, PlaybackEvent, PlaybackState};
pub use playback::sequencer::PlaybackSequencer;
pub use playback::sink::{LoggingSink, SequenceSink, SinkError};
