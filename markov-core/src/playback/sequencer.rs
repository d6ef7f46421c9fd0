use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use rand::Rng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;

use super::events::{Cursor, Highlight, Phase, PlaybackEvent, PlaybackState};
use super::sink::SequenceSink;
use super::timer::RepeatingTimer;
use crate::config::{PlaybackConfig, Speed};
use crate::error::ChainError;
use crate::history::OutputHistory;
use crate::model::chain_model::ChainModel;
use crate::model::edit::ChainEdit;
use crate::model::generator::SequenceGenerator;
use crate::model::params::GenerationParams;
use crate::model::sequence::{GeneratedSequence, join_labels};
use crate::model::state::State;

/// A sequence being animated.
///
/// Holds its own chain snapshot so highlights stay consistent if the chain
/// is rebuilt or edited mid-run.
#[derive(Debug)]
struct Run {
	key: GenerationParams,
	sequence: GeneratedSequence,
	chain: Arc<ChainModel>,
	cursor: Option<Cursor>,
}

impl Run {
	fn last_index(&self) -> usize {
		self.sequence.len() - 1
	}

	fn at_end(&self) -> bool {
		self.cursor == Some(Cursor::arrived(self.last_index()))
	}

	/// Cursor after one more sub-step, or `None` if the run is exhausted.
	fn next_cursor(&self) -> Option<Cursor> {
		match self.cursor {
			None => Some(Cursor::arrived(0)),
			Some(Cursor { index, phase: Phase::Arrived }) if index < self.last_index() => {
				Some(Cursor::committed(index))
			}
			Some(Cursor { index, phase: Phase::Committed }) => Some(Cursor::arrived(index + 1)),
			Some(_) => None,
		}
	}
}

/// Playback state machine: `ready → playing/paused/stepping → ready`.
///
/// # Responsibilities
/// - Generate a sequence on `play`/`step` from the current chain snapshot
/// - Walk it in two sub-steps per hop (arrived, committed), either on a
///   repeating timer or one `step` at a time
/// - Commit finished sequences to the `OutputHistory` and the export sink
/// - Discard canceled sequences without touching the history
///
/// # Invariants
/// - At most one timer is active, and only while `Playing`
/// - `Ready` means no in-progress run and an empty highlight
/// - Public operations never fail: invalid or degenerate requests are
///   logged and leave the state unchanged
///
/// Timed playback requires a tokio runtime: the caller drives it by awaiting
/// `next_tick` and calling `on_tick` (see `PlaybackDriver`), or with
/// `run_until_ready`.
pub struct PlaybackSequencer<R: Rng = StdRng> {
	config: PlaybackConfig,
	params: GenerationParams,
	chain: Arc<ChainModel>,
	generator: SequenceGenerator<R>,
	history: OutputHistory,
	state: PlaybackState,
	run: Option<Run>,
	highlight: Highlight,
	timer: RepeatingTimer,
	sink: Arc<dyn SequenceSink>,
	subscribers: Vec<mpsc::UnboundedSender<PlaybackEvent>>,
}

impl PlaybackSequencer<StdRng> {
	/// Creates a sequencer over an empty chain, seeded from `config.seed`.
	pub fn new(config: PlaybackConfig, sink: Arc<dyn SequenceSink>) -> Self {
		let generator = SequenceGenerator::from_seed(config.seed);
		Self::with_generator(config, generator, sink)
	}
}

impl<R: Rng> PlaybackSequencer<R> {
	pub fn with_generator(
		config: PlaybackConfig,
		generator: SequenceGenerator<R>,
		sink: Arc<dyn SequenceSink>,
	) -> Self {
		Self {
			config,
			params: GenerationParams::default(),
			chain: Arc::new(ChainModel::new()),
			generator,
			history: OutputHistory::new(),
			state: PlaybackState::Ready,
			run: None,
			highlight: Highlight::default(),
			timer: RepeatingTimer::new(),
			sink,
			subscribers: Vec::new(),
		}
	}

	// --- Queries ---

	pub fn state(&self) -> PlaybackState {
		self.state
	}

	pub fn chain(&self) -> &Arc<ChainModel> {
		&self.chain
	}

	pub fn params(&self) -> &GenerationParams {
		&self.params
	}

	pub fn config(&self) -> &PlaybackConfig {
		&self.config
	}

	pub fn history(&self) -> &OutputHistory {
		&self.history
	}

	pub fn highlight(&self) -> &Highlight {
		&self.highlight
	}

	pub fn cursor(&self) -> Option<Cursor> {
		self.run.as_ref().and_then(|run| run.cursor)
	}

	/// Whether the auto-advance timer is running.
	pub fn timer_active(&self) -> bool {
		self.timer.is_active()
	}

	/// The in-progress sequence as far as the animation has revealed it.
	pub fn partial_sequence(&self) -> &[State] {
		match &self.run {
			Some(Run { sequence, cursor: Some(cursor), .. }) => &sequence.states()[..cursor.visible_len()],
			_ => &[],
		}
	}

	/// `partial_sequence` joined with the current delimiter.
	pub fn partial_text(&self) -> String {
		let delimiter = self.run.as_ref().map_or(self.params.delimiter(), |run| run.key.delimiter());
		join_labels(self.partial_sequence(), delimiter)
	}

	/// Registers a new event subscriber.
	pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<PlaybackEvent> {
		let (tx, rx) = mpsc::unbounded_channel();
		self.subscribers.push(tx);
		rx
	}

	// --- Inputs ---

	/// Replaces the chain wholesale. A running sequence keeps its snapshot.
	pub fn set_chain(&mut self, chain: Arc<ChainModel>) {
		self.chain = chain;
	}

	/// Applies a drawing-mode edit copy-on-write.
	pub fn edit_chain(&mut self, edit: &ChainEdit) -> Result<(), ChainError> {
		let mut chain = ChainModel::clone(&self.chain);
		chain.apply(edit)?;
		self.chain = Arc::new(chain);
		Ok(())
	}

	/// New parameters take effect at the next `play` or `step`.
	pub fn set_params(&mut self, params: GenerationParams) {
		self.params = params;
	}

	/// Switches the speed preset, restarting a running timer.
	pub fn set_speed(&mut self, speed: Speed) {
		self.config.speed = speed;
		self.restart_timer_if_active();
	}

	/// Overrides the interval of one preset.
	pub fn set_interval(&mut self, speed: Speed, interval: Duration) {
		let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
		match speed {
			Speed::Fast => self.config.fast_interval_ms = millis,
			Speed::Normal => self.config.normal_interval_ms = millis,
		}
		self.restart_timer_if_active();
	}

	// --- Events ---

	/// `ready → playing`: generates a sequence, shows its first state and
	/// starts the auto-advance timer.
	///
	/// An empty chain or unknown starting state makes this a no-op.
	pub fn play(&mut self) -> PlaybackState {
		if self.state != PlaybackState::Ready {
			debug!("play ignored while {:?}", self.state);
			return self.state;
		}
		if !self.begin_run() {
			return self.state;
		}

		self.advance();
		self.timer.start(self.config.interval());
		self.set_state(PlaybackState::Playing);
		self.state
	}

	/// `playing → paused`. The timer is stopped before this returns.
	pub fn pause(&mut self) -> PlaybackState {
		if self.state != PlaybackState::Playing {
			debug!("pause ignored while {:?}", self.state);
			return self.state;
		}

		self.timer.stop();
		self.set_state(PlaybackState::Paused);
		self.state
	}

	/// `paused → playing`, or straight to `finish` if the last state is
	/// already shown.
	pub fn resume(&mut self) -> PlaybackState {
		if self.state != PlaybackState::Paused {
			debug!("resume ignored while {:?}", self.state);
			return self.state;
		}

		if self.run.as_ref().is_none_or(Run::at_end) {
			self.finish();
		} else {
			self.timer.start(self.config.interval());
			self.set_state(PlaybackState::Playing);
		}
		self.state
	}

	/// Advances exactly one sub-step.
	///
	/// - From `ready`: generates a sequence and shows its first state.
	/// - From `stepping` or `paused`: moves on one sub-step, finishing the
	///   run if it was already on its last state.
	pub fn step(&mut self) -> PlaybackState {
		match self.state {
			PlaybackState::Ready => {
				if self.begin_run() {
					self.advance();
					self.set_state(PlaybackState::Stepping);
				}
			}
			PlaybackState::Stepping | PlaybackState::Paused => {
				if self.advance() {
					self.set_state(PlaybackState::Stepping);
				} else {
					self.finish();
				}
			}
			PlaybackState::Playing => debug!("step ignored while playing"),
		}
		self.state
	}

	/// Discards the in-progress sequence without committing or exporting it.
	pub fn cancel(&mut self) -> PlaybackState {
		if self.state == PlaybackState::Ready {
			debug!("cancel ignored while ready");
			return self.state;
		}

		self.timer.stop();
		self.run = None;
		self.clear_highlight();
		self.emit(PlaybackEvent::Canceled);
		self.set_state(PlaybackState::Ready);
		self.state
	}

	/// Empties the output history. Only allowed while `ready`.
	pub fn clear_output(&mut self) -> bool {
		if self.state != PlaybackState::Ready {
			debug!("clear output ignored while {:?}", self.state);
			return false;
		}

		self.history.clear();
		self.emit(PlaybackEvent::OutputCleared);
		true
	}

	// --- Timer ---

	/// Waits for the next auto-advance fire. Never completes unless playing.
	pub async fn next_tick(&mut self) {
		self.timer.fired().await;
	}

	/// Applies one timed advance (or `finish` once exhausted).
	pub fn on_tick(&mut self) {
		if self.state != PlaybackState::Playing {
			// A fire racing a state change; the timer is already stopped.
			return;
		}
		if !self.advance() {
			self.finish();
		}
	}

	/// Drives timed playback until the sequencer leaves `playing`.
	pub async fn run_until_ready(&mut self) {
		while self.state == PlaybackState::Playing {
			self.next_tick().await;
			self.on_tick();
		}
	}

	// --- Internals ---

	/// Generates the sequence of a new run. Returns `false` if nothing could
	/// be generated.
	fn begin_run(&mut self) -> bool {
		let sequence = self.generator.generate(&self.chain, &self.params);
		if sequence.is_empty() {
			debug!("Nothing to play: empty chain or unknown starting state");
			return false;
		}

		debug!("Generated {} states: {}", sequence.len(), sequence.join(self.params.delimiter()));
		self.run = Some(Run {
			key: self.params.clone(),
			sequence,
			chain: Arc::clone(&self.chain),
			cursor: None,
		});
		true
	}

	/// Moves one sub-step forward and publishes the new highlight.
	///
	/// Returns `false` (leaving everything untouched) when the run is
	/// exhausted or absent.
	fn advance(&mut self) -> bool {
		let Some(run) = self.run.as_mut() else {
			return false;
		};
		let Some(cursor) = run.next_cursor() else {
			return false;
		};
		run.cursor = Some(cursor);

		let current = run.sequence.states()[cursor.index].id().to_owned();
		let (highlight, event) = match cursor.phase {
			Phase::Arrived => {
				let candidates: Vec<(String, String)> = if cursor.index < run.last_index() {
					run.chain
						.outgoing_transitions(&current)
						.iter()
						.filter(|t| t.weight() > 0.0)
						.map(|t| t.key())
						.collect()
				} else {
					Vec::new()
				};
				(
					Highlight { node: Some(current.clone()), candidates: candidates.clone(), edge: None },
					PlaybackEvent::Arrived { index: cursor.index, state: current, candidates },
				)
			}
			Phase::Committed => {
				let next = run.sequence.states()[cursor.index + 1].id().to_owned();
				(
					Highlight {
						node: Some(next.clone()),
						candidates: Vec::new(),
						edge: Some((current.clone(), next.clone())),
					},
					PlaybackEvent::Committed { index: cursor.index, from: current, to: next },
				)
			}
		};

		self.highlight = highlight;
		self.emit(event);
		true
	}

	/// Commits the finished run to the history and the export sink.
	fn finish(&mut self) {
		self.timer.stop();
		if let Some(run) = self.run.take() {
			let states = run.sequence.states().to_vec();
			let group = self.history.commit(&run.key, run.sequence.clone());
			info!("Finished sequence in group {}: {}", group, run.sequence.join(run.key.delimiter()));
			self.emit(PlaybackEvent::Finished { group, sequence: run.sequence });
			self.export(states);
		}
		self.clear_highlight();
		self.set_state(PlaybackState::Ready);
	}

	/// Hands a finished sequence to the sink without waiting for it.
	fn export(&self, states: Vec<State>) {
		let sink = Arc::clone(&self.sink);
		match tokio::runtime::Handle::try_current() {
			Ok(handle) => {
				handle.spawn(async move {
					if let Err(e) = sink.commit_sequence(states).await {
						warn!("Export of finished sequence failed: {e}");
					}
				});
			}
			Err(_) => warn!("No async runtime available, finished sequence not exported"),
		}
	}

	fn restart_timer_if_active(&mut self) {
		if self.timer.is_active() {
			self.timer.start(self.config.interval());
		}
	}

	fn clear_highlight(&mut self) {
		if !self.highlight.is_empty() {
			self.highlight = Highlight::default();
			self.emit(PlaybackEvent::HighlightCleared);
		}
	}

	fn set_state(&mut self, state: PlaybackState) {
		if self.state != state {
			debug!("Playback {:?} -> {:?}", self.state, state);
			self.state = state;
			self.emit(PlaybackEvent::StateChanged { state });
		}
	}

	/// Publishes to every live subscriber, dropping closed ones.
	fn emit(&mut self, event: PlaybackEvent) {
		self.subscribers.retain(|subscriber| subscriber.send(event.clone()).is_ok());
	}
}
