use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use super::events::{Cursor, Highlight, PlaybackEvent, PlaybackState};
use super::sequencer::PlaybackSequencer;
use super::sink::SequenceSink;
use crate::config::{PlaybackConfig, Speed};
use crate::error::ChainError;
use crate::history::OutputHistory;
use crate::model::builder::ChainBuilder;
use crate::model::chain_model::ChainModel;
use crate::model::edit::ChainEdit;
use crate::model::params::GenerationParams;

/// Capacity of the command channel.
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Errors returned by a `PlaybackHandle`.
#[derive(Debug, Error)]
pub enum PlaybackError {
	#[error("Playback driver has stopped")]
	Closed,
	#[error(transparent)]
	Chain(#[from] ChainError),
	#[error("Chain build failed: {0}")]
	Build(#[from] tokio::task::JoinError),
}

/// Point-in-time view of the driver, for polling clients.
#[derive(Serialize, Clone, Debug)]
pub struct PlaybackSnapshot {
	pub state: PlaybackState,
	pub params: GenerationParams,
	pub speed: Speed,
	pub cursor: Option<Cursor>,
	pub highlight: Highlight,
	/// Labels of the in-progress sequence revealed so far.
	pub partial: Vec<String>,
	pub history: OutputHistory,
}

type Reply<T> = oneshot::Sender<T>;

enum Command {
	SetChain(Arc<ChainModel>, Reply<()>),
	EditChain(ChainEdit, Reply<Result<(), ChainError>>),
	Chain(Reply<Arc<ChainModel>>),
	SetParams(GenerationParams, Reply<()>),
	SetSpeed(Speed, Reply<()>),
	Play(Reply<PlaybackState>),
	Pause(Reply<PlaybackState>),
	Resume(Reply<PlaybackState>),
	Step(Reply<PlaybackState>),
	Cancel(Reply<PlaybackState>),
	ClearOutput(Reply<bool>),
	Snapshot(Reply<PlaybackSnapshot>),
	Subscribe(Reply<mpsc::UnboundedReceiver<PlaybackEvent>>),
}

/// Owns the chain and the sequencer on a single task.
///
/// Commands and timer fires are processed one at a time on that task, so
/// every reply is sent after its command is fully applied: once `pause` or
/// `cancel` returns, no further advance happens.
pub struct PlaybackDriver;

impl PlaybackDriver {
	/// Spawns the driver task on the current tokio runtime.
	///
	/// The task stops when every handle has been dropped.
	pub fn spawn(config: PlaybackConfig, sink: Arc<dyn SequenceSink>) -> PlaybackHandle {
		Self::spawn_with(PlaybackSequencer::new(config, sink))
	}

	/// Spawns the driver task around an existing sequencer.
	pub fn spawn_with(sequencer: PlaybackSequencer) -> PlaybackHandle {
		let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
		tokio::spawn(Self::run(sequencer, rx));
		debug!("playback driver spawned");
		PlaybackHandle { tx }
	}

	async fn run(mut sequencer: PlaybackSequencer, mut rx: mpsc::Receiver<Command>) {
		loop {
			tokio::select! {
				biased;
				command = rx.recv() => match command {
					Some(command) => Self::handle(&mut sequencer, command),
					None => break,
				},
				_ = sequencer.next_tick() => sequencer.on_tick(),
			}
		}

		sequencer.cancel();
		debug!("playback driver stopped");
	}

	/// Applies one command. A dropped reply receiver is not an error.
	fn handle(sequencer: &mut PlaybackSequencer, command: Command) {
		match command {
			Command::SetChain(chain, reply) => {
				sequencer.set_chain(chain);
				let _ = reply.send(());
			}
			Command::EditChain(edit, reply) => {
				let _ = reply.send(sequencer.edit_chain(&edit));
			}
			Command::Chain(reply) => {
				let _ = reply.send(Arc::clone(sequencer.chain()));
			}
			Command::SetParams(params, reply) => {
				sequencer.set_params(params);
				let _ = reply.send(());
			}
			Command::SetSpeed(speed, reply) => {
				sequencer.set_speed(speed);
				let _ = reply.send(());
			}
			Command::Play(reply) => {
				let _ = reply.send(sequencer.play());
			}
			Command::Pause(reply) => {
				let _ = reply.send(sequencer.pause());
			}
			Command::Resume(reply) => {
				let _ = reply.send(sequencer.resume());
			}
			Command::Step(reply) => {
				let _ = reply.send(sequencer.step());
			}
			Command::Cancel(reply) => {
				let _ = reply.send(sequencer.cancel());
			}
			Command::ClearOutput(reply) => {
				let _ = reply.send(sequencer.clear_output());
			}
			Command::Snapshot(reply) => {
				let _ = reply.send(PlaybackSnapshot {
					state: sequencer.state(),
					params: sequencer.params().clone(),
					speed: sequencer.config().speed,
					cursor: sequencer.cursor(),
					highlight: sequencer.highlight().clone(),
					partial: sequencer.partial_sequence().iter().map(|s| s.label().to_owned()).collect(),
					history: sequencer.history().clone(),
				});
			}
			Command::Subscribe(reply) => {
				let _ = reply.send(sequencer.subscribe());
			}
		}
	}
}

/// Cloneable handle to a running `PlaybackDriver`.
#[derive(Clone, Debug)]
pub struct PlaybackHandle {
	tx: mpsc::Sender<Command>,
}

impl PlaybackHandle {
	/// Input feed: rebuilds the chain from scratch.
	///
	/// Empty strings separate independent sub-sequences. The build runs on
	/// the blocking pool; the driver keeps serving commands and timer fires
	/// until the new chain is swapped in.
	pub async fn load_observations(&self, observations: Vec<String>) -> Result<Arc<ChainModel>, PlaybackError> {
		let count = observations.len();
		let chain = tokio::task::spawn_blocking(move || ChainBuilder::build_parallel(&observations)).await?;
		info!(
			"Rebuilt chain from {} observations ({} states, {} transitions)",
			count,
			chain.state_count(),
			chain.transition_count()
		);

		let chain = Arc::new(chain);
		self.request(|reply| Command::SetChain(Arc::clone(&chain), reply)).await?;
		Ok(chain)
	}

	/// Replaces the chain wholesale (e.g. a loaded snapshot).
	pub async fn replace_chain(&self, chain: ChainModel) -> Result<(), PlaybackError> {
		self.request(|reply| Command::SetChain(Arc::new(chain), reply)).await
	}

	/// Applies a drawing-mode edit.
	pub async fn edit_chain(&self, edit: ChainEdit) -> Result<(), PlaybackError> {
		Ok(self.request(|reply| Command::EditChain(edit, reply)).await??)
	}

	/// Current chain snapshot.
	pub async fn chain(&self) -> Result<Arc<ChainModel>, PlaybackError> {
		self.request(Command::Chain).await
	}

	pub async fn set_params(&self, params: GenerationParams) -> Result<(), PlaybackError> {
		self.request(|reply| Command::SetParams(params, reply)).await
	}

	pub async fn set_speed(&self, speed: Speed) -> Result<(), PlaybackError> {
		self.request(|reply| Command::SetSpeed(speed, reply)).await
	}

	pub async fn play(&self) -> Result<PlaybackState, PlaybackError> {
		self.request(Command::Play).await
	}

	pub async fn pause(&self) -> Result<PlaybackState, PlaybackError> {
		self.request(Command::Pause).await
	}

	pub async fn resume(&self) -> Result<PlaybackState, PlaybackError> {
		self.request(Command::Resume).await
	}

	pub async fn step(&self) -> Result<PlaybackState, PlaybackError> {
		self.request(Command::Step).await
	}

	pub async fn cancel(&self) -> Result<PlaybackState, PlaybackError> {
		self.request(Command::Cancel).await
	}

	/// Empties the output history. Returns `false` unless ready.
	pub async fn clear_output(&self) -> Result<bool, PlaybackError> {
		self.request(Command::ClearOutput).await
	}

	pub async fn snapshot(&self) -> Result<PlaybackSnapshot, PlaybackError> {
		self.request(Command::Snapshot).await
	}

	/// Receives every event published after this call.
	pub async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<PlaybackEvent>, PlaybackError> {
		self.request(Command::Subscribe).await
	}

	async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, PlaybackError> {
		let (reply, response) = oneshot::channel();
		self.tx.send(command(reply)).await.map_err(|_| PlaybackError::Closed)?;
		response.await.map_err(|_| PlaybackError::Closed)
	}
}

impl std::fmt::Debug for Command {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Command::SetChain(..) => "SetChain",
			Command::EditChain(..) => "EditChain",
			Command::Chain(..) => "Chain",
			Command::SetParams(..) => "SetParams",
			Command::SetSpeed(..) => "SetSpeed",
			Command::Play(..) => "Play",
			Command::Pause(..) => "Pause",
			Command::Resume(..) => "Resume",
			Command::Step(..) => "Step",
			Command::Cancel(..) => "Cancel",
			Command::ClearOutput(..) => "ClearOutput",
			Command::Snapshot(..) => "Snapshot",
			Command::Subscribe(..) => "Subscribe",
		};
		f.write_str(name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::playback::sink::LoggingSink;

	fn observations(values: &[&str]) -> Vec<String> {
		values.iter().map(|value| (*value).to_owned()).collect()
	}

	fn spawn() -> PlaybackHandle {
		let config = PlaybackConfig { seed: Some(3), ..PlaybackConfig::default() };
		PlaybackDriver::spawn(config, Arc::new(LoggingSink))
	}

	#[tokio::test(start_paused = true)]
	async fn timed_playback_reaches_ready() {
		let handle = spawn();
		handle.load_observations(observations(&["A", "B", "C"])).await.unwrap();
		handle.set_params(GenerationParams::new(Some("A".into()), 3, " ").unwrap()).await.unwrap();
		let mut events = handle.subscribe().await.unwrap();

		assert_eq!(handle.play().await.unwrap(), PlaybackState::Playing);
		while let Some(event) = events.recv().await {
			if event == (PlaybackEvent::StateChanged { state: PlaybackState::Ready }) {
				break;
			}
		}

		let snapshot = handle.snapshot().await.unwrap();
		assert_eq!(snapshot.state, PlaybackState::Ready);
		assert_eq!(snapshot.history.to_text().lines().nth(1), Some("A B C"));
	}

	#[tokio::test(start_paused = true)]
	async fn pause_returns_after_timer_stops() {
		let handle = spawn();
		handle.load_observations(observations(&["A", "B", "C", "D", "E"])).await.unwrap();
		handle.set_params(GenerationParams::new(Some("A".into()), 5, ",").unwrap()).await.unwrap();

		handle.play().await.unwrap();
		tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
		assert_eq!(handle.pause().await.unwrap(), PlaybackState::Paused);
		let paused_at = handle.snapshot().await.unwrap().cursor;

		tokio::time::sleep(std::time::Duration::from_secs(10)).await;
		assert_eq!(handle.snapshot().await.unwrap().cursor, paused_at);
	}

	#[tokio::test]
	async fn load_while_playing_keeps_the_running_walk() {
		let handle = spawn();
		handle.load_observations(observations(&["A", "B", "C"])).await.unwrap();
		handle.set_params(GenerationParams::new(Some("A".into()), 3, " ").unwrap()).await.unwrap();
		handle.play().await.unwrap();
		let before = handle.snapshot().await.unwrap();

		let rebuilt = handle.load_observations(observations(&["X", "Y"])).await.unwrap();
		assert!(rebuilt.contains_state("X"));
		assert!(handle.chain().await.unwrap().contains_state("X"));

		let after = handle.snapshot().await.unwrap();
		assert_eq!(after.state, PlaybackState::Playing);
		assert_eq!(after.partial, before.partial);
	}

	#[tokio::test]
	async fn unbounded_length_limit_keeps_driver_alive() {
		let handle = spawn();
		handle.load_observations(observations(&["A", "B"])).await.unwrap();
		handle.set_params(GenerationParams::new(Some("A".into()), usize::MAX, " ").unwrap()).await.unwrap();

		assert_eq!(handle.play().await.unwrap(), PlaybackState::Playing);
		assert_eq!(handle.snapshot().await.unwrap().partial, vec!["A"]);
	}

	#[tokio::test]
	async fn edits_report_chain_errors() {
		let handle = spawn();
		let result = handle
			.edit_chain(ChainEdit::SetStateWeight { id: "missing".into(), weight: 1.0 })
			.await;
		assert!(matches!(result, Err(PlaybackError::Chain(ChainError::UnknownState(_)))));

		handle
			.edit_chain(ChainEdit::AddState { id: "A".into(), label: None, weight: 1.0 })
			.await
			.unwrap();
		assert_eq!(handle.chain().await.unwrap().state_count(), 1);
	}
}
