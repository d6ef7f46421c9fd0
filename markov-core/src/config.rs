use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ChainError;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "MARKOV_CONFIG";

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "markov.toml";

/// Playback speed preset.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Speed {
	Fast,
	#[default]
	Normal,
}

/// Timing and sampling settings of a playback sequencer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
	/// Auto-advance interval of the fast preset, in milliseconds.
	pub fast_interval_ms: u64,
	/// Auto-advance interval of the normal preset, in milliseconds.
	pub normal_interval_ms: u64,
	pub speed: Speed,
	/// Fixed seed for the sampler. Random when absent.
	pub seed: Option<u64>,
}

impl Default for PlaybackConfig {
	fn default() -> Self {
		Self {
			fast_interval_ms: 250,
			normal_interval_ms: 1000,
			speed: Speed::Normal,
			seed: None,
		}
	}
}

impl PlaybackConfig {
	/// Interval of the given preset. Never zero.
	pub fn interval_for(&self, speed: Speed) -> Duration {
		let millis = match speed {
			Speed::Fast => self.fast_interval_ms,
			Speed::Normal => self.normal_interval_ms,
		};
		Duration::from_millis(millis.max(1))
	}

	/// Interval of the configured preset.
	pub fn interval(&self) -> Duration {
		self.interval_for(self.speed)
	}
}

/// Parses a TOML document into `T`.
pub fn from_toml_str<T: DeserializeOwned>(text: &str) -> Result<T, ChainError> {
	Ok(toml::from_str(text)?)
}

/// Loads configuration of type `T`.
///
/// Lookup order:
/// - the file named by `MARKOV_CONFIG`
/// - `./markov.toml` if it exists
/// - `T::default()`
///
/// # Errors
/// Returns an error if the selected file cannot be read or parsed.
pub fn load<T: DeserializeOwned + Default>() -> Result<T, ChainError> {
	let path = match std::env::var_os(CONFIG_ENV) {
		Some(path) => Some(PathBuf::from(path)),
		None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|path| path.exists()),
	};

	match path {
		Some(path) => load_file(&path),
		None => {
			debug!("No configuration file, using defaults");
			Ok(T::default())
		}
	}
}

/// Loads configuration of type `T` from a TOML file.
pub fn load_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, ChainError> {
	debug!("Loading configuration from {}", path.as_ref().display());
	let text = std::fs::read_to_string(path)?;
	from_toml_str(&text)
}
