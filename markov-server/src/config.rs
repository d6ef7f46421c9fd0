use std::path::PathBuf;

use serde::Deserialize;

use markov_core::PlaybackConfig;

/// Server settings, read from `markov.toml` (or `$MARKOV_CONFIG`).
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ServerConfig {
	pub host: String,
	pub port: u16,
	/// Folder holding `<name>.txt` observation files.
	pub data_dir: String,
	/// CSV file receiving finished sequences.
	pub export_file: PathBuf,
	pub playback: PlaybackConfig,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".to_owned(),
			port: 5000,
			data_dir: "./data".to_owned(),
			export_file: PathBuf::from("./data/generated.csv"),
			playback: PlaybackConfig::default(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use markov_core::Speed;
	use markov_core::config::from_toml_str;

	#[test]
	fn nested_playback_section_is_read() {
		let config: ServerConfig = from_toml_str("port = 8080\n[playback]\nspeed = \"fast\"\n").unwrap();
		assert_eq!(config.port, 8080);
		assert_eq!(config.host, "127.0.0.1");
		assert_eq!(config.playback.speed, Speed::Fast);
	}
}
