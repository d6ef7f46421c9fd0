use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use log::debug;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use markov_core::{SequenceSink, SinkError, State};

const HEADER: &str = "sequence,position,state\n";

/// Appends finished sequences to a CSV dataset, one row per state.
///
/// Columns: `sequence`, `position`, `state`. Exports are written one at a
/// time; sequence ids continue after the highest id already in the file.
pub struct CsvDatasetSink {
	path: PathBuf,
	/// Next sequence id, read from the file on the first export.
	next_sequence: Mutex<Option<usize>>,
}

impl CsvDatasetSink {
	pub fn new(path: PathBuf) -> Self {
		Self { path, next_sequence: Mutex::new(None) }
	}

	fn escape(value: &str) -> String {
		if value.contains([',', '"', '\n']) {
			format!("\"{}\"", value.replace('"', "\"\""))
		} else {
			value.to_owned()
		}
	}

	/// Highest sequence id found in `content`, 0 if none.
	fn last_sequence(content: &str) -> usize {
		content
			.lines()
			.filter_map(|line| line.split(',').next()?.parse::<usize>().ok())
			.max()
			.unwrap_or(0)
	}

	async fn first_free_sequence(&self) -> Result<usize, SinkError> {
		match fs::read_to_string(&self.path).await {
			Ok(content) => Ok(Self::last_sequence(&content) + 1),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(1),
			Err(e) => Err(e.into()),
		}
	}
}

#[async_trait]
impl SequenceSink for CsvDatasetSink {
	async fn commit_sequence(&self, states: Vec<State>) -> Result<(), SinkError> {
		let mut next_sequence = self.next_sequence.lock().await;
		let sequence = match *next_sequence {
			Some(sequence) => sequence,
			None => self.first_free_sequence().await?,
		};

		let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;
		let mut rows = String::new();
		if file.metadata().await?.len() == 0 {
			rows.push_str(HEADER);
		}
		for (position, state) in states.iter().enumerate() {
			rows.push_str(&format!("{},{},{}\n", sequence, position + 1, Self::escape(state.label())));
		}

		file.write_all(rows.as_bytes()).await?;
		file.flush().await?;
		*next_sequence = Some(sequence + 1);
		debug!("Exported sequence {} ({} rows) to {}", sequence, states.len(), self.path.display());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn scratch_file(name: &str) -> PathBuf {
		let path = std::env::temp_dir().join(format!("markov-{}-{name}.csv", std::process::id()));
		let _ = std::fs::remove_file(&path);
		path
	}

	fn states(ids: &[&str]) -> Vec<State> {
		ids.iter().map(|id| State::new(id, id)).collect()
	}

	#[test]
	fn escapes_csv_specials() {
		assert_eq!(CsvDatasetSink::escape("plain"), "plain");
		assert_eq!(CsvDatasetSink::escape("a,b"), "\"a,b\"");
		assert_eq!(CsvDatasetSink::escape("say \"hi\""), "\"say \"\"hi\"\"\"");
	}

	#[test]
	fn last_sequence_skips_header() {
		assert_eq!(CsvDatasetSink::last_sequence(""), 0);
		assert_eq!(CsvDatasetSink::last_sequence("sequence,position,state\n1,1,R\n2,1,P\n2,2,S\n"), 2);
	}

	#[tokio::test]
	async fn concurrent_exports_write_one_header() {
		let path = scratch_file("concurrent");
		let sink = CsvDatasetSink::new(path.clone());

		let (first, second) =
			tokio::join!(sink.commit_sequence(states(&["R", "P"])), sink.commit_sequence(states(&["S"])));
		first.unwrap();
		second.unwrap();

		let content = std::fs::read_to_string(&path).unwrap();
		assert_eq!(content.matches("sequence,position,state").count(), 1);
		assert!(content.starts_with(HEADER));
		assert_eq!(content.lines().count(), 4);
		assert_eq!(CsvDatasetSink::last_sequence(&content), 2);
		let _ = std::fs::remove_file(&path);
	}

	#[tokio::test]
	async fn numbering_continues_after_restart() {
		let path = scratch_file("restart");
		CsvDatasetSink::new(path.clone()).commit_sequence(states(&["R"])).await.unwrap();
		CsvDatasetSink::new(path.clone()).commit_sequence(states(&["P", "R"])).await.unwrap();

		let content = std::fs::read_to_string(&path).unwrap();
		assert_eq!(content, "sequence,position,state\n1,1,R\n2,1,P\n2,2,R\n");
		let _ = std::fs::remove_file(&path);
	}
}
