use std::path::{Path, PathBuf};
use std::{env, fs, io};

/// Separator marker between independent sub-sequences of observations.
pub const SEPARATOR: &str = "";

/// Extension of the binary chain snapshot stored next to an observation file.
pub const SNAPSHOT_EXTENSION: &str = "bin";

/// Reads an observation file: one category value per line.
///
/// Blank (or whitespace-only) lines become separators, so cases can be
/// written as paragraphs. Surrounding whitespace of values is trimmed.
pub fn read_observations<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let contents = fs::read_to_string(filename)?;
	Ok(contents.lines().map(|line| line.trim().to_owned()).collect())
}

/// Splits prose into word observations.
///
/// - Words are separated by whitespace
/// - Leading/trailing punctuation is trimmed (`"end."` → `"end"`)
/// - Blank lines start a new sub-sequence (a separator is emitted once)
/// - Tokens made only of punctuation are dropped
pub fn tokenize_text(text: &str) -> Vec<String> {
	let mut observations = Vec::new();
	for line in text.lines() {
		if line.trim().is_empty() {
			if observations.last().is_some_and(|last: &String| last != SEPARATOR) {
				observations.push(SEPARATOR.to_owned());
			}
			continue;
		}
		for word in line.split_whitespace() {
			let word = word.trim_matches(|c: char| !c.is_alphanumeric());
			if !word.is_empty() {
				observations.push(word.to_owned());
			}
		}
	}
	if observations.last().is_some_and(|last| last == SEPARATOR) {
		observations.pop();
	}
	observations
}

/// Path of the snapshot cached beside `observation_file` (`rps.txt` → `rps.bin`).
///
/// # Errors
/// `InvalidInput` if the path does not name a file (e.g. `data/..`).
pub fn snapshot_path(observation_file: &Path) -> io::Result<PathBuf> {
	if observation_file.file_name().is_none() {
		return Err(io::Error::new(
			io::ErrorKind::InvalidInput,
			format!("'{}' does not name an observation file", observation_file.display()),
		));
	}
	Ok(observation_file.with_extension(SNAPSHOT_EXTENSION))
}

/// Resolves the configured data folder to an absolute path.
///
/// Relative folders (including `""` and `"."`) are taken from the working
/// directory; `.` segments and trailing separators are dropped.
pub fn resolve_data_dir(configured: &str) -> PathBuf {
	let configured = Path::new(configured.trim());
	let joined = match env::current_dir() {
		Ok(cwd) if configured.is_relative() => cwd.join(configured),
		_ => configured.to_path_buf(),
	};
	joined.components().collect()
}

/// Lists all files with a given extension in a directory.
///
/// Returns file stems only (no paths, no extension), sorted.
pub fn list_datasets<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(stem) = path.file_stem() {
				files.push(stem.to_string_lossy().to_string());
			}
		}
	}

	files.sort();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tokenize_splits_words_and_paragraphs() {
		let text = "The cat sat.\nThe dog ran!\n\n\nA bird, flew";
		assert_eq!(
			tokenize_text(text),
			vec!["The", "cat", "sat", "The", "dog", "ran", "", "A", "bird", "flew"]
		);
	}

	#[test]
	fn tokenize_drops_leading_and_trailing_separators() {
		assert_eq!(tokenize_text("\n\nhello -- world\n\n"), vec!["hello", "world"]);
		assert!(tokenize_text("").is_empty());
	}

	#[test]
	fn snapshot_sits_beside_observations() {
		assert_eq!(snapshot_path(Path::new("data/rps.txt")).unwrap(), PathBuf::from("data/rps.bin"));
		assert_eq!(snapshot_path(Path::new("moves")).unwrap(), PathBuf::from("moves.bin"));
		assert!(snapshot_path(Path::new("data/..")).is_err());
	}

	#[test]
	fn data_dir_is_resolved_against_working_directory() {
		let cwd = env::current_dir().unwrap();
		assert_eq!(resolve_data_dir("./data/"), cwd.join("data"));
		assert_eq!(resolve_data_dir("."), cwd);
		assert_eq!(resolve_data_dir(" "), cwd);
		assert_eq!(resolve_data_dir("/srv/markov/./data"), PathBuf::from("/srv/markov/data"));
	}
}
