use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::model::params::GenerationParams;
use crate::model::sequence::GeneratedSequence;

/// Generated sequences sharing the same generation parameters.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SequenceGroup {
	key: GenerationParams,
	sequences: Vec<GeneratedSequence>,
}

impl SequenceGroup {
	fn new(key: GenerationParams) -> Self {
		Self { key, sequences: Vec::new() }
	}

	/// Parameters every sequence of this group was generated with.
	pub fn key(&self) -> &GenerationParams {
		&self.key
	}

	pub fn starting_state(&self) -> Option<&str> {
		self.key.starting_state()
	}

	pub fn length_limit(&self) -> usize {
		self.key.length_limit()
	}

	pub fn delimiter(&self) -> &str {
		self.key.delimiter()
	}

	pub fn sequences(&self) -> &[GeneratedSequence] {
		&self.sequences
	}

	/// Each sequence rendered with the group's delimiter.
	pub fn lines(&self) -> Vec<String> {
		self.sequences.iter().map(|sequence| sequence.join(self.key.delimiter())).collect()
	}
}

/// Append-only, grouped log of finished sequences.
///
/// # Invariants
/// - Only the most recent group is eligible for reuse: identical parameters
///   seen non-consecutively get a new group each time.
/// - `current_key` is the key of the last group (or `None` when empty).
/// - No group is empty.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct OutputHistory {
	groups: Vec<SequenceGroup>,
	current_key: Option<GenerationParams>,
}

impl OutputHistory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Commits a finished sequence.
	///
	/// Appends to the current group if its key equals `key`, otherwise opens
	/// a new group. Returns the index of the group that received it.
	pub fn commit(&mut self, key: &GenerationParams, sequence: GeneratedSequence) -> usize {
		if self.current_key.as_ref() != Some(key) {
			self.groups.push(SequenceGroup::new(key.clone()));
			self.current_key = Some(key.clone());
		}

		let index = self.groups.len() - 1;
		self.groups[index].sequences.push(sequence);
		index
	}

	/// Whether a sequence generated with `key` would open a new group.
	pub fn would_open_group(&self, key: &GenerationParams) -> bool {
		self.current_key.as_ref() != Some(key)
	}

	pub fn groups(&self) -> &[SequenceGroup] {
		&self.groups
	}

	pub fn current_group(&self) -> Option<&SequenceGroup> {
		self.groups.last()
	}

	pub fn is_empty(&self) -> bool {
		self.groups.is_empty()
	}

	/// Total number of sequences across all groups.
	pub fn sequence_count(&self) -> usize {
		self.groups.iter().map(|group| group.sequences.len()).sum()
	}

	/// Removes every group.
	pub fn clear(&mut self) {
		self.groups.clear();
		self.current_key = None;
	}

	/// Plain-text export.
	///
	/// One header line per group, then one line per sequence joined with the
	/// group's delimiter. Groups are separated by a blank line.
	pub fn to_text(&self) -> String {
		let mut text = String::new();
		for (index, group) in self.groups.iter().enumerate() {
			if index > 0 {
				text.push('\n');
			}
			// Writing into a String cannot fail.
			let _ = writeln!(
				text,
				"# start: {}, length: {}, delimiter: {:?}",
				group.starting_state().unwrap_or("random"),
				group.length_limit(),
				group.delimiter()
			);
			for line in group.lines() {
				text.push_str(&line);
				text.push('\n');
			}
		}
		text
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::builder::ChainBuilder;
	use crate::model::generator::SequenceGenerator;

	fn key(start: Option<&str>, length_limit: usize, delimiter: &str) -> GenerationParams {
		GenerationParams::new(start.map(str::to_owned), length_limit, delimiter).unwrap()
	}

	fn sequence(ids: &[&str]) -> GeneratedSequence {
		let model = ChainBuilder::build(ids);
		let mut generator = SequenceGenerator::seeded(0);
		generator.generate(&model, &key(Some(ids[0]), ids.len(), ","))
	}

	#[test]
	fn matching_key_reuses_current_group() {
		let mut history = OutputHistory::new();
		let first = key(Some("A"), 2, ",");

		assert_eq!(history.commit(&first, sequence(&["A", "B"])), 0);
		assert_eq!(history.commit(&first, sequence(&["A", "B"])), 0);
		assert_eq!(history.groups().len(), 1);
		assert_eq!(history.groups()[0].sequences().len(), 2);
	}

	#[test]
	fn only_most_recent_group_is_reused() {
		let mut history = OutputHistory::new();
		let first = key(None, 2, ",");
		let second = key(None, 3, ",");

		history.commit(&first, sequence(&["A", "B"]));
		history.commit(&second, sequence(&["A", "B"]));
		assert!(history.would_open_group(&first));
		history.commit(&first, sequence(&["A", "B"]));

		assert_eq!(history.groups().len(), 3);
		assert_eq!(history.sequence_count(), 3);
		assert_eq!(history.current_group().map(SequenceGroup::length_limit), Some(2));
	}

	#[test]
	fn clear_resets_current_key() {
		let mut history = OutputHistory::new();
		let first = key(None, 2, ",");
		history.commit(&first, sequence(&["A", "B"]));
		history.clear();

		assert!(history.is_empty());
		assert!(history.would_open_group(&first));
	}

	#[test]
	fn text_export_uses_group_delimiter() {
		let mut history = OutputHistory::new();
		history.commit(&key(Some("A"), 2, "-"), sequence(&["A", "B"]));
		history.commit(&key(Some("B"), 1, ","), sequence(&["B"]));

		assert_eq!(
			history.to_text(),
			"# start: A, length: 2, delimiter: \"-\"\nA-B\n\n# start: B, length: 1, delimiter: \",\"\nB\n"
		);
	}
}
