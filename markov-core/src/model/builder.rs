use std::sync::mpsc;
use std::thread;

use log::debug;

use super::chain_model::ChainModel;
use crate::io::SEPARATOR;

/// Builds a fresh `ChainModel` from a flat sequence of observations.
///
/// Empty strings separate independent sub-sequences (e.g. dataset cases):
/// no transition is ever recorded across a separator.
///
/// Every build starts from an empty model, so a rebuild never carries over
/// states from a previous one.
pub struct ChainBuilder;

impl ChainBuilder {
	/// Sequential build.
	///
	/// State weights are raw occurrence counts; transition weights are raw
	/// consecutive-pair counts. An empty input yields an empty model.
	pub fn build<S: AsRef<str>>(observations: &[S]) -> ChainModel {
		let mut model = ChainModel::new();
		Self::ingest(&mut model, observations);
		model
	}

	/// Parallel build over independent sub-sequences.
	///
	/// # Behavior
	/// - Splits the input at separators into cases.
	/// - Groups cases into chunks (based on CPU cores * factor).
	/// - Spawns threads to build a partial model per chunk.
	/// - Merges partial models in input order.
	///
	/// # Notes
	/// - The result is identical to `build`, including insertion order.
	/// - Inputs without separators are a single case and are built inline.
	pub fn build_parallel<S: AsRef<str>>(observations: &[S]) -> ChainModel {
		let cases: Vec<Vec<String>> = observations
			.split(|value| value.as_ref() == SEPARATOR)
			.filter(|case| !case.is_empty())
			.map(|case| case.iter().map(|value| value.as_ref().to_owned()).collect())
			.collect();

		if cases.len() < 2 {
			return Self::build(observations);
		}

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = cases.len().div_ceil(chunks);

		let (tx, rx) = mpsc::channel();
		for (index, chunk) in cases.chunks(chunk_size).enumerate() {
			let tx = tx.clone();
			let chunk: Vec<Vec<String>> = chunk.to_vec();

			thread::spawn(move || {
				let mut partial_model = ChainModel::new();
				for case in &chunk {
					Self::ingest(&mut partial_model, case);
				}
				// The receiver outlives every worker, so the send cannot fail.
				let _ = tx.send((index, partial_model));
			});
		}
		drop(tx);

		let mut partial_models: Vec<(usize, ChainModel)> = rx.iter().collect();
		partial_models.sort_by_key(|(index, _)| *index);
		debug!("Merging {} partial chains", partial_models.len());

		let mut final_model = ChainModel::new();
		for (_, partial_model) in &partial_models {
			final_model.merge(partial_model);
		}
		final_model
	}

	/// Feeds observations into `model`, resetting the previous state at
	/// every separator.
	fn ingest<S: AsRef<str>>(model: &mut ChainModel, observations: &[S]) {
		let mut previous: Option<String> = None;
		for value in observations {
			let value = value.as_ref();
			if value == SEPARATOR {
				previous = None;
				continue;
			}

			let id = model.add_or_increment_state(value, value).id().to_owned();
			if let Some(previous_id) = &previous {
				model.add_or_increment_transition(previous_id, &id);
			}
			previous = Some(id);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::state::State;

	fn weight_of(model: &ChainModel, id: &str) -> f64 {
		model.state(id).map(State::weight).unwrap_or_default()
	}

	fn transition_weight(model: &ChainModel, from: &str, to: &str) -> f64 {
		model.transition(from, to).map(|t| t.weight()).unwrap_or_default()
	}

	#[test]
	fn counts_occurrences_and_pairs() {
		let model = ChainBuilder::build(&["R", "P", "R", "P", "S", "R"]);

		assert_eq!(weight_of(&model, "R"), 3.0);
		assert_eq!(weight_of(&model, "P"), 2.0);
		assert_eq!(weight_of(&model, "S"), 1.0);
		assert_eq!(model.transition_count(), 4);
		assert_eq!(transition_weight(&model, "R", "P"), 2.0);
		assert_eq!(transition_weight(&model, "P", "R"), 1.0);
		assert_eq!(transition_weight(&model, "P", "S"), 1.0);
		assert_eq!(transition_weight(&model, "S", "R"), 1.0);
	}

	#[test]
	fn transition_total_is_length_minus_one() {
		let observations = ["a", "b", "a", "a", "c", "b", "a"];
		let model = ChainBuilder::build(&observations);
		let total: f64 = model.transitions().iter().map(|t| t.weight()).sum();

		assert_eq!(total, (observations.len() - 1) as f64);
		for id in ["a", "b", "c"] {
			let occurrences = observations.iter().filter(|value| **value == id).count();
			assert!(weight_of(&model, id) >= occurrences as f64);
		}
	}

	#[test]
	fn separators_break_sub_sequences() {
		let model = ChainBuilder::build(&["A", "B", "", "C", "D"]);

		assert_eq!(model.transition_count(), 2);
		assert!(model.transition("A", "B").is_some());
		assert!(model.transition("C", "D").is_some());
		assert!(model.transition("B", "C").is_none());
	}

	#[test]
	fn repeated_values_make_self_loops() {
		let model = ChainBuilder::build(&["A", "A", "A"]);
		assert_eq!(transition_weight(&model, "A", "A"), 2.0);
		assert!(model.transitions()[0].is_self_loop());
	}

	#[test]
	fn empty_input_builds_empty_model() {
		let empty: [&str; 0] = [];
		assert!(ChainBuilder::build(&empty).is_empty());
		assert!(ChainBuilder::build(&["", ""]).is_empty());
		assert_eq!(ChainBuilder::build(&empty).transition_count(), 0);
	}

	#[test]
	fn rebuilding_is_idempotent() {
		let observations = ["x", "y", "", "y", "x", "x"];
		assert_eq!(ChainBuilder::build(&observations), ChainBuilder::build(&observations));
	}

	#[test]
	fn parallel_build_matches_sequential() {
		let mut observations = Vec::new();
		for case in 0..200 {
			for step in 0..(case % 7 + 1) {
				observations.push(format!("s{}", (case * 3 + step) % 11));
			}
			observations.push(String::new());
		}

		let sequential = ChainBuilder::build(&observations);
		let parallel = ChainBuilder::build_parallel(&observations);
		assert_eq!(parallel, sequential);
	}
}
