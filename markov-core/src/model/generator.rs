use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::chain_model::ChainModel;
use super::params::GenerationParams;
use super::selection::{select_positive, select_weighted};
use super::sequence::GeneratedSequence;
use super::state::State;

/// Weighted random-walk sampler over a `ChainModel`.
///
/// # Responsibilities
/// - Pick the initial state (forced, or drawn by occurrence weight)
/// - Follow outgoing transitions, drawn by transition weight
/// - Stop at the length limit or at the first dead end (no outgoing
///   transition with a positive weight)
///
/// The random source is a type parameter so callers (and tests) can supply a
/// seeded generator.
#[derive(Debug)]
pub struct SequenceGenerator<R: Rng = StdRng> {
	rng: R,
}

impl SequenceGenerator<StdRng> {
	/// Creates a generator seeded from the thread-local RNG.
	pub fn new() -> Self {
		Self { rng: StdRng::from_rng(&mut rand::rng()) }
	}

	/// Creates a deterministic generator.
	pub fn seeded(seed: u64) -> Self {
		Self { rng: StdRng::seed_from_u64(seed) }
	}

	/// Seeded if `seed` is given, otherwise random.
	pub fn from_seed(seed: Option<u64>) -> Self {
		match seed {
			Some(seed) => Self::seeded(seed),
			None => Self::new(),
		}
	}
}

impl Default for SequenceGenerator<StdRng> {
	fn default() -> Self {
		Self::new()
	}
}

impl<R: Rng> SequenceGenerator<R> {
	pub fn with_rng(rng: R) -> Self {
		Self { rng }
	}

	/// Produces one sequence by weighted random walk.
	///
	/// # Returns
	/// - Between 1 and `length_limit` states on success.
	/// - Fewer than `length_limit` states if a dead end is reached.
	/// - An empty sequence if the model is empty or the requested starting
	///   state does not exist. Callers treat it as "cannot generate".
	pub fn generate(&mut self, model: &ChainModel, params: &GenerationParams) -> GeneratedSequence {
		let Some(mut current) = self.initial_state(model, params.starting_state()) else {
			debug!("Nothing to generate (empty chain or unknown starting state)");
			return GeneratedSequence::default();
		};

		let mut visited: Vec<State> = Vec::new();
		loop {
			visited.push(current.clone());
			if visited.len() >= params.length_limit() {
				break;
			}

			let outgoing = model.outgoing_transitions(current.id());
			let weights: Vec<f64> = outgoing.iter().map(|t| t.weight()).collect();
			// Outgoing edges that all weigh 0 make a dead end.
			let next = select_positive(&weights, &mut self.rng)
				.and_then(|index| model.state(outgoing[index].to()));
			match next {
				Some(state) => current = state,
				None => break,
			}
		}

		GeneratedSequence::new(visited)
	}

	/// Resolves the first state of a walk.
	///
	/// A forced starting state is used as-is (or `None` if unknown);
	/// otherwise a state is drawn over all states by occurrence weight, in
	/// insertion order.
	fn initial_state<'m>(&mut self, model: &'m ChainModel, starting_state: Option<&str>) -> Option<&'m State> {
		if let Some(id) = starting_state {
			return model.state(id);
		}

		let weights: Vec<f64> = model.states().iter().map(State::weight).collect();
		select_weighted(&weights, &mut self.rng).map(|index| &model.states()[index])
	}
}
