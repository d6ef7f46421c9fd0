use rand::Rng;

/// Cumulative-weight roulette selection for a given draw.
///
/// `draw` is expected in `[0, total)`. Weights are accumulated in order and
/// the first index whose running sum exceeds `draw` wins, so a zero weight is
/// never selected while any positive alternative exists.
///
/// Returns `None` if `weights` is empty or no weight is positive.
pub fn select_by_draw(weights: &[f64], draw: f64) -> Option<usize> {
	let mut running = 0.0;
	for (index, weight) in weights.iter().enumerate() {
		running += weight;
		if running > draw {
			return Some(index);
		}
	}

	// Rounding can leave the running sum just below a draw close to total.
	weights.iter().rposition(|weight| *weight > 0.0)
}

/// Weighted random selection among candidates with a positive weight.
///
/// An O(n) scan computes the total weight, then a draw in `[0, total)`
/// picks the bucket.
///
/// Returns `None` if `weights` is empty or sums to 0.
pub fn select_positive<R: Rng>(weights: &[f64], rng: &mut R) -> Option<usize> {
	let total: f64 = weights.iter().sum();
	if total <= 0.0 {
		return None;
	}

	select_by_draw(weights, rng.random_range(0.0..total))
}

/// Like `select_positive`, but if every weight is 0 a candidate is picked
/// uniformly (a lone candidate is therefore always selected).
///
/// Returns `None` only if `weights` is empty.
pub fn select_weighted<R: Rng>(weights: &[f64], rng: &mut R) -> Option<usize> {
	if weights.is_empty() {
		return None;
	}

	select_positive(weights, rng).or_else(|| Some(rng.random_range(0..weights.len())))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn draw_picks_cumulative_bucket() {
		let weights = [2.0, 1.0, 1.0];
		assert_eq!(select_by_draw(&weights, 0.0), Some(0));
		assert_eq!(select_by_draw(&weights, 1.99), Some(0));
		assert_eq!(select_by_draw(&weights, 2.0), Some(1));
		assert_eq!(select_by_draw(&weights, 3.5), Some(2));
	}

	#[test]
	fn zero_weight_is_skipped_for_every_draw() {
		let weights = [0.0, 3.0, 0.0];
		for draw in [0.0, 0.5, 1.5, 2.999] {
			assert_eq!(select_by_draw(&weights, draw), Some(1));
		}
	}

	#[test]
	fn draw_at_total_falls_back_to_last_positive() {
		assert_eq!(select_by_draw(&[1.0, 1.0, 0.0], 2.0), Some(1));
		assert_eq!(select_by_draw(&[0.0, 0.0], 0.0), None);
		assert_eq!(select_by_draw(&[], 0.0), None);
	}

	#[test]
	fn single_candidate_always_selected() {
		let mut rng = StdRng::seed_from_u64(7);
		for _ in 0..100 {
			assert_eq!(select_weighted(&[4.0], &mut rng), Some(0));
			assert_eq!(select_weighted(&[0.0], &mut rng), Some(0));
		}
		assert_eq!(select_weighted(&[], &mut rng), None);
	}

	#[test]
	fn positive_selection_rejects_all_zero_weights() {
		let mut rng = StdRng::seed_from_u64(7);
		for _ in 0..100 {
			assert_eq!(select_positive(&[0.0, 0.0], &mut rng), None);
			assert_eq!(select_positive(&[0.0, 2.0], &mut rng), Some(1));
		}
		assert_eq!(select_positive(&[], &mut rng), None);
	}

	#[test]
	fn weighted_selection_follows_weights() {
		let mut rng = StdRng::seed_from_u64(42);
		let mut counts = [0usize; 3];
		for _ in 0..10_000 {
			if let Some(index) = select_weighted(&[1.0, 0.0, 3.0], &mut rng) {
				counts[index] += 1;
			}
		}
		assert_eq!(counts[1], 0);
		assert!(counts[2] > counts[0] * 2);
	}
}
