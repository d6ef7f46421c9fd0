use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Cancellable fixed-delay repeating timer.
///
/// At most one schedule is active: `start` replaces any previous one, and
/// `stop` takes effect immediately (no fire is observed after it returns).
///
/// Must be started from within a tokio runtime.
#[derive(Debug)]
pub struct RepeatingTimer {
	interval: Option<Interval>,
	period: Duration,
	last_fire: Option<Instant>,
}

impl Default for RepeatingTimer {
	fn default() -> Self {
		Self::new()
	}
}

impl RepeatingTimer {
	/// Creates a stopped timer.
	pub fn new() -> Self {
		Self { interval: None, period: Duration::ZERO, last_fire: None }
	}

	/// (Re)starts the timer. The first fire happens one `period` from now.
	pub fn start(&mut self, period: Duration) {
		self.stop();
		let now = Instant::now();
		let mut interval = time::interval_at(now + period, period);
		interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
		self.interval = Some(interval);
		self.period = period;
		self.last_fire = Some(now);
	}

	pub fn stop(&mut self) {
		self.interval = None;
		self.last_fire = None;
	}

	pub fn is_active(&self) -> bool {
		self.interval.is_some()
	}

	pub fn period(&self) -> Duration {
		self.period
	}

	/// Waits for the next fire. Never completes while stopped.
	///
	/// Fires closer than half a period to the previous one are swallowed, so
	/// drift never yields two logical fires per interval. Cancel safe.
	pub async fn fired(&mut self) {
		loop {
			let Some(interval) = self.interval.as_mut() else {
				return std::future::pending().await;
			};
			let tick = interval.tick().await;

			if let Some(last) = self.last_fire {
				if tick.saturating_duration_since(last) < self.period / 2 {
					continue;
				}
			}
			self.last_fire = Some(tick);
			return;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn assert_close(elapsed: Duration, millis: u64) {
		let expected = Duration::from_millis(millis);
		assert!(
			elapsed >= expected && elapsed < expected + Duration::from_millis(5),
			"elapsed {elapsed:?}, expected {expected:?}"
		);
	}

	#[tokio::test(start_paused = true)]
	async fn fires_once_per_period() {
		let mut timer = RepeatingTimer::new();
		let started = Instant::now();
		timer.start(Duration::from_millis(250));

		timer.fired().await;
		assert_close(started.elapsed(), 250);
		timer.fired().await;
		assert_close(started.elapsed(), 500);
	}

	#[tokio::test(start_paused = true)]
	async fn missed_periods_collapse_into_one_fire() {
		let mut timer = RepeatingTimer::new();
		let started = Instant::now();
		timer.start(Duration::from_millis(100));
		time::advance(Duration::from_millis(350)).await;

		// Three periods were missed: one fire is due now, the next a full period later.
		timer.fired().await;
		assert_close(started.elapsed(), 350);
		timer.fired().await;
		assert_close(started.elapsed(), 450);
	}

	#[tokio::test(start_paused = true)]
	async fn stopped_timer_never_fires() {
		let mut timer = RepeatingTimer::new();
		timer.start(Duration::from_millis(10));
		timer.stop();
		assert!(!timer.is_active());

		let outcome = time::timeout(Duration::from_secs(5), timer.fired()).await;
		assert!(outcome.is_err());
	}

	#[tokio::test(start_paused = true)]
	async fn restart_replaces_schedule() {
		let mut timer = RepeatingTimer::new();
		timer.start(Duration::from_millis(1000));
		time::advance(Duration::from_millis(900)).await;

		let restarted = Instant::now();
		timer.start(Duration::from_millis(100));
		timer.fired().await;
		assert_close(restarted.elapsed(), 100);
		assert_eq!(timer.period(), Duration::from_millis(100));
	}
}
