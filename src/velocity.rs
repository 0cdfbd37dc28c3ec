//! Closing velocity estimated from recent distances to the line.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

/// A distance observation at a point in time.
#[derive(Debug, Clone, Copy)]
struct DistanceSample {
    time: DateTime<Utc>,
    meters: f64,
}

/// Estimates the closing velocity towards the line by smoothing rates of
/// change over recent distance samples.
///
/// Positive velocity means the boat is approaching the line.
#[derive(Debug)]
pub struct VelocityEstimator {
    distances: VecDeque<DistanceSample>,
    rates: VecDeque<f64>,
    distance_window: usize,
    rate_window: usize,
}

impl VelocityEstimator {
    /// Construct a new [`VelocityEstimator`] keeping up to `distance_window`
    /// distance samples and smoothing over up to `rate_window` rates.
    #[must_use]
    pub fn new(distance_window: usize, rate_window: usize) -> Self {
        Self {
            distances: VecDeque::with_capacity(distance_window),
            rates: VecDeque::with_capacity(rate_window),
            distance_window,
            rate_window,
        }
    }

    /// Record a distance sample and return the updated velocity estimate
    /// in metres per second.
    ///
    /// Samples whose time does not advance past the previous sample are
    /// skipped, leaving the estimate unchanged.
    pub fn update(&mut self, time: DateTime<Utc>, meters: f64) -> f64 {
        if let Some(newest) = self.distances.back() {
            if time <= newest.time {
                tracing::trace!(
                    "Skipping distance sample at {} which does not advance past {}",
                    time,
                    newest.time
                );
                return self.velocity();
            }
        }

        self.distances.push_back(DistanceSample { time, meters });
        while self.distances.len() > self.distance_window {
            self.distances.pop_front();
        }

        if let (Some(oldest), Some(newest)) = (self.distances.front(), self.distances.back()) {
            let elapsed = (newest.time - oldest.time)
                .to_std()
                .map_or(0.0, |elapsed| elapsed.as_secs_f64());
            if elapsed > 0.0 {
                // Shrinking distance reads as positive velocity.
                self.rates.push_back((oldest.meters - newest.meters) / elapsed);
                while self.rates.len() > self.rate_window {
                    self.rates.pop_front();
                }
            }
        }

        self.velocity()
    }

    /// Mean of the retained rates, or `0.0` before any rate is available.
    fn velocity(&self) -> f64 {
        if self.rates.is_empty() {
            return 0.0;
        }
        self.rates.iter().sum::<f64>() / self.rates.len() as f64
    }
}

impl Default for VelocityEstimator {
    fn default() -> Self {
        Self::new(2, 3)
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use chrono::{DateTime, Duration, Utc};

    use super::VelocityEstimator;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(seconds, 0).unwrap()
    }

    #[test]
    fn test_velocity_without_samples_is_zero() {
        let mut estimator = VelocityEstimator::default();
        assert_eq!(0.0, estimator.update(at(0), 50.0));
    }

    #[test]
    fn test_velocity_approaching_is_positive() {
        let mut estimator = VelocityEstimator::default();
        estimator.update(at(0), 50.0);
        assert_relative_eq!(2.0, estimator.update(at(5), 40.0), epsilon = 1e-12);
    }

    #[test]
    fn test_velocity_receding_is_negative() {
        let mut estimator = VelocityEstimator::default();
        estimator.update(at(0), 40.0);
        assert_relative_eq!(-2.0, estimator.update(at(5), 50.0), epsilon = 1e-12);
    }

    #[test]
    fn test_velocity_smooths_over_recent_rates() {
        let mut estimator = VelocityEstimator::default();
        estimator.update(at(0), 10.0);
        estimator.update(at(1), 8.0);
        estimator.update(at(2), 7.0);
        estimator.update(at(3), 7.5);

        // Rates so far: 2.0, 1.0, -0.5. The first rate falls out of the
        // window on the next update.
        let velocity = estimator.update(at(4), 9.0);
        assert_relative_eq!(-1.0 / 3.0, velocity, epsilon = 1e-12);
    }

    #[test]
    fn test_stale_sample_is_skipped() {
        let mut estimator = VelocityEstimator::default();
        estimator.update(at(0), 50.0);
        estimator.update(at(5), 40.0);

        // Redelivered timestamp leaves the estimate alone.
        assert_relative_eq!(2.0, estimator.update(at(5), 0.0), epsilon = 1e-12);
        assert_relative_eq!(2.0, estimator.update(at(10), 30.0), epsilon = 1e-12);
    }

    #[test]
    fn test_sub_millisecond_spacing_keeps_velocity_finite() {
        let mut estimator = VelocityEstimator::default();
        estimator.update(at(0), 50.0);

        let velocity = estimator.update(at(0) + Duration::microseconds(500), 40.0);
        assert!(velocity.is_finite());
        assert_relative_eq!(20_000.0, velocity, epsilon = 1e-6);
    }

    #[test]
    fn test_sub_millisecond_spacing_with_equal_distance() {
        let mut estimator = VelocityEstimator::default();
        estimator.update(at(0), 50.0);

        // A flat distance over a tiny interval is a zero rate, not NaN.
        let velocity = estimator.update(at(0) + Duration::microseconds(500), 50.0);
        assert_eq!(0.0, velocity);
    }

    #[test]
    fn test_rate_window_of_one_tracks_latest_rate() {
        let mut estimator = VelocityEstimator::new(2, 1);
        estimator.update(at(0), 10.0);
        estimator.update(at(1), 8.0);
        assert_relative_eq!(1.0, estimator.update(at(2), 7.0), epsilon = 1e-12);
    }
}
