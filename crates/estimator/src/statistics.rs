//! Processed statistics and run bookkeeping
//!
//! Raw moments are turned into means, relative errors, and figures of merit
//! with the number of histories and the wall time of the run.

// standard library
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

// external crates
use serde::{Deserialize, Serialize};

/// Histories and wall time needed to process raw moments
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Number of completed histories
    pub histories: u64,
    /// Elapsed wall time in seconds
    pub wall_time: f64,
}

impl RunStatistics {
    pub fn new(histories: u64, wall_time: f64) -> Self {
        Self {
            histories,
            wall_time,
        }
    }
}

/// Thread-safe history counter and run clock
///
/// Shared by reference between workers. Call [HistoryCounter::snapshot] once
/// the workers are done to get the [RunStatistics] for processing.
///
/// ```rust
/// # use ntally_estimator::HistoryCounter;
/// let counter = HistoryCounter::new();
/// std::thread::scope(|s| {
///     for _ in 0..4 {
///         s.spawn(|| counter.increment());
///     }
/// });
///
/// assert_eq!(counter.snapshot().histories, 4);
/// ```
#[derive(Debug)]
pub struct HistoryCounter {
    histories: AtomicU64,
    start: Instant,
}

impl Default for HistoryCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryCounter {
    /// Start a new counter with the clock running
    pub fn new() -> Self {
        Self {
            histories: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    /// Record one completed history
    pub fn increment(&self) {
        self.add(1);
    }

    /// Record several completed histories
    pub fn add(&self, histories: u64) {
        self.histories.fetch_add(histories, Ordering::Relaxed);
    }

    /// Completed histories so far
    pub fn histories(&self) -> u64 {
        self.histories.load(Ordering::Relaxed)
    }

    /// Seconds since the counter was created
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Current histories and wall time
    pub fn snapshot(&self) -> RunStatistics {
        RunStatistics::new(self.histories(), self.elapsed())
    }
}

/// Mean, relative error, and figure of merit for every bin
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedData {
    pub mean: Vec<f64>,
    pub relative_error: Vec<f64>,
    pub figure_of_merit: Vec<f64>,
}

impl ProcessedData {
    /// Process first and second moments
    pub fn from_moments(
        first: &[f64],
        second: &[f64],
        multiplier: f64,
        norm_constant: f64,
        run: &RunStatistics,
    ) -> Self {
        let n = run.histories;
        let relative_error: Vec<f64> = first
            .iter()
            .zip(second)
            .map(|(s1, s2)| relative_error(*s1, *s2, n))
            .collect();

        Self {
            mean: first
                .iter()
                .map(|s1| mean(*s1, multiplier, norm_constant, n))
                .collect(),
            figure_of_merit: relative_error
                .iter()
                .map(|re| figure_of_merit(*re, run.wall_time))
                .collect(),
            relative_error,
        }
    }
}

/// [ProcessedData] with the relative variance of the variance
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedTotalData {
    pub mean: Vec<f64>,
    pub relative_error: Vec<f64>,
    pub relative_vov: Vec<f64>,
    pub figure_of_merit: Vec<f64>,
}

impl ProcessedTotalData {
    /// Process all four moments
    pub fn from_moments(
        moments: [&[f64]; 4],
        multiplier: f64,
        norm_constant: f64,
        run: &RunStatistics,
    ) -> Self {
        let [first, second, third, fourth] = moments;
        let ProcessedData {
            mean,
            relative_error,
            figure_of_merit,
        } = ProcessedData::from_moments(first, second, multiplier, norm_constant, run);

        let relative_vov = first
            .iter()
            .zip(second)
            .zip(third.iter().zip(fourth))
            .map(|((s1, s2), (s3, s4))| relative_vov(*s1, *s2, *s3, *s4, run.histories))
            .collect();

        Self {
            mean,
            relative_error,
            relative_vov,
            figure_of_merit,
        }
    }
}

/// Sample mean per history, scaled by the multiplier and normalised
pub fn mean(first: f64, multiplier: f64, norm_constant: f64, histories: u64) -> f64 {
    if histories == 0 {
        return 0.0;
    }
    first * multiplier / histories as f64 / norm_constant
}

/// Relative error of the sample mean
///
/// ```rust
/// # use ntally_estimator::relative_error;
/// assert_eq!(relative_error(10.0, 100.0, 100), 1.0);
/// assert_eq!(relative_error(0.0, 0.0, 100), 0.0);
/// ```
pub fn relative_error(first: f64, second: f64, histories: u64) -> f64 {
    if first == 0.0 || histories == 0 {
        return 0.0;
    }

    let n = histories as f64;
    let bessel = if histories > 1 { n / (n - 1.0) } else { 1.0 };
    let variance = (second / (first * first) - 1.0 / n) * bessel;
    variance.max(0.0).sqrt()
}

/// Relative variance of the variance from the first four moments
///
/// ```rust
/// # use ntally_estimator::relative_vov;
/// let vov = relative_vov(10.0, 100.0, 1000.0, 10000.0, 100);
/// assert!((vov - 0.97010101010101002).abs() < 1e-12);
/// ```
pub fn relative_vov(first: f64, second: f64, third: f64, fourth: f64, histories: u64) -> f64 {
    if first == 0.0 || histories == 0 {
        return 0.0;
    }

    let n = histories as f64;
    let numerator = fourth - 4.0 * first * third / n + 8.0 * second * first.powi(2) / n.powi(2)
        - 4.0 * first.powi(4) / n.powi(3)
        - second.powi(2) / n;
    let denominator = (second - first.powi(2) / n).powi(2);

    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

/// Figure of merit, zero when the relative error or time is zero
///
/// ```rust
/// # use ntally_estimator::figure_of_merit;
/// assert!((figure_of_merit(2.0, 1e3) - 2.5e-4).abs() < 1e-15);
/// assert_eq!(figure_of_merit(0.0, 1e3), 0.0);
/// ```
pub fn figure_of_merit(relative_error: f64, wall_time: f64) -> f64 {
    if relative_error > 0.0 && wall_time > 0.0 {
        1.0 / (relative_error * relative_error * wall_time)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn single_history() {
        let run = RunStatistics::new(1, 1.0);
        let data = ProcessedData::from_moments(&[5.0], &[25.0], 1.0, 1.0, &run);
        assert_eq!(data.mean, vec![5.0]);
        assert_eq!(data.relative_error, vec![0.0]);
        assert_eq!(data.figure_of_merit, vec![0.0]);
    }

    #[rstest]
    fn normalised_mean() {
        let run = RunStatistics::new(4, 2.0);
        let data = ProcessedData::from_moments(&[2.0, 0.0], &[1.0, 0.0], 10.0, 2.0, &run);
        assert_eq!(data.mean, vec![2.5, 0.0]);
        assert_eq!(data.relative_error[1], 0.0);
    }

    #[rstest]
    fn no_histories() {
        let run = RunStatistics::default();
        let data = ProcessedTotalData::from_moments(
            [&[1.0], &[1.0], &[1.0], &[1.0]],
            1.0,
            1.0,
            &run,
        );
        assert_eq!(data.mean, vec![0.0]);
        assert_eq!(data.relative_error, vec![0.0]);
        assert_eq!(data.relative_vov, vec![0.0]);
        assert_eq!(data.figure_of_merit, vec![0.0]);
    }

    #[rstest]
    fn constant_scores_have_no_spread() {
        // every history scores 2.0
        let n = 10;
        let s = |p: i32| n as f64 * 2f64.powi(p);
        assert_eq!(relative_error(s(1), s(2), n), 0.0);
        assert_eq!(relative_vov(s(1), s(2), s(3), s(4), n), 0.0);
    }

    #[rstest]
    fn counter_accumulates() {
        let counter = HistoryCounter::default();
        counter.add(10);
        counter.increment();
        assert_eq!(counter.histories(), 11);
        assert!(counter.elapsed() >= 0.0);
    }
}
