// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lap timing for the raster and UI threads.
//!
//! A [`Stopwatch`] keeps the most recent N lap durations in a ring buffer.
//! The compositor starts and stops the raster stopwatch around every frame;
//! the UI stopwatch is fed externally with [`Stopwatch::set_lap_time`]. The
//! performance overlay reads both.

use alloc::vec;
use alloc::vec::Vec;

use crate::time::{Duration, HostTime};

/// Number of laps kept by default (two seconds at 60 Hz).
pub const DEFAULT_SAMPLE_COUNT: usize = 120;

/// The frame budget at 60 Hz.
pub const DEFAULT_FRAME_BUDGET: Duration = Duration(16_666_667);

/// Ring buffer of lap durations.
#[derive(Clone, Debug)]
pub struct Stopwatch {
    laps: Vec<Duration>,
    cursor: usize,
    start: Option<HostTime>,
    frame_budget: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_COUNT, DEFAULT_FRAME_BUDGET)
    }
}

impl Stopwatch {
    /// Creates a stopwatch holding `sample_count` laps, all initially zero.
    ///
    /// A `sample_count` of zero is raised to one.
    #[must_use]
    pub fn new(sample_count: usize, frame_budget: Duration) -> Self {
        Self {
            laps: vec![Duration::ZERO; sample_count.max(1)],
            cursor: 0,
            start: None,
            frame_budget,
        }
    }

    /// Marks the beginning of a lap.
    pub fn start(&mut self, now: HostTime) {
        self.start = Some(now);
    }

    /// Ends the current lap and records its duration.
    ///
    /// A `stop` without a matching `start` is ignored.
    pub fn stop(&mut self, now: HostTime) {
        if let Some(start) = self.start.take() {
            self.push(now.saturating_duration_since(start));
        }
    }

    /// Records a lap measured elsewhere.
    pub fn set_lap_time(&mut self, lap: Duration) {
        self.start = None;
        self.push(lap);
    }

    /// The most recently recorded lap.
    #[must_use]
    pub fn last_lap(&self) -> Duration {
        let n = self.laps.len();
        self.laps[(self.cursor + n - 1) % n]
    }

    /// The longest lap in the buffer.
    #[must_use]
    pub fn max_delta(&self) -> Duration {
        self.laps.iter().copied().max().unwrap_or(Duration::ZERO)
    }

    /// The mean of all laps in the buffer.
    #[must_use]
    pub fn average_delta(&self) -> Duration {
        let total: u128 = self.laps.iter().map(|d| u128::from(d.0)).sum();
        #[expect(
            clippy::cast_possible_truncation,
            reason = "mean of u64 values fits in u64"
        )]
        let mean = (total / self.laps.len() as u128) as u64;
        Duration(mean)
    }

    /// The frame budget laps are measured against.
    #[must_use]
    pub fn frame_budget(&self) -> Duration {
        self.frame_budget
    }

    /// Expresses `lap` as a multiple of the frame budget.
    #[must_use]
    pub fn unit_frame_interval(&self, lap: Duration) -> f64 {
        if self.frame_budget.0 == 0 {
            return 0.0;
        }
        lap.0 as f64 / self.frame_budget.0 as f64
    }

    /// Number of laps the buffer holds.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.laps.len()
    }

    /// Laps from oldest to newest.
    pub fn laps(&self) -> impl Iterator<Item = Duration> + '_ {
        let (newer, older) = self.laps.split_at(self.cursor);
        older.iter().chain(newer).copied()
    }

    fn push(&mut self, lap: Duration) {
        self.laps[self.cursor] = lap;
        self.cursor = (self.cursor + 1) % self.laps.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_stop_records_lap() {
        let mut sw = Stopwatch::default();
        sw.start(HostTime(1_000));
        sw.stop(HostTime(5_000));
        assert_eq!(sw.last_lap(), Duration(4_000));
    }

    #[test]
    fn stop_without_start_is_ignored() {
        let mut sw = Stopwatch::new(4, DEFAULT_FRAME_BUDGET);
        sw.stop(HostTime(5_000));
        assert_eq!(sw.last_lap(), Duration::ZERO);
        assert!(sw.laps().all(|d| d == Duration::ZERO));
    }

    #[test]
    fn ring_buffer_wraps() {
        let mut sw = Stopwatch::new(3, DEFAULT_FRAME_BUDGET);
        for ms in 1..=5 {
            sw.set_lap_time(Duration::from_millis(ms));
        }
        let laps: Vec<_> = sw.laps().collect();
        assert_eq!(
            laps,
            [
                Duration::from_millis(3),
                Duration::from_millis(4),
                Duration::from_millis(5)
            ]
        );
        assert_eq!(sw.last_lap(), Duration::from_millis(5));
        assert_eq!(sw.max_delta(), Duration::from_millis(5));
        assert_eq!(sw.average_delta(), Duration::from_millis(4));
    }

    #[test]
    fn unit_frame_interval_relative_to_budget() {
        let sw = Stopwatch::new(1, Duration::from_millis(10));
        assert!((sw.unit_frame_interval(Duration::from_millis(15)) - 1.5).abs() < 1e-12);
        let zero = Stopwatch::new(1, Duration::ZERO);
        assert_eq!(zero.unit_frame_interval(Duration::from_millis(15)), 0.0);
    }

    #[test]
    fn zero_samples_keeps_one_lap() {
        let mut sw = Stopwatch::new(0, DEFAULT_FRAME_BUDGET);
        assert_eq!(sw.sample_count(), 1);
        assert_eq!(sw.last_lap(), Duration::ZERO);
        sw.set_lap_time(Duration(7));
        assert_eq!(sw.last_lap(), Duration(7));
        assert_eq!(sw.average_delta(), Duration(7));
    }
}
