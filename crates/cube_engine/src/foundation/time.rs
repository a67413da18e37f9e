//! Simulation timing
//!
//! Everything in the simulation advances by an explicit `delta_time` in
//! seconds. Only [`Stopwatch`] reads the wall clock.

use std::time::Instant;

/// Tolerance applied when comparing accumulated time against a goal.
///
/// Summing `0.1` ten times yields `0.9999999999999999`, so an exact
/// comparison would fire one tick late.
pub const TIME_EPSILON: f64 = 1.0e-9;

/// Repeating interval detector with carry-over remainder.
///
/// Each call to [`LapTimer::tick`] adds the elapsed time. Once the
/// accumulator reaches the goal, exactly one goal is subtracted and the call
/// reports a lap. The remainder carries into the next lap, so a timer fed
/// `T` seconds fires `floor(T / goal)` times.
#[derive(Debug, Clone, PartialEq)]
pub struct LapTimer {
    lap_time: f64,
    goal_time: f64,
    paused: bool,
}

impl LapTimer {
    /// Create a running timer with the given goal (seconds)
    pub fn new(goal_time: f64) -> Self {
        Self {
            lap_time: 0.0,
            goal_time,
            paused: false,
        }
    }

    /// Advance the timer, returning `true` when a lap completes
    pub fn tick(&mut self, delta_time: f64) -> bool {
        if self.paused {
            return false;
        }

        self.lap_time += delta_time;
        if self.lap_time + TIME_EPSILON >= self.goal_time {
            self.lap_time -= self.goal_time;
            return true;
        }

        false
    }

    /// Change the goal duration without touching the accumulator
    pub fn set_goal(&mut self, goal_time: f64) {
        self.goal_time = goal_time;
    }

    /// Current goal duration
    pub fn goal(&self) -> f64 {
        self.goal_time
    }

    /// Zero the accumulator
    pub fn clear(&mut self) {
        self.lap_time = 0.0;
    }

    /// Stop accumulating time
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Continue accumulating time from where it was paused
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Pause and zero the accumulator
    pub fn stop(&mut self) {
        self.paused = true;
        self.lap_time = 0.0;
    }

    /// Resume and zero the accumulator
    pub fn start(&mut self) {
        self.paused = false;
        self.lap_time = 0.0;
    }

    /// Whether the timer is currently accumulating time
    pub fn is_active(&self) -> bool {
        !self.paused
    }

    /// Accumulated time as a fraction of the goal, in `[0, 1)`
    ///
    /// Used to interpolate animations that track an in-progress lap.
    pub fn progress_fraction(&self) -> f64 {
        if self.goal_time <= 0.0 {
            return 0.0;
        }
        (self.lap_time / self.goal_time).clamp(0.0, 1.0)
    }
}

/// Wall-clock stopwatch for runners that report real throughput
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
    laps: u64,
}

impl Stopwatch {
    /// Start measuring now
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            laps: 0,
        }
    }

    /// Count one completed step
    pub fn lap(&mut self) {
        self.laps += 1;
    }

    /// Steps counted so far
    pub fn laps(&self) -> u64 {
        self.laps
    }

    /// Real seconds since [`Stopwatch::start`]
    pub fn elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Counted steps per real second, or 0 before any time has passed
    pub fn laps_per_second(&self) -> f64 {
        let elapsed = self.elapsed();
        if elapsed > 0.0 {
            self.laps as f64 / elapsed
        } else {
            0.0
        }
    }
}
