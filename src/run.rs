use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Conductivity range produced by the simulated meter.
pub const SIMULATED_RANGE: std::ops::Range<f64> = 0.0..100.0;

/// Shared stop flag for an in-progress run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// 1-based.
    pub iteration: u32,
    pub conductivity: f64,
    pub taken_at: DateTime<Utc>,
}

/// Yields one simulated conductivity reading per iteration.
///
/// The iterator never sleeps. Whoever drives it owns the pause between steps,
/// which keeps it usable from a GUI tick as well as a blocking CLI loop. The
/// cancel token is checked once before each reading.
pub struct SimulatedRun<R> {
    rng: R,
    iterations: u32,
    completed: u32,
    cancel: CancelToken,
}

impl<R: Rng> SimulatedRun<R> {
    pub fn new(rng: R, iterations: u32, cancel: CancelToken) -> Self {
        SimulatedRun {
            rng,
            iterations,
            completed: 0,
            cancel,
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn completed(&self) -> u32 {
        self.completed
    }

    pub fn progress(&self) -> f32 {
        if self.iterations == 0 {
            return 1.0;
        }
        self.completed as f32 / self.iterations as f32
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// True once every iteration produced a reading without cancellation.
    pub fn is_finished(&self) -> bool {
        self.completed >= self.iterations && !self.is_cancelled()
    }
}

impl<R: Rng> Iterator for SimulatedRun<R> {
    type Item = Reading;

    fn next(&mut self) -> Option<Reading> {
        if self.cancel.is_cancelled() || self.completed >= self.iterations {
            return None;
        }
        self.completed += 1;
        Some(Reading {
            iteration: self.completed,
            conductivity: self.rng.gen_range(SIMULATED_RANGE),
            taken_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn yields_one_reading_per_iteration() {
        let run = SimulatedRun::new(StdRng::seed_from_u64(7), 5, CancelToken::new());
        let readings: Vec<_> = run.collect();
        assert_eq!(readings.len(), 5);
        assert_eq!(readings.last().map(|r| r.iteration), Some(5));
        assert!(readings.iter().all(|r| SIMULATED_RANGE.contains(&r.conductivity)));
    }

    #[test]
    fn cancellation_stops_before_next_reading() {
        let cancel = CancelToken::new();
        let mut run = SimulatedRun::new(StdRng::seed_from_u64(7), 10, cancel.clone());
        assert!(run.next().is_some());
        assert!(run.next().is_some());
        cancel.cancel();
        assert!(run.next().is_none());
        assert_eq!(run.completed(), 2);
        assert!(!run.is_finished());
    }

    #[test]
    fn same_seed_same_readings() {
        let a: Vec<f64> = SimulatedRun::new(StdRng::seed_from_u64(1), 4, CancelToken::new())
            .map(|r| r.conductivity)
            .collect();
        let b: Vec<f64> = SimulatedRun::new(StdRng::seed_from_u64(1), 4, CancelToken::new())
            .map(|r| r.conductivity)
            .collect();
        assert_eq!(a, b);
    }
}
