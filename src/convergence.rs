//! Convergence detection over normalized elbow positions.
//!
//! The decision looks only at where the elbow sits relative to the live
//! document count, never at absolute scores: once the cliff stops moving,
//! more trials are not changing the answer.

/// Tracks one round's elbow history and decides when to stop.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    enabled: bool,
    min_trials: usize,
    stable_trials: usize,
    tolerance: f64,
    history: Vec<f64>,
}

impl ConvergenceMonitor {
    pub fn new(enabled: bool, min_trials: usize, stable_trials: usize, tolerance: f64) -> Self {
        Self {
            enabled,
            min_trials,
            stable_trials,
            tolerance,
            history: Vec::new(),
        }
    }

    /// Start a fresh history for a new round.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Record one trial's elbow. An absent elbow means no cliff: the whole
    /// list is on the relevant side, normalized position 1.0.
    pub fn record(&mut self, elbow: Option<usize>, live_documents: usize) {
        let normalized = match elbow {
            Some(e) => e as f64 / live_documents.max(1) as f64,
            None => 1.0,
        };
        self.history.push(normalized);
    }

    pub fn trials_recorded(&self) -> usize {
        self.history.len()
    }

    /// Whether the last `stable_trials` elbow positions sit within the
    /// tolerance band. Never fires before `min_trials`.
    pub fn converged(&self) -> bool {
        if !self.enabled {
            return false;
        }
        let n = self.history.len();
        if n < self.min_trials || n < self.stable_trials {
            return false;
        }
        let window = &self.history[n - self.stable_trials..];
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for &v in window {
            min = min.min(v);
            max = max.max(v);
        }
        max - min <= self.tolerance
    }
}
