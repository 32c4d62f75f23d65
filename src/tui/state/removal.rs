use crate::coordinator::RemovalSummary;
use crate::pipeline::RemovalOutcome;
use crate::progress::ProgressEvent;
use std::time::{Duration, Instant};

/// What the progress screen knows about the active run.
#[derive(Debug)]
pub struct RemovalProgress {
    pub total_units: usize,
    pub current: Option<ProgressEvent>,
    pub outcomes: Vec<RemovalOutcome>,
    pub cancel_requested: bool,
    pub started: Instant,
}

impl Default for RemovalProgress {
    fn default() -> Self {
        Self::start(0)
    }
}

impl RemovalProgress {
    pub fn start(total_units: usize) -> Self {
        Self {
            total_units,
            current: None,
            outcomes: Vec::new(),
            cancel_requested: false,
            started: Instant::now(),
        }
    }

    /// Fraction of the whole run: finished units plus the share of steps
    /// done in the current one.
    pub fn ratio(&self) -> f64 {
        if self.total_units == 0 {
            return 0.0;
        }
        let done = self.outcomes.len() as f64;
        let partial = match &self.current {
            Some(p) if p.step_count > 0 && self.outcomes.len() < self.total_units => {
                p.step_index.saturating_sub(1) as f64 / p.step_count as f64
            }
            _ => 0.0,
        };
        ((done + partial) / self.total_units as f64).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct RemovalResultDisplay {
    pub summary: RemovalSummary,
    pub duration: Duration,
}
