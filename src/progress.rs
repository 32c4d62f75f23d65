use crate::coordinator::RemovalEvent;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

const MIN_INTERVAL: Duration = Duration::from_millis(50);
const MAX_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub unit: String,
    pub step_index: usize,
    pub step_count: usize,
    pub message: String,
}

/// Rate limit for progress crossing the thread boundary.
///
/// Emits when at least 50ms passed and the integer percentage moved, or when
/// 200ms passed regardless. The first call always emits.
#[derive(Debug, Default)]
pub struct ProgressThrottle {
    last_emit: Option<Instant>,
    last_percent: Option<u64>,
}

impl ProgressThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_emit(&mut self, current: u64, total: u64) -> bool {
        self.should_emit_at(current, total, Instant::now())
    }

    pub fn should_emit_at(&mut self, current: u64, total: u64, now: Instant) -> bool {
        let percent = if total == 0 {
            100
        } else {
            current.min(total) * 100 / total
        };

        let emit = match self.last_emit {
            None => true,
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                (elapsed >= MIN_INTERVAL && self.last_percent != Some(percent))
                    || elapsed >= MAX_INTERVAL
            }
        };

        if emit {
            self.last_emit = Some(now);
            self.last_percent = Some(percent);
        }
        emit
    }
}

/// Worker-side end of the progress channel.
pub struct ProgressReporter {
    sender: Option<Sender<RemovalEvent>>,
    throttle: ProgressThrottle,
}

impl ProgressReporter {
    pub fn new(sender: Sender<RemovalEvent>) -> Self {
        Self {
            sender: Some(sender),
            throttle: ProgressThrottle::new(),
        }
    }

    pub fn silent() -> Self {
        Self {
            sender: None,
            throttle: ProgressThrottle::new(),
        }
    }

    /// Step boundaries are rare and always delivered.
    pub fn step(&mut self, unit: &str, step_index: usize, step_count: usize, message: impl Into<String>) {
        self.throttle = ProgressThrottle::new();
        self.send(ProgressEvent {
            unit: unit.to_string(),
            step_index,
            step_count,
            message: message.into(),
        });
    }

    /// Inner-loop progress; dropped unless the throttle allows it.
    pub fn tick(
        &mut self,
        unit: &str,
        step_index: usize,
        step_count: usize,
        current: u64,
        total: u64,
        message: impl FnOnce() -> String,
    ) {
        if self.throttle.should_emit(current, total) {
            self.send(ProgressEvent {
                unit: unit.to_string(),
                step_index,
                step_count,
                message: message(),
            });
        }
    }

    fn send(&mut self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            // A closed receiver means nobody is watching; the run continues.
            let _ = sender.send(RemovalEvent::Progress(event));
        }
    }
}
