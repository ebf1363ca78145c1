use log::{debug, warn};
use std::time::{Duration, Instant};

/// Logs how long a scope took when dropped; warns past an optional budget.
pub struct FunctionTimer {
    name: &'static str,
    start: Instant,
    budget: Option<Duration>,
}

impl FunctionTimer {
    pub fn new(name: &'static str) -> Self {
        FunctionTimer {
            name,
            start: Instant::now(),
            budget: None,
        }
    }

    /// Warn instead of debug when the scope outlives `budget`
    pub fn with_budget(name: &'static str, budget: Duration) -> Self {
        FunctionTimer {
            name,
            start: Instant::now(),
            budget: Some(budget),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn over_budget(&self) -> bool {
        self.budget.is_some_and(|budget| self.elapsed() > budget)
    }
}

// This `Drop` implementation is called automatically when the `FunctionTimer` struct goes out of scope.
impl Drop for FunctionTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        match self.budget {
            Some(budget) if duration > budget => {
                warn!("'{}' took {:?}, longer than its {:?} interval", self.name, duration, budget)
            }
            _ => debug!("'{}' took: {:?}", self.name, duration),
        }
    }
}
