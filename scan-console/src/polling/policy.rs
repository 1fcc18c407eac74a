use std::time::Duration;

use super::status::TaskStatus;

/// Poll cadence for a tracked task, chosen by its status at poll start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingPolicy {
    /// Interval while the task is running.
    pub running_interval: Duration,
    /// Interval for every other status.
    pub idle_interval: Duration,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self {
            running_interval: Duration::from_secs(1),
            idle_interval: Duration::from_secs(5),
        }
    }
}

impl PollingPolicy {
    pub fn interval_for(&self, status: TaskStatus) -> Duration {
        match status {
            TaskStatus::Running => self.running_interval,
            _ => self.idle_interval,
        }
    }
}
