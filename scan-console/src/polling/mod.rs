//! Task status polling.
//!
//! The [`PollingScheduler`] keeps one timer per tracked task id and writes each
//! fetched status into the [`EntityStateStore`], which views read for display.
//! Polling stops on its own when a task reaches a terminal status, no longer
//! exists, or the session ends.

mod fetcher;
mod policy;
mod scheduler;
mod status;
mod store;

pub use fetcher::{FetchError, StatusFetcher};
pub use policy::PollingPolicy;
pub use scheduler::{PollState, PollingHandle, PollingScheduler};
pub use status::{TaskProgress, TaskStatus};
pub use store::{EntityStateStore, TrackedEntity};
