//! Request orchestration for the scan console.
//!
//! Every API call goes through a [`RequestClient`], which survives access token
//! expiry through a single-flight [`RefreshCoordinator`]. Background task
//! monitoring runs on the [`PollingScheduler`].

pub mod api;
pub mod client;
pub mod config;
pub mod console;
pub mod credentials;
pub mod error;
pub mod http;
pub mod logging;
pub mod polling;
pub mod transport;

pub use client::RequestClient;
pub use config::ConsoleConfig;
pub use console::Console;
pub use credentials::RefreshCoordinator;
pub use error::{Error, Result};
pub use polling::PollingScheduler;
