//! End-to-end connector job tests for the search platform.
//!
//! Typed clients for the platform API and the Slack Web API, fixture
//! managers built on them, and scenarios that drive indexing, permission
//! sync and pruning through those managers.

pub mod clients;
pub mod config;
pub mod connectors;
pub mod domain;
pub mod error;
pub mod managers;
pub mod scenarios;

pub use config::{Config, WaitSettings};
pub use error::{HarnessError, HarnessResult};
