//! # aigov-decision-api
//!
//! HTTP service and CLI around the `aigov-decision` engine.
//!
//! The service owns one [`aigov_decision::SnapshotStore`], evaluates
//! requests against its current snapshot, and records every decision in a
//! bounded in-memory log fed by a broadcast bus. Administrators replace
//! the policy and manage overrides over the same API; each write publishes
//! a new snapshot without blocking evaluations in flight.
//!
//! ## Modules
//!
//! - [`api`]: router assembly, `/health` and `/evaluate`
//! - [`content`]: scan and redact endpoints
//! - [`policy`]: policy and override administration
//! - [`audit`]: decision log, event bus, and query endpoints
//! - [`config`]: HCL/JSON configuration
//! - [`bootstrap`]: config discovery and server startup

pub mod api;
pub mod audit;
pub mod bootstrap;
pub mod config;
pub mod content;
pub mod error;
pub mod policy;

pub use config::DecisionApiConfig;
pub use error::ApiError;
