//! Decision audit pipeline: in-memory log, event bus, and query API.

pub mod bus;
pub mod handler;
pub mod log;

pub use bus::AuditEventBus;
pub use handler::{audit_router, AuditState};
pub use log::{DecisionFilter, DecisionLog, DecisionSummary, ServiceUsage};
