//! Error types for aigov-decision

use thiserror::Error;

/// Errors that can occur while configuring or running the decision engine
#[derive(Debug, Error)]
pub enum DecisionError {
    /// No rule snapshot has been published yet.
    ///
    /// Evaluation must never fall back to ALLOW when this happens.
    #[error("Decision engine not configured: no rule snapshot has been published")]
    NotConfigured,

    /// A pattern definition failed to compile
    #[error("Invalid pattern '{name}': {reason}")]
    InvalidPattern { name: String, reason: String },

    /// A service set carried a role string that is not recognised
    #[error("Invalid service role: {0}")]
    InvalidServiceRole(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for decision operations
pub type Result<T> = std::result::Result<T, DecisionError>;
