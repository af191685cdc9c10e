//! crates/intake_scheduler_core/src/domain/error.rs
//!
//! Failures raised by value objects and aggregates. These never carry
//! infrastructure detail; storage problems travel as `PortError` instead.

/// Result alias used throughout the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Malformed or out-of-range input (dosage, rule text, course window, ids).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The plan is finished and can no longer be changed.
    #[error("plan is finished")]
    PlanFinished,

    /// The intake record has left the `Planned` state.
    #[error("intake record is outdated: {0}")]
    OutdatedRecord(String),

    /// The caller does not own the aggregate it is acting on.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A lifecycle transition that the aggregate does not allow.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
}
