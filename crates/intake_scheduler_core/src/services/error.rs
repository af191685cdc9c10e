//! crates/intake_scheduler_core/src/services/error.rs
//!
//! The error returned at the use-case boundary, and its coarse classification
//! for whichever outer layer maps it to a transport status.

use crate::domain::DomainError;
use crate::ports::PortError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input. Never retried.
    BadRequest,
    /// A domain rule refused the operation. Never retried.
    Forbidden,
    NotFound,
    /// Storage or other infrastructure failure.
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Port(#[from] PortError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(DomainError::Validation(_)) => ErrorKind::BadRequest,
            Self::Domain(
                DomainError::PlanFinished
                | DomainError::OutdatedRecord(_)
                | DomainError::Forbidden(_)
                | DomainError::InvariantViolation(_),
            ) => ErrorKind::Forbidden,
            Self::Port(PortError::NotFound(_)) => ErrorKind::NotFound,
            Self::Port(PortError::Unexpected(_)) => ErrorKind::Internal,
        }
    }
}
