//! crates/intake_scheduler_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific storage engines and runtimes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

use crate::domain::{DomainEvent, IntakeRecord, Plan};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Pull-based sequence of active plans. Consumers may stop at any point.
pub type PlanStream<'a> = Pin<Box<dyn Stream<Item = PortResult<Plan>> + Send + 'a>>;

//=========================================================================================
// Repository Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn get_by_id(&self, plan_id: Uuid) -> PortResult<Plan>;

    async fn user_plans(&self, user_id: Uuid) -> PortResult<Vec<Plan>>;

    /// Inserts a new plan.
    async fn save(&self, plan: &Plan) -> PortResult<()>;

    /// Replaces a stored plan. Fails with `NotFound` when the id is unknown.
    async fn update_plan(&self, plan: &Plan) -> PortResult<()>;

    /// Streams every `Active` plan, fetching `batch_size` at a time.
    fn active_plans(&self, batch_size: usize) -> PlanStream<'_>;
}

#[async_trait]
pub trait RecordRepository: Send + Sync {
    async fn get_by_id(&self, record_id: Uuid) -> PortResult<IntakeRecord>;

    async fn get_by_plan_id(&self, plan_id: Uuid) -> PortResult<Vec<IntakeRecord>>;

    /// Inserts or replaces a record by id.
    async fn save(&self, record: &IntakeRecord) -> PortResult<()>;

    /// Inserts records whose `(plan_id, scheduled_for)` key is not stored yet
    /// and ignores the rest, returning how many were inserted. Safe to call
    /// repeatedly with overlapping sets.
    async fn save_bulk(&self, records: &[IntakeRecord]) -> PortResult<usize>;
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Hands over events drained from aggregates after a successful save.
    async fn publish(&self, events: Vec<DomainEvent>) -> PortResult<()>;
}

/// Source of "now", injectable so generation windows can be tested.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
