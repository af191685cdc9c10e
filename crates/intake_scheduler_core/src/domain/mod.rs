//! crates/intake_scheduler_core/src/domain/mod.rs
//!
//! Defines the pure, core data structures for the application.
//! These types are independent of any database or serialization format.

pub mod dosage;
pub mod error;
pub mod events;
pub mod plan;
pub mod record;
pub mod rule;
pub mod schedule;

pub use dosage::{Dosage, DosageUnit};
pub use error::{DomainError, DomainResult};
pub use events::{DomainEvent, PlanEvent, RecordEvent};
pub use plan::{Plan, PlanSnapshot, PlanStatus, MAX_CONDITION_CHARS};
pub use record::{IntakeRecord, IntakeRecordSnapshot, RecordStatus};
pub use rule::{BoundRule, Frequency, RecurrenceRule, WeekdaySpec};
pub use schedule::Schedule;
