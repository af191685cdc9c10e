//! crates/intake_scheduler_core/src/domain/events.rs
//!
//! Domain events appended by the aggregates on every mutation. Use cases drain
//! them after a successful save and hand them to an `EventPublisher`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::dosage::Dosage;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanEvent {
    Activated { plan_id: Uuid, user_id: Uuid, at: DateTime<Utc> },
    DosageChanged { plan_id: Uuid, dosage: Dosage, at: DateTime<Utc> },
    ScheduleChanged {
        plan_id: Uuid,
        course_start: DateTime<Utc>,
        course_end: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    ConditionChanged { plan_id: Uuid, at: DateTime<Utc> },
    Finished { plan_id: Uuid, at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordEvent {
    Taken { record_id: Uuid, plan_id: Uuid, taken_at: DateTime<Utc> },
    TakeCancelled { record_id: Uuid, plan_id: Uuid, at: DateTime<Utc> },
    Rescheduled {
        record_id: Uuid,
        plan_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    Missed { record_id: Uuid, plan_id: Uuid, at: DateTime<Utc> },
}

/// Either kind of event, as seen by a publisher.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Plan(PlanEvent),
    Record(RecordEvent),
}

impl From<PlanEvent> for DomainEvent {
    fn from(event: PlanEvent) -> Self {
        Self::Plan(event)
    }
}

impl From<RecordEvent> for DomainEvent {
    fn from(event: RecordEvent) -> Self {
        Self::Record(event)
    }
}
