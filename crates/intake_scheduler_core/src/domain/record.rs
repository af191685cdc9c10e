//! crates/intake_scheduler_core/src/domain/record.rs
//!
//! A single materialised occurrence of a plan and its completion status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::error::{DomainError, DomainResult};
use super::events::RecordEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Planned,
    Taken,
    Missed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Taken => "taken",
            Self::Missed => "missed",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planned" => Ok(Self::Planned),
            "taken" => Ok(Self::Taken),
            "missed" => Ok(Self::Missed),
            other => Err(DomainError::validation(format!("unknown record status '{other}'"))),
        }
    }
}

/// Materialised intake occurrence.
///
/// `scheduled_for` is the occurrence the record was generated from and never
/// changes; together with `plan_id` it is the idempotency key used by bulk
/// saves. `planned_at` starts equal to it and moves on reschedule.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeRecord {
    id: Uuid,
    plan_id: Uuid,
    status: RecordStatus,
    scheduled_for: DateTime<Utc>,
    planned_at: DateTime<Utc>,
    taken_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<RecordEvent>,
}

/// Stored form of an [`IntakeRecord`], used by repository adapters.
#[derive(Debug, Clone)]
pub struct IntakeRecordSnapshot {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub status: RecordStatus,
    pub scheduled_for: DateTime<Utc>,
    pub planned_at: DateTime<Utc>,
    pub taken_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IntakeRecord {
    /// A fresh `Planned` record for one occurrence of a plan.
    pub fn planned(
        plan_id: Uuid,
        occurrence: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if plan_id.is_nil() {
            return Err(DomainError::validation("intake record needs a plan id"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            plan_id,
            status: RecordStatus::Planned,
            scheduled_for: occurrence,
            planned_at: occurrence,
            taken_at: None,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        })
    }

    pub fn restore(snapshot: IntakeRecordSnapshot) -> Self {
        Self {
            id: snapshot.id,
            plan_id: snapshot.plan_id,
            status: snapshot.status,
            scheduled_for: snapshot.scheduled_for,
            planned_at: snapshot.planned_at,
            taken_at: snapshot.taken_at,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            events: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> IntakeRecordSnapshot {
        IntakeRecordSnapshot {
            id: self.id,
            plan_id: self.plan_id,
            status: self.status,
            scheduled_for: self.scheduled_for,
            planned_at: self.planned_at,
            taken_at: self.taken_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn plan_id(&self) -> Uuid {
        self.plan_id
    }

    pub fn status(&self) -> RecordStatus {
        self.status
    }

    pub fn scheduled_for(&self) -> DateTime<Utc> {
        self.scheduled_for
    }

    pub fn planned_at(&self) -> DateTime<Utc> {
        self.planned_at
    }

    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        self.taken_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Idempotency key for bulk upserts.
    pub fn occurrence_key(&self) -> (Uuid, DateTime<Utc>) {
        (self.plan_id, self.scheduled_for)
    }

    /// Records an intake at `at`. Allowed from every state, so it also serves
    /// late logging of a missed dose and correction of an earlier take time.
    pub fn mark_taken(&mut self, at: DateTime<Utc>, now: DateTime<Utc>) {
        self.status = RecordStatus::Taken;
        self.taken_at = Some(at);
        self.updated_at = now;
        self.events.push(RecordEvent::Taken {
            record_id: self.id,
            plan_id: self.plan_id,
            taken_at: at,
        });
    }

    /// Undoes a take: back to `Planned`, and `taken_at` is cleared.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != RecordStatus::Taken {
            return Err(DomainError::OutdatedRecord(format!(
                "only a taken record can be cancelled, record {} is {}",
                self.id, self.status
            )));
        }
        self.status = RecordStatus::Planned;
        self.taken_at = None;
        self.updated_at = now;
        self.events.push(RecordEvent::TakeCancelled {
            record_id: self.id,
            plan_id: self.plan_id,
            at: now,
        });
        Ok(())
    }

    /// Moves a still-planned intake to a later instant.
    pub fn reschedule(&mut self, to: DateTime<Utc>, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != RecordStatus::Planned {
            return Err(DomainError::OutdatedRecord(format!(
                "record {} is {} and can no longer be rescheduled",
                self.id, self.status
            )));
        }
        if to <= self.planned_at {
            return Err(DomainError::validation(
                "an intake can only be rescheduled to a later time",
            ));
        }
        let from = self.planned_at;
        self.planned_at = to;
        self.updated_at = now;
        self.events.push(RecordEvent::Rescheduled {
            record_id: self.id,
            plan_id: self.plan_id,
            from,
            to,
        });
        Ok(())
    }

    /// Used by reconciliation once a planned intake has gone unrecorded.
    pub fn mark_missed(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != RecordStatus::Planned {
            return Err(DomainError::OutdatedRecord(format!(
                "record {} is {} and cannot be marked missed",
                self.id, self.status
            )));
        }
        self.status = RecordStatus::Missed;
        self.updated_at = now;
        self.events.push(RecordEvent::Missed {
            record_id: self.id,
            plan_id: self.plan_id,
            at: now,
        });
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<RecordEvent> {
        std::mem::take(&mut self.events)
    }
}
