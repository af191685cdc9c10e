//! crates/intake_scheduler_core/src/services/projection.rs
//!
//! Read side: a user's schedule between two instants, built from stored
//! records plus occurrences computed on the fly for what is not stored yet.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::{IntakeRecord, Plan, RecordStatus};
use crate::ports::{Clock, PlanRepository, RecordRepository};
use crate::services::dto::ScheduleEntry;
use crate::services::error::ServiceResult;

pub struct ScheduleProjection {
    plans: Arc<dyn PlanRepository>,
    records: Arc<dyn RecordRepository>,
    clock: Arc<dyn Clock>,
}

impl ScheduleProjection {
    pub fn new(
        plans: Arc<dyn PlanRepository>,
        records: Arc<dyn RecordRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            plans,
            records,
            clock,
        }
    }

    /// Entries in `[from, to]` for every plan the user owns, sorted by
    /// `planned_at`.
    ///
    /// Stored records keep their real status, except untouched `Planned` ones a
    /// schedule change left behind, which are dropped. Occurrences from
    /// `max(from, now)` onwards that have no stored record are added as
    /// `Planned` without an id.
    pub async fn show_schedule(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ServiceResult<Vec<ScheduleEntry>> {
        if from > to {
            return Ok(Vec::new());
        }
        let now = self.clock.now();
        let mut entries = Vec::new();

        for plan in self.plans.user_plans(user_id).await? {
            let stored: Vec<IntakeRecord> = self
                .records
                .get_by_plan_id(plan.id())
                .await?
                .into_iter()
                .filter(|r| !plan.supersedes(r))
                .collect();
            let known: HashSet<DateTime<Utc>> =
                stored.iter().map(IntakeRecord::scheduled_for).collect();

            entries.extend(
                stored
                    .iter()
                    .filter(|r| r.planned_at() >= from && r.planned_at() <= to)
                    .map(|r| stored_entry(&plan, r)),
            );

            // Occurrences are computed over (start, to]; starting one nanosecond
            // early keeps an occurrence at exactly `from` in range.
            let start = if from > now {
                from - Duration::nanoseconds(1)
            } else {
                now
            };
            entries.extend(
                plan.occurrences(start, to)
                    .into_iter()
                    .filter(|at| !known.contains(at))
                    .map(|at| computed_entry(&plan, at)),
            );
        }

        entries.sort_by_key(|e| e.planned_at);
        Ok(entries)
    }
}

fn stored_entry(plan: &Plan, record: &IntakeRecord) -> ScheduleEntry {
    ScheduleEntry {
        record_id: Some(record.id()),
        plan_id: plan.id(),
        medication_id: plan.medication_id(),
        dosage_value: plan.dosage().value(),
        dosage_unit: plan.dosage().unit(),
        planned_at: record.planned_at(),
        status: record.status(),
        taken_at: record.taken_at(),
    }
}

fn computed_entry(plan: &Plan, at: DateTime<Utc>) -> ScheduleEntry {
    ScheduleEntry {
        record_id: None,
        plan_id: plan.id(),
        medication_id: plan.medication_id(),
        dosage_value: plan.dosage().value(),
        dosage_unit: plan.dosage().unit(),
        planned_at: at,
        status: RecordStatus::Planned,
        taken_at: None,
    }
}
