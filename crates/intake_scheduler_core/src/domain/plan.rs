//! crates/intake_scheduler_core/src/domain/plan.rs
//!
//! The plan aggregate: a user's recurring intake of one medication.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::dosage::Dosage;
use super::error::{DomainError, DomainResult};
use super::events::PlanEvent;
use super::record::{IntakeRecord, RecordStatus};
use super::schedule::Schedule;

pub const MAX_CONDITION_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Draft,
    Active,
    Finished,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "finished" => Ok(Self::Finished),
            other => Err(DomainError::validation(format!("unknown plan status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    id: Uuid,
    medication_id: Uuid,
    user_id: Uuid,
    dosage: Dosage,
    schedule: Schedule,
    condition: String,
    status: PlanStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<PlanEvent>,
}

/// Stored form of a [`Plan`], used by repository adapters.
#[derive(Debug, Clone)]
pub struct PlanSnapshot {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub user_id: Uuid,
    pub dosage: Dosage,
    pub schedule: Schedule,
    pub condition: String,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_condition(condition: &str) -> DomainResult<()> {
    if condition.chars().count() > MAX_CONDITION_CHARS {
        return Err(DomainError::validation(format!(
            "condition must be at most {MAX_CONDITION_CHARS} characters"
        )));
    }
    Ok(())
}

impl Plan {
    /// Creates a `Draft` plan. Call [`Plan::activate`] once it should start
    /// producing intakes.
    pub fn new(
        user_id: Uuid,
        medication_id: Uuid,
        dosage: Dosage,
        schedule: Schedule,
        condition: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let condition = condition.into();
        validate_condition(&condition)?;
        if user_id.is_nil() || medication_id.is_nil() {
            return Err(DomainError::validation("plan needs a user and a medication"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            medication_id,
            user_id,
            dosage,
            schedule,
            condition,
            status: PlanStatus::Draft,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        })
    }

    pub fn restore(snapshot: PlanSnapshot) -> Self {
        Self {
            id: snapshot.id,
            medication_id: snapshot.medication_id,
            user_id: snapshot.user_id,
            dosage: snapshot.dosage,
            schedule: snapshot.schedule,
            condition: snapshot.condition,
            status: snapshot.status,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            events: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> PlanSnapshot {
        PlanSnapshot {
            id: self.id,
            medication_id: self.medication_id,
            user_id: self.user_id,
            dosage: self.dosage,
            schedule: self.schedule.clone(),
            condition: self.condition.clone(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn medication_id(&self) -> Uuid {
        self.medication_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn dosage(&self) -> &Dosage {
        &self.dosage
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }

    pub fn status(&self) -> PlanStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_active(&self) -> bool {
        self.status == PlanStatus::Active
    }

    pub fn activate(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        match self.status {
            PlanStatus::Active => Ok(()),
            PlanStatus::Finished => Err(DomainError::PlanFinished),
            PlanStatus::Draft => {
                self.status = PlanStatus::Active;
                self.updated_at = now;
                self.events.push(PlanEvent::Activated {
                    plan_id: self.id,
                    user_id: self.user_id,
                    at: now,
                });
                Ok(())
            }
        }
    }

    /// Ensures the plan is finished. Finishing twice is a no-op.
    pub fn deactivate(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        match self.status {
            PlanStatus::Finished => Ok(()),
            PlanStatus::Draft => Err(DomainError::invariant("a draft plan cannot be finished")),
            PlanStatus::Active => {
                self.status = PlanStatus::Finished;
                self.updated_at = now;
                self.events.push(PlanEvent::Finished {
                    plan_id: self.id,
                    at: now,
                });
                Ok(())
            }
        }
    }

    pub fn change_dosage(&mut self, dosage: Dosage, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_not_finished()?;
        self.dosage = dosage;
        self.updated_at = now;
        self.events.push(PlanEvent::DosageChanged {
            plan_id: self.id,
            dosage,
            at: now,
        });
        Ok(())
    }

    pub fn change_schedule(&mut self, schedule: Schedule, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_not_finished()?;
        self.events.push(PlanEvent::ScheduleChanged {
            plan_id: self.id,
            course_start: schedule.course_start(),
            course_end: schedule.course_end(),
            at: now,
        });
        self.schedule = schedule;
        self.updated_at = now;
        Ok(())
    }

    pub fn change_condition(
        &mut self,
        condition: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_not_finished()?;
        let condition = condition.into();
        validate_condition(&condition)?;
        self.condition = condition;
        self.updated_at = now;
        self.events.push(PlanEvent::ConditionChanged {
            plan_id: self.id,
            at: now,
        });
        Ok(())
    }

    /// Occurrences of an active plan in `(from, to]`. Any other status has none.
    pub fn occurrences(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        if !self.is_active() {
            return Vec::new();
        }
        self.schedule.occurrences(from, to)
    }

    /// A record the current schedule no longer produces: still `Planned`, never
    /// moved, and its slot is not an occurrence after a schedule change.
    pub fn supersedes(&self, record: &IntakeRecord) -> bool {
        record.plan_id() == self.id
            && record.status() == RecordStatus::Planned
            && record.planned_at() == record.scheduled_for()
            && !self.schedule.contains(record.scheduled_for())
    }

    /// Builds one fresh `Planned` record per occurrence in `(from, to]`.
    ///
    /// Pure with respect to storage: existing records are not consulted.
    /// Either every record is built or the call fails with none.
    pub fn generate_intake_records(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<IntakeRecord>> {
        self.occurrences(from, to)
            .into_iter()
            .map(|occurrence| IntakeRecord::planned(self.id, occurrence, now))
            .collect()
    }

    pub fn take_events(&mut self) -> Vec<PlanEvent> {
        std::mem::take(&mut self.events)
    }

    fn ensure_not_finished(&self) -> DomainResult<()> {
        if self.status == PlanStatus::Finished {
            return Err(DomainError::PlanFinished);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dosage::DosageUnit;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn active_plan() -> Plan {
        let schedule = Schedule::parse(
            at("2024-01-01T00:00:00Z"),
            at("2024-01-10T23:59:59Z"),
            &["FREQ=DAILY;BYHOUR=9,19"],
        )
        .unwrap();
        let now = at("2024-01-01T00:00:00Z");
        let mut plan = Plan::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Dosage::new(2.0, DosageUnit::Pcs).unwrap(),
            schedule,
            "after meals",
            now,
        )
        .unwrap();
        plan.activate(now).unwrap();
        plan
    }

    #[test]
    fn schedule_change_supersedes_untouched_planned_records() {
        let mut plan = active_plan();
        let now = at("2024-01-05T00:00:00Z");
        let records = plan
            .generate_intake_records(now, at("2024-01-05T23:00:00Z"), now)
            .unwrap();
        assert_eq!(records.len(), 2);
        let (mut morning, mut evening) = (records[0].clone(), records[1].clone());
        assert!(!plan.supersedes(&morning));

        let schedule = Schedule::parse(
            at("2024-01-01T00:00:00Z"),
            at("2024-01-10T23:59:59Z"),
            &["FREQ=DAILY;BYHOUR=9,21"],
        )
        .unwrap();
        plan.change_schedule(schedule, now).unwrap();
        assert!(!plan.supersedes(&morning));
        assert!(plan.supersedes(&evening));

        // Anything the user already acted on stays.
        evening.mark_taken(at("2024-01-05T19:05:00Z"), now);
        assert!(!plan.supersedes(&evening));
        morning.reschedule(at("2024-01-05T10:00:00Z"), now).unwrap();
        assert!(!plan.supersedes(&morning));
    }

    #[test]
    fn long_conditions_are_rejected() {
        let mut plan = active_plan();
        let long = "x".repeat(MAX_CONDITION_CHARS + 1);
        assert!(matches!(
            plan.change_condition(long, Utc::now()),
            Err(DomainError::Validation(_))
        ));
        plan.change_condition("y".repeat(MAX_CONDITION_CHARS), Utc::now()).unwrap();
    }

    #[test]
    fn finished_plans_reject_changes() {
        let mut plan = active_plan();
        let now = at("2024-01-03T00:00:00Z");
        plan.deactivate(now).unwrap();
        assert_eq!(plan.status(), PlanStatus::Finished);

        let dosage = Dosage::new(1.0, DosageUnit::Mg).unwrap();
        assert_eq!(plan.change_dosage(dosage, now), Err(DomainError::PlanFinished));
        let schedule = plan.schedule().clone();
        assert_eq!(plan.change_schedule(schedule, now), Err(DomainError::PlanFinished));
        assert_eq!(plan.activate(now), Err(DomainError::PlanFinished));
    }

    #[test]
    fn deactivate_is_idempotent() {
        let mut plan = active_plan();
        let now = at("2024-01-03T00:00:00Z");
        plan.deactivate(now).unwrap();
        plan.deactivate(now + chrono::Duration::hours(1)).unwrap();
        assert_eq!(plan.updated_at(), now);
        let finished = plan
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, PlanEvent::Finished { .. }))
            .count();
        assert_eq!(finished, 1);
    }

    #[test]
    fn draft_plans_cannot_be_finished_or_generate() {
        let mut plan = active_plan();
        plan.status = PlanStatus::Draft;
        assert!(plan.deactivate(Utc::now()).is_err());
        assert!(plan
            .occurrences(at("2024-01-01T00:00:00Z"), at("2024-01-03T00:00:00Z"))
            .is_empty());
    }

    #[test]
    fn generates_planned_records_for_each_occurrence() {
        let plan = active_plan();
        let now = at("2024-01-02T10:00:00Z");
        let records = plan
            .generate_intake_records(now, at("2024-01-03T12:00:00Z"), now)
            .unwrap();
        let planned: Vec<_> = records.iter().map(|r| r.planned_at()).collect();
        assert_eq!(
            planned,
            vec![
                at("2024-01-02T19:00:00Z"),
                at("2024-01-03T09:00:00Z"),
            ]
        );
        assert!(records
            .iter()
            .all(|r| r.plan_id() == plan.id() && r.status() == RecordStatus::Planned));
        assert_ne!(records[0].id(), records[1].id());
    }

    #[test]
    fn changing_dosage_keeps_identity() {
        let mut plan = active_plan();
        let id = plan.id();
        let dosage = Dosage::new(5.0, DosageUnit::Ml).unwrap();
        plan.change_dosage(dosage, Utc::now()).unwrap();
        assert_eq!(plan.id(), id);
        assert_eq!(plan.dosage(), &dosage);
    }
}
