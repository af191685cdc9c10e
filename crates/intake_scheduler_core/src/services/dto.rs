//! crates/intake_scheduler_core/src/services/dto.rs
//!
//! Plain request and response shapes exchanged with the outer layer.
//! Requests carry already-authenticated primitives: ids as UUID strings,
//! timestamps as RFC 3339 strings, rules as RRULE text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    DomainError, DomainResult, Dosage, DosageUnit, IntakeRecord, Plan, PlanStatus, RecordStatus,
    Schedule,
};

//=========================================================================================
// Requests
//=========================================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DosageInput {
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleInput {
    pub course_start: String,
    pub course_end: String,
    pub rules: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddPlanRequest {
    pub user_id: String,
    pub medication_id: String,
    pub dosage: DosageInput,
    pub schedule: ScheduleInput,
    #[serde(default)]
    pub condition: String,
}

/// Partial update; absent fields stay as they are.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePlanRequest {
    pub user_id: String,
    pub plan_id: String,
    pub dosage: Option<DosageInput>,
    pub schedule: Option<ScheduleInput>,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TakeMedicationRequest {
    pub user_id: String,
    pub record_id: String,
    /// Defaults to the current time when absent.
    pub taken_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeTakeRequest {
    pub user_id: String,
    pub record_id: String,
    pub taken_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleRequest {
    pub user_id: String,
    pub record_id: String,
    pub planned_at: String,
}

impl DosageInput {
    pub fn to_domain(&self) -> DomainResult<Dosage> {
        Dosage::parse(self.value, &self.unit)
    }
}

impl ScheduleInput {
    pub fn to_domain(&self) -> DomainResult<Schedule> {
        let start = parse_time("course_start", &self.course_start)?;
        let end = parse_time("course_end", &self.course_end)?;
        Schedule::parse(start, end, &self.rules)
    }
}

pub fn parse_id(field: &str, value: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|e| DomainError::validation(format!("{field} is not a valid UUID: {e}")))
}

pub fn parse_time(field: &str, value: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DomainError::validation(format!("{field} is not an RFC 3339 timestamp: {e}")))
}

//=========================================================================================
// Responses
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub medication_id: Uuid,
    pub dosage_value: f64,
    pub dosage_unit: DosageUnit,
    pub course_start: DateTime<Utc>,
    pub course_end: DateTime<Utc>,
    pub rules: Vec<String>,
    pub condition: String,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Plan> for PlanView {
    fn from(plan: &Plan) -> Self {
        Self {
            id: plan.id(),
            user_id: plan.user_id(),
            medication_id: plan.medication_id(),
            dosage_value: plan.dosage().value(),
            dosage_unit: plan.dosage().unit(),
            course_start: plan.schedule().course_start(),
            course_end: plan.schedule().course_end(),
            rules: plan.schedule().rule_texts(),
            condition: plan.condition().to_string(),
            status: plan.status(),
            created_at: plan.created_at(),
            updated_at: plan.updated_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntakeRecordView {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub status: RecordStatus,
    pub planned_at: DateTime<Utc>,
    pub taken_at: Option<DateTime<Utc>>,
}

impl From<&IntakeRecord> for IntakeRecordView {
    fn from(record: &IntakeRecord) -> Self {
        Self {
            id: record.id(),
            plan_id: record.plan_id(),
            status: record.status(),
            planned_at: record.planned_at(),
            taken_at: record.taken_at(),
        }
    }
}

/// One line of a user's schedule. `record_id` is `None` for occurrences that
/// have not been materialised yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleEntry {
    pub record_id: Option<Uuid>,
    pub plan_id: Uuid,
    pub medication_id: Uuid,
    pub dosage_value: f64,
    pub dosage_unit: DosageUnit,
    pub planned_at: DateTime<Utc>,
    pub status: RecordStatus,
    pub taken_at: Option<DateTime<Utc>>,
}
