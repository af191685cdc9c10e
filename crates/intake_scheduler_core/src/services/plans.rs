//! crates/intake_scheduler_core/src/services/plans.rs
//!
//! Use cases consumed by the outer (HTTP) layer: plan management, intake
//! tracking and the schedule view.

use std::sync::Arc;

use chrono::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{DomainError, DomainEvent, IntakeRecord, Plan, PlanStatus, RecordStatus};
use crate::ports::{Clock, EventPublisher, PlanRepository, RecordRepository};
use crate::services::dto::{
    parse_id, parse_time, AddPlanRequest, ChangeTakeRequest, IntakeRecordView, PlanView,
    RescheduleRequest, ScheduleEntry, TakeMedicationRequest, UpdatePlanRequest,
};
use crate::services::error::ServiceResult;
use crate::services::generation::GenerationService;
use crate::services::projection::ScheduleProjection;

pub struct PlanService {
    plans: Arc<dyn PlanRepository>,
    records: Arc<dyn RecordRepository>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    generation: Arc<GenerationService>,
    projection: ScheduleProjection,
    creation_shift: Duration,
}

impl PlanService {
    pub fn new(
        plans: Arc<dyn PlanRepository>,
        records: Arc<dyn RecordRepository>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        generation: Arc<GenerationService>,
        creation_shift: Duration,
    ) -> Self {
        let projection = ScheduleProjection::new(plans.clone(), records.clone(), clock.clone());
        Self {
            plans,
            records,
            events,
            clock,
            generation,
            projection,
            creation_shift,
        }
    }

    //=====================================================================================
    // Plans
    //=====================================================================================

    /// Validates the input, stores an `Active` plan and materialises its
    /// occurrences for today right away.
    pub async fn add_plan(&self, request: AddPlanRequest) -> ServiceResult<PlanView> {
        let user_id = parse_id("user_id", &request.user_id)?;
        let medication_id = parse_id("medication_id", &request.medication_id)?;
        let dosage = request.dosage.to_domain()?;
        let schedule = request.schedule.to_domain()?;
        let now = self.clock.now();

        let mut plan = Plan::new(user_id, medication_id, dosage, schedule, request.condition, now)?;
        plan.activate(now)?;
        self.plans.save(&plan).await?;
        self.flush_plan_events(&mut plan).await;
        info!(plan_id = %plan.id(), %user_id, "Plan created.");

        // The daemon picks the plan up on its next tick if this fails.
        if let Err(e) = self
            .generation
            .generate_for_plan(plan.id(), self.creation_shift)
            .await
        {
            warn!(plan_id = %plan.id(), "Catch-up generation failed: {}", e);
        }
        Ok(PlanView::from(&plan))
    }

    pub async fn update_plan(&self, request: UpdatePlanRequest) -> ServiceResult<PlanView> {
        let user_id = parse_id("user_id", &request.user_id)?;
        let plan_id = parse_id("plan_id", &request.plan_id)?;
        let dosage = request.dosage.as_ref().map(|d| d.to_domain()).transpose()?;
        let schedule = request.schedule.as_ref().map(|s| s.to_domain()).transpose()?;

        let mut plan = self.owned_plan(user_id, plan_id).await?;
        if plan.status() == PlanStatus::Finished {
            return Err(DomainError::PlanFinished.into());
        }
        let now = self.clock.now();
        let schedule_changed = schedule.is_some();
        if let Some(dosage) = dosage {
            plan.change_dosage(dosage, now)?;
        }
        if let Some(schedule) = schedule {
            plan.change_schedule(schedule, now)?;
        }
        if let Some(condition) = request.condition {
            plan.change_condition(condition, now)?;
        }

        self.plans.update_plan(&plan).await?;
        self.flush_plan_events(&mut plan).await;

        if schedule_changed {
            if let Err(e) = self
                .generation
                .generate_for_plan(plan.id(), self.creation_shift)
                .await
            {
                warn!(plan_id = %plan.id(), "Catch-up generation failed: {}", e);
            }
        }
        Ok(PlanView::from(&plan))
    }

    pub async fn get_plan(&self, user_id: &str, plan_id: &str) -> ServiceResult<PlanView> {
        let user_id = parse_id("user_id", user_id)?;
        let plan_id = parse_id("plan_id", plan_id)?;
        let plan = self.owned_plan(user_id, plan_id).await?;
        Ok(PlanView::from(&plan))
    }

    pub async fn get_all_plans(&self, user_id: &str) -> ServiceResult<Vec<PlanView>> {
        let user_id = parse_id("user_id", user_id)?;
        let plans = self.plans.user_plans(user_id).await?;
        Ok(plans.iter().map(PlanView::from).collect())
    }

    /// Finishes a plan. Finishing an already finished plan succeeds.
    pub async fn finish_plan(&self, user_id: &str, plan_id: &str) -> ServiceResult<PlanView> {
        let user_id = parse_id("user_id", user_id)?;
        let plan_id = parse_id("plan_id", plan_id)?;
        let mut plan = self.owned_plan(user_id, plan_id).await?;
        let was_active = plan.is_active();

        plan.deactivate(self.clock.now())?;
        if was_active {
            self.plans.update_plan(&plan).await?;
            self.flush_plan_events(&mut plan).await;
            info!(%plan_id, "Plan finished.");
        }
        Ok(PlanView::from(&plan))
    }

    //=====================================================================================
    // Intake tracking
    //=====================================================================================

    pub async fn take_medication(
        &self,
        request: TakeMedicationRequest,
    ) -> ServiceResult<IntakeRecordView> {
        let user_id = parse_id("user_id", &request.user_id)?;
        let record_id = parse_id("record_id", &request.record_id)?;
        let now = self.clock.now();
        let taken_at = match request.taken_at.as_deref() {
            Some(t) => parse_time("taken_at", t)?,
            None => now,
        };

        let mut record = self.owned_record(user_id, record_id).await?;
        record.mark_taken(taken_at, now);
        self.save_record(&mut record).await
    }

    /// Corrects the time of an intake that was already recorded as taken.
    pub async fn change_take_medication(
        &self,
        request: ChangeTakeRequest,
    ) -> ServiceResult<IntakeRecordView> {
        let user_id = parse_id("user_id", &request.user_id)?;
        let record_id = parse_id("record_id", &request.record_id)?;
        let taken_at = parse_time("taken_at", &request.taken_at)?;

        let mut record = self.owned_record(user_id, record_id).await?;
        if record.status() != RecordStatus::Taken {
            return Err(DomainError::OutdatedRecord(format!(
                "record {record_id} has not been taken yet"
            ))
            .into());
        }
        record.mark_taken(taken_at, self.clock.now());
        self.save_record(&mut record).await
    }

    pub async fn cancel_medication_take(
        &self,
        user_id: &str,
        record_id: &str,
    ) -> ServiceResult<IntakeRecordView> {
        let user_id = parse_id("user_id", user_id)?;
        let record_id = parse_id("record_id", record_id)?;

        let mut record = self.owned_record(user_id, record_id).await?;
        record.cancel(self.clock.now())?;
        self.save_record(&mut record).await
    }

    pub async fn reschedule_intake(
        &self,
        request: RescheduleRequest,
    ) -> ServiceResult<IntakeRecordView> {
        let user_id = parse_id("user_id", &request.user_id)?;
        let record_id = parse_id("record_id", &request.record_id)?;
        let planned_at = parse_time("planned_at", &request.planned_at)?;

        let mut record = self.owned_record(user_id, record_id).await?;
        record.reschedule(planned_at, self.clock.now())?;
        self.save_record(&mut record).await
    }

    pub async fn show_schedule(
        &self,
        user_id: &str,
        from: &str,
        to: &str,
    ) -> ServiceResult<Vec<ScheduleEntry>> {
        let user_id = parse_id("user_id", user_id)?;
        let from = parse_time("from", from)?;
        let to = parse_time("to", to)?;
        self.projection.show_schedule(user_id, from, to).await
    }

    //=====================================================================================
    // Helpers
    //=====================================================================================

    async fn owned_plan(&self, user_id: Uuid, plan_id: Uuid) -> ServiceResult<Plan> {
        let plan = self.plans.get_by_id(plan_id).await?;
        if plan.user_id() != user_id {
            return Err(
                DomainError::forbidden(format!("plan {plan_id} belongs to another user")).into(),
            );
        }
        Ok(plan)
    }

    async fn owned_record(&self, user_id: Uuid, record_id: Uuid) -> ServiceResult<IntakeRecord> {
        let record = self.records.get_by_id(record_id).await?;
        let plan = self.plans.get_by_id(record.plan_id()).await?;
        if plan.user_id() != user_id {
            return Err(DomainError::forbidden(format!(
                "record {record_id} belongs to another user's plan"
            ))
            .into());
        }
        if plan.supersedes(&record) {
            return Err(DomainError::OutdatedRecord(format!(
                "record {record_id} is no longer part of the plan's schedule"
            ))
            .into());
        }
        Ok(record)
    }

    async fn save_record(&self, record: &mut IntakeRecord) -> ServiceResult<IntakeRecordView> {
        self.records.save(record).await?;
        let events = record.take_events().into_iter().map(DomainEvent::from).collect();
        self.publish(events).await;
        Ok(IntakeRecordView::from(&*record))
    }

    async fn flush_plan_events(&self, plan: &mut Plan) {
        let events = plan.take_events().into_iter().map(DomainEvent::from).collect();
        self.publish(events).await;
    }

    /// Events go out after the aggregate is stored; a failed publish is
    /// logged and does not undo the save.
    async fn publish(&self, events: Vec<DomainEvent>) {
        if events.is_empty() {
            return;
        }
        if let Err(e) = self.events.publish(events).await {
            warn!("Failed to publish domain events: {}", e);
        }
    }
}
