//! Shared fixtures: in-memory stores, a settable clock and a publisher that
//! keeps what it receives.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use intake_scheduler_core::domain::{DomainEvent, Dosage, DosageUnit, Plan, Schedule};
use intake_scheduler_core::ports::{Clock, EventPublisher, PlanRepository, PortResult};
use intake_scheduler_core::services::dto::{AddPlanRequest, DosageInput, ScheduleInput};
use intake_scheduler_core::services::{GenerationService, PlanService};
use scheduler_lib::adapters::{InMemoryPlanRepository, InMemoryRecordRepository};
use uuid::Uuid;

pub const COURSE_START: &str = "2024-01-01T00:00:00Z";
pub const COURSE_END: &str = "2024-01-10T23:59:59Z";
pub const TWICE_DAILY: &str = "FREQ=DAILY;BYHOUR=8,20;BYMINUTE=0;BYSECOND=0";

pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) -> PortResult<()> {
        self.events.lock().unwrap().extend(events);
        Ok(())
    }
}

pub struct Harness {
    pub plans: Arc<InMemoryPlanRepository>,
    pub records: Arc<InMemoryRecordRepository>,
    pub clock: Arc<FixedClock>,
    pub publisher: Arc<RecordingPublisher>,
    pub generation: Arc<GenerationService>,
    pub service: PlanService,
}

pub fn harness(now: &str) -> Harness {
    let plans = InMemoryPlanRepository::arc();
    let records = InMemoryRecordRepository::arc();
    let clock = Arc::new(FixedClock::new(at(now)));
    let publisher = Arc::new(RecordingPublisher::default());
    let generation = Arc::new(GenerationService::new(
        plans.clone(),
        records.clone(),
        clock.clone(),
    ));
    let service = PlanService::new(
        plans.clone(),
        records.clone(),
        publisher.clone(),
        clock.clone(),
        generation.clone(),
        Duration::hours(24),
    );
    Harness {
        plans,
        records,
        clock,
        publisher,
        generation,
        service,
    }
}

pub fn add_request(user_id: Uuid, rules: &[&str]) -> AddPlanRequest {
    AddPlanRequest {
        user_id: user_id.to_string(),
        medication_id: Uuid::new_v4().to_string(),
        dosage: DosageInput {
            value: 500.0,
            unit: "mg".to_string(),
        },
        schedule: ScheduleInput {
            course_start: COURSE_START.to_string(),
            course_end: COURSE_END.to_string(),
            rules: rules.iter().map(|r| r.to_string()).collect(),
        },
        condition: "after meals".to_string(),
    }
}

/// Stores an active plan directly, without materialising anything.
pub async fn seed_plan(
    plans: &InMemoryPlanRepository,
    course: (&str, &str),
    rules: &[&str],
) -> Plan {
    let now = at(COURSE_START);
    let schedule = Schedule::parse(at(course.0), at(course.1), rules).unwrap();
    let dosage = Dosage::new(1.0, DosageUnit::Pcs).unwrap();
    let mut plan = Plan::new(Uuid::new_v4(), Uuid::new_v4(), dosage, schedule, "", now).unwrap();
    plan.activate(now).unwrap();
    plans.save(&plan).await.unwrap();
    plan
}
