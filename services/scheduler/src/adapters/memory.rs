//! services/scheduler/src/adapters/memory.rs
//!
//! In-memory implementations of the repository ports. Used when no database
//! is configured and by the test suite. Each store sits behind one
//! `tokio::sync::RwLock`: lookups share it, writes take it exclusively.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream;
use intake_scheduler_core::domain::{IntakeRecord, Plan};
use intake_scheduler_core::ports::{
    PlanRepository, PlanStream, PortError, PortResult, RecordRepository,
};
use tokio::sync::RwLock;
use uuid::Uuid;

//=========================================================================================
// Plans
//=========================================================================================

#[derive(Default)]
pub struct InMemoryPlanRepository {
    plans: RwLock<HashMap<Uuid, Plan>>,
}

impl InMemoryPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns up to `limit` active plans with an id greater than `after`,
    /// ordered by id so paging is stable across calls.
    async fn active_page(&self, after: Option<Uuid>, limit: usize) -> Vec<Plan> {
        let plans = self.plans.read().await;
        let mut page: Vec<Plan> = plans
            .values()
            .filter(|p| p.is_active() && after.map_or(true, |a| p.id() > a))
            .cloned()
            .collect();
        page.sort_by_key(Plan::id);
        page.truncate(limit);
        page
    }
}

#[async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn get_by_id(&self, plan_id: Uuid) -> PortResult<Plan> {
        self.plans
            .read()
            .await
            .get(&plan_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Plan {} not found", plan_id)))
    }

    async fn user_plans(&self, user_id: Uuid) -> PortResult<Vec<Plan>> {
        let plans = self.plans.read().await;
        let mut owned: Vec<Plan> = plans
            .values()
            .filter(|p| p.user_id() == user_id)
            .cloned()
            .collect();
        owned.sort_by_key(Plan::created_at);
        Ok(owned)
    }

    async fn save(&self, plan: &Plan) -> PortResult<()> {
        let mut plans = self.plans.write().await;
        if plans.contains_key(&plan.id()) {
            return Err(PortError::Unexpected(format!("Plan {} already exists", plan.id())));
        }
        plans.insert(plan.id(), plan.clone());
        Ok(())
    }

    async fn update_plan(&self, plan: &Plan) -> PortResult<()> {
        let mut plans = self.plans.write().await;
        match plans.get_mut(&plan.id()) {
            Some(stored) => {
                *stored = plan.clone();
                Ok(())
            }
            None => Err(PortError::NotFound(format!("Plan {} not found", plan.id()))),
        }
    }

    fn active_plans(&self, batch_size: usize) -> PlanStream<'_> {
        let batch_size = batch_size.max(1);
        // Each page is fetched lazily, keyed on the last id seen.
        let pages = stream::unfold(Some(None::<Uuid>), move |cursor| async move {
            let Some(after) = cursor else {
                return None;
            };
            let page = self.active_page(after, batch_size).await;
            if page.is_empty() {
                return None;
            }
            let next = if page.len() < batch_size {
                None
            } else {
                page.last().map(|p| Some(p.id()))
            };
            Some((stream::iter(page.into_iter().map(Ok::<Plan, PortError>)), next))
        });
        Box::pin(futures::StreamExt::flatten(pages))
    }
}

//=========================================================================================
// Intake records
//=========================================================================================

#[derive(Default)]
struct RecordTable {
    by_id: HashMap<Uuid, IntakeRecord>,
    by_occurrence: HashMap<(Uuid, DateTime<Utc>), Uuid>,
}

impl RecordTable {
    fn insert(&mut self, record: &IntakeRecord) {
        self.by_occurrence.insert(record.occurrence_key(), record.id());
        self.by_id.insert(record.id(), record.clone());
    }
}

#[derive(Default)]
pub struct InMemoryRecordRepository {
    table: RwLock<RecordTable>,
}

impl InMemoryRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn get_by_id(&self, record_id: Uuid) -> PortResult<IntakeRecord> {
        self.table
            .read()
            .await
            .by_id
            .get(&record_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Intake record {} not found", record_id)))
    }

    async fn get_by_plan_id(&self, plan_id: Uuid) -> PortResult<Vec<IntakeRecord>> {
        let table = self.table.read().await;
        let mut records: Vec<IntakeRecord> = table
            .by_id
            .values()
            .filter(|r| r.plan_id() == plan_id)
            .cloned()
            .collect();
        records.sort_by_key(IntakeRecord::planned_at);
        Ok(records)
    }

    async fn save(&self, record: &IntakeRecord) -> PortResult<()> {
        let mut table = self.table.write().await;
        if let Some(existing) = table.by_occurrence.get(&record.occurrence_key()) {
            if *existing != record.id() {
                return Err(PortError::Unexpected(format!(
                    "Another record already tracks plan {} at {}",
                    record.plan_id(),
                    record.scheduled_for()
                )));
            }
        }
        table.insert(record);
        Ok(())
    }

    async fn save_bulk(&self, records: &[IntakeRecord]) -> PortResult<usize> {
        let mut table = self.table.write().await;
        let mut inserted = 0;
        for record in records {
            if table.by_occurrence.contains_key(&record.occurrence_key()) {
                continue;
            }
            table.insert(record);
            inserted += 1;
        }
        Ok(inserted)
    }
}
