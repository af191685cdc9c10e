//! services/scheduler/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `PlanRepository` and `RecordRepository` ports from the core crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.

use async_stream::stream;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use intake_scheduler_core::domain::{
    Dosage, IntakeRecord, IntakeRecordSnapshot, Plan, PlanSnapshot, Schedule,
};
use intake_scheduler_core::ports::{
    PlanRepository, PlanStream, PortError, PortResult, RecordRepository,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements both repository ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn corrupt(what: &str, id: Uuid, reason: impl std::fmt::Display) -> PortError {
    PortError::Unexpected(format!("Stored {what} {id} is invalid: {reason}"))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const PLAN_COLUMNS: &str = "id, medication_id, user_id, dosage_value, dosage_unit, \
     course_start, course_end, rules, condition, status, created_at, updated_at";

const RECORD_COLUMNS: &str =
    "id, plan_id, status, scheduled_for, planned_at, taken_at, created_at, updated_at";

#[derive(FromRow)]
struct PlanRow {
    id: Uuid,
    medication_id: Uuid,
    user_id: Uuid,
    dosage_value: f64,
    dosage_unit: String,
    course_start: DateTime<Utc>,
    course_end: DateTime<Utc>,
    rules: Vec<String>,
    condition: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PlanRow {
    fn to_domain(self) -> PortResult<Plan> {
        let id = self.id;
        let dosage = Dosage::parse(self.dosage_value, &self.dosage_unit)
            .map_err(|e| corrupt("plan", id, e))?;
        let schedule = Schedule::parse(self.course_start, self.course_end, &self.rules)
            .map_err(|e| corrupt("plan", id, e))?;
        let status = self.status.parse().map_err(|e| corrupt("plan", id, e))?;
        Ok(Plan::restore(PlanSnapshot {
            id,
            medication_id: self.medication_id,
            user_id: self.user_id,
            dosage,
            schedule,
            condition: self.condition,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }))
    }
}

#[derive(FromRow)]
struct IntakeRecordRow {
    id: Uuid,
    plan_id: Uuid,
    status: String,
    scheduled_for: DateTime<Utc>,
    planned_at: DateTime<Utc>,
    taken_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IntakeRecordRow {
    fn to_domain(self) -> PortResult<IntakeRecord> {
        let status = self
            .status
            .parse()
            .map_err(|e| corrupt("intake record", self.id, e))?;
        Ok(IntakeRecord::restore(IntakeRecordSnapshot {
            id: self.id,
            plan_id: self.plan_id,
            status,
            scheduled_for: self.scheduled_for,
            planned_at: self.planned_at,
            taken_at: self.taken_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }))
    }
}

//=========================================================================================
// `PlanRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl PlanRepository for DbAdapter {
    async fn get_by_id(&self, plan_id: Uuid) -> PortResult<Plan> {
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1"
        ))
        .bind(plan_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Plan {} not found", plan_id)),
            _ => unexpected(e),
        })?;
        row.to_domain()
    }

    async fn user_plans(&self, user_id: Uuid) -> PortResult<Vec<Plan>> {
        let rows = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE user_id = $1 ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        rows.into_iter().map(PlanRow::to_domain).collect()
    }

    async fn save(&self, plan: &Plan) -> PortResult<()> {
        sqlx::query(&format!(
            "INSERT INTO plans ({PLAN_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(plan.id())
        .bind(plan.medication_id())
        .bind(plan.user_id())
        .bind(plan.dosage().value())
        .bind(plan.dosage().unit().as_str())
        .bind(plan.schedule().course_start())
        .bind(plan.schedule().course_end())
        .bind(plan.schedule().rule_texts())
        .bind(plan.condition())
        .bind(plan.status().as_str())
        .bind(plan.created_at())
        .bind(plan.updated_at())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn update_plan(&self, plan: &Plan) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE plans SET dosage_value = $2, dosage_unit = $3, course_start = $4, \
             course_end = $5, rules = $6, condition = $7, status = $8, updated_at = $9 \
             WHERE id = $1",
        )
        .bind(plan.id())
        .bind(plan.dosage().value())
        .bind(plan.dosage().unit().as_str())
        .bind(plan.schedule().course_start())
        .bind(plan.schedule().course_end())
        .bind(plan.schedule().rule_texts())
        .bind(plan.condition())
        .bind(plan.status().as_str())
        .bind(plan.updated_at())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Plan {} not found", plan.id())));
        }
        Ok(())
    }

    /// Keyset pagination on `id`, one query per page.
    fn active_plans(&self, batch_size: usize) -> PlanStream<'_> {
        let limit = i64::try_from(batch_size.max(1)).unwrap_or(i64::MAX);
        let query = format!(
            "SELECT {PLAN_COLUMNS} FROM plans \
             WHERE status = 'active' AND ($1::uuid IS NULL OR id > $1) \
             ORDER BY id LIMIT $2"
        );

        Box::pin(stream! {
            let mut after: Option<Uuid> = None;
            loop {
                let rows = match sqlx::query_as::<_, PlanRow>(&query)
                    .bind(after)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await
                {
                    Ok(rows) => rows,
                    Err(e) => {
                        yield Err(unexpected(e));
                        return;
                    }
                };
                let fetched = rows.len();
                for row in rows {
                    match row.to_domain() {
                        Ok(plan) => {
                            after = Some(plan.id());
                            yield Ok(plan);
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
                if i64::try_from(fetched).unwrap_or(0) < limit {
                    break;
                }
            }
        })
    }
}

//=========================================================================================
// `RecordRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl RecordRepository for DbAdapter {
    async fn get_by_id(&self, record_id: Uuid) -> PortResult<IntakeRecord> {
        let row = sqlx::query_as::<_, IntakeRecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM intake_records WHERE id = $1"
        ))
        .bind(record_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Intake record {} not found", record_id))
            }
            _ => unexpected(e),
        })?;
        row.to_domain()
    }

    async fn get_by_plan_id(&self, plan_id: Uuid) -> PortResult<Vec<IntakeRecord>> {
        let rows = sqlx::query_as::<_, IntakeRecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM intake_records WHERE plan_id = $1 ORDER BY planned_at ASC"
        ))
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        rows.into_iter().map(IntakeRecordRow::to_domain).collect()
    }

    async fn save(&self, record: &IntakeRecord) -> PortResult<()> {
        sqlx::query(&format!(
            "INSERT INTO intake_records ({RECORD_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status, \
             planned_at = EXCLUDED.planned_at, taken_at = EXCLUDED.taken_at, \
             updated_at = EXCLUDED.updated_at"
        ))
        .bind(record.id())
        .bind(record.plan_id())
        .bind(record.status().as_str())
        .bind(record.scheduled_for())
        .bind(record.planned_at())
        .bind(record.taken_at())
        .bind(record.created_at())
        .bind(record.updated_at())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn save_bulk(&self, records: &[IntakeRecord]) -> PortResult<usize> {
        let insert = format!(
            "INSERT INTO intake_records ({RECORD_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (plan_id, scheduled_for) DO NOTHING"
        );
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut inserted = 0u64;
        for record in records {
            let result = sqlx::query(&insert)
                .bind(record.id())
                .bind(record.plan_id())
                .bind(record.status().as_str())
                .bind(record.scheduled_for())
                .bind(record.planned_at())
                .bind(record.taken_at())
                .bind(record.created_at())
                .bind(record.updated_at())
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
            inserted += result.rows_affected();
        }
        tx.commit().await.map_err(unexpected)?;
        Ok(usize::try_from(inserted).unwrap_or(usize::MAX))
    }
}
