//! crates/intake_scheduler_core/src/services/generation.rs
//!
//! Batch materialisation of near-term occurrences into intake records.
//!
//! The service never checks for existing records before inserting. It relies
//! on `RecordRepository::save_bulk` ignoring `(plan_id, scheduled_for)` pairs
//! that are already stored, so re-running a pass over the same window is safe.

use std::pin::pin;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::future::{select, Either};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::Plan;
use crate::ports::{Clock, PlanRepository, RecordRepository};
use crate::services::error::ServiceResult;

/// The window one pass materialises: from `now` up to UTC midnight of the
/// current day plus `creation_shift`.
pub fn generation_window(
    now: DateTime<Utc>,
    creation_shift: Duration,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(now, |m| Utc.from_utc_datetime(&m));
    (now, midnight + creation_shift)
}

/// Outcome of a pass over all active plans.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub plans_scanned: usize,
    /// Plans with no occurrence in the window; no write was issued for them.
    pub plans_skipped: usize,
    pub records_written: usize,
    pub cancelled: bool,
}

pub struct GenerationService {
    plans: Arc<dyn PlanRepository>,
    records: Arc<dyn RecordRepository>,
    clock: Arc<dyn Clock>,
}

impl GenerationService {
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

    /// Materialises today's window for a single plan and returns the number
    /// of records inserted.
    pub async fn generate_for_plan(
        &self,
        plan_id: Uuid,
        creation_shift: Duration,
    ) -> ServiceResult<usize> {
        let plan = self.plans.get_by_id(plan_id).await?;
        let now = self.clock.now();
        let (from, to) = generation_window(now, creation_shift);
        let written = self.materialize(&plan, from, to, now).await?.unwrap_or(0);
        info!(%plan_id, written, "Generated intake records for plan.");
        Ok(written)
    }

    /// Streams active plans in pages of `batch_size` and materialises the same
    /// window for each of them.
    ///
    /// Cancellation is observed between plans, never in the middle of one.
    /// The first repository error aborts the pass.
    pub async fn generate_for_all_active_plans(
        &self,
        batch_size: usize,
        creation_shift: Duration,
        cancel: &CancellationToken,
    ) -> ServiceResult<GenerationReport> {
        let now = self.clock.now();
        let (from, to) = generation_window(now, creation_shift);
        let mut report = GenerationReport::default();
        let mut plans = self.plans.active_plans(batch_size.max(1));

        loop {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let cancelled = pin!(cancel.cancelled());
            let plan = match select(plans.next(), cancelled).await {
                Either::Left((Some(plan), _)) => plan?,
                Either::Left((None, _)) => break,
                Either::Right(_) => {
                    report.cancelled = true;
                    break;
                }
            };

            report.plans_scanned += 1;
            match self.materialize(&plan, from, to, now).await? {
                Some(written) => report.records_written += written,
                None => report.plans_skipped += 1,
            }
        }

        info!(
            scanned = report.plans_scanned,
            skipped = report.plans_skipped,
            written = report.records_written,
            cancelled = report.cancelled,
            window_end = %to,
            "Generation pass finished."
        );
        Ok(report)
    }

    /// Returns `None` when the plan has nothing in the window and no write was made.
    async fn materialize(
        &self,
        plan: &Plan,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ServiceResult<Option<usize>> {
        let records = plan.generate_intake_records(from, to, now)?;
        if records.is_empty() {
            debug!(plan_id = %plan.id(), "No occurrences in window, skipping.");
            return Ok(None);
        }
        let written = self.records.save_bulk(&records).await?;
        Ok(Some(written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn window_runs_from_now_to_shifted_midnight() {
        let (from, to) = generation_window(at("2024-01-05T10:30:00Z"), Duration::hours(24));
        assert_eq!(from, at("2024-01-05T10:30:00Z"));
        assert_eq!(to, at("2024-01-06T00:00:00Z"));

        let (_, to) = generation_window(at("2024-01-05T23:59:00Z"), Duration::hours(30));
        assert_eq!(to, at("2024-01-06T06:00:00Z"));
    }
}
