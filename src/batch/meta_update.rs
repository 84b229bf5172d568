//! The background job that writes the shipping tax rate annotation.
//!
//! Scheduling selects order ids and stores them as a [`MetaUpdateJob`]
//! checkpoint. Each call to [`process_meta_batch`] handles at most
//! `batch.batch_size` orders and persists what is left, so a job can be run
//! by any trigger (a timer, an HTTP call, a restart) and picks up where the
//! previous batch stopped. Deleting the checkpoint cancels the job.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::TaxFixEngine;
use crate::error::EngineResult;
use crate::models::OrderId;
use crate::store::{OrderQuery, OrderStore};

use super::checkpoint::CheckpointStore;

/// Which orders a meta-update job should cover.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaUpdateRequest {
    /// First order date to include.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last order date to include.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Recompute orders that already carry an annotation.
    #[serde(default)]
    pub overwrite: bool,
}

impl MetaUpdateRequest {
    fn has_date_range(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }
}

/// Checkpointed state of a meta-update job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaUpdateJob {
    /// Orders still to annotate, in processing order.
    pub remaining_ids: Vec<OrderId>,
    /// Orders annotated so far.
    pub processed: usize,
    /// Orders that could not be annotated.
    pub failed: usize,
    /// When the job was scheduled.
    pub started_at: DateTime<Utc>,
}

/// Where a job stands after a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// More batches are needed.
    InProgress,
    /// Every scheduled order was handled and the checkpoint removed.
    Complete,
    /// The checkpoint disappeared while the batch ran.
    Cancelled,
}

/// Result of one [`process_meta_batch`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Orders annotated in this batch.
    pub processed: usize,
    /// Orders that failed in this batch.
    pub failed: usize,
    /// Orders left for later batches.
    pub remaining: usize,
    /// Orders annotated since the job was scheduled.
    pub total_processed: usize,
    /// Failures since the job was scheduled.
    pub total_failed: usize,
    /// State after the batch.
    pub state: JobState,
}

/// Selects the orders to annotate and stores them as the job checkpoint.
///
/// Without a date range the `batch.initial_limit` newest orders are chosen.
/// Unless `overwrite` is set, orders that already carry an annotation are
/// left out. Scheduling replaces any job that is still pending.
pub fn schedule_meta_update<S, C>(
    engine: &TaxFixEngine,
    store: &S,
    checkpoints: &C,
    request: &MetaUpdateRequest,
) -> EngineResult<MetaUpdateJob>
where
    S: OrderStore + ?Sized,
    C: CheckpointStore + ?Sized,
{
    let query = OrderQuery {
        created_from: request.start_date,
        created_to: request.end_date,
        missing_rate_meta: !request.overwrite,
        rate_filter: None,
        limit: if request.has_date_range() {
            None
        } else {
            Some(engine.settings().batch.initial_limit)
        },
    };

    let job = MetaUpdateJob {
        remaining_ids: store.query(&query)?,
        processed: 0,
        failed: 0,
        started_at: Utc::now(),
    };
    checkpoints.save(&job)?;

    if engine.settings().general.enable_logging {
        info!(
            orders = job.remaining_ids.len(),
            start_date = ?request.start_date,
            end_date = ?request.end_date,
            overwrite = request.overwrite,
            "Scheduled shipping tax rate meta update"
        );
    }

    Ok(job)
}

/// Annotates the next batch of scheduled orders.
///
/// Returns `None` when no job is scheduled. The checkpoint is re-read before
/// every order and saved after it, so a cancellation stops the batch at the
/// next order and an interrupted batch resumes without repeating work. The
/// save only goes through while the checkpoint still exists; a cancellation
/// that lands while an order is processed ends the batch as
/// [`JobState::Cancelled`]. A missing or failing order is counted and skipped.
pub fn process_meta_batch<S, C>(
    engine: &TaxFixEngine,
    store: &S,
    checkpoints: &C,
) -> EngineResult<Option<BatchProgress>>
where
    S: OrderStore + ?Sized,
    C: CheckpointStore + ?Sized,
{
    let Some(mut job) = checkpoints.load()? else {
        return Ok(None);
    };

    let verbose = engine.settings().general.enable_logging;
    let batch_len = job.remaining_ids.len().min(engine.settings().batch.batch_size);
    if verbose {
        info!(orders = batch_len, "Processing shipping tax rate meta batch");
    }

    let mut processed = 0;
    let mut failed = 0;
    let mut cancelled = false;

    for _ in 0..batch_len {
        if checkpoints.load()?.is_none() {
            cancelled = true;
            break;
        }

        let order_id = job.remaining_ids.remove(0);
        match engine.refresh_rate_meta(store, order_id) {
            Ok(_) => {
                processed += 1;
                job.processed += 1;
            }
            Err(err) => {
                warn!(order_id, error = %err, "Failed to update shipping tax rate meta");
                failed += 1;
                job.failed += 1;
            }
        }
        if !checkpoints.save_if_present(&job)? {
            cancelled = true;
            break;
        }
    }

    let state = if cancelled {
        if verbose {
            info!(processed, "Shipping tax rate meta update cancelled");
        }
        JobState::Cancelled
    } else if job.remaining_ids.is_empty() {
        checkpoints.clear()?;
        if verbose {
            info!(
                total_processed = job.processed,
                total_failed = job.failed,
                "No more orders to process, meta update complete"
            );
        }
        JobState::Complete
    } else {
        JobState::InProgress
    };

    Ok(Some(BatchProgress {
        processed,
        failed,
        remaining: job.remaining_ids.len(),
        total_processed: job.processed,
        total_failed: job.failed,
        state,
    }))
}

/// Cancels the pending job. Returns whether one existed.
pub fn cancel_meta_update<C>(checkpoints: &C) -> EngineResult<bool>
where
    C: CheckpointStore + ?Sized,
{
    let existed = checkpoints.load()?.is_some();
    checkpoints.clear()?;
    Ok(existed)
}
