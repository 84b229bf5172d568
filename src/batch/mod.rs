//! Multi-order processing.
//!
//! [`run_bulk_action`] handles an explicit selection of orders in one call.
//! The meta-update job annotates many orders in bounded batches, keeping its
//! progress in a [`CheckpointStore`].

mod bulk;
mod checkpoint;
mod meta_update;

pub use bulk::{BulkAction, BulkSummary, run_bulk_action};
pub use checkpoint::{CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore};
pub use meta_update::{
    BatchProgress, JobState, MetaUpdateJob, MetaUpdateRequest, cancel_meta_update,
    process_meta_batch, schedule_meta_update,
};
