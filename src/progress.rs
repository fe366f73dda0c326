//! Progress reporting.
//!
//! Events are emitted after each chunk at bounded-context / aggregate /
//! property-type / chunk granularity. Delivery is fire-and-forget: a
//! reporter must swallow its own failures and never block the pipeline.

use serde::{Deserialize, Serialize};
use tracing::info;

use dm_draft_types::PropertyType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressStatus {
    ChunkCompleted,
    /// The chunk fell back to its original items after exhausting retries.
    ChunkFallback,
    JobCompleted,
    JobCancelled,
}

/// Hierarchical scope path: [bounded context, aggregate, property type,
/// chunk index]. Job-level events carry only the bounded context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProgressScope {
    pub bounded_context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub job_id: String,
    pub scope: ProgressScope,
    pub status: ProgressStatus,
}

/// External notification seam.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Drops every event.
pub struct NoopProgressReporter;

impl ProgressReporter for NoopProgressReporter {
    fn report(&self, _event: ProgressEvent) {}
}

/// Logs every event through `tracing`.
pub struct TracingProgressReporter;

impl ProgressReporter for TracingProgressReporter {
    fn report(&self, event: ProgressEvent) {
        info!(
            job_id = %event.job_id,
            bounded_context = %event.scope.bounded_context,
            aggregate = %event.scope.aggregate.as_deref().unwrap_or("-"),
            property_type = %event.scope.property_type.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
            chunk_index = event.scope.chunk_index.map(|i| i as i64).unwrap_or(-1),
            status = ?event.status,
            "progress"
        );
    }
}
