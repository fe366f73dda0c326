//! Job orchestration: one draft, end to end.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use dm_agentic::{ChunkGenerator, LlmClient};
use dm_draft_types::{restore_refs, strip_refs, BoundedContext, Draft, PropertyType};
use dm_standard_rag::{
    CategorizedRetriever, MappingContextBuilder, RetrievalStats, SimilaritySearch,
};

use crate::config::StandardizerConfig;
use crate::error::Result;
use crate::extract::extract_names;
use crate::mapper::apply_deterministic_mappings;
use crate::progress::{ProgressEvent, ProgressReporter, ProgressScope, ProgressStatus};
use crate::query::build_queries;
use crate::transform::{CancellationFlag, ChunkedTransformer, TransformScope};

/// Everything a transformation job needs from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    pub draft: Draft,
    pub bounded_context: BoundedContext,
    pub job_id: String,
    /// Caller identity scoping the retrieval session and mapping index.
    pub session_id: String,
}

impl JobInput {
    /// Wrap a draft with freshly generated job/session ids.
    pub fn new(draft: Draft, bounded_context: BoundedContext) -> Self {
        Self {
            draft,
            bounded_context,
            job_id: Uuid::new_v4().to_string(),
            session_id: Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    Completed,
    Cancelled,
}

/// Everything that went sideways without failing the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Anomaly {
    /// A transformed alias had no counterpart in the original draft during
    /// ref restoration; its refs were left empty.
    #[serde(rename_all = "camelCase")]
    UnmatchedRef {
        aggregate_alias: String,
        property_alias: String,
    },
    /// A chunk exhausted its retries and fell back to its original items.
    #[serde(rename_all = "camelCase")]
    FallbackChunk {
        aggregate_alias: String,
        property_type: PropertyType,
        chunk_index: usize,
        aliases: Vec<String>,
    },
    /// The generative step returned an alias that was never in its input.
    #[serde(rename_all = "camelCase")]
    InventedAlias {
        aggregate_alias: String,
        alias: String,
    },
    /// No deterministic mapping could be extracted from retrieval; the
    /// generative step was told so explicitly.
    EmptyMappingContext,
}

/// Transformed draft of identical cardinality, plus everything observed
/// along the way.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutput {
    pub draft: Draft,
    pub status: JobStatus,
    pub anomalies: Vec<Anomaly>,
    pub retrieval: RetrievalStats,
    pub deterministic_resolved: usize,
    pub chunks_completed: usize,
    pub chunks_fallback: usize,
    pub completed_at: DateTime<Utc>,
}

/// The standardization pipeline, wired to its three collaborators.
///
/// One instance serves one worker; independent jobs run as independent
/// instances with no shared mutable state.
pub struct DraftStandardizer {
    retriever: CategorizedRetriever,
    generator: ChunkGenerator,
    reporter: Arc<dyn ProgressReporter>,
    config: StandardizerConfig,
}

impl DraftStandardizer {
    pub fn new(
        search: Arc<dyn SimilaritySearch>,
        client: Arc<dyn LlmClient>,
        reporter: Arc<dyn ProgressReporter>,
        config: StandardizerConfig,
    ) -> Self {
        Self {
            retriever: CategorizedRetriever::new(search, config.retriever.clone()),
            generator: ChunkGenerator::with_client(client),
            reporter,
            config,
        }
    }

    /// Construct with the LLM backend selected from the environment.
    pub fn from_env(
        search: Arc<dyn SimilaritySearch>,
        reporter: Arc<dyn ProgressReporter>,
        config: StandardizerConfig,
    ) -> Result<Self> {
        Ok(Self {
            retriever: CategorizedRetriever::new(search, config.retriever.clone()),
            generator: ChunkGenerator::from_env()?,
            reporter,
            config,
        })
    }

    /// Run one job to completion (or cancellation).
    ///
    /// The output always contains every original item; unresolved ones keep
    /// their original names, and anomalies say why.
    #[instrument(skip(self, input, cancel), fields(job_id = %input.job_id, items = input.draft.len()))]
    pub async fn run(&self, input: JobInput, cancel: &CancellationFlag) -> Result<JobOutput> {
        input.draft.validate()?;

        let JobInput {
            draft: mut working,
            bounded_context,
            job_id,
            session_id,
        } = input;

        // Retrieval: names → category-scoped queries → mapping context.
        let names = extract_names(&working);
        let queries = build_queries(&names, &bounded_context);
        info!(names = names.len(), queries = queries.len(), "querying standards");
        let retrieval = self.retriever.retrieve(&queries, Some(&session_id)).await;
        let stats = retrieval.stats.clone();
        let context = MappingContextBuilder::build(retrieval.results, session_id);

        let mut anomalies = Vec::new();
        if context.is_empty() {
            anomalies.push(Anomaly::EmptyMappingContext);
        }

        // Deterministic substitutions happen before any generative call.
        let deterministic_resolved = apply_deterministic_mappings(&mut working, &context);
        info!(deterministic_resolved, "deterministic pass done");

        // Refs never travel to the generative collaborator.
        let original = working.clone();
        let (mut stripped, _ref_table) = strip_refs(&working);

        let transformer = ChunkedTransformer::new(
            &self.generator,
            self.reporter.as_ref(),
            &self.config.transformer,
        );
        let scope = TransformScope {
            job_id: &job_id,
            bounded_context: &bounded_context.name,
            context: &context,
        };
        let report = transformer
            .transform_draft(&mut stripped, &scope, cancel)
            .await?;
        anomalies.extend(report.anomalies);

        // Restore refs from the original by alias identity.
        let (merged, ref_anomalies) = restore_refs(&original, &stripped);
        anomalies.extend(ref_anomalies.into_iter().map(|a| Anomaly::UnmatchedRef {
            aggregate_alias: a.aggregate_alias,
            property_alias: a.property_alias,
        }));

        let status = if report.cancelled {
            JobStatus::Cancelled
        } else {
            JobStatus::Completed
        };
        self.reporter.report(ProgressEvent {
            job_id: job_id.clone(),
            scope: ProgressScope {
                bounded_context: bounded_context.name.clone(),
                ..Default::default()
            },
            status: match status {
                JobStatus::Completed => ProgressStatus::JobCompleted,
                JobStatus::Cancelled => ProgressStatus::JobCancelled,
            },
        });
        info!(?status, anomalies = anomalies.len(), "job finished");

        Ok(JobOutput {
            draft: merged,
            status,
            anomalies,
            retrieval: stats,
            deterministic_resolved,
            chunks_completed: report.chunks_completed,
            chunks_fallback: report.chunks_fallback,
            completed_at: Utc::now(),
        })
    }
}
