//! Chunked transformation of draft collections.
//!
//! Each structure item walks PENDING → FIELDS_IN_PROGRESS →
//! ENUMS_VOS_IN_PROGRESS → DONE; a chunk that exhausts its retries falls
//! back to its original items without touching siblings. Generative calls
//! are strictly sequential per item so quota use and progress ordering stay
//! predictable.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use dm_agentic::chunk::estimate_request_tokens;
use dm_agentic::{AgenticError, ChunkGenerator, ChunkItem, ChunkRequest, TransformedItem};
use dm_draft_types::{Draft, DraftElement, Enumeration, Field, PropertyType, ValueObject};
use dm_standard_rag::StandardMappingContext;

use crate::config::TransformerConfig;
use crate::error::StandardizerError;
use crate::job::Anomaly;
use crate::progress::{ProgressEvent, ProgressReporter, ProgressScope, ProgressStatus};

/// Standard excerpts carried per chunk request.
const MAX_STANDARD_EXCERPTS: usize = 5;

/// External cancellation signal, checked at chunk boundaries. Stopping
/// early leaves untransformed chunks at their original values - never a
/// half-written state.
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-item transformation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemPhase {
    Pending,
    FieldsInProgress,
    EnumsVosInProgress,
    Done,
}

/// Job-wide inputs shared by every chunk request.
pub struct TransformScope<'a> {
    pub job_id: &'a str,
    pub bounded_context: &'a str,
    pub context: &'a StandardMappingContext,
}

/// What the transformation pass did, beyond mutating the draft.
#[derive(Debug, Default)]
pub struct TransformReport {
    pub anomalies: Vec<Anomaly>,
    pub chunks_completed: usize,
    pub chunks_fallback: usize,
    pub cancelled: bool,
}

/// Outcome counters for one structure item, driving the
/// collaborator-unreachable fatal rule.
#[derive(Debug, Default)]
struct ItemStats {
    attempted: usize,
    ok: usize,
    transport_failures: usize,
    other_failures: usize,
}

trait ChunkSource: DraftElement + Clone {
    fn chunk_item(&self) -> ChunkItem {
        ChunkItem {
            name: self.name().to_string(),
            alias: self.alias().to_string(),
            field_type: None,
            resolved: self.is_resolved(),
        }
    }
}

impl ChunkSource for Enumeration {}
impl ChunkSource for ValueObject {}
impl ChunkSource for Field {
    fn chunk_item(&self) -> ChunkItem {
        ChunkItem {
            name: self.name.clone(),
            alias: self.alias.clone(),
            field_type: self.field_type.clone(),
            resolved: self.resolved,
        }
    }
}

pub struct ChunkedTransformer<'a> {
    generator: &'a ChunkGenerator,
    reporter: &'a dyn ProgressReporter,
    config: &'a TransformerConfig,
}

impl<'a> ChunkedTransformer<'a> {
    pub fn new(
        generator: &'a ChunkGenerator,
        reporter: &'a dyn ProgressReporter,
        config: &'a TransformerConfig,
    ) -> Self {
        Self {
            generator,
            reporter,
            config,
        }
    }

    /// Transform every collection of every structure item in place.
    #[instrument(skip_all, fields(job_id = %scope.job_id, items = draft.len()))]
    pub async fn transform_draft(
        &self,
        draft: &mut Draft,
        scope: &TransformScope<'_>,
        cancel: &CancellationFlag,
    ) -> Result<TransformReport, StandardizerError> {
        let mut report = TransformReport::default();

        for item in &mut draft.items {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let aggregate_name = item.aggregate.name.clone();
            let aggregate_alias = item.aggregate.alias.clone();
            let mut stats = ItemStats::default();
            let mut phase = ItemPhase::Pending;
            debug!(aggregate = %aggregate_alias, ?phase, "structure item scheduled");

            phase = ItemPhase::FieldsInProgress;
            debug!(aggregate = %aggregate_alias, ?phase, count = item.fields.len(), "transforming");
            self.transform_collection(
                scope,
                &aggregate_name,
                &aggregate_alias,
                PropertyType::Fields,
                &mut item.fields,
                &mut report,
                &mut stats,
                cancel,
            )
            .await;

            if !report.cancelled {
                phase = ItemPhase::EnumsVosInProgress;
                debug!(aggregate = %aggregate_alias, ?phase,
                       enums = item.enumerations.len(), vos = item.value_objects.len(),
                       "transforming");
                self.transform_collection(
                    scope,
                    &aggregate_name,
                    &aggregate_alias,
                    PropertyType::Enumerations,
                    &mut item.enumerations,
                    &mut report,
                    &mut stats,
                    cancel,
                )
                .await;
                self.transform_collection(
                    scope,
                    &aggregate_name,
                    &aggregate_alias,
                    PropertyType::ValueObjects,
                    &mut item.value_objects,
                    &mut report,
                    &mut stats,
                    cancel,
                )
                .await;
            }

            if report.cancelled {
                break;
            }

            phase = ItemPhase::Done;
            debug!(aggregate = %aggregate_alias, ?phase,
                   chunks = stats.attempted, ok = stats.ok, "structure item finished");

            // Every chunk of this item died on transport after retries:
            // the collaborator is unreachable, not merely misbehaving.
            if stats.attempted > 0 && stats.ok == 0 && stats.other_failures == 0 {
                return Err(StandardizerError::LlmUnavailable {
                    aggregate_alias,
                    reason: format!(
                        "all {} chunks failed at the transport level after retries",
                        stats.attempted
                    ),
                });
            }
        }

        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn transform_collection<E: ChunkSource>(
        &self,
        scope: &TransformScope<'_>,
        aggregate_name: &str,
        aggregate_alias: &str,
        property_type: PropertyType,
        elements: &mut Vec<E>,
        report: &mut TransformReport,
        stats: &mut ItemStats,
        cancel: &CancellationFlag,
    ) {
        if elements.is_empty() {
            return;
        }

        let chunk_size =
            self.plan_chunk_size(scope, aggregate_name, aggregate_alias, property_type, elements);
        let len = elements.len();
        let mut ranges = Vec::new();
        let mut start = 0;
        while start < len {
            let end = (start + chunk_size).min(len);
            ranges.push((start, end));
            start = end;
        }

        for (chunk_index, (start, end)) in ranges.into_iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                return;
            }

            let request = self.build_request(
                scope,
                aggregate_name,
                aggregate_alias,
                property_type,
                &elements[start..end],
            );
            let outcome = self.call_with_retries(&request).await;
            stats.attempted += 1;

            let status = match outcome {
                Ok(transformed) => {
                    stats.ok += 1;
                    report.chunks_completed += 1;
                    splice(
                        &mut elements[start..end],
                        &transformed,
                        aggregate_alias,
                        &mut report.anomalies,
                    );
                    ProgressStatus::ChunkCompleted
                }
                Err(err) => {
                    if err.is_transport() {
                        stats.transport_failures += 1;
                    } else {
                        stats.other_failures += 1;
                    }
                    report.chunks_fallback += 1;
                    warn!(aggregate = %aggregate_alias, %property_type, chunk_index,
                          error = %err, "chunk failed, emitting original items unchanged");
                    report.anomalies.push(Anomaly::FallbackChunk {
                        aggregate_alias: aggregate_alias.to_string(),
                        property_type,
                        chunk_index,
                        aliases: elements[start..end]
                            .iter()
                            .map(|e| e.alias().to_string())
                            .collect(),
                    });
                    ProgressStatus::ChunkFallback
                }
            };

            self.reporter.report(ProgressEvent {
                job_id: scope.job_id.to_string(),
                scope: ProgressScope {
                    bounded_context: scope.bounded_context.to_string(),
                    aggregate: Some(aggregate_alias.to_string()),
                    property_type: Some(property_type),
                    chunk_index: Some(chunk_index),
                },
                status,
            });
        }
    }

    /// Candidate size → estimate → accept or halve, bounded by the shrink
    /// count, floor of one item per chunk.
    fn plan_chunk_size<E: ChunkSource>(
        &self,
        scope: &TransformScope<'_>,
        aggregate_name: &str,
        aggregate_alias: &str,
        property_type: PropertyType,
        elements: &[E],
    ) -> usize {
        let mut size = self.config.base_chunk_size.max(1);
        let mut shrinks = 0usize;
        loop {
            let probe = &elements[..size.min(elements.len())];
            let request =
                self.build_request(scope, aggregate_name, aggregate_alias, property_type, probe);
            let estimate = estimate_request_tokens(&request);
            if estimate <= self.config.token_budget {
                return size;
            }
            if size == 1 || shrinks >= self.config.max_shrink_count {
                warn!(estimate, budget = self.config.token_budget, size,
                      "request still over token budget after shrinking");
                return size;
            }
            size = (size / 2).max(1);
            shrinks += 1;
            debug!(estimate, size, "request over token budget, halving chunk size");
        }
    }

    fn build_request<E: ChunkSource>(
        &self,
        scope: &TransformScope<'_>,
        aggregate_name: &str,
        aggregate_alias: &str,
        property_type: PropertyType,
        elements: &[E],
    ) -> ChunkRequest {
        let mut entity_mappings: Vec<(String, String)> = scope
            .context
            .entity_mappings()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entity_mappings.sort();
        let mut name_mappings: Vec<(String, String)> = scope
            .context
            .name_mappings()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        name_mappings.sort();

        ChunkRequest {
            bounded_context: scope.bounded_context.to_string(),
            aggregate_name: aggregate_name.to_string(),
            aggregate_alias: aggregate_alias.to_string(),
            property_type: property_type.to_string(),
            items: elements.iter().map(ChunkSource::chunk_item).collect(),
            entity_mappings,
            name_mappings,
            standards: standards_for(property_type, scope.context),
            no_standard_found: scope.context.is_empty(),
        }
    }

    /// One chunk, retried with linear backoff. A response that fails shape
    /// validation (including missing input aliases) counts as a failure
    /// like any transport error.
    async fn call_with_retries(
        &self,
        request: &ChunkRequest,
    ) -> Result<Vec<TransformedItem>, AgenticError> {
        let mut attempt = 0usize;
        loop {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(
                    self.config.retry_backoff_ms * attempt as u64,
                ))
                .await;
            }

            let result = match self.generator.transform_chunk(request).await {
                Ok(items) => validate_coverage(request, items),
                Err(err) => Err(err),
            };

            match result {
                Ok(items) => return Ok(items),
                Err(err) if attempt < self.config.max_chunk_retries => {
                    warn!(attempt, error = %err, "chunk attempt failed, retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Retrieved excerpts relevant to this scope: column standards for fields,
/// table standards for enumerations/value objects, terminology for both.
fn standards_for(property_type: PropertyType, context: &StandardMappingContext) -> Vec<String> {
    let wanted: [&str; 2] = match property_type {
        PropertyType::Fields => ["column_name", "terminology"],
        PropertyType::Enumerations | PropertyType::ValueObjects => ["table_name", "terminology"],
    };
    context
        .raw_results()
        .iter()
        .filter(|r| wanted.contains(&r.category.as_str()))
        .take(MAX_STANDARD_EXCERPTS)
        .map(|r| r.text.clone())
        .collect()
}

/// Every input alias must come back; anything less is a shape violation.
fn validate_coverage(
    request: &ChunkRequest,
    items: Vec<TransformedItem>,
) -> Result<Vec<TransformedItem>, AgenticError> {
    let returned: HashSet<&str> = items.iter().map(|t| t.alias.as_str()).collect();
    let missing: Vec<String> = request
        .items
        .iter()
        .map(|i| i.alias.as_str())
        .filter(|a| !returned.contains(a))
        .map(String::from)
        .collect();
    if missing.is_empty() {
        Ok(items)
    } else {
        Err(AgenticError::SchemaViolation(format!(
            "response missing aliases: {}",
            missing.join(", ")
        )))
    }
}

/// Write transformed names back over the chunk slice. Order comes from the
/// input slice, not the response; invented aliases never enter the
/// collection and are recorded instead.
fn splice<E: ChunkSource>(
    elements: &mut [E],
    transformed: &[TransformedItem],
    aggregate_alias: &str,
    anomalies: &mut Vec<Anomaly>,
) {
    for t in transformed {
        if !elements.iter().any(|e| e.alias() == t.alias) {
            anomalies.push(Anomaly::InventedAlias {
                aggregate_alias: aggregate_alias.to_string(),
                alias: t.alias.clone(),
            });
        }
    }

    let by_alias: HashMap<&str, &TransformedItem> =
        transformed.iter().map(|t| (t.alias.as_str(), t)).collect();
    for element in elements.iter_mut() {
        if element.is_resolved() {
            continue;
        }
        if let Some(t) = by_alias.get(element.alias()) {
            if !t.unmatched {
                element.set_name(t.name.clone());
            }
        }
    }
}
