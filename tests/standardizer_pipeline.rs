//! End-to-end pipeline tests with scripted collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use dm_standardizer::{
    Anomaly, BoundedContext, CancellationFlag, DraftStandardizer, JobInput, JobStatus,
    NoopProgressReporter, ProgressEvent, ProgressReporter, ProgressStatus, StandardCategory,
    StandardizerConfig, StandardizerError,
};

use dm_agentic::{AgenticError, LlmClient, ToolCallResult, ToolDefinition};
use dm_draft_types::{collect_refs, Aggregate, Draft, Field, RefSpan, StructureItem};
use dm_standard_rag::{RagError, ScoredDocument, SearchFilter, SimilaritySearch};

// ---- scripted collaborators -----------------------------------------------

/// Similarity search returning one fixed standard record for every query.
struct FixedStandardSearch {
    score: f32,
    structured_data: Value,
}

#[async_trait]
impl SimilaritySearch for FixedStandardSearch {
    async fn search(
        &self,
        _query_text: &str,
        _filter: &SearchFilter,
        _k: usize,
        _min_score: f32,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        Ok(vec![ScoredDocument {
            text: "주문정보 Order m_odr는 ODR 도메인의 table_name이다".into(),
            metadata: json!({
                "type": "database_standard",
                "category": "table_name",
                "structured_data": self.structured_data,
            }),
            score: self.score,
        }])
    }
}

/// Records every query it receives; returns nothing.
#[derive(Default)]
struct RecordingSearch {
    queries: Mutex<Vec<(String, SearchFilter)>>,
}

#[async_trait]
impl SimilaritySearch for RecordingSearch {
    async fn search(
        &self,
        query_text: &str,
        filter: &SearchFilter,
        _k: usize,
        _min_score: f32,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        self.queries
            .lock()
            .unwrap()
            .push((query_text.to_string(), filter.clone()));
        Ok(vec![])
    }
}

/// Empty index.
struct EmptySearch;

#[async_trait]
impl SimilaritySearch for EmptySearch {
    async fn search(
        &self,
        _q: &str,
        _f: &SearchFilter,
        _k: usize,
        _m: f32,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        Ok(vec![])
    }
}

fn parse_prompt_items(user_prompt: &str) -> Vec<Value> {
    let idx = user_prompt.find("## Items").expect("prompt has an Items section");
    let json = user_prompt[idx + "## Items".len()..].trim();
    serde_json::from_str(json).expect("items section is valid JSON")
}

/// Prefixes every name with `STD_`, except that chunks containing an alias
/// from `poison` get a wrong-shaped payload instead.
struct RenamingClient {
    calls: AtomicUsize,
    poison: Vec<String>,
}

impl RenamingClient {
    fn new(poison: &[&str]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            poison: poison.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl LlmClient for RenamingClient {
    async fn chat(&self, _s: &str, _u: &str) -> Result<String, AgenticError> {
        unimplemented!("not used by the pipeline")
    }
    async fn chat_json(&self, _s: &str, _u: &str) -> Result<String, AgenticError> {
        unimplemented!("not used by the pipeline")
    }
    async fn chat_structured(
        &self,
        _system: &str,
        user: &str,
        tool: &ToolDefinition,
    ) -> Result<ToolCallResult, AgenticError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let items = parse_prompt_items(user);
        let poisoned = items.iter().any(|i| {
            i["alias"]
                .as_str()
                .map(|a| self.poison.iter().any(|p| p == a))
                .unwrap_or(false)
        });
        let arguments = if poisoned {
            json!({"renamed": "wrong shape"})
        } else {
            json!({
                "items": items
                    .iter()
                    .map(|i| json!({
                        "alias": i["alias"],
                        "name": format!("STD_{}", i["name"].as_str().unwrap_or_default()),
                    }))
                    .collect::<Vec<_>>()
            })
        };
        Ok(ToolCallResult {
            tool_name: tool.name.clone(),
            arguments,
        })
    }
    fn model_name(&self) -> &str {
        "scripted"
    }
    fn provider_name(&self) -> &str {
        "test"
    }
}

/// Always fails at the transport level.
struct UnreachableClient;

#[async_trait]
impl LlmClient for UnreachableClient {
    async fn chat(&self, _s: &str, _u: &str) -> Result<String, AgenticError> {
        Err(AgenticError::Transport("connection refused".into()))
    }
    async fn chat_json(&self, _s: &str, _u: &str) -> Result<String, AgenticError> {
        Err(AgenticError::Transport("connection refused".into()))
    }
    async fn chat_structured(
        &self,
        _s: &str,
        _u: &str,
        _t: &ToolDefinition,
    ) -> Result<ToolCallResult, AgenticError> {
        Err(AgenticError::Transport("connection refused".into()))
    }
    fn model_name(&self) -> &str {
        "unreachable"
    }
    fn provider_name(&self) -> &str {
        "test"
    }
}

#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ---- fixtures -------------------------------------------------------------

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn bounded_context() -> BoundedContext {
    BoundedContext {
        name: "ordering".into(),
        alias: "주문관리".into(),
        domain: Some("ODR".into()),
        has_api_elements: false,
    }
}

fn fast_config() -> StandardizerConfig {
    let mut config = StandardizerConfig::default();
    config.transformer.max_chunk_retries = 1;
    config.transformer.retry_backoff_ms = 0;
    config
}

fn field(i: usize) -> Field {
    Field {
        name: format!("field{i}"),
        alias: format!("f{i}"),
        refs: vec![RefSpan::new((i as u32 + 1, 1), (i as u32 + 1, 8))],
        ..Default::default()
    }
}

fn draft_with_fields(count: usize) -> Draft {
    Draft::new(vec![StructureItem {
        aggregate: Aggregate {
            name: "OrderDraft".into(),
            alias: "주문".into(),
            refs: vec![RefSpan::new((1, 1), (1, 10))],
            ..Default::default()
        },
        fields: (0..count).map(field).collect(),
        ..Default::default()
    }])
}

// ---- scenarios ------------------------------------------------------------

/// 23 fields, base chunk size 10 → chunks [10,10,3]; chunk 2 returns a
/// wrong-shaped payload on both attempts, so its 10 items come back
/// unchanged with an anomaly while chunks 1 and 3 still succeed.
#[tokio::test]
async fn failing_middle_chunk_does_not_corrupt_siblings() {
    init_tracing();
    let client = Arc::new(RenamingClient::new(&["f10"]));
    let reporter = Arc::new(RecordingReporter::default());
    let standardizer = DraftStandardizer::new(
        Arc::new(EmptySearch),
        client.clone(),
        reporter.clone(),
        fast_config(),
    );

    let input = JobInput::new(draft_with_fields(23), bounded_context());
    let output = standardizer
        .run(input, &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(output.status, JobStatus::Completed);
    let fields = &output.draft.items[0].fields;
    assert_eq!(fields.len(), 23);

    // Chunks 1 and 3 transformed, chunk 2 (f10..f19) untouched.
    for (i, f) in fields.iter().enumerate() {
        if (10..20).contains(&i) {
            assert_eq!(f.name, format!("field{i}"));
        } else {
            assert_eq!(f.name, format!("STD_field{i}"));
        }
    }

    let fallback = output
        .anomalies
        .iter()
        .find_map(|a| match a {
            Anomaly::FallbackChunk {
                chunk_index,
                aliases,
                ..
            } => Some((*chunk_index, aliases.clone())),
            _ => None,
        })
        .expect("fallback anomaly recorded");
    assert_eq!(fallback.0, 1);
    assert_eq!(
        fallback.1,
        (10..20).map(|i| format!("f{i}")).collect::<Vec<_>>()
    );

    // 3 chunks, the poisoned one attempted twice.
    assert_eq!(client.calls.load(Ordering::SeqCst), 4);
    assert_eq!(output.chunks_completed, 2);
    assert_eq!(output.chunks_fallback, 1);

    // Chunk progress arrives in input order, then the job event.
    let events = reporter.events.lock().unwrap();
    let chunk_events: Vec<(Option<usize>, ProgressStatus)> = events
        .iter()
        .filter(|e| e.scope.chunk_index.is_some())
        .map(|e| (e.scope.chunk_index, e.status))
        .collect();
    assert_eq!(
        chunk_events,
        vec![
            (Some(0), ProgressStatus::ChunkCompleted),
            (Some(1), ProgressStatus::ChunkFallback),
            (Some(2), ProgressStatus::ChunkCompleted),
        ]
    );
    assert_eq!(events.last().unwrap().status, ProgressStatus::JobCompleted);
}

/// A deterministic standard hit rewrites the aggregate name before - and
/// without - any generative call.
#[tokio::test]
async fn deterministic_hit_skips_the_generative_collaborator() {
    let client = Arc::new(RenamingClient::new(&[]));
    let standardizer = DraftStandardizer::new(
        Arc::new(FixedStandardSearch {
            score: 0.82,
            structured_data: json!([{"entity_name": "OrderDraft", "table_name": "T_ODR_M"}]),
        }),
        client.clone(),
        Arc::new(NoopProgressReporter),
        fast_config(),
    );

    // Aggregate only: nothing for the chunked transformer to do.
    let input = JobInput::new(draft_with_fields(0), bounded_context());
    let output = standardizer
        .run(input, &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(output.draft.items[0].aggregate.name, "T_ODR_M");
    assert!(output.draft.items[0].aggregate.resolved);
    assert_eq!(output.deterministic_resolved, 1);
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

/// Refs survive an end-to-end transformation byte-for-byte.
#[tokio::test]
async fn refs_are_conserved_across_the_pipeline() {
    let draft = draft_with_fields(12);
    let expected_refs = collect_refs(&draft);

    let standardizer = DraftStandardizer::new(
        Arc::new(EmptySearch),
        Arc::new(RenamingClient::new(&[])),
        Arc::new(NoopProgressReporter),
        fast_config(),
    );
    let output = standardizer
        .run(JobInput::new(draft, bounded_context()), &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(collect_refs(&output.draft), expected_refs);
    assert!(output.draft.items[0].fields.iter().all(|f| f.name.starts_with("STD_")));
    // Empty retrieval means the generative step was told explicitly.
    assert!(output.anomalies.contains(&Anomaly::EmptyMappingContext));
}

/// Internal drafts produce no api_path queries; terminology is always there.
#[tokio::test]
async fn api_path_queries_are_gated_on_the_bounded_context() {
    let search = Arc::new(RecordingSearch::default());
    let standardizer = DraftStandardizer::new(
        search.clone(),
        Arc::new(RenamingClient::new(&[])),
        Arc::new(NoopProgressReporter),
        fast_config(),
    );
    standardizer
        .run(
            JobInput::new(draft_with_fields(1), bounded_context()),
            &CancellationFlag::new(),
        )
        .await
        .unwrap();

    let queries = search.queries.lock().unwrap();
    assert!(!queries.is_empty());
    assert!(queries
        .iter()
        .all(|(_, f)| f.category != Some(StandardCategory::ApiPath)));
    assert!(queries
        .iter()
        .any(|(_, f)| f.category == Some(StandardCategory::Terminology)));
}

/// Cancelling before the first chunk leaves the draft consistent: original
/// names, refs intact, every item present.
#[tokio::test]
async fn cancellation_leaves_a_consistent_draft() {
    let draft = draft_with_fields(23);
    let expected_refs = collect_refs(&draft);

    let cancel = CancellationFlag::new();
    cancel.cancel();

    let standardizer = DraftStandardizer::new(
        Arc::new(EmptySearch),
        Arc::new(RenamingClient::new(&[])),
        Arc::new(NoopProgressReporter),
        fast_config(),
    );
    let output = standardizer
        .run(JobInput::new(draft, bounded_context()), &cancel)
        .await
        .unwrap();

    assert_eq!(output.status, JobStatus::Cancelled);
    assert_eq!(output.draft.items[0].fields.len(), 23);
    assert!(output.draft.items[0]
        .fields
        .iter()
        .all(|f| f.name.starts_with("field")));
    assert_eq!(collect_refs(&output.draft), expected_refs);
}

/// Transport-level failure on every chunk of an item is a job failure, not
/// a silent partial success.
#[tokio::test]
async fn unreachable_collaborator_fails_the_job() {
    let standardizer = DraftStandardizer::new(
        Arc::new(EmptySearch),
        Arc::new(UnreachableClient),
        Arc::new(NoopProgressReporter),
        fast_config(),
    );
    let err = standardizer
        .run(
            JobInput::new(draft_with_fields(5), bounded_context()),
            &CancellationFlag::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StandardizerError::LlmUnavailable { aggregate_alias, .. } if aggregate_alias == "주문"
    ));
}

/// Duplicate aliases are rejected up front.
#[tokio::test]
async fn duplicate_alias_rejects_the_draft() {
    let mut draft = draft_with_fields(1);
    let dup = draft.items[0].clone();
    draft.items.push(dup);

    let standardizer = DraftStandardizer::new(
        Arc::new(EmptySearch),
        Arc::new(RenamingClient::new(&[])),
        Arc::new(NoopProgressReporter),
        fast_config(),
    );
    let err = standardizer
        .run(JobInput::new(draft, bounded_context()), &CancellationFlag::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StandardizerError::InvalidDraft(_)));
}
