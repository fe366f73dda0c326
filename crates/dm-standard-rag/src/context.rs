//! Session-scoped mapping context built from retrieved standards.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::types::StandardSearchResult;

/// Lookup tables extracted from retrieved standard records, scoped to one
/// transformation session and torn down with it.
///
/// Exact lookups hit the primary tables; a normalized (lowercased,
/// whitespace-collapsed) secondary index is built once at construction so
/// near-miss lookups stay O(1) for the whole job.
#[derive(Debug, Default)]
pub struct StandardMappingContext {
    session_id: String,
    entity_to_table: HashMap<String, String>,
    name_to_domain: HashMap<String, String>,
    normalized_entities: HashMap<String, String>,
    normalized_names: HashMap<String, String>,
    raw_results: Vec<StandardSearchResult>,
}

impl StandardMappingContext {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// No mappings could be extracted; the generative step must be told
    /// "no deterministic standard found" instead of silently guessing.
    pub fn is_empty(&self) -> bool {
        self.entity_to_table.is_empty() && self.name_to_domain.is_empty()
    }

    /// Entity display name -> standard table name, exact then normalized.
    pub fn lookup_entity(&self, name: &str) -> Option<&str> {
        self.entity_to_table
            .get(name)
            .or_else(|| self.normalized_entities.get(&normalize(name)))
            .map(String::as_str)
    }

    /// Column/term name -> standard domain wording, exact then normalized.
    pub fn lookup_name(&self, name: &str) -> Option<&str> {
        self.name_to_domain
            .get(name)
            .or_else(|| self.normalized_names.get(&normalize(name)))
            .map(String::as_str)
    }

    pub fn entity_mappings(&self) -> &HashMap<String, String> {
        &self.entity_to_table
    }

    pub fn name_mappings(&self) -> &HashMap<String, String> {
        &self.name_to_domain
    }

    /// Every retrieved snippet, in retrieval order, for prompt excerpts.
    pub fn raw_results(&self) -> &[StandardSearchResult] {
        &self.raw_results
    }
}

impl Drop for StandardMappingContext {
    fn drop(&mut self) {
        // Session index must not outlive the job.
        debug!(session_id = %self.session_id, "tearing down mapping session index");
    }
}

/// Parses retrieved standard records into the mapping context.
pub struct MappingContextBuilder;

/// Relation keys recognized in structured records.
const ENTITY_KEY: &str = "entity_name";
const TABLE_KEY: &str = "table_name";
const COLUMN_KEY: &str = "column_name";
const TERM_KEY: &str = "term";
const DESCRIPTION_KEY: &str = "description";

impl MappingContextBuilder {
    /// Build the context from de-duplicated retrieval results. Unparseable
    /// payloads are skipped, never fatal.
    pub fn build(
        results: Vec<StandardSearchResult>,
        session_id: impl Into<String>,
    ) -> StandardMappingContext {
        let session_id = session_id.into();
        let mut entity_to_table = HashMap::new();
        let mut name_to_domain = HashMap::new();
        let mut skipped = 0usize;

        for result in &results {
            let records = parse_records(&result.structured_data);
            if records.is_empty() && !result.structured_data.is_null() {
                skipped += 1;
                continue;
            }
            for record in records {
                let field = |key: &str| record.get(key).and_then(Value::as_str);
                if let (Some(entity), Some(table)) = (field(ENTITY_KEY), field(TABLE_KEY)) {
                    entity_to_table.insert(entity.to_string(), table.to_string());
                }
                if let (Some(column), Some(description)) =
                    (field(COLUMN_KEY), field(DESCRIPTION_KEY))
                {
                    name_to_domain.insert(column.to_string(), description.to_string());
                }
                if let (Some(term), Some(description)) = (field(TERM_KEY), field(DESCRIPTION_KEY))
                {
                    name_to_domain.insert(term.to_string(), description.to_string());
                }
            }
        }

        let normalized_entities = normalized_index(&entity_to_table);
        let normalized_names = normalized_index(&name_to_domain);

        debug!(
            session_id = %session_id,
            entities = entity_to_table.len(),
            names = name_to_domain.len(),
            skipped,
            "mapping context built"
        );

        StandardMappingContext {
            session_id,
            entity_to_table,
            name_to_domain,
            normalized_entities,
            normalized_names,
            raw_results: results,
        }
    }
}

/// Lowercase + collapse internal whitespace; the near-miss key form.
pub fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn normalized_index(table: &HashMap<String, String>) -> HashMap<String, String> {
    table
        .iter()
        .map(|(k, v)| (normalize(k), v.clone()))
        .collect()
}

/// Accepts an object, an array of objects, or a JSON string containing
/// either - the indexer serializes row records in both forms. Anything else
/// yields no records.
fn parse_records(structured_data: &Value) -> Vec<serde_json::Map<String, Value>> {
    match structured_data {
        Value::Object(map) => vec![map.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_object().cloned())
            .collect(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => parse_records(&parsed),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result_with(structured_data: Value) -> StandardSearchResult {
        StandardSearchResult {
            text: "snippet".into(),
            standard_type: "database_standard".into(),
            category: "table_name".into(),
            structured_data,
            score: 0.8,
        }
    }

    #[test]
    fn extracts_entity_and_column_relations() {
        let context = MappingContextBuilder::build(
            vec![result_with(json!([
                {"entity_name": "Order", "table_name": "T_ODR_M"},
                {"column_name": "orderId", "description": "ODR_ID"},
            ]))],
            "session-a",
        );
        assert_eq!(context.lookup_entity("Order"), Some("T_ODR_M"));
        assert_eq!(context.lookup_name("orderId"), Some("ODR_ID"));
        assert!(!context.is_empty());
    }

    #[test]
    fn json_string_payloads_are_parsed() {
        let payload = r#"{"entity_name": "Coupon", "table_name": "T_CPN_M"}"#;
        let context =
            MappingContextBuilder::build(vec![result_with(json!(payload))], "session-a");
        assert_eq!(context.lookup_entity("Coupon"), Some("T_CPN_M"));
    }

    #[test]
    fn normalized_lookup_tolerates_case_and_whitespace() {
        let context = MappingContextBuilder::build(
            vec![result_with(json!({"entity_name": "Order History", "table_name": "T_ODR_H"}))],
            "session-a",
        );
        assert_eq!(context.lookup_entity("order   history"), Some("T_ODR_H"));
        assert_eq!(context.lookup_entity("ORDER HISTORY"), Some("T_ODR_H"));
    }

    #[test]
    fn unparseable_payloads_are_skipped_not_fatal() {
        let context = MappingContextBuilder::build(
            vec![
                result_with(json!("not json at all")),
                result_with(json!(42)),
                result_with(json!({"entity_name": "Order", "table_name": "T_ODR_M"})),
            ],
            "session-a",
        );
        assert_eq!(context.lookup_entity("Order"), Some("T_ODR_M"));
    }

    #[test]
    fn empty_context_is_flagged() {
        let context = MappingContextBuilder::build(vec![result_with(Value::Null)], "session-a");
        assert!(context.is_empty());
        assert_eq!(context.session_id(), "session-a");
    }
}
