//! Deterministic name substitution.
//!
//! Exact or normalized hits against the mapping context are applied
//! directly on the draft before anything reaches the generative
//! collaborator. Resolved items are skipped on later passes, which makes
//! the whole pass idempotent and order-independent. No I/O happens here.

use tracing::debug;

use dm_draft_types::{Draft, DraftElement};
use dm_standard_rag::StandardMappingContext;

/// Apply every resolvable substitution in place; returns how many items
/// were resolved.
pub fn apply_deterministic_mappings(draft: &mut Draft, context: &StandardMappingContext) -> usize {
    let mut resolved = 0usize;

    for item in &mut draft.items {
        resolved += resolve(&mut item.aggregate, |n| context.lookup_entity(n));
        for e in &mut item.enumerations {
            resolved += resolve(e, |n| context.lookup_entity(n));
        }
        for v in &mut item.value_objects {
            resolved += resolve(v, |n| context.lookup_entity(n));
        }
        for f in &mut item.fields {
            resolved += resolve(f, |n| context.lookup_name(n));
        }
    }

    if resolved > 0 {
        debug!(resolved, "deterministic substitutions applied");
    }
    resolved
}

fn resolve<'c, E, F>(element: &mut E, lookup: F) -> usize
where
    E: DraftElement,
    F: Fn(&str) -> Option<&'c str>,
{
    if element.is_resolved() {
        return 0;
    }
    match lookup(element.name()) {
        Some(standard) => {
            let standard = standard.to_string();
            element.set_name(standard);
            element.mark_resolved();
            1
        }
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dm_draft_types::{Aggregate, Field, StructureItem};
    use dm_standard_rag::{MappingContextBuilder, StandardSearchResult};
    use serde_json::json;

    fn context() -> StandardMappingContext {
        MappingContextBuilder::build(
            vec![StandardSearchResult {
                text: "주문정보 Order m_odr".into(),
                standard_type: "database_standard".into(),
                category: "table_name".into(),
                structured_data: json!([
                    {"entity_name": "OrderDraft", "table_name": "T_ODR_M"},
                    {"column_name": "orderId", "description": "ODR_ID"},
                ]),
                score: 0.82,
            }],
            "session-a",
        )
    }

    fn draft() -> Draft {
        Draft::new(vec![StructureItem {
            aggregate: Aggregate {
                name: "OrderDraft".into(),
                alias: "주문".into(),
                ..Default::default()
            },
            fields: vec![
                Field {
                    name: "orderId".into(),
                    alias: "주문번호".into(),
                    ..Default::default()
                },
                Field {
                    name: "somethingElse".into(),
                    alias: "기타".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }])
    }

    #[test]
    fn exact_hits_substitute_and_mark_resolved() {
        let mut draft = draft();
        let resolved = apply_deterministic_mappings(&mut draft, &context());
        assert_eq!(resolved, 2);
        assert_eq!(draft.items[0].aggregate.name, "T_ODR_M");
        assert!(draft.items[0].aggregate.resolved);
        assert_eq!(draft.items[0].fields[0].name, "ODR_ID");
        // No mapping: untouched, unresolved.
        assert_eq!(draft.items[0].fields[1].name, "somethingElse");
        assert!(!draft.items[0].fields[1].resolved);
    }

    #[test]
    fn normalized_hits_tolerate_case() {
        let mut draft = draft();
        draft.items[0].aggregate.name = "orderdraft".into();
        let resolved = apply_deterministic_mappings(&mut draft, &context());
        assert_eq!(resolved, 2);
        assert_eq!(draft.items[0].aggregate.name, "T_ODR_M");
    }

    #[test]
    fn pass_is_idempotent() {
        let mut draft = draft();
        let ctx = context();
        apply_deterministic_mappings(&mut draft, &ctx);
        let once = draft.clone();
        let second = apply_deterministic_mappings(&mut draft, &ctx);
        assert_eq!(second, 0);
        assert_eq!(draft, once);
    }
}
