//! Retrieval query construction.

use dm_draft_types::BoundedContext;
use dm_standard_rag::{StandardCategory, StandardQuery};

/// Categories queried per name, in emission order. `ApiPath` is appended
/// only for drafts with API-facing elements; `Terminology` is always
/// present.
const CATEGORY_SEQUENCE: [StandardCategory; 2] =
    [StandardCategory::TableName, StandardCategory::Terminology];

/// Build the query batch: grouped by name, sub-ordered by the fixed
/// category sequence, so identical inputs yield byte-identical lists.
///
/// The query text is only the short display name - the category is carried
/// out-of-band as a retrieval filter, never concatenated into the text, to
/// keep recall high.
pub fn build_queries(names: &[String], bounded_context: &BoundedContext) -> Vec<StandardQuery> {
    let mut queries = Vec::new();
    for name in names {
        let short = short_display_name(name);
        if short.is_empty() {
            continue;
        }
        for category in CATEGORY_SEQUENCE {
            queries.push(StandardQuery::new(
                short,
                category,
                bounded_context.domain.clone(),
            ));
        }
        if bounded_context.has_api_elements {
            queries.push(StandardQuery::new(
                short,
                StandardCategory::ApiPath,
                bounded_context.domain.clone(),
            ));
        }
    }
    queries
}

/// Strip qualifiers: "ordering.OrderDraft" queries as "OrderDraft".
fn short_display_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name).trim()
}
