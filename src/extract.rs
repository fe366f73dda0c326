//! Name extraction from a draft.

use std::collections::HashSet;

use dm_draft_types::Draft;

/// Collect the ordered, distinct display names of aggregates, enumerations
/// and value objects. Raw fields are skipped to bound query volume; their
/// standards arrive through the structured records of the broader queries.
///
/// Absent or empty nested collections contribute nothing - never an error.
pub fn extract_names(draft: &Draft) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    let mut push = |name: &str| {
        let name = name.trim();
        if !name.is_empty() && seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
    };

    for item in &draft.items {
        push(&item.aggregate.name);
        for e in &item.enumerations {
            push(&e.name);
        }
        for v in &item.value_objects {
            push(&v.name);
        }
    }
    names
}
