//! Provenance refs: strip before generation, restore after.
//!
//! A ref links a draft element back to the source requirement text as a pair
//! of positions, serialized `[[startLine, startCol], [endLine, endCol]]`.
//! Refs are opaque to the standardization pipeline and must survive it
//! byte-for-byte: they are removed before anything is sent to the generative
//! collaborator and re-attached afterwards by alias identity, so the
//! collaborator can neither see, drop, nor invent them.
//!
//! Identity of a ref owner is the `(aggregate alias, property alias)` pair;
//! the aggregate element itself is keyed as `(alias, alias)`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::draft::{Draft, DraftElement, StructureItem};

/// One provenance span: `[[start_line, start_col], [end_line, end_col]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefSpan(pub [[u32; 2]; 2]);

impl RefSpan {
    pub fn new(start: (u32, u32), end: (u32, u32)) -> Self {
        Self([[start.0, start.1], [end.0, end.1]])
    }
}

pub type Refs = Vec<RefSpan>;

/// Side table of refs keyed by `(aggregate alias, property alias)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefTable {
    entries: HashMap<(String, String), Refs>,
}

impl RefTable {
    pub fn get(&self, aggregate_alias: &str, property_alias: &str) -> Option<&Refs> {
        self.entries
            .get(&(aggregate_alias.to_string(), property_alias.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, aggregate_alias: &str, property_alias: &str, refs: Refs) {
        if !refs.is_empty() {
            self.entries
                .insert((aggregate_alias.to_string(), property_alias.to_string()), refs);
        }
    }
}

/// A transformed element whose alias no longer matches anything in the
/// original draft. Its refs default to empty rather than being guessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefAnomaly {
    pub aggregate_alias: String,
    pub property_alias: String,
}

/// Collect every non-empty ref in the draft into a side table.
pub fn collect_refs(draft: &Draft) -> RefTable {
    let mut table = RefTable::default();
    for item in &draft.items {
        let agg_alias = item.aggregate.alias.clone();
        table.insert(&agg_alias, &agg_alias, item.aggregate.refs.clone());
        for e in &item.enumerations {
            table.insert(&agg_alias, &e.alias, e.refs.clone());
        }
        for v in &item.value_objects {
            table.insert(&agg_alias, &v.alias, v.refs.clone());
        }
        for f in &item.fields {
            table.insert(&agg_alias, &f.alias, f.refs.clone());
        }
    }
    table
}

/// Produce a refs-free copy of the draft plus the side table of everything
/// that was removed.
pub fn strip_refs(draft: &Draft) -> (Draft, RefTable) {
    let table = collect_refs(draft);
    let mut stripped = draft.clone();
    for item in &mut stripped.items {
        item.aggregate.refs.clear();
        for e in &mut item.enumerations {
            e.refs.clear();
        }
        for v in &mut item.value_objects {
            v.refs.clear();
        }
        for f in &mut item.fields {
            f.refs.clear();
        }
    }
    (stripped, table)
}

/// Merge the transformed names back onto the ref-bearing original.
///
/// The original is deep-copied; every transformed element found in it by
/// alias overwrites only the name-bearing fields, leaving refs untouched.
/// Transformed elements with no counterpart are appended with empty refs and
/// reported - never guessed, never a crash.
pub fn restore_refs(original: &Draft, transformed: &Draft) -> (Draft, Vec<RefAnomaly>) {
    let mut merged = original.clone();
    let mut anomalies = Vec::new();

    // Alias -> position index, built once per restore call.
    let aggregate_index: HashMap<String, usize> = merged
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| (item.aggregate.alias.clone(), i))
        .collect();

    for t_item in &transformed.items {
        let agg_alias = t_item.aggregate.alias.clone();
        match aggregate_index.get(&agg_alias) {
            Some(&i) => {
                let target = &mut merged.items[i];
                overwrite_names(&mut target.aggregate, &t_item.aggregate);
                merge_collection(
                    &agg_alias,
                    &mut target.enumerations,
                    &t_item.enumerations,
                    &mut anomalies,
                );
                merge_collection(
                    &agg_alias,
                    &mut target.value_objects,
                    &t_item.value_objects,
                    &mut anomalies,
                );
                merge_collection(&agg_alias, &mut target.fields, &t_item.fields, &mut anomalies);
            }
            None => {
                let mut orphan = t_item.clone();
                clear_item_refs(&mut orphan);
                anomalies.push(RefAnomaly {
                    aggregate_alias: agg_alias.clone(),
                    property_alias: agg_alias,
                });
                merged.items.push(orphan);
            }
        }
    }

    (merged, anomalies)
}

fn overwrite_names<E: DraftElement>(target: &mut E, source: &E) {
    target.set_name(source.name().to_string());
    if source.is_resolved() {
        target.mark_resolved();
    }
}

fn merge_collection<E: DraftElement + Clone>(
    aggregate_alias: &str,
    target: &mut Vec<E>,
    transformed: &[E],
    anomalies: &mut Vec<RefAnomaly>,
) {
    let index: HashMap<String, usize> = target
        .iter()
        .enumerate()
        .map(|(i, e)| (e.alias().to_string(), i))
        .collect();

    for t in transformed {
        match index.get(t.alias()) {
            Some(&i) => overwrite_names(&mut target[i], t),
            None => {
                let mut orphan = t.clone();
                orphan.refs_mut().clear();
                anomalies.push(RefAnomaly {
                    aggregate_alias: aggregate_alias.to_string(),
                    property_alias: t.alias().to_string(),
                });
                target.push(orphan);
            }
        }
    }
}

fn clear_item_refs(item: &mut StructureItem) {
    item.aggregate.refs.clear();
    for e in &mut item.enumerations {
        e.refs.clear();
    }
    for v in &mut item.value_objects {
        v.refs.clear();
    }
    for f in &mut item.fields {
        f.refs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{Aggregate, Field, StructureItem};

    fn sample_draft() -> Draft {
        Draft::new(vec![StructureItem {
            aggregate: Aggregate {
                name: "OrderDraft".into(),
                alias: "주문".into(),
                refs: vec![RefSpan::new((3, 1), (3, 14))],
                ..Default::default()
            },
            fields: vec![
                Field {
                    name: "orderId".into(),
                    alias: "주문번호".into(),
                    refs: vec![RefSpan::new((4, 2), (4, 9))],
                    ..Default::default()
                },
                Field {
                    name: "orderedAt".into(),
                    alias: "주문일시".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }])
    }

    #[test]
    fn ref_span_serializes_as_position_pairs() {
        let span = RefSpan::new((3, 1), (3, 14));
        assert_eq!(serde_json::to_string(&span).unwrap(), "[[3,1],[3,14]]");
    }

    #[test]
    fn strip_removes_every_ref_and_records_it() {
        let draft = sample_draft();
        let (stripped, table) = strip_refs(&draft);
        assert!(stripped.items[0].aggregate.refs.is_empty());
        assert!(stripped.items[0].fields[0].refs.is_empty());
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get("주문", "주문번호").unwrap()[0],
            RefSpan::new((4, 2), (4, 9))
        );
    }

    #[test]
    fn restore_conserves_refs_under_alias_preserving_rename() {
        let original = sample_draft();
        let (mut transformed, _) = strip_refs(&original);
        transformed.items[0].aggregate.name = "T_ODR_M".into();
        transformed.items[0].fields[0].name = "ODR_ID".into();

        let (merged, anomalies) = restore_refs(&original, &transformed);
        assert!(anomalies.is_empty());
        assert_eq!(merged.items[0].aggregate.name, "T_ODR_M");
        assert_eq!(merged.items[0].fields[0].name, "ODR_ID");
        assert_eq!(collect_refs(&merged), collect_refs(&original));
    }

    #[test]
    fn invented_alias_gets_empty_refs_and_an_anomaly() {
        let original = sample_draft();
        let (mut transformed, _) = strip_refs(&original);
        transformed.items[0].fields.push(Field {
            name: "ODR_AMT".into(),
            alias: "주문금액".into(),
            refs: vec![RefSpan::new((9, 9), (9, 12))],
            ..Default::default()
        });

        let (merged, anomalies) = restore_refs(&original, &transformed);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].property_alias, "주문금액");
        let invented = merged.items[0]
            .fields
            .iter()
            .find(|f| f.alias == "주문금액")
            .unwrap();
        assert!(invented.refs.is_empty());
        // The original items are all still present.
        assert_eq!(merged.items[0].fields.len(), 3);
    }

    #[test]
    fn dropped_item_is_kept_from_the_original() {
        let original = sample_draft();
        let (mut transformed, _) = strip_refs(&original);
        transformed.items[0].fields.remove(1);

        let (merged, anomalies) = restore_refs(&original, &transformed);
        assert!(anomalies.is_empty());
        assert_eq!(merged.items[0].fields.len(), 2);
        assert_eq!(merged.items[0].fields[1].name, "orderedAt");
    }
}
