//! Draft structure model.
//!
//! Wire format is camelCase JSON. Absent nested collections deserialize as
//! empty - the upstream generator omits them freely.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DraftError;
use crate::refs::Refs;

fn is_false(b: &bool) -> bool {
    !*b
}

/// Aggregate root of one structure item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Aggregate {
    pub name: String,
    pub alias: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub refs: Refs,
    /// Set by the deterministic mapping pass; tells the generative step not
    /// to re-derive this name.
    #[serde(skip_serializing_if = "is_false")]
    pub resolved: bool,
}

/// Enumeration nested under an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Enumeration {
    pub name: String,
    pub alias: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub refs: Refs,
    #[serde(skip_serializing_if = "is_false")]
    pub resolved: bool,
}

/// Value object nested under an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ValueObject {
    pub name: String,
    pub alias: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub refs: Refs,
    #[serde(skip_serializing_if = "is_false")]
    pub resolved: bool,
}

/// Field (attribute) of an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Field {
    pub name: String,
    pub alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub is_key: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub refs: Refs,
    #[serde(skip_serializing_if = "is_false")]
    pub resolved: bool,
}

/// Uniform access to the name/alias/refs of any draft element.
///
/// The alias is the element's stable identity across the transformation; the
/// name is the only thing the standardization pipeline rewrites.
pub trait DraftElement {
    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
    fn alias(&self) -> &str;
    fn refs(&self) -> &Refs;
    fn refs_mut(&mut self) -> &mut Refs;
    fn is_resolved(&self) -> bool;
    fn mark_resolved(&mut self);
}

macro_rules! impl_draft_element {
    ($ty:ty) => {
        impl DraftElement for $ty {
            fn name(&self) -> &str {
                &self.name
            }
            fn set_name(&mut self, name: String) {
                self.name = name;
            }
            fn alias(&self) -> &str {
                &self.alias
            }
            fn refs(&self) -> &Refs {
                &self.refs
            }
            fn refs_mut(&mut self) -> &mut Refs {
                &mut self.refs
            }
            fn is_resolved(&self) -> bool {
                self.resolved
            }
            fn mark_resolved(&mut self) {
                self.resolved = true;
            }
        }
    };
}

impl_draft_element!(Aggregate);
impl_draft_element!(Enumeration);
impl_draft_element!(ValueObject);
impl_draft_element!(Field);

/// One aggregate plus its nested collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct StructureItem {
    pub aggregate: Aggregate,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enumerations: Vec<Enumeration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub value_objects: Vec<ValueObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
}

/// The draft: an ordered collection of structure items, owned by one job for
/// its lifetime and mutated in place during transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Draft {
    pub items: Vec<StructureItem>,
}

impl Draft {
    pub fn new(items: Vec<StructureItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Reject drafts whose aliases cannot serve as identities: an element
    /// without an alias, two aggregates sharing an alias, or two properties
    /// of the same aggregate sharing one.
    pub fn validate(&self) -> Result<(), DraftError> {
        let mut aggregate_aliases = HashSet::new();
        for item in &self.items {
            check_alias(&item.aggregate.name, &item.aggregate.alias)?;
            if !aggregate_aliases.insert(item.aggregate.alias.clone()) {
                return Err(DraftError::DuplicateAlias {
                    alias: item.aggregate.alias.clone(),
                });
            }

            let mut property_aliases = HashSet::new();
            let properties = item
                .enumerations
                .iter()
                .map(|e| (&e.name, &e.alias))
                .chain(item.value_objects.iter().map(|v| (&v.name, &v.alias)))
                .chain(item.fields.iter().map(|f| (&f.name, &f.alias)));
            for (name, alias) in properties {
                check_alias(name, alias)?;
                if !property_aliases.insert(alias.clone()) {
                    return Err(DraftError::DuplicateAlias {
                        alias: alias.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn check_alias(name: &str, alias: &str) -> Result<(), DraftError> {
    if alias.trim().is_empty() {
        return Err(DraftError::MissingAlias {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Which nested collection of a structure item is being worked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyType {
    Fields,
    Enumerations,
    ValueObjects,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::Fields => write!(f, "fields"),
            PropertyType::Enumerations => write!(f, "enumerations"),
            PropertyType::ValueObjects => write!(f, "valueObjects"),
        }
    }
}

/// Bounded context descriptor supplied with the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BoundedContext {
    pub name: String,
    pub alias: String,
    /// Domain hint (e.g. "ODR", "CPN") forwarded to retrieval queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Drafts with API-facing elements also get api_path standard queries.
    pub has_api_elements: bool,
}
