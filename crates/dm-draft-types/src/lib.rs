//! Shared draft model types
//!
//! The domain-model draft as produced by the upstream draft generator:
//! an ordered list of structure items, each holding one aggregate plus its
//! enumerations, value objects and fields. Every nameable element carries an
//! alias (its stable identity) and optional provenance refs.
//!
//! This crate is the single source of truth for draft shapes crossing the
//! pipeline boundary. It has no I/O and no async - pure data plus the refs
//! strip/restore operations that the conservation invariants depend on.

pub mod draft;
pub mod error;
pub mod refs;

pub use draft::{
    Aggregate, BoundedContext, Draft, DraftElement, Enumeration, Field, PropertyType,
    StructureItem, ValueObject,
};
pub use error::DraftError;
pub use refs::{collect_refs, restore_refs, strip_refs, RefAnomaly, RefSpan, RefTable, Refs};
