//! Draft validation errors.

use thiserror::Error;

/// Structural problems that make a draft unusable as pipeline input.
///
/// Aliases are the identity used for ref restoration, so an absent or
/// ambiguous alias is rejected up front rather than silently merged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DraftError {
    #[error("duplicate alias '{alias}' in draft")]
    DuplicateAlias { alias: String },

    #[error("draft element '{name}' is missing an alias")]
    MissingAlias { name: String },
}
