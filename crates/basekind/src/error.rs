use thiserror::Error;

/// Failure of a derived geometry computation (area, centroid).
///
/// These never abort a feature: callers match on the error, log it and fall
/// back to a default.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("feature {id} has no {what} available")]
    Unavailable { id: u64, what: &'static str },

    #[error("feature {id} has a non-finite {what}")]
    NonFinite { id: u64, what: &'static str },
}

/// Problems found while building a [`crate::matcher::MatchIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule #{rule} has no actions")]
    NoActions { rule: usize },

    #[error("rule #{rule} references an empty tag key")]
    EmptyKey { rule: usize },

    #[error("rule #{rule} assigns to an empty attribute name")]
    EmptyAttribute { rule: usize },

    #[error("rule #{rule} tests key `{key}` against an empty value set")]
    EmptyValueSet { rule: usize, key: String },

    #[error(
        "attribute `{attr}` is set to a {found} literal in rule #{rule}, \
         but to a {expected} literal in an earlier rule"
    )]
    InconsistentType {
        rule: usize,
        attr: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Invalid merge policy configuration.
#[derive(Debug, Error)]
pub enum MergeConfigError {
    #[error("merge table for layer `{layer}` has no zoom bands")]
    EmptyTable { layer: String },

    #[error(
        "merge table for layer `{layer}`: band up_to_zoom {found} does not \
         follow {previous}"
    )]
    UnorderedBands {
        layer: String,
        previous: u8,
        found: u8,
    },

    #[error("merge table for layer `{layer}`: `{field}` must be finite and >= 0, got {value}")]
    BadValue {
        layer: String,
        field: &'static str,
        value: f64,
    },

    #[error("failed to parse merge policy: {0}")]
    Parse(#[from] serde_json::Error),
}
