use {std::path::PathBuf, thiserror::Error};

use crate::validate::{ValidationErrors, ViolationKind};

/// Everything that can stop a configuration from loading.
///
/// Loading is all-or-nothing: any of these means no [`crate::Configuration`]
/// was produced.
#[derive(Error, Debug)]
pub enum Error {
    #[error("environment variable '{name}' not found")]
    MissingEnvironmentVariable { name: String },

    #[error("reference path '{path}' not found")]
    ReferenceNotFound { path: String },

    /// `chain` lists the paths in resolution order, ending with the path
    /// that was re-entered.
    #[error("circular reference detected: {}", chain.join(" -> "))]
    CircularReference { chain: Vec<String> },

    #[error("reference '{reference}' resolves to a {found} and cannot be embedded in a string")]
    EmbeddedNonScalar {
        reference: String,
        found: &'static str,
    },

    #[error("unresolved placeholder at '{path}': {value}")]
    UnresolvedPlaceholder { path: String, value: String },

    #[error("configuration validation failed ({n} violation(s)):\n{0}", n = .0.len())]
    SchemaValidation(ValidationErrors),

    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("unsupported config format: .{extension}")]
    UnsupportedFormat { extension: String },
}

impl Error {
    /// The individual violations, when this is a validation failure.
    #[must_use]
    pub fn violations(&self) -> Option<&ValidationErrors> {
        match self {
            Self::SchemaValidation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Returns `true` when a string survived where a resolved object was
    /// expected (a model or tool reference that never turned into an entity).
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        match self {
            Self::UnresolvedPlaceholder { .. } => true,
            Self::SchemaValidation(errors) => errors
                .iter()
                .any(|v| v.kind == ViolationKind::Unresolved),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use {super::*, crate::validate::Violation};

    #[test]
    fn schema_validation_message_counts_and_lists_violations() {
        let err = Error::SchemaValidation(ValidationErrors::from(vec![
            Violation::field("models.m.id", "must not be empty"),
            Violation::unresolved("agents.a.model", "not resolved"),
        ]));
        assert_eq!(
            err.to_string(),
            "configuration validation failed (2 violation(s)):\n  - [field] models.m.id: must not be \
             empty\n  - [unresolved] agents.a.model: not resolved"
        );
        assert!(err.is_unresolved());
        assert_eq!(err.violations().map(|v| v.count(ViolationKind::Field)), Some(1));
    }
}
