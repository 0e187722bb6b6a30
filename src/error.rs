//! Error types for segmentctl
//!
//! Every failure is fatal for the current invocation: there are no internal
//! retries and no rollback. At most one mutating call is issued per
//! invocation, so a failed run never leaves partial state behind.

use thiserror::Error;

/// Classification of a policy engine API failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The engine returned 404 for an operation that requires the object
    NotFound,
    /// Authentication or authorization failure (401/403)
    Unauthorized,
    /// The request conflicts with remote state (406/409)
    Conflict,
    /// The engine is throttling requests (429)
    RateLimited,
    /// The request never produced an HTTP response
    Transport,
    /// The engine failed internally (5xx)
    ServerError,
}

impl std::fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ApiErrorKind::NotFound => "not found",
            ApiErrorKind::Unauthorized => "unauthorized",
            ApiErrorKind::Conflict => "conflict",
            ApiErrorKind::RateLimited => "rate limited",
            ApiErrorKind::Transport => "transport error",
            ApiErrorKind::ServerError => "server error",
        };
        f.write_str(s)
    }
}

/// A failed call to the policy engine API.
///
/// `context` names the operation and target ("failed to update label
/// /orgs/1/labels/1500"); `message` carries the engine's response verbatim.
#[derive(Debug, Error)]
#[error("{context}: {message} ({kind})")]
pub struct ApiError {
    /// Failure classification
    pub kind: ApiErrorKind,
    /// Which call failed, against which object
    pub context: String,
    /// Engine-supplied detail, passed through verbatim
    pub message: String,
}

impl ApiError {
    /// Create an ApiError with the given classification and context
    pub fn new(kind: ApiErrorKind, context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            context: context.into(),
            message: message.into(),
        }
    }
}

/// Main error type for segmentctl operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed or contradictory invocation inputs, detected before any
    /// remote call
    #[error("validation error: {0}")]
    Validation(String),

    /// An explicitly supplied identifier referenced no existing object
    #[error("not found: {0}")]
    NotFound(String),

    /// A natural-key lookup matched more than one remote object
    #[error("ambiguous lookup: multiple {kind} objects match {filter}")]
    AmbiguousLookup {
        /// Resource kind being looked up
        kind: &'static str,
        /// The natural-key filter that matched more than once
        filter: String,
    },

    /// An update would change a field the kind forbids changing after creation
    #[error("cannot change {field} of an existing {kind}")]
    ImmutableField {
        /// Resource kind being updated
        kind: &'static str,
        /// The frozen field the update would have changed
        field: &'static str,
    },

    /// Policy engine API error
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not-found error with the given message
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_includes_context_and_kind() {
        let err = ApiError::new(
            ApiErrorKind::Conflict,
            "failed to create label",
            "key already in use",
        );
        let msg = err.to_string();
        assert!(msg.contains("failed to create label"));
        assert!(msg.contains("key already in use"));
        assert!(msg.contains("conflict"));
    }

    #[test]
    fn immutable_field_display_names_kind_and_field() {
        let err = Error::ImmutableField {
            kind: "label",
            field: "key",
        };
        assert_eq!(err.to_string(), "cannot change key of an existing label");
    }
}
