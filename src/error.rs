//! Error types for signature computation and hook invocation.

/// Errors raised while resolving an operation or computing its signature.
///
/// These surface to whoever requested the signature. A malformed document
/// yields a distinguishable error instead of a silently mis-grouped
/// signature string.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// The query text could not be parsed into a document.
    #[error("GraphQL parse error: {0}")]
    Parse(#[from] async_graphql_parser::Error),

    /// A fragment transitively spreads itself.
    #[error("fragment '{0}' spreads itself cyclically")]
    CyclicFragment(String),

    /// A fragment spread names a fragment the document does not define.
    #[error("unknown fragment '{0}'")]
    UnknownFragment(String),

    /// The document declares no executable operation.
    #[error("document declares no operation")]
    UnknownOperationType,

    /// The requested operation name is not defined in the document.
    #[error("operation '{0}' not found in document")]
    OperationNotFound(String),

    /// The document defines multiple operations and no name was given.
    #[error("document defines multiple operations but no operation name was given")]
    AmbiguousOperation,
}

impl SignatureError {
    /// Stable machine-readable code, suitable for metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "PARSE_ERROR",
            Self::CyclicFragment(_) => "CYCLIC_FRAGMENT",
            Self::UnknownFragment(_) => "UNKNOWN_FRAGMENT",
            Self::UnknownOperationType => "UNKNOWN_OPERATION_TYPE",
            Self::OperationNotFound(_) => "OPERATION_NOT_FOUND",
            Self::AmbiguousOperation => "AMBIGUOUS_OPERATION",
        }
    }
}

/// Errors raised by a registered hook or by the correlator's bookkeeping.
///
/// Hook errors are isolated at the registry boundary: they are logged and
/// handed to the [`ErrorReporter`](crate::hooks::ErrorReporter), never
/// propagated into the host engine's query result.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// An execution record already exists for this token. Indicates a
    /// wiring bug in the host engine's lifecycle callbacks.
    #[error("duplicate execution record for token '{0}'")]
    DuplicateExecution(String),

    /// A field or completion event arrived for a token with no live
    /// execution record.
    #[error("no execution record for token '{0}'")]
    UnknownExecution(String),

    /// A hook-specific failure.
    #[error("{0}")]
    Failed(String),
}

impl HookError {
    /// Build a hook-specific failure from any message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_error_codes() {
        assert_eq!(
            SignatureError::CyclicFragment("f".into()).code(),
            "CYCLIC_FRAGMENT"
        );
        assert_eq!(
            SignatureError::UnknownOperationType.code(),
            "UNKNOWN_OPERATION_TYPE"
        );
        assert_eq!(
            SignatureError::AmbiguousOperation.code(),
            "AMBIGUOUS_OPERATION"
        );
    }

    #[test]
    fn test_signature_error_display() {
        let err = SignatureError::CyclicFragment("userFields".into());
        assert!(err.to_string().contains("userFields"));

        let err = SignatureError::OperationNotFound("GetUser".into());
        assert!(err.to_string().contains("GetUser"));
    }

    #[test]
    fn test_hook_error_display() {
        let err = HookError::DuplicateExecution("exec-1".into());
        assert!(err.to_string().contains("exec-1"));

        let err = HookError::failed("sink unavailable");
        assert_eq!(err.to_string(), "sink unavailable");
    }
}
