use crate::FormattedError;
use thiserror::Error;

/// Errors returned by a dialect adapter (`Connection`/`DbDriver`).
///
/// Variants carrying `FormattedError` preserve structured information
/// (detail, hint, code, location) extracted from the underlying driver.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(FormattedError),

    #[error("{0}")]
    QueryFailed(FormattedError),

    #[error("Authentication failed: {0}")]
    AuthFailed(FormattedError),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(FormattedError),

    #[error("Syntax error: {0}")]
    SyntaxError(FormattedError),

    #[error("Permission denied: {0}")]
    PermissionDenied(FormattedError),

    #[error("Object not found: {0}")]
    ObjectNotFound(FormattedError),

    #[error("Query timed out")]
    Timeout,

    #[error("Query cancelled")]
    Cancelled,

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl std::fmt::Display for FormattedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl DbError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(FormattedError::new(msg))
    }

    pub fn query_failed(msg: impl Into<String>) -> Self {
        Self::QueryFailed(FormattedError::new(msg))
    }

    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::AuthFailed(FormattedError::new(msg))
    }

    pub fn constraint_violation(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(FormattedError::new(msg))
    }

    pub fn syntax_error(msg: impl Into<String>) -> Self {
        Self::SyntaxError(FormattedError::new(msg))
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(FormattedError::new(msg))
    }

    pub fn object_not_found(msg: impl Into<String>) -> Self {
        Self::ObjectNotFound(FormattedError::new(msg))
    }

    pub fn formatted(&self) -> Option<&FormattedError> {
        match self {
            Self::ConnectionFailed(f)
            | Self::QueryFailed(f)
            | Self::AuthFailed(f)
            | Self::ConstraintViolation(f)
            | Self::SyntaxError(f)
            | Self::PermissionDenied(f)
            | Self::ObjectNotFound(f) => Some(f),
            Self::Timeout | Self::Cancelled | Self::NotSupported(_) | Self::InvalidProfile(_)
            | Self::IoError(_) => None,
        }
    }

    /// Whether the error is retriable without LLM involvement (transient
    /// network/deadlock/rate-limit conditions).
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::ConnectionFailed(f)
            | Self::QueryFailed(f)
            | Self::AuthFailed(f)
            | Self::ConstraintViolation(f)
            | Self::SyntaxError(f)
            | Self::PermissionDenied(f)
            | Self::ObjectNotFound(f) => f.retriable,
            Self::Timeout => true,
            _ => false,
        }
    }
}

/// Caller-visible error taxonomy (`spec.md` §7).
///
/// Every operation exposed by `CoreContext` (connect/ask/build_ontology/...)
/// returns this type rather than a component-local error, so a host surface
/// never has to match on `DbError`, an ontology error, or an LLM error
/// separately.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    #[error("database unreachable: {0}")]
    Unreachable(String),

    #[error("unsupported dialect: {0}")]
    UnsupportedDialect(String),

    #[error("session expired")]
    SessionExpired,

    #[error("session not found")]
    SessionNotFound,

    #[error("connection pool exhausted")]
    PoolExhausted,

    #[error("operation timed out")]
    Timeout,

    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("syntax error: {0}")]
    SyntaxError(String),

    #[error("statement rejected by read-only policy: {0}")]
    Unsafe(String),

    #[error("LLM provider unavailable: {0}")]
    LLMUnavailable(String),

    #[error("LLM context budget exceeded")]
    LLMBudgetExceeded,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Transient/Permanent classification the Agent uses to decide whether to
/// retry a failed `EXECUTE` without the LLM, or to route through the
/// Analyzer for a repair attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Permanent,
}

impl CoreError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            CoreError::Unreachable(_) | CoreError::Timeout | CoreError::PoolExhausted => {
                ErrorClass::Transient
            }
            _ => ErrorClass::Permanent,
        }
    }
}

impl From<DbError> for CoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::AuthFailed(f) => CoreError::AuthFailure(f.to_display_string()),
            DbError::ConnectionFailed(f) => CoreError::Unreachable(f.to_display_string()),
            DbError::Timeout => CoreError::Timeout,
            DbError::SyntaxError(f) => CoreError::SyntaxError(f.to_display_string()),
            DbError::ObjectNotFound(f) => CoreError::UnknownIdentifier(f.to_display_string()),
            DbError::PermissionDenied(f) => CoreError::Unsafe(f.to_display_string()),
            DbError::ConstraintViolation(f) => CoreError::TypeMismatch(f.to_display_string()),
            DbError::QueryFailed(f) => {
                if f.retriable {
                    CoreError::Unreachable(f.to_display_string())
                } else {
                    CoreError::Internal(f.to_display_string())
                }
            }
            DbError::Cancelled => CoreError::Internal("query cancelled".to_string()),
            DbError::NotSupported(m) => CoreError::Internal(m),
            DbError::InvalidProfile(m) => CoreError::Internal(m),
            DbError::IoError(e) => CoreError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_is_transient() {
        assert_eq!(CoreError::Unreachable("x".into()).classify(), ErrorClass::Transient);
        assert_eq!(CoreError::Timeout.classify(), ErrorClass::Transient);
    }

    #[test]
    fn unknown_identifier_is_permanent() {
        assert_eq!(
            CoreError::UnknownIdentifier("foo".into()).classify(),
            ErrorClass::Permanent
        );
    }

    #[test]
    fn db_error_conversion_preserves_syntax_kind() {
        let db_err = DbError::syntax_error("near FROM");
        let core_err: CoreError = db_err.into();
        assert!(matches!(core_err, CoreError::SyntaxError(_)));
    }
}
