//! Application error types.

use thiserror::Error;

/// Application-level errors for the CRM data-access layer.
#[derive(Error, Debug)]
pub enum AppError {
    // Neo4j errors
    #[error("Neo4j connection error: {0}")]
    Connection(#[from] neo4rs::Error),

    #[error("Neo4j query error: {message}")]
    Query { message: String, query: String },

    // Domain errors
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for [`AppError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Connection(_) => "CONNECTION_ERROR",
            AppError::Query { .. } => "QUERY_ERROR",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether retrying the same operation may succeed.
    ///
    /// Only connection-level failures qualify; query, validation and
    /// decoding errors do not.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Connection(err) => matches!(
                err,
                neo4rs::Error::ConnectionError | neo4rs::Error::IOError { .. }
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = AppError::not_found("Contact", "c1");
        assert_eq!(err.to_string(), "Contact not found: c1");
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_validation_is_not_transient() {
        let err = AppError::Validation("bad tenant".into());
        assert!(!err.is_transient());
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
