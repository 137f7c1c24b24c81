//! Error types for the distr system.

use std::fmt;

use thiserror::Error;

use crate::contract::TransportError;

#[derive(Debug, Error)]
pub enum DistrError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid service definition: {reason}")]
    InvalidServiceDefinition { reason: String },

    #[error("Missing credentials for {service} service")]
    MissingCredentials { service: String },

    #[error("Service {service} is blocked")]
    ServiceBlocked { service: String },

    #[error("Remote call failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Failed to fetch schema from {url}: {message}")]
    SchemaFetch { url: String, message: String },

    #[error("Failed to parse schema: {0}")]
    SchemaParse(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable, machine-readable classification of a [`DistrError`].
///
/// Callers branch on the kind; the `Display` message is for humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    InvalidServiceDefinition,
    MissingCredentials,
    ServiceBlocked,
    Transport,
    SchemaFetch,
    SchemaParse,
    Decoding,
    Crypto,
    Database,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::InvalidServiceDefinition => "INVALID_SERVICE_DEFINITION",
            ErrorKind::MissingCredentials => "MISSING_CREDENTIALS",
            ErrorKind::ServiceBlocked => "SERVICE_BLOCKED",
            ErrorKind::Transport => "TRANSPORT",
            ErrorKind::SchemaFetch => "SCHEMA_FETCH",
            ErrorKind::SchemaParse => "SCHEMA_PARSE",
            ErrorKind::Decoding => "DECODING",
            ErrorKind::Crypto => "CRYPTO",
            ErrorKind::Database => "DATABASE",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DistrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DistrError::NotFound { .. } => ErrorKind::NotFound,
            DistrError::Validation { .. } => ErrorKind::Validation,
            DistrError::InvalidServiceDefinition { .. } => ErrorKind::InvalidServiceDefinition,
            DistrError::MissingCredentials { .. } => ErrorKind::MissingCredentials,
            DistrError::ServiceBlocked { .. } => ErrorKind::ServiceBlocked,
            DistrError::Transport(_) => ErrorKind::Transport,
            DistrError::SchemaFetch { .. } => ErrorKind::SchemaFetch,
            DistrError::SchemaParse(_) => ErrorKind::SchemaParse,
            DistrError::Decoding(_) => ErrorKind::Decoding,
            DistrError::Crypto(_) => ErrorKind::Crypto,
            DistrError::Database(_) => ErrorKind::Database,
            DistrError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn invalid_service(reason: impl Into<String>) -> Self {
        DistrError::InvalidServiceDefinition {
            reason: reason.into(),
        }
    }
}

pub type DistrResult<T> = Result<T, DistrError>;
