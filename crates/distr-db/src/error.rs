//! Database-specific error types and conversions.

use distr_core::error::DistrError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Malformed record: {0}")]
    InvalidRecord(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl DbError {
    pub(crate) fn not_found(entity: &str, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

impl From<DbError> for DistrError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => DistrError::NotFound { entity, id },
            other => DistrError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use distr_core::error::ErrorKind;

    use super::*;

    #[test]
    fn not_found_keeps_its_kind() {
        let err: DistrError = DbError::not_found("deployment", "abc").into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Entity not found: deployment with id abc");
    }

    #[test]
    fn other_errors_become_database_errors() {
        let err: DistrError = DbError::Query("syntax".into()).into();
        assert_eq!(err.kind(), ErrorKind::Database);
    }
}
