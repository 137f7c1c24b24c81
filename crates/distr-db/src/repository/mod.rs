//! SurrealDB repository implementations.

mod deletion;
mod deployment;
mod organisation;
mod resource;
mod service;
mod system;

pub use deletion::SurrealDeletionRepository;
pub use deployment::SurrealDeploymentRepository;
pub use organisation::SurrealOrganisationRepository;
pub use resource::SurrealResourceRepository;
pub use service::SurrealServiceRepository;
pub use system::SurrealSystemRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(value: &str, field: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::InvalidRecord(format!("invalid {field} UUID: {e}")))
}
