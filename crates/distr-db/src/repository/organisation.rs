//! SurrealDB implementation of [`OrganisationRepository`].

use chrono::{DateTime, Utc};
use distr_core::error::DistrResult;
use distr_core::models::organisation::{CreateOrganisation, Organisation};
use distr_core::repository::OrganisationRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct OrganisationRow {
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganisationRow {
    fn into_organisation(self, id: Uuid) -> Organisation {
        Organisation {
            id,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct SurrealOrganisationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrganisationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OrganisationRepository for SurrealOrganisationRepository<C> {
    async fn create(&self, input: CreateOrganisation) -> DistrResult<Organisation> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query("CREATE type::record('organisation', $id) SET name = $name")
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<OrganisationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("organisation", id_str))?;

        Ok(row.into_organisation(id))
    }

    async fn get_by_id(&self, id: Uuid) -> DistrResult<Organisation> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('organisation', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganisationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("organisation", id_str))?;

        Ok(row.into_organisation(id))
    }
}
