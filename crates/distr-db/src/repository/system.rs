//! SurrealDB implementation of [`SystemRepository`].

use chrono::{DateTime, Utc};
use distr_core::error::DistrResult;
use distr_core::models::system::{CreateSystem, System, UpdateSystem};
use distr_core::repository::SystemRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SystemRow {
    organisation_id: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SystemRow {
    fn try_into_system(self, id: Uuid) -> Result<System, DbError> {
        Ok(System {
            id,
            organisation_id: parse_uuid(&self.organisation_id, "organisation")?,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct SystemRowWithId {
    record_id: String,
    organisation_id: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SystemRowWithId {
    fn try_into_system(self) -> Result<System, DbError> {
        let id = parse_uuid(&self.record_id, "system")?;
        SystemRow {
            organisation_id: self.organisation_id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .try_into_system(id)
    }
}

#[derive(Clone)]
pub struct SurrealSystemRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSystemRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SystemRepository for SurrealSystemRepository<C> {
    async fn create(&self, input: CreateSystem) -> DistrResult<System> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('system', $id) SET \
                 organisation_id = $organisation_id, name = $name, \
                 description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("organisation_id", input.organisation_id.to_string()))
            .bind(("name", input.name))
            .bind(("description", input.description.unwrap_or_default()))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<SystemRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("system", id_str))?;

        Ok(row.try_into_system(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DistrResult<System> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('system', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SystemRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("system", id_str))?;

        Ok(row.try_into_system(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateSystem) -> DistrResult<System> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('system', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<SystemRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("system", id_str))?;

        Ok(row.try_into_system(id)?)
    }

    async fn list_by_organisation(&self, organisation_id: Uuid) -> DistrResult<Vec<System>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM system \
                 WHERE organisation_id = $organisation_id \
                 ORDER BY created_at ASC",
            )
            .bind(("organisation_id", organisation_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SystemRowWithId> = result.take(0).map_err(DbError::from)?;
        let systems = rows
            .into_iter()
            .map(SystemRowWithId::try_into_system)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(systems)
    }
}
