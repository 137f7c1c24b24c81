//! SurrealDB implementation of [`ResourceRepository`].

use chrono::{DateTime, Utc};
use distr_core::error::DistrResult;
use distr_core::models::resource::{CreateResource, Resource, UpdateResource};
use distr_core::repository::ResourceRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ResourceRow {
    deployment_id: String,
    service_id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_resource(row: ResourceRow, id: Uuid) -> Result<Resource, DbError> {
    Ok(Resource {
        id,
        deployment_id: parse_uuid(&row.deployment_id, "deployment")?,
        service_id: parse_uuid(&row.service_id, "service")?,
        name: row.name,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[derive(Debug, SurrealValue)]
struct ResourceRowWithId {
    record_id: String,
    deployment_id: String,
    service_id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ResourceRowWithId {
    fn try_into_resource(self) -> Result<Resource, DbError> {
        let id = parse_uuid(&self.record_id, "resource")?;
        row_to_resource(
            ResourceRow {
                deployment_id: self.deployment_id,
                service_id: self.service_id,
                name: self.name,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            id,
        )
    }
}

#[derive(Clone)]
pub struct SurrealResourceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealResourceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ResourceRepository for SurrealResourceRepository<C> {
    async fn create(&self, input: CreateResource) -> DistrResult<Resource> {
        let id_str = input.id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('resource', $id) SET \
                 deployment_id = $deployment_id, service_id = $service_id, \
                 name = $name",
            )
            .bind(("id", id_str.clone()))
            .bind(("deployment_id", input.deployment_id.to_string()))
            .bind(("service_id", input.service_id.to_string()))
            .bind(("name", input.name))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("resource", id_str))?;

        Ok(row_to_resource(row, input.id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DistrResult<Resource> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('resource', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("resource", id_str))?;

        Ok(row_to_resource(row, id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateResource) -> DistrResult<Resource> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('resource', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("resource", id_str))?;

        Ok(row_to_resource(row, id)?)
    }

    async fn list_by_deployment(&self, deployment_id: Uuid) -> DistrResult<Vec<Resource>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM resource \
                 WHERE deployment_id = $deployment_id \
                 ORDER BY created_at ASC",
            )
            .bind(("deployment_id", deployment_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRowWithId> = result.take(0).map_err(DbError::from)?;
        let resources = rows
            .into_iter()
            .map(ResourceRowWithId::try_into_resource)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(resources)
    }
}
