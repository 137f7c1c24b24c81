//! SurrealDB implementation of [`DeploymentRepository`].
//!
//! Credentials arrive already sealed and are stored verbatim as a flexible
//! object; this layer never sees plaintext secrets.

use chrono::{DateTime, Utc};
use distr_core::error::DistrResult;
use distr_core::models::credentials::SealedCredentials;
use distr_core::models::deployment::{CreateDeployment, Deployment, UpdateDeployment};
use distr_core::repository::DeploymentRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct DeploymentRow {
    system_id: String,
    name: String,
    credentials: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DeploymentRow {
    fn try_into_deployment(self, id: Uuid) -> Result<Deployment, DbError> {
        Ok(Deployment {
            id,
            system_id: parse_uuid(&self.system_id, "system")?,
            name: self.name,
            credentials: credentials_from_json(self.credentials)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct DeploymentRowWithId {
    record_id: String,
    system_id: String,
    name: String,
    credentials: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DeploymentRowWithId {
    fn try_into_deployment(self) -> Result<Deployment, DbError> {
        let id = parse_uuid(&self.record_id, "deployment")?;
        DeploymentRow {
            system_id: self.system_id,
            name: self.name,
            credentials: self.credentials,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .try_into_deployment(id)
    }
}

fn credentials_to_json(credentials: &SealedCredentials) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(credentials)
        .map_err(|e| DbError::InvalidRecord(format!("unserializable credentials: {e}")))
}

fn credentials_from_json(value: serde_json::Value) -> Result<SealedCredentials, DbError> {
    serde_json::from_value(value)
        .map_err(|e| DbError::InvalidRecord(format!("malformed credentials: {e}")))
}

#[derive(Clone)]
pub struct SurrealDeploymentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDeploymentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> DeploymentRepository for SurrealDeploymentRepository<C> {
    async fn create(&self, input: CreateDeployment) -> DistrResult<Deployment> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let credentials = credentials_to_json(&input.credentials)?;

        let result = self
            .db
            .query(
                "CREATE type::record('deployment', $id) SET \
                 system_id = $system_id, name = $name, \
                 credentials = $credentials",
            )
            .bind(("id", id_str.clone()))
            .bind(("system_id", input.system_id.to_string()))
            .bind(("name", input.name))
            .bind(("credentials", credentials))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<DeploymentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("deployment", id_str))?;

        Ok(row.try_into_deployment(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DistrResult<Deployment> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('deployment', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DeploymentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("deployment", id_str))?;

        Ok(row.try_into_deployment(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateDeployment) -> DistrResult<Deployment> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.credentials.is_some() {
            // Whole-object assignment so a previous variant never lingers.
            sets.push("credentials = $credentials");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('deployment', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(credentials) = &input.credentials {
            builder = builder.bind(("credentials", credentials_to_json(credentials)?));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<DeploymentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("deployment", id_str))?;

        Ok(row.try_into_deployment(id)?)
    }

    async fn list_by_system(&self, system_id: Uuid) -> DistrResult<Vec<Deployment>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM deployment \
                 WHERE system_id = $system_id \
                 ORDER BY created_at ASC",
            )
            .bind(("system_id", system_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DeploymentRowWithId> = result.take(0).map_err(DbError::from)?;
        let deployments = rows
            .into_iter()
            .map(DeploymentRowWithId::try_into_deployment)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(deployments)
    }
}
