//! SurrealDB implementation of [`ServiceRepository`].

use chrono::{DateTime, Utc};
use distr_core::error::DistrResult;
use distr_core::models::service::{CreateService, Platform, Service, UpdateService};
use distr_core::repository::{PaginatedResult, Pagination, ServiceRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ServiceRow {
    name: String,
    summary: String,
    description: String,
    platform: String,
    author_id: Option<String>,
    namespace: String,
    service_url: String,
    introspection_url: String,
    documentation_url: String,
    source_code_url: String,
    verified: bool,
    blocked: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ServiceRow {
    fn try_into_service(self, id: Uuid) -> Result<Service, DbError> {
        let platform = self
            .platform
            .parse::<Platform>()
            .map_err(DbError::InvalidRecord)?;
        let author_id = self
            .author_id
            .as_deref()
            .map(|a| parse_uuid(a, "author"))
            .transpose()?;
        Ok(Service {
            id,
            name: self.name,
            summary: self.summary,
            description: self.description,
            platform,
            author_id,
            namespace: self.namespace,
            service_url: self.service_url,
            introspection_url: self.introspection_url,
            documentation_url: self.documentation_url,
            source_code_url: self.source_code_url,
            verified: self.verified,
            blocked: self.blocked,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct ServiceRowWithId {
    record_id: String,
    name: String,
    summary: String,
    description: String,
    platform: String,
    author_id: Option<String>,
    namespace: String,
    service_url: String,
    introspection_url: String,
    documentation_url: String,
    source_code_url: String,
    verified: bool,
    blocked: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ServiceRowWithId {
    fn try_into_service(self) -> Result<Service, DbError> {
        let id = parse_uuid(&self.record_id, "service")?;
        ServiceRow {
            name: self.name,
            summary: self.summary,
            description: self.description,
            platform: self.platform,
            author_id: self.author_id,
            namespace: self.namespace,
            service_url: self.service_url,
            introspection_url: self.introspection_url,
            documentation_url: self.documentation_url,
            source_code_url: self.source_code_url,
            verified: self.verified,
            blocked: self.blocked,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .try_into_service(id)
    }
}

#[derive(Clone)]
pub struct SurrealServiceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealServiceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ServiceRepository for SurrealServiceRepository<C> {
    async fn create(&self, input: CreateService) -> DistrResult<Service> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('service', $id) SET \
                 name = $name, summary = $summary, \
                 description = $description, platform = $platform, \
                 author_id = $author_id, namespace = $namespace, \
                 service_url = $service_url, \
                 introspection_url = $introspection_url, \
                 documentation_url = $documentation_url, \
                 source_code_url = $source_code_url, \
                 verified = false, blocked = false",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("summary", input.summary))
            .bind(("description", input.description))
            .bind(("platform", input.platform.as_str().to_string()))
            .bind(("author_id", input.author_id.map(|a| a.to_string())))
            .bind(("namespace", input.namespace))
            .bind(("service_url", input.service_url))
            .bind(("introspection_url", input.introspection_url))
            .bind(("documentation_url", input.documentation_url))
            .bind(("source_code_url", input.source_code_url))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ServiceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("service", id_str))?;

        Ok(row.try_into_service(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DistrResult<Service> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('service', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ServiceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("service", id_str))?;

        Ok(row.try_into_service(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateService) -> DistrResult<Service> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.summary.is_some() {
            sets.push("summary = $summary");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.platform.is_some() {
            sets.push("platform = $platform");
        }
        if input.namespace.is_some() {
            sets.push("namespace = $namespace");
        }
        if input.service_url.is_some() {
            sets.push("service_url = $service_url");
        }
        if input.introspection_url.is_some() {
            sets.push("introspection_url = $introspection_url");
        }
        if input.documentation_url.is_some() {
            sets.push("documentation_url = $documentation_url");
        }
        if input.source_code_url.is_some() {
            sets.push("source_code_url = $source_code_url");
        }
        if input.verified.is_some() {
            sets.push("verified = $verified");
        }
        if input.blocked.is_some() {
            sets.push("blocked = $blocked");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('service', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(summary) = input.summary {
            builder = builder.bind(("summary", summary));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(platform) = input.platform {
            builder = builder.bind(("platform", platform.as_str().to_string()));
        }
        if let Some(namespace) = input.namespace {
            builder = builder.bind(("namespace", namespace));
        }
        if let Some(service_url) = input.service_url {
            builder = builder.bind(("service_url", service_url));
        }
        if let Some(introspection_url) = input.introspection_url {
            builder = builder.bind(("introspection_url", introspection_url));
        }
        if let Some(documentation_url) = input.documentation_url {
            builder = builder.bind(("documentation_url", documentation_url));
        }
        if let Some(source_code_url) = input.source_code_url {
            builder = builder.bind(("source_code_url", source_code_url));
        }
        if let Some(verified) = input.verified {
            builder = builder.bind(("verified", verified));
        }
        if let Some(blocked) = input.blocked {
            builder = builder.bind(("blocked", blocked));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ServiceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("service", id_str))?;

        Ok(row.try_into_service(id)?)
    }

    async fn list(&self, pagination: Pagination) -> DistrResult<PaginatedResult<Service>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM service GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM service \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ServiceRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(ServiceRowWithId::try_into_service)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_unblocked(&self) -> DistrResult<Vec<Service>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM service \
                 WHERE blocked = false \
                 ORDER BY created_at ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ServiceRowWithId> = result.take(0).map_err(DbError::from)?;
        let services = rows
            .into_iter()
            .map(ServiceRowWithId::try_into_service)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(services)
    }
}
