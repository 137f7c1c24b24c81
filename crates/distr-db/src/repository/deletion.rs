//! SurrealDB implementation of [`DeletionRepository`].

use distr_core::error::DistrResult;
use distr_core::repository::{DeletionPlan, DeletionRepository};
use surrealdb::{Connection, Surreal};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;

/// Applied leaf-first inside one transaction. Rows still hanging off a
/// planned deployment or system go too, so a cascade never leaves orphans
/// behind when a child was created after the plan was drawn up.
const COMMIT_PLAN: &str = "\
BEGIN TRANSACTION;
LET $swept = array::union($deployment_ids, (SELECT VALUE meta::id(id) FROM deployment WHERE system_id IN $system_ids));
DELETE resource WHERE meta::id(id) IN $resource_ids OR deployment_id IN $swept;
DELETE deployment WHERE meta::id(id) IN $swept;
DELETE system WHERE meta::id(id) IN $system_ids;
COMMIT TRANSACTION;
";

fn id_strings(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}

#[derive(Clone)]
pub struct SurrealDeletionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDeletionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> DeletionRepository for SurrealDeletionRepository<C> {
    async fn commit(&self, plan: DeletionPlan) -> DistrResult<()> {
        if plan.is_empty() {
            return Ok(());
        }
        debug!(
            resources = plan.resources.len(),
            deployments = plan.deployments.len(),
            systems = plan.systems.len(),
            "Committing deletion plan"
        );

        self.db
            .query(COMMIT_PLAN)
            .bind(("resource_ids", id_strings(&plan.resources)))
            .bind(("deployment_ids", id_strings(&plan.deployments)))
            .bind(("system_ids", id_strings(&plan.systems)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }
}
