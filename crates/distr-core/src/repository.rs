//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. The ownership tree
//! organisation → system → deployment → resource is never deleted row by
//! row; removals go through [`DeletionRepository::commit`] so a cascade
//! lands in a single commit.

use uuid::Uuid;

use crate::error::DistrResult;
use crate::models::{
    deployment::{CreateDeployment, Deployment, UpdateDeployment},
    organisation::{CreateOrganisation, Organisation},
    resource::{CreateResource, Resource, UpdateResource},
    service::{CreateService, Service, UpdateService},
    system::{CreateSystem, System, UpdateSystem},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Ownership tree
// ---------------------------------------------------------------------------

pub trait OrganisationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOrganisation,
    ) -> impl Future<Output = DistrResult<Organisation>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DistrResult<Organisation>> + Send;
}

pub trait SystemRepository: Send + Sync {
    fn create(&self, input: CreateSystem) -> impl Future<Output = DistrResult<System>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DistrResult<System>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateSystem,
    ) -> impl Future<Output = DistrResult<System>> + Send;
    fn list_by_organisation(
        &self,
        organisation_id: Uuid,
    ) -> impl Future<Output = DistrResult<Vec<System>>> + Send;
}

pub trait DeploymentRepository: Send + Sync {
    fn create(
        &self,
        input: CreateDeployment,
    ) -> impl Future<Output = DistrResult<Deployment>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DistrResult<Deployment>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateDeployment,
    ) -> impl Future<Output = DistrResult<Deployment>> + Send;
    fn list_by_system(
        &self,
        system_id: Uuid,
    ) -> impl Future<Output = DistrResult<Vec<Deployment>>> + Send;
}

pub trait ResourceRepository: Send + Sync {
    /// Persists a resource under the id carried by `input`.
    fn create(&self, input: CreateResource) -> impl Future<Output = DistrResult<Resource>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DistrResult<Resource>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateResource,
    ) -> impl Future<Output = DistrResult<Resource>> + Send;
    fn list_by_deployment(
        &self,
        deployment_id: Uuid,
    ) -> impl Future<Output = DistrResult<Vec<Resource>>> + Send;
}

// ---------------------------------------------------------------------------
// Service registry
// ---------------------------------------------------------------------------

/// Services are never hard-deleted, so there is no `delete`.
pub trait ServiceRepository: Send + Sync {
    fn create(&self, input: CreateService) -> impl Future<Output = DistrResult<Service>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DistrResult<Service>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateService,
    ) -> impl Future<Output = DistrResult<Service>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = DistrResult<PaginatedResult<Service>>> + Send;
    fn list_unblocked(&self) -> impl Future<Output = DistrResult<Vec<Service>>> + Send;
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

/// Rows to remove in one commit, applied leaf-first: resources, then
/// deployments, then systems.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionPlan {
    pub resources: Vec<Uuid>,
    pub deployments: Vec<Uuid>,
    pub systems: Vec<Uuid>,
}

impl DeletionPlan {
    pub fn resource(id: Uuid) -> Self {
        Self {
            resources: vec![id],
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.deployments.is_empty() && self.systems.is_empty()
    }
}

pub trait DeletionRepository: Send + Sync {
    /// Applies every removal in `plan` atomically. Ids that no longer exist
    /// are ignored.
    fn commit(&self, plan: DeletionPlan) -> impl Future<Output = DistrResult<()>> + Send;
}
