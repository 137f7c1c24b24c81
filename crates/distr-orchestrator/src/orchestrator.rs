//! Resource lifecycle orchestration.
//!
//! Every remote call goes through a [`ServiceConnection`] opened with the
//! owning deployment's decrypted credentials. Creates and updates are
//! strict: nothing is written locally unless the service accepted the
//! change. Reads and deletes are lenient: remote failures degrade the
//! result instead of failing the call.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};

use distr_core::contract::GetResponse;
use distr_core::error::{DistrError, DistrResult};
use distr_core::models::deployment::{
    CreateDeployment, CreateDeploymentInput, Deployment, UpdateDeployment, UpdateDeploymentInput,
};
use distr_core::models::resource::{
    CreateResource, CreateResourceInput, Resource, UpdateResource, UpdateResourceInput,
};
use distr_core::models::status::{HealthStatus, StatusOverview, Usage};
use distr_core::models::value::{Input, Property};
use distr_core::repository::{
    DeletionPlan, DeletionRepository, DeploymentRepository, ResourceRepository, SystemRepository,
};
use distr_vault::Vault;
use futures::future::{join_all, try_join_all};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

use crate::connection::ServiceConnection;
use crate::registry::ServiceConnector;

/// What happened to the remote object during a delete.
#[derive(Debug)]
pub enum RemoteOutcome {
    Deleted,
    /// The local row was removed anyway.
    Failed(DistrError),
}

impl RemoteOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, RemoteOutcome::Deleted)
    }
}

/// Result of a best-effort resource delete. The local row is always gone.
#[derive(Debug)]
pub struct ResourceDeletion {
    pub resource: Resource,
    pub remote: RemoteOutcome,
}

/// Result of deleting a deployment or a system with everything below it.
#[derive(Debug, Default)]
pub struct CascadeReport {
    pub resources: Vec<ResourceDeletion>,
    pub deployments: Vec<Uuid>,
    pub systems: Vec<Uuid>,
}

impl CascadeReport {
    /// Resources whose remote object may have been left behind.
    pub fn remote_failures(&self) -> impl Iterator<Item = &ResourceDeletion> {
        self.resources.iter().filter(|d| !d.remote.is_deleted())
    }
}

type LockMap = std::sync::Mutex<HashMap<Uuid, Arc<Mutex<()>>>>;

/// Exclusive hold on one resource. Dropping it releases the lock and
/// forgets the map entry once no other caller is waiting for it.
struct ResourceLock<'a> {
    id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
    locks: &'a LockMap,
}

impl Drop for ResourceLock<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Waiters clone the Arc under the map lock, so a count of one
        // after our guard is gone means nobody else wants this entry.
        drop(self.guard.take());
        if locks.get(&self.id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.id);
        }
    }
}

pub struct ResourceOrchestrator<Y, D, R, P, K> {
    systems: Y,
    deployments: D,
    resources: R,
    deletions: P,
    connector: K,
    vault: Vault,
    /// Serializes updates and deletes of the same resource.
    locks: LockMap,
}

impl<Y, D, R, P, K> ResourceOrchestrator<Y, D, R, P, K>
where
    Y: SystemRepository,
    D: DeploymentRepository,
    R: ResourceRepository,
    P: DeletionRepository,
    K: ServiceConnector,
{
    pub fn new(systems: Y, deployments: D, resources: R, deletions: P, connector: K, vault: Vault) -> Self {
        Self {
            systems,
            deployments,
            resources,
            deletions,
            connector,
            vault,
            locks: LockMap::default(),
        }
    }

    async fn lock(&self, id: Uuid) -> ResourceLock<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(id).or_default())
        };

        ResourceLock {
            id,
            guard: Some(lock.lock_owned().await),
            locks: &self.locks,
        }
    }

    /// Resources currently locked or waited on.
    pub fn locked_resources(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Locks several resources at once, in id order so that overlapping
    /// cascades cannot deadlock.
    async fn lock_all(&self, ids: &[Uuid]) -> Vec<ResourceLock<'_>> {
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut guards = Vec::with_capacity(sorted.len());
        for id in sorted {
            guards.push(self.lock(id).await);
        }
        guards
    }

    async fn connect(&self, deployment: &Deployment, service_id: Uuid) -> DistrResult<ServiceConnection<K::Client>> {
        let service = self.connector.service(service_id).await?;
        let credentials = self.vault.credentials_for(deployment)?;
        self.connector.connect(&service, Some(credentials)).await
    }

    async fn connection_for(&self, resource: &Resource) -> DistrResult<ServiceConnection<K::Client>> {
        let deployment = self.deployments.get_by_id(resource.deployment_id).await?;
        self.connect(&deployment, resource.service_id).await
    }

    // -----------------------------------------------------------------------
    // Resources
    // -----------------------------------------------------------------------

    /// Provisions a resource remotely, then records it. A single attempt;
    /// a remote failure leaves no local row.
    pub async fn create_resource(&self, input: CreateResourceInput) -> DistrResult<Resource> {
        let deployment = self.deployments.get_by_id(input.deployment_id).await?;
        let service = self.connector.service(input.service_id).await?;
        if service.blocked {
            return Err(DistrError::ServiceBlocked {
                service: service.name,
            });
        }

        let credentials = self.vault.credentials_for(&deployment)?;
        let connection = self.connector.connect(&service, Some(credentials)).await?;

        let id = Uuid::new_v4();
        connection.create(id, input.payload).await?;

        let resource = self
            .resources
            .create(CreateResource {
                id,
                deployment_id: deployment.id,
                service_id: service.id,
                name: input.name,
            })
            .await?;

        info!(
            resource_id = %resource.id,
            deployment_id = %deployment.id,
            service = %service.name,
            "Created resource"
        );
        Ok(resource)
    }

    pub async fn get_resource(&self, id: Uuid) -> DistrResult<Resource> {
        self.resources.get_by_id(id).await
    }

    /// Applies remote changes when a payload is given, then local ones.
    pub async fn update_resource(&self, id: Uuid, input: UpdateResourceInput) -> DistrResult<Resource> {
        let _guard = self.lock(id).await;
        let resource = self.resources.get_by_id(id).await?;

        if let Some(payload) = input.payload {
            let connection = self.connection_for(&resource).await?;
            connection.update(id, payload).await?;
        }

        self.resources
            .update(id, UpdateResource { name: input.name })
            .await
    }

    /// Deletes the remote object on a best-effort basis and the local row
    /// unconditionally.
    pub async fn delete_resource(&self, id: Uuid, payload: Option<Vec<Input>>) -> DistrResult<ResourceDeletion> {
        let guard = self.lock(id).await;
        let resource = self.resources.get_by_id(id).await?;

        let remote = self.remote_delete(&resource, payload).await;
        self.deletions.commit(DeletionPlan::resource(id)).await?;
        drop(guard);

        info!(resource_id = %id, remote_deleted = remote.is_deleted(), "Deleted resource");
        Ok(ResourceDeletion { resource, remote })
    }

    async fn remote_delete(&self, resource: &Resource, payload: Option<Vec<Input>>) -> RemoteOutcome {
        let attempt = async {
            let connection = self.connection_for(resource).await?;
            connection.delete(resource.id, payload).await
        };

        match attempt.await {
            Ok(()) => RemoteOutcome::Deleted,
            Err(err) => {
                warn!(resource_id = %resource.id, ?err, "Remote delete failed");
                RemoteOutcome::Failed(err)
            }
        }
    }

    /// Remote health of the resource; `DOWN` when the service cannot say.
    pub async fn resource_status(&self, id: Uuid) -> DistrResult<HealthStatus> {
        let resource = self.resources.get_by_id(id).await?;
        Ok(self.remote_status(&resource).await)
    }

    async fn remote_status(&self, resource: &Resource) -> HealthStatus {
        let attempt = async {
            let connection = self.connection_for(resource).await?;
            connection.status(resource.id).await
        };

        attempt.await.unwrap_or_else(|err| {
            warn!(resource_id = %resource.id, ?err, "Status unavailable, reporting DOWN");
            HealthStatus::Down
        })
    }

    /// Usage reported by the service, if any.
    pub async fn resource_usage(&self, id: Uuid) -> DistrResult<Option<Usage>> {
        let resource = self.resources.get_by_id(id).await?;
        Ok(self
            .remote_get(&resource)
            .await
            .and_then(|response| response.usage))
    }

    /// Properties reported by the service; empty when it cannot be reached.
    pub async fn resource_details(&self, id: Uuid) -> DistrResult<Vec<Property>> {
        let resource = self.resources.get_by_id(id).await?;
        Ok(self
            .remote_get(&resource)
            .await
            .map(|response| response.properties)
            .unwrap_or_default())
    }

    async fn remote_get(&self, resource: &Resource) -> Option<GetResponse> {
        let attempt = async {
            let connection = self.connection_for(resource).await?;
            connection.get(resource.id).await
        };

        match attempt.await {
            Ok(response) => Some(response),
            Err(err) => {
                warn!(resource_id = %resource.id, ?err, "Remote get failed");
                None
            }
        }
    }

    /// Healthy vs. unhealthy counts over every resource of a deployment.
    pub async fn aggregate_status(&self, deployment_id: Uuid) -> DistrResult<StatusOverview> {
        let deployment = self.deployments.get_by_id(deployment_id).await?;
        let resources = self.resources.list_by_deployment(deployment.id).await?;
        let statuses = join_all(resources.iter().map(|r| self.remote_status(r))).await;
        Ok(statuses.into_iter().collect())
    }

    // -----------------------------------------------------------------------
    // Deployments and systems
    // -----------------------------------------------------------------------

    pub async fn create_deployment(&self, input: CreateDeploymentInput) -> DistrResult<Deployment> {
        self.systems.get_by_id(input.system_id).await?;
        let credentials = self.vault.seal(&input.credentials)?;

        let deployment = self
            .deployments
            .create(CreateDeployment {
                system_id: input.system_id,
                name: input.name,
                credentials,
            })
            .await?;

        info!(
            deployment_id = %deployment.id,
            system_id = %deployment.system_id,
            credentials = deployment.credentials.variant_name(),
            "Created deployment"
        );
        Ok(deployment)
    }

    pub async fn update_deployment(&self, id: Uuid, input: UpdateDeploymentInput) -> DistrResult<Deployment> {
        let credentials = input
            .credentials
            .map(|c| self.vault.seal(&c))
            .transpose()?;

        self.deployments
            .update(
                id,
                UpdateDeployment {
                    name: input.name,
                    credentials,
                },
            )
            .await
    }

    /// Deletes a deployment and its resources. Remote deletes run first
    /// and concurrently; the local rows go in one commit.
    pub async fn delete_deployment(&self, id: Uuid) -> DistrResult<CascadeReport> {
        let deployment = self.deployments.get_by_id(id).await?;
        let resources = self.resources.list_by_deployment(deployment.id).await?;

        self.cascade(resources, vec![deployment.id], Vec::new()).await
    }

    /// Deletes a system with all of its deployments and resources.
    pub async fn delete_system(&self, id: Uuid) -> DistrResult<CascadeReport> {
        let system = self.systems.get_by_id(id).await?;
        let deployments = self.deployments.list_by_system(system.id).await?;

        let resources = try_join_all(
            deployments
                .iter()
                .map(|d| self.resources.list_by_deployment(d.id)),
        )
        .await?
        .into_iter()
        .flatten()
        .collect();

        let deployment_ids = deployments.iter().map(|d| d.id).collect();
        self.cascade(resources, deployment_ids, vec![system.id]).await
    }

    async fn cascade(
        &self,
        resources: Vec<Resource>,
        deployments: Vec<Uuid>,
        systems: Vec<Uuid>,
    ) -> DistrResult<CascadeReport> {
        let resource_ids: Vec<Uuid> = resources.iter().map(|r| r.id).collect();
        let guards = self.lock_all(&resource_ids).await;

        let outcomes = join_all(resources.iter().map(|r| self.remote_delete(r, None))).await;

        let plan = DeletionPlan {
            resources: resource_ids,
            deployments,
            systems,
        };
        self.deletions.commit(plan.clone()).await?;
        drop(guards);

        let report = CascadeReport {
            resources: resources
                .into_iter()
                .zip(outcomes)
                .map(|(resource, remote)| ResourceDeletion { resource, remote })
                .collect(),
            deployments: plan.deployments,
            systems: plan.systems,
        };

        info!(
            resources = report.resources.len(),
            remote_failures = report.remote_failures().count(),
            deployments = report.deployments.len(),
            systems = report.systems.len(),
            "Cascade delete committed"
        );
        Ok(report)
    }
}
