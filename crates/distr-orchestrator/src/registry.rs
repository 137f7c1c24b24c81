//! Service registry: admission, live client cache, blocking and periodic
//! revalidation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use distr_core::contract::{ClientFactory, ContractClient, Method};
use distr_core::error::{DistrError, DistrResult};
use distr_core::models::credentials::Credentials;
use distr_core::models::service::{
    CreateService, CreateServiceInput, Service, UpdateService, UpdateServiceInput,
};
use distr_core::models::value::Field;
use distr_core::repository::{PaginatedResult, Pagination, ServiceRepository};
use distr_proto::schema::{SchemaSource, check_contract, extract_namespace, fetch_schema};
use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::connection::ServiceConnection;

/// Outcome of one revalidation sweep.
#[derive(Debug, Default)]
pub struct RevalidationReport {
    /// Services that were re-checked (all unblocked services).
    pub checked: usize,
    /// Services blocked by this sweep.
    pub blocked: Vec<Uuid>,
    /// Services that failed validation but could not be marked blocked.
    pub block_failed: Vec<Uuid>,
}

/// Loads services and opens connections to them.
///
/// Lets the orchestrator depend on "something that can connect" rather
/// than on the registry's full set of type parameters.
pub trait ServiceConnector: Send + Sync {
    type Client: ContractClient;

    fn service(&self, id: Uuid) -> impl Future<Output = DistrResult<Service>> + Send;

    fn connect(
        &self,
        service: &Service,
        credentials: Option<Credentials>,
    ) -> impl Future<Output = DistrResult<ServiceConnection<Self::Client>>> + Send;
}

impl<T: ServiceConnector> ServiceConnector for Arc<T> {
    type Client = T::Client;

    fn service(&self, id: Uuid) -> impl Future<Output = DistrResult<Service>> + Send {
        (**self).service(id)
    }

    fn connect(
        &self,
        service: &Service,
        credentials: Option<Credentials>,
    ) -> impl Future<Output = DistrResult<ServiceConnection<Self::Client>>> + Send {
        (**self).connect(service, credentials)
    }
}

/// Registry of services implementing the shared contract.
///
/// Generic over the repository, the schema source and the client factory
/// so that it has no dependency on the database or the RPC transport.
pub struct ServiceRegistry<R: ServiceRepository, S: SchemaSource, F: ClientFactory> {
    repo: R,
    source: S,
    factory: F,
    clients: RwLock<HashMap<Uuid, F::Client>>,
}

impl<R: ServiceRepository, S: SchemaSource, F: ClientFactory> ServiceRegistry<R, S, F> {
    pub fn new(repo: R, source: S, factory: F) -> Self {
        Self {
            repo,
            source,
            factory,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Fetches the schema at `url` and returns the namespace that
    /// implements the contract.
    async fn admit(&self, url: &str) -> DistrResult<String> {
        let description = fetch_schema(&self.source, url).await?;
        let namespace = extract_namespace(&description).ok_or_else(|| {
            DistrError::invalid_service(format!("schema at {url} declares no namespace"))
        })?;
        check_contract(&description, &namespace).map_err(DistrError::invalid_service)?;
        Ok(namespace)
    }

    /// Validates the service's schema and persists it. Nothing is stored
    /// when validation fails.
    pub async fn register(&self, input: CreateServiceInput) -> DistrResult<Service> {
        let namespace = self.admit(&input.introspection_url).await?;
        let service = self
            .repo
            .create(CreateService::from_input(input, namespace))
            .await?;

        info!(
            service_id = %service.id,
            name = %service.name,
            namespace = %service.namespace,
            "Registered service"
        );
        Ok(service)
    }

    /// Applies an explicit update. A changed introspection URL is
    /// validated first and may move the service to a new namespace.
    pub async fn update(&self, id: Uuid, input: UpdateServiceInput) -> DistrResult<Service> {
        let current = self.repo.get_by_id(id).await?;

        let namespace = match &input.introspection_url {
            Some(url) if *url != current.introspection_url => Some(self.admit(url).await?),
            _ => None,
        };

        let service = self
            .repo
            .update(id, UpdateService::from_input(input, namespace))
            .await?;
        self.evict(id).await;

        info!(service_id = %id, "Updated service");
        Ok(service)
    }

    pub async fn get(&self, id: Uuid) -> DistrResult<Service> {
        self.repo.get_by_id(id).await
    }

    pub async fn list(&self, pagination: Pagination) -> DistrResult<PaginatedResult<Service>> {
        self.repo.list(pagination).await
    }

    /// Marks the service blocked. Idempotent; the row is never deleted.
    pub async fn block(&self, id: Uuid) -> DistrResult<Service> {
        let service = self.repo.update(id, UpdateService::blocked(true)).await?;
        self.evict(id).await;

        info!(service_id = %id, name = %service.name, "Blocked service");
        Ok(service)
    }

    /// Describes the inputs the service expects for `method`.
    pub async fn service_inputs(&self, id: Uuid, method: Method) -> DistrResult<Vec<Field>> {
        let service = self.repo.get_by_id(id).await?;
        let connection = self.connect(&service, None).await?;
        Ok(connection.reflect(method).await?.inputs)
    }

    /// Returns a connection over the cached client for `service`, building
    /// the client on first use.
    pub async fn connect(
        &self,
        service: &Service,
        credentials: Option<Credentials>,
    ) -> DistrResult<ServiceConnection<F::Client>> {
        let client = self.client_for(service).await?;
        Ok(ServiceConnection::new(service.name.clone(), client, credentials))
    }

    async fn client_for(&self, service: &Service) -> DistrResult<F::Client> {
        if let Some(client) = self.clients.read().await.get(&service.id) {
            debug!(service_id = %service.id, "Client cache hit");
            return Ok(client.clone());
        }

        let client = self.factory.build(service).await?;
        let mut clients = self.clients.write().await;
        // A concurrent caller may have built one meanwhile; keep the first.
        Ok(clients.entry(service.id).or_insert(client).clone())
    }

    async fn evict(&self, id: Uuid) {
        self.clients.write().await.remove(&id);
    }

    /// Re-checks every unblocked service against its stored namespace and
    /// blocks those that fail. Individual failures never abort the sweep.
    pub async fn revalidate_all(&self) -> DistrResult<RevalidationReport> {
        let services = self.repo.list_unblocked().await?;
        let mut report = RevalidationReport {
            checked: services.len(),
            ..Default::default()
        };

        let outcomes = join_all(services.iter().map(|service| self.revalidate(service))).await;

        for (service, outcome) in services.iter().zip(outcomes) {
            let Err(reason) = outcome else { continue };
            warn!(
                service_id = %service.id,
                name = %service.name,
                %reason,
                "Service failed revalidation"
            );
            match self.block(service.id).await {
                Ok(_) => report.blocked.push(service.id),
                Err(err) => {
                    warn!(service_id = %service.id, ?err, "Failed to block service");
                    report.block_failed.push(service.id);
                }
            }
        }

        Ok(report)
    }

    async fn revalidate(&self, service: &Service) -> Result<(), String> {
        let description = fetch_schema(&self.source, &service.introspection_url)
            .await
            .map_err(|e| e.to_string())?;
        check_contract(&description, &service.namespace)
    }
}

impl<R, S, F> ServiceConnector for ServiceRegistry<R, S, F>
where
    R: ServiceRepository,
    S: SchemaSource,
    F: ClientFactory,
{
    type Client = F::Client;

    async fn service(&self, id: Uuid) -> DistrResult<Service> {
        self.get(id).await
    }

    async fn connect(
        &self,
        service: &Service,
        credentials: Option<Credentials>,
    ) -> DistrResult<ServiceConnection<F::Client>> {
        ServiceRegistry::connect(self, service, credentials).await
    }
}

/// Runs [`ServiceRegistry::revalidate_all`] every `period`, starting
/// immediately. Never returns.
pub async fn revalidation_loop<R, S, F>(registry: Arc<ServiceRegistry<R, S, F>>, period: Duration)
where
    R: ServiceRepository,
    S: SchemaSource,
    F: ClientFactory,
{
    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;
        match registry.revalidate_all().await {
            Ok(report) => info!(
                checked = report.checked,
                blocked = report.blocked.len(),
                block_failed = report.block_failed.len(),
                "Revalidation sweep finished"
            ),
            Err(err) => warn!(?err, "Revalidation sweep failed"),
        }
    }
}
