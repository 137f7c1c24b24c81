//! In-process fakes for the remote side: schema source, client factory and
//! contract client, all sharing one [`FakeBackend`].

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use distr_core::contract::{
    ClientFactory, ContractClient, CreateRequest, DeleteRequest, GetRequest, GetResponse,
    ReflectMethodRequest, ReflectMethodResponse, StatusRequest, StatusResponse, TransportError,
    TransportErrorKind, UpdateRequest, WriteResponse,
};
use distr_core::error::{DistrError, DistrResult};
use distr_core::models::credentials::Credentials;
use distr_core::models::service::{CreateServiceInput, Platform, Service};
use distr_core::models::status::{HealthStatus, Usage};
use distr_core::models::value::{Field, Property};
use distr_core::repository::{DeletionPlan, DeletionRepository};
use distr_db::repository::{
    SurrealDeletionRepository, SurrealDeploymentRepository, SurrealResourceRepository,
    SurrealServiceRepository, SurrealSystemRepository,
};
use distr_orchestrator::{ResourceOrchestrator, ServiceRegistry};
use distr_proto::schema::SchemaSource;
use distr_vault::Vault;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tokio::sync::Notify;

pub async fn setup_db() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    distr_db::run_migrations(&db).await.unwrap();
    db
}

// ---------------------------------------------------------------------------
// Schemas
// ---------------------------------------------------------------------------

const CONTRACT_METHODS: &str = r#"
  rpc Reflect(co.mechen.distr.common.v1.ReflectMethodRequest) returns (co.mechen.distr.common.v1.ReflectMethodResponse);
  rpc Get(co.mechen.distr.common.v1.GetRequest) returns (co.mechen.distr.common.v1.GetResponse);
  rpc Status(co.mechen.distr.common.v1.StatusRequest) returns (co.mechen.distr.common.v1.StatusResponse);
  rpc Create(co.mechen.distr.common.v1.CreateRequest) returns (co.mechen.distr.common.v1.CreateResponse);
  rpc Update(co.mechen.distr.common.v1.UpdateRequest) returns (co.mechen.distr.common.v1.UpdateResponse);
  rpc Delete(co.mechen.distr.common.v1.DeleteRequest) returns (co.mechen.distr.common.v1.DeleteResponse);
"#;

fn schema_with(package: &str, methods: &str) -> String {
    format!(
        "syntax = \"proto3\";\npackage {package};\nimport \"co/mechen/distr/common/v1.proto\";\nservice MainService {{\n{methods}\n}}\n"
    )
}

/// A schema declaring `<package>.MainService` with exactly the contract.
pub fn valid_schema(package: &str) -> String {
    schema_with(package, CONTRACT_METHODS)
}

/// Same as [`valid_schema`] but `Status` returns the wrong type.
pub fn broken_schema(package: &str) -> String {
    let methods = CONTRACT_METHODS.replace(
        "returns (co.mechen.distr.common.v1.StatusResponse)",
        "returns (co.mechen.distr.common.v1.GetResponse)",
    );
    schema_with(package, &methods)
}

/// Serves schema text from an in-memory map that tests can rewrite.
#[derive(Clone, Default)]
pub struct FakeSchemas {
    schemas: Arc<Mutex<HashMap<String, String>>>,
}

impl FakeSchemas {
    pub fn publish(&self, url: &str, schema: impl Into<String>) {
        self.schemas
            .lock()
            .unwrap()
            .insert(url.to_string(), schema.into());
    }

    pub fn withdraw(&self, url: &str) {
        self.schemas.lock().unwrap().remove(url);
    }
}

impl SchemaSource for FakeSchemas {
    async fn fetch(&self, url: &str) -> DistrResult<String> {
        self.schemas
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| DistrError::SchemaFetch {
                url: url.to_string(),
                message: "404 Not Found".into(),
            })
    }
}

pub fn service_input(name: &str, introspection_url: &str) -> CreateServiceInput {
    CreateServiceInput {
        name: name.into(),
        summary: format!("{name} service"),
        description: String::new(),
        platform: Platform::Aws,
        author_id: None,
        service_url: format!("{name}.svc:50051"),
        introspection_url: introspection_url.into(),
        documentation_url: String::new(),
        source_code_url: String::new(),
    }
}

// ---------------------------------------------------------------------------
// Remote service
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BackendState {
    events: Vec<String>,
    failing: HashSet<&'static str>,
    statuses: HashMap<String, HealthStatus>,
    inputs: Vec<Field>,
    properties: Vec<Property>,
    usage: Option<Usage>,
    credentials: Vec<Credentials>,
    plans: Vec<DeletionPlan>,
    update_gate: Option<UpdateGate>,
}

/// Pauses remote updates after they are logged until `release` fires.
#[derive(Clone, Default)]
pub struct UpdateGate {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

/// Behaviour and call log of the fake remote service.
///
/// Operations listed via [`fail`](Self::fail) return `UNAVAILABLE`. A
/// status request for a resource with no configured status does too.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<BackendState>>,
}

impl FakeBackend {
    pub fn fail(&self, operation: &'static str) {
        self.state.lock().unwrap().failing.insert(operation);
    }

    pub fn set_status(&self, resource_id: impl ToString, status: HealthStatus) {
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(resource_id.to_string(), status);
    }

    pub fn set_inputs(&self, inputs: Vec<Field>) {
        self.state.lock().unwrap().inputs = inputs;
    }

    pub fn set_details(&self, properties: Vec<Property>, usage: Option<Usage>) {
        let mut state = self.state.lock().unwrap();
        state.properties = properties;
        state.usage = usage;
    }

    /// Makes every following remote update wait on the returned gate.
    pub fn hold_updates(&self) -> UpdateGate {
        let gate = UpdateGate::default();
        self.state.lock().unwrap().update_gate = Some(gate.clone());
        gate
    }

    fn update_gate(&self) -> Option<UpdateGate> {
        self.state.lock().unwrap().update_gate.clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn plans(&self) -> Vec<DeletionPlan> {
        self.state.lock().unwrap().plans.clone()
    }

    pub fn last_credentials(&self) -> Option<Credentials> {
        self.state.lock().unwrap().credentials.last().cloned()
    }

    fn record_commit(&self, plan: DeletionPlan) {
        let mut state = self.state.lock().unwrap();
        state.events.push("commit".into());
        state.plans.push(plan);
    }

    fn call(
        &self,
        operation: &'static str,
        resource_id: &str,
        credentials: Option<&Credentials>,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.events.push(format!("{operation}:{resource_id}"));
        if let Some(credentials) = credentials {
            state.credentials.push(credentials.clone());
        }
        if state.failing.contains(operation) {
            return Err(TransportError::new(
                TransportErrorKind::Unavailable,
                format!("{operation} unavailable"),
            ));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct FakeClient {
    backend: FakeBackend,
}

impl ContractClient for FakeClient {
    async fn reflect(
        &self,
        request: ReflectMethodRequest,
    ) -> Result<ReflectMethodResponse, TransportError> {
        self.backend.call("reflect", "-", None)?;
        Ok(ReflectMethodResponse {
            method: request.method,
            inputs: self.backend.state.lock().unwrap().inputs.clone(),
        })
    }

    async fn get(&self, request: GetRequest) -> Result<GetResponse, TransportError> {
        self.backend
            .call("get", &request.resource_id, Some(&request.credentials))?;
        let state = self.backend.state.lock().unwrap();
        Ok(GetResponse {
            properties: state.properties.clone(),
            usage: state.usage.clone(),
        })
    }

    async fn status(&self, request: StatusRequest) -> Result<StatusResponse, TransportError> {
        self.backend
            .call("status", &request.resource_id, Some(&request.credentials))?;
        let status = self
            .backend
            .state
            .lock()
            .unwrap()
            .statuses
            .get(&request.resource_id)
            .copied();
        status.map(|status| StatusResponse { status }).ok_or_else(|| {
            TransportError::new(TransportErrorKind::Unavailable, "connection refused")
        })
    }

    async fn create(&self, request: CreateRequest) -> Result<WriteResponse, TransportError> {
        self.backend
            .call("create", &request.resource_id, Some(&request.credentials))?;
        Ok(WriteResponse { status: true })
    }

    async fn update(&self, request: UpdateRequest) -> Result<WriteResponse, TransportError> {
        self.backend
            .call("update", &request.resource_id, Some(&request.credentials))?;
        if let Some(gate) = self.backend.update_gate() {
            gate.started.notify_one();
            gate.release.notified().await;
        }
        Ok(WriteResponse { status: true })
    }

    async fn delete(&self, request: DeleteRequest) -> Result<WriteResponse, TransportError> {
        self.backend
            .call("delete", &request.resource_id, Some(&request.credentials))?;
        Ok(WriteResponse { status: true })
    }
}

/// Hands out [`FakeClient`]s and counts how many were built.
#[derive(Clone, Default)]
pub struct FakeFactory {
    pub backend: FakeBackend,
    builds: Arc<AtomicUsize>,
}

impl FakeFactory {
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl ClientFactory for FakeFactory {
    type Client = FakeClient;

    async fn build(&self, _service: &Service) -> DistrResult<FakeClient> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(FakeClient {
            backend: self.backend.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Records every committed plan in the backend's event log before
/// applying it.
pub struct RecordingDeletions {
    inner: SurrealDeletionRepository<Db>,
    backend: FakeBackend,
}

impl DeletionRepository for RecordingDeletions {
    async fn commit(&self, plan: DeletionPlan) -> DistrResult<()> {
        self.backend.record_commit(plan.clone());
        self.inner.commit(plan).await
    }
}

pub type TestRegistry = ServiceRegistry<SurrealServiceRepository<Db>, FakeSchemas, FakeFactory>;

pub type TestOrchestrator = ResourceOrchestrator<
    SurrealSystemRepository<Db>,
    SurrealDeploymentRepository<Db>,
    SurrealResourceRepository<Db>,
    RecordingDeletions,
    Arc<TestRegistry>,
>;

pub struct Harness {
    pub db: Surreal<Db>,
    pub schemas: FakeSchemas,
    pub factory: FakeFactory,
    pub backend: FakeBackend,
    pub registry: Arc<TestRegistry>,
    pub vault: Vault,
}

impl Harness {
    pub async fn new() -> Self {
        let db = setup_db().await;
        let schemas = FakeSchemas::default();
        let factory = FakeFactory::default();
        let backend = factory.backend.clone();
        let registry = Arc::new(ServiceRegistry::new(
            SurrealServiceRepository::new(db.clone()),
            schemas.clone(),
            factory.clone(),
        ));

        Self {
            db,
            schemas,
            factory,
            backend,
            registry,
            vault: test_vault(),
        }
    }

    pub fn orchestrator(&self) -> TestOrchestrator {
        ResourceOrchestrator::new(
            SurrealSystemRepository::new(self.db.clone()),
            SurrealDeploymentRepository::new(self.db.clone()),
            SurrealResourceRepository::new(self.db.clone()),
            RecordingDeletions {
                inner: SurrealDeletionRepository::new(self.db.clone()),
                backend: self.backend.clone(),
            },
            self.registry.clone(),
            test_vault(),
        )
    }

    /// Registers a service whose schema declares a package named `name`.
    pub async fn register(&self, name: &str) -> Service {
        let url = format!("https://{name}.example/schema.proto");
        self.schemas.publish(&url, valid_schema(name));
        self.registry
            .register(service_input(name, &url))
            .await
            .unwrap()
    }
}

pub fn test_vault() -> Vault {
    Vault::from_key([7u8; 32])
}
