//! Dynamic RPC clients built from a service's published schema.
//!
//! The schema is compiled at runtime together with the bundled shared
//! contract; requests and responses cross the wire as
//! [`DynamicMessage`]s translated to and from the typed contract structs
//! through their proto3 JSON form.

use std::fs;
use std::sync::Arc;

use distr_core::contract::{
    ClientFactory, ContractClient, CreateRequest, DeleteRequest, GetRequest, GetResponse,
    MAIN_SERVICE, ReflectMethodRequest, ReflectMethodResponse, StatusRequest, StatusResponse,
    TransportError, TransportErrorKind, UpdateRequest, WriteResponse,
};
use distr_core::error::{DistrError, DistrResult};
use distr_core::models::service::Service;
use http::uri::PathAndQuery;
use prost_reflect::{
    DescriptorPool, DynamicMessage, MethodDescriptor, ReflectMessage, ServiceDescriptor,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use crate::codec::DynamicCodec;
use crate::schema::{HttpSchemaFetcher, SchemaSource};

/// Bundled shared contract, placed beside every compiled schema.
pub const COMMON_PROTO: &str = include_str!("../proto/co/mechen/distr/common/v1.proto");

/// Import path services use for the shared contract.
pub const COMMON_PROTO_PATH: &str = "co/mechen/distr/common/v1.proto";

/// A compiled `<namespace>.MainService`, ready to bind to an address.
#[derive(Debug, Clone)]
pub struct ClientDefinition {
    service: ServiceDescriptor,
}

impl ClientDefinition {
    /// Compiles `schema` in a fresh temporary directory, written as
    /// `<cache_key>.proto`, and resolves `<namespace>.MainService`.
    pub fn compile(schema: &str, namespace: &str, cache_key: &str) -> DistrResult<Self> {
        let dir = tempfile::tempdir()
            .map_err(|e| DistrError::Internal(format!("creating schema directory: {e}")))?;

        let common = dir.path().join(COMMON_PROTO_PATH);
        if let Some(parent) = common.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DistrError::Internal(format!("writing shared contract: {e}")))?;
        }
        fs::write(&common, COMMON_PROTO)
            .map_err(|e| DistrError::Internal(format!("writing shared contract: {e}")))?;

        let file = dir.path().join(format!("{cache_key}.proto"));
        fs::write(&file, schema)
            .map_err(|e| DistrError::Internal(format!("writing schema: {e}")))?;

        let files = protox::compile([&file], [dir.path()])
            .map_err(|e| DistrError::SchemaParse(e.to_string()))?;
        let pool = DescriptorPool::from_file_descriptor_set(files)
            .map_err(|e| DistrError::SchemaParse(e.to_string()))?;

        let name = format!("{namespace}.{MAIN_SERVICE}");
        let service = pool
            .get_service_by_name(&name)
            .ok_or_else(|| DistrError::invalid_service(format!("{name} not found in schema")))?;

        Ok(Self { service })
    }

    pub fn service(&self) -> &ServiceDescriptor {
        &self.service
    }

    /// Binds the definition to `address`. The channel connects on first
    /// use, so an unreachable service surfaces as an `UNAVAILABLE` call
    /// failure rather than here.
    pub fn connect(&self, address: &str) -> DistrResult<GrpcContractClient> {
        let uri = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{address}")
        };
        let channel = Endpoint::from_shared(uri)
            .map_err(|e| DistrError::Validation {
                message: format!("invalid service address {address}: {e}"),
            })?
            .connect_lazy();

        Ok(GrpcContractClient {
            channel,
            service: self.service.clone(),
        })
    }
}

/// Fetches the schema at `url` and compiles it into a client definition.
/// Nothing is retried.
pub async fn materialize_client<S: SchemaSource>(
    source: &S,
    url: &str,
    namespace: &str,
    cache_key: &str,
) -> DistrResult<ClientDefinition> {
    let schema = source.fetch(url).await?;
    ClientDefinition::compile(&schema, namespace, cache_key)
}

// ---------------------------------------------------------------------------
// Live client
// ---------------------------------------------------------------------------

/// Contract client over a tonic channel. Clones share the channel.
#[derive(Debug, Clone)]
pub struct GrpcContractClient {
    channel: Channel,
    service: ServiceDescriptor,
}

impl GrpcContractClient {
    fn method(&self, name: &str) -> Result<MethodDescriptor, TransportError> {
        self.service
            .methods()
            .find(|m| m.name() == name)
            .ok_or_else(|| {
                TransportError::new(
                    TransportErrorKind::Unimplemented,
                    format!("{} has no method {name}", self.service.full_name()),
                )
            })
    }

    async fn invoke<Req, Resp>(&self, name: &str, request: &Req) -> Result<Resp, TransportError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let method = self.method(name)?;
        let message = to_dynamic(&method, request)?;
        let path = PathAndQuery::try_from(format!("/{}/{}", self.service.full_name(), name))
            .map_err(|e| TransportError::new(TransportErrorKind::Internal, e.to_string()))?;

        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        grpc.ready().await.map_err(|e| {
            TransportError::new(
                TransportErrorKind::Unavailable,
                format!("service not ready: {e}"),
            )
        })?;

        debug!(method = %method.full_name(), "Invoking remote method");
        let response = grpc
            .unary(
                tonic::Request::new(message),
                path,
                DynamicCodec::new(method.output()),
            )
            .await
            .map_err(|status| from_status(&status))?;

        from_dynamic(&response.into_inner())
    }
}

impl ContractClient for GrpcContractClient {
    async fn reflect(
        &self,
        request: ReflectMethodRequest,
    ) -> Result<ReflectMethodResponse, TransportError> {
        self.invoke("Reflect", &request).await
    }

    async fn get(&self, request: GetRequest) -> Result<GetResponse, TransportError> {
        self.invoke("Get", &request).await
    }

    async fn status(&self, request: StatusRequest) -> Result<StatusResponse, TransportError> {
        self.invoke("Status", &request).await
    }

    async fn create(&self, request: CreateRequest) -> Result<WriteResponse, TransportError> {
        self.invoke("Create", &request).await
    }

    async fn update(&self, request: UpdateRequest) -> Result<WriteResponse, TransportError> {
        self.invoke("Update", &request).await
    }

    async fn delete(&self, request: DeleteRequest) -> Result<WriteResponse, TransportError> {
        self.invoke("Delete", &request).await
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// Builds the request message for `method` from its proto3 JSON form.
pub fn to_dynamic<T: Serialize>(
    method: &MethodDescriptor,
    value: &T,
) -> Result<DynamicMessage, TransportError> {
    let json = serde_json::to_value(value)
        .map_err(|e| TransportError::new(TransportErrorKind::InvalidArgument, e.to_string()))?;
    DynamicMessage::deserialize(method.input(), json).map_err(|e| {
        TransportError::new(
            TransportErrorKind::InvalidArgument,
            format!("building {}: {e}", method.input().full_name()),
        )
    })
}

/// Reads a typed value out of a response message via its proto3 JSON form.
pub fn from_dynamic<T: DeserializeOwned>(message: &DynamicMessage) -> Result<T, TransportError> {
    let json = message
        .serialize(serde_json::value::Serializer)
        .map_err(|e| TransportError::new(TransportErrorKind::DataLoss, e.to_string()))?;
    serde_json::from_value(json).map_err(|e| {
        TransportError::new(
            TransportErrorKind::DataLoss,
            format!("reading {}: {e}", message.descriptor().full_name()),
        )
    })
}

pub fn kind_from_code(code: tonic::Code) -> TransportErrorKind {
    use tonic::Code;

    match code {
        Code::Cancelled => TransportErrorKind::Cancelled,
        Code::InvalidArgument => TransportErrorKind::InvalidArgument,
        Code::DeadlineExceeded => TransportErrorKind::DeadlineExceeded,
        Code::NotFound => TransportErrorKind::NotFound,
        Code::AlreadyExists => TransportErrorKind::AlreadyExists,
        Code::PermissionDenied => TransportErrorKind::PermissionDenied,
        Code::ResourceExhausted => TransportErrorKind::ResourceExhausted,
        Code::FailedPrecondition => TransportErrorKind::FailedPrecondition,
        Code::Aborted => TransportErrorKind::Aborted,
        Code::OutOfRange => TransportErrorKind::OutOfRange,
        Code::Unimplemented => TransportErrorKind::Unimplemented,
        Code::Internal => TransportErrorKind::Internal,
        Code::Unavailable => TransportErrorKind::Unavailable,
        Code::DataLoss => TransportErrorKind::DataLoss,
        Code::Unauthenticated => TransportErrorKind::Unauthenticated,
        _ => TransportErrorKind::Unknown,
    }
}

fn from_status(status: &tonic::Status) -> TransportError {
    TransportError::new(kind_from_code(status.code()), status.message())
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds [`GrpcContractClient`]s by fetching each service's schema from
/// its introspection URL and binding to its service URL.
#[derive(Debug, Clone)]
pub struct GrpcClientFactory<S = HttpSchemaFetcher> {
    source: Arc<S>,
}

impl<S: SchemaSource> GrpcClientFactory<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }
}

impl<S: SchemaSource> ClientFactory for GrpcClientFactory<S> {
    type Client = GrpcContractClient;

    async fn build(&self, service: &Service) -> DistrResult<GrpcContractClient> {
        let definition = materialize_client(
            self.source.as_ref(),
            &service.introspection_url,
            &service.namespace,
            &service.id.to_string(),
        )
        .await?;
        definition.connect(&service.service_url)
    }
}
