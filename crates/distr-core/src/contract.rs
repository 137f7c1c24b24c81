//! The fixed remote contract every service implements
//! (`co.mechen.distr.common.v1.MainService`).
//!
//! Request and response types mirror the protobuf messages and use the
//! proto3 JSON field names, so a dynamic client can translate them with
//! serde alone. [`ContractClient`] is the seam between the orchestration
//! layer and whatever transport produced the client.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::DistrResult;
use crate::models::credentials::Credentials;
use crate::models::service::Service;
use crate::models::status::{HealthStatus, Usage};
use crate::models::value::{Field, Input, Property};

/// Fully-qualified protobuf package of the shared contract.
pub const CONTRACT_PACKAGE: &str = "co.mechen.distr.common.v1";

/// Name of the service every integration must declare in its namespace.
pub const MAIN_SERVICE: &str = "MainService";

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Closed set of transport failure kinds, mirroring RPC status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl TransportErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportErrorKind::Cancelled => "CANCELLED",
            TransportErrorKind::Unknown => "UNKNOWN",
            TransportErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            TransportErrorKind::DeadlineExceeded => "DEADLINE_EXCEEDED",
            TransportErrorKind::NotFound => "NOT_FOUND",
            TransportErrorKind::AlreadyExists => "ALREADY_EXISTS",
            TransportErrorKind::PermissionDenied => "PERMISSION_DENIED",
            TransportErrorKind::ResourceExhausted => "RESOURCE_EXHAUSTED",
            TransportErrorKind::FailedPrecondition => "FAILED_PRECONDITION",
            TransportErrorKind::Aborted => "ABORTED",
            TransportErrorKind::OutOfRange => "OUT_OF_RANGE",
            TransportErrorKind::Unimplemented => "UNIMPLEMENTED",
            TransportErrorKind::Internal => "INTERNAL",
            TransportErrorKind::Unavailable => "UNAVAILABLE",
            TransportErrorKind::DataLoss => "DATA_LOSS",
            TransportErrorKind::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed remote call, classified by kind with the original message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Write method a service can describe its inputs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Method {
    #[default]
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectMethodRequest {
    pub method: Method,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectMethodResponse {
    #[serde(default)]
    pub method: Method,
    #[serde(default)]
    pub inputs: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRequest {
    pub credentials: Credentials,
    pub resource_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GetResponse {
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub credentials: Credentials,
    pub resource_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: HealthStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub credentials: Credentials,
    pub resource_id: String,
    #[serde(default)]
    pub payload: Vec<Input>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub credentials: Credentials,
    pub resource_id: String,
    #[serde(default)]
    pub payload: Vec<Input>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub credentials: Credentials,
    pub resource_id: String,
    #[serde(default)]
    pub payload: Vec<Input>,
}

/// Acknowledgement returned by the three write operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WriteResponse {
    #[serde(default)]
    pub status: bool,
}

// ---------------------------------------------------------------------------
// Client seams
// ---------------------------------------------------------------------------

/// A live client for one service, exposing the six contract operations.
///
/// Implementations translate their transport's failures into
/// [`TransportError`]. No timeout is imposed at this layer.
pub trait ContractClient: Send + Sync {
    fn reflect(
        &self,
        request: ReflectMethodRequest,
    ) -> impl Future<Output = Result<ReflectMethodResponse, TransportError>> + Send;
    fn get(
        &self,
        request: GetRequest,
    ) -> impl Future<Output = Result<GetResponse, TransportError>> + Send;
    fn status(
        &self,
        request: StatusRequest,
    ) -> impl Future<Output = Result<StatusResponse, TransportError>> + Send;
    fn create(
        &self,
        request: CreateRequest,
    ) -> impl Future<Output = Result<WriteResponse, TransportError>> + Send;
    fn update(
        &self,
        request: UpdateRequest,
    ) -> impl Future<Output = Result<WriteResponse, TransportError>> + Send;
    fn delete(
        &self,
        request: DeleteRequest,
    ) -> impl Future<Output = Result<WriteResponse, TransportError>> + Send;
}

/// Builds a [`ContractClient`] for a registered service.
///
/// The production implementation fetches and compiles the service's
/// schema at runtime; callers only ever see the resulting client.
pub trait ClientFactory: Send + Sync {
    type Client: ContractClient + Clone + 'static;

    fn build(&self, service: &Service) -> impl Future<Output = DistrResult<Self::Client>> + Send;
}
