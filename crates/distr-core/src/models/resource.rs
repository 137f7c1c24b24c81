//! Resource domain model.
//!
//! A resource is a local handle to an object managed by a remote service.
//! All business state lives remotely; locally only identity is kept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value::Input;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Also sent to the service as the remote `resourceId`.
    pub id: Uuid,
    pub deployment_id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository input. The id is chosen before the remote create call so
/// the local row and the remote object share it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResource {
    pub id: Uuid,
    pub deployment_id: Uuid,
    pub service_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateResource {
    pub name: Option<String>,
}

/// Caller input for provisioning a resource.
#[derive(Debug, Clone)]
pub struct CreateResourceInput {
    pub deployment_id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    /// Inputs forwarded to the service's `Create` call.
    pub payload: Vec<Input>,
}

/// Caller input for updating a resource.
///
/// When `payload` is `None` only local fields change and the service is
/// not contacted.
#[derive(Debug, Clone, Default)]
pub struct UpdateResourceInput {
    pub name: Option<String>,
    pub payload: Option<Vec<Input>>,
}
