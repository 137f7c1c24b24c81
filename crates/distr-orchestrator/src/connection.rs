//! A live client bound to one service and, optionally, one deployment's
//! credentials.

use distr_core::contract::{
    ContractClient, CreateRequest, DeleteRequest, GetRequest, GetResponse, Method,
    ReflectMethodRequest, ReflectMethodResponse, StatusRequest, TransportError,
    TransportErrorKind, UpdateRequest, WriteResponse,
};
use distr_core::error::{DistrError, DistrResult};
use distr_core::models::credentials::Credentials;
use distr_core::models::status::HealthStatus;
use distr_core::models::value::Input;
use uuid::Uuid;

/// Exposes the six contract operations with the resource id and
/// credentials filled in.
///
/// Every operation except [`reflect`](Self::reflect) needs credentials and
/// fails with [`DistrError::MissingCredentials`] before touching the
/// network when the connection has none.
#[derive(Debug, Clone)]
pub struct ServiceConnection<C> {
    service_name: String,
    client: C,
    credentials: Option<Credentials>,
}

impl<C: ContractClient> ServiceConnection<C> {
    pub fn new(service_name: impl Into<String>, client: C, credentials: Option<Credentials>) -> Self {
        Self {
            service_name: service_name.into(),
            client,
            credentials,
        }
    }

    fn credentials(&self) -> DistrResult<Credentials> {
        self.credentials
            .clone()
            .ok_or_else(|| DistrError::MissingCredentials {
                service: self.service_name.clone(),
            })
    }

    /// A write acknowledged with `status = false` is a refused precondition.
    fn acknowledge(&self, operation: &str, resource_id: Uuid, response: WriteResponse) -> DistrResult<()> {
        if response.status {
            return Ok(());
        }
        Err(TransportError::new(
            TransportErrorKind::FailedPrecondition,
            format!(
                "{} service refused to {operation} resource {resource_id}",
                self.service_name
            ),
        )
        .into())
    }

    pub async fn reflect(&self, method: Method) -> DistrResult<ReflectMethodResponse> {
        Ok(self.client.reflect(ReflectMethodRequest { method }).await?)
    }

    pub async fn get(&self, resource_id: Uuid) -> DistrResult<GetResponse> {
        let credentials = self.credentials()?;
        Ok(self
            .client
            .get(GetRequest {
                credentials,
                resource_id: resource_id.to_string(),
            })
            .await?)
    }

    pub async fn status(&self, resource_id: Uuid) -> DistrResult<HealthStatus> {
        let credentials = self.credentials()?;
        let response = self
            .client
            .status(StatusRequest {
                credentials,
                resource_id: resource_id.to_string(),
            })
            .await?;
        Ok(response.status)
    }

    pub async fn create(&self, resource_id: Uuid, payload: Vec<Input>) -> DistrResult<()> {
        let credentials = self.credentials()?;
        let response = self
            .client
            .create(CreateRequest {
                credentials,
                resource_id: resource_id.to_string(),
                payload,
            })
            .await?;
        self.acknowledge("create", resource_id, response)
    }

    pub async fn update(&self, resource_id: Uuid, payload: Vec<Input>) -> DistrResult<()> {
        let credentials = self.credentials()?;
        let response = self
            .client
            .update(UpdateRequest {
                credentials,
                resource_id: resource_id.to_string(),
                payload,
            })
            .await?;
        self.acknowledge("update", resource_id, response)
    }

    /// An absent payload is sent as an empty list.
    pub async fn delete(&self, resource_id: Uuid, payload: Option<Vec<Input>>) -> DistrResult<()> {
        let credentials = self.credentials()?;
        let response = self
            .client
            .delete(DeleteRequest {
                credentials,
                resource_id: resource_id.to_string(),
                payload: payload.unwrap_or_default(),
            })
            .await?;
        self.acknowledge("delete", resource_id, response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use distr_core::contract::StatusResponse;
    use distr_core::error::ErrorKind;
    use distr_core::models::credentials::{AwsCredentials, Credentials};

    use super::*;

    #[derive(Clone, Default)]
    struct CountingClient {
        calls: Arc<AtomicUsize>,
        last_delete: Arc<Mutex<Option<DeleteRequest>>>,
        acknowledge: bool,
    }

    impl ContractClient for CountingClient {
        async fn reflect(
            &self,
            request: ReflectMethodRequest,
        ) -> Result<ReflectMethodResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ReflectMethodResponse {
                method: request.method,
                inputs: Vec::new(),
            })
        }

        async fn get(&self, _request: GetRequest) -> Result<GetResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GetResponse::default())
        }

        async fn status(&self, _request: StatusRequest) -> Result<StatusResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StatusResponse {
                status: HealthStatus::Degraded,
            })
        }

        async fn create(&self, _request: CreateRequest) -> Result<WriteResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(WriteResponse {
                status: self.acknowledge,
            })
        }

        async fn update(&self, _request: UpdateRequest) -> Result<WriteResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(WriteResponse {
                status: self.acknowledge,
            })
        }

        async fn delete(&self, request: DeleteRequest) -> Result<WriteResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_delete.lock().unwrap() = Some(request);
            Ok(WriteResponse {
                status: self.acknowledge,
            })
        }
    }

    fn aws() -> Credentials {
        Credentials::Aws(AwsCredentials {
            id: "AKIA".into(),
            secret: "s3cr3t".into(),
            region: "eu-west-1".into(),
        })
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_call() {
        let client = CountingClient::default();
        let connection = ServiceConnection::new("storage", client.clone(), None);
        let id = Uuid::new_v4();

        let errors = [
            connection.get(id).await.unwrap_err(),
            connection.status(id).await.unwrap_err(),
            connection.create(id, Vec::new()).await.unwrap_err(),
            connection.update(id, Vec::new()).await.unwrap_err(),
            connection.delete(id, None).await.unwrap_err(),
        ];
        for err in &errors {
            assert_eq!(err.kind(), ErrorKind::MissingCredentials);
            assert_eq!(err.to_string(), "Missing credentials for storage service");
        }
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reflect_needs_no_credentials() {
        let client = CountingClient::default();
        let connection = ServiceConnection::new("storage", client.clone(), None);

        let response = connection.reflect(Method::Update).await.unwrap();
        assert_eq!(response.method, Method::Update);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn absent_delete_payload_is_sent_empty() {
        let client = CountingClient {
            acknowledge: true,
            ..Default::default()
        };
        let connection = ServiceConnection::new("storage", client.clone(), Some(aws()));
        let id = Uuid::new_v4();

        connection.delete(id, None).await.unwrap();

        let request = client.last_delete.lock().unwrap().clone().unwrap();
        assert!(request.payload.is_empty());
        assert_eq!(request.resource_id, id.to_string());
        assert_eq!(request.credentials, aws());
    }

    #[tokio::test]
    async fn refused_write_is_a_failed_precondition() {
        let client = CountingClient::default();
        let connection = ServiceConnection::new("storage", client, Some(aws()));

        let err = connection.create(Uuid::new_v4(), Vec::new()).await.unwrap_err();
        match err {
            DistrError::Transport(t) => assert_eq!(t.kind, TransportErrorKind::FailedPrecondition),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_is_passed_through() {
        let connection = ServiceConnection::new("storage", CountingClient::default(), Some(aws()));
        assert_eq!(
            connection.status(Uuid::new_v4()).await.unwrap(),
            HealthStatus::Degraded
        );
    }
}
