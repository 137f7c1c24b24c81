//! Tests for runtime schema compilation and dynamic message conversion.

use std::collections::HashMap;

use distr_core::contract::{
    CreateRequest, GetResponse, Method, ReflectMethodResponse, TransportErrorKind,
};
use distr_core::error::{DistrError, DistrResult, ErrorKind};
use distr_core::models::credentials::{AzureCredentials, Credentials};
use distr_core::models::status::Limit;
use distr_core::models::value::{FieldType, Input, Struct, Value};
use distr_proto::client::{from_dynamic, kind_from_code, to_dynamic};
use distr_proto::schema::check_contract;
use distr_proto::{
    ClientDefinition, SchemaSource, extract_namespace, fetch_schema, materialize_client,
};
use prost::Message;
use prost_reflect::DynamicMessage;

const STORAGE_SCHEMA: &str = include_str!("fixtures/storage.proto");

struct FixedSource {
    schemas: HashMap<String, String>,
}

impl FixedSource {
    fn with(url: &str, schema: &str) -> Self {
        Self {
            schemas: HashMap::from([(url.to_string(), schema.to_string())]),
        }
    }
}

impl SchemaSource for FixedSource {
    async fn fetch(&self, url: &str) -> DistrResult<String> {
        self.schemas
            .get(url)
            .cloned()
            .ok_or_else(|| DistrError::SchemaFetch {
                url: url.to_string(),
                message: "404 Not Found".into(),
            })
    }
}

fn definition() -> ClientDefinition {
    ClientDefinition::compile(STORAGE_SCHEMA, "acme", "storage").unwrap()
}

#[test]
fn fixture_satisfies_the_contract() {
    let description =
        distr_proto::SchemaDescription::parse("storage.proto", STORAGE_SCHEMA).unwrap();
    assert_eq!(extract_namespace(&description).as_deref(), Some("acme"));
    assert_eq!(check_contract(&description, "acme"), Ok(()));
}

#[test]
fn compiled_definition_resolves_main_service() {
    let definition = definition();
    let service = definition.service();
    assert_eq!(service.full_name(), "acme.MainService");

    let mut methods: Vec<String> = service.methods().map(|m| m.name().to_string()).collect();
    methods.sort();
    assert_eq!(
        methods,
        vec!["Create", "Delete", "Get", "Reflect", "Status", "Update"]
    );
}

#[test]
fn compile_fails_for_unknown_namespace() {
    let err = ClientDefinition::compile(STORAGE_SCHEMA, "globex", "storage").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidServiceDefinition);
}

#[test]
fn compile_fails_for_unresolvable_types() {
    let schema = STORAGE_SCHEMA.replace("GetRequest)", "MissingRequest)");
    let err = ClientDefinition::compile(&schema, "acme", "broken").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaParse);
}

#[tokio::test]
async fn materialize_fetches_then_compiles() {
    let source = FixedSource::with("http://acme/schema", STORAGE_SCHEMA);

    let definition = materialize_client(&source, "http://acme/schema", "acme", "svc-1")
        .await
        .unwrap();
    assert_eq!(definition.service().methods().count(), 6);

    let err = materialize_client(&source, "http://acme/missing", "acme", "svc-1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaFetch);
}

#[tokio::test]
async fn fetch_schema_parses_the_fetched_text() {
    let source = FixedSource::with("http://acme/schema", STORAGE_SCHEMA);
    let description = fetch_schema(&source, "http://acme/schema").await.unwrap();
    assert!(distr_proto::validate(&description, "acme"));
}

#[test]
fn connect_accepts_addresses_without_scheme() {
    let definition = definition();
    // Lazily connected: no listener is needed.
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let _guard = runtime.enter();
    assert!(definition.connect("localhost:50051").is_ok());
    assert!(definition.connect("http://localhost:50051").is_ok());
}

#[test]
fn create_request_survives_the_wire_encoding() {
    let definition = definition();
    let method = definition
        .service()
        .methods()
        .find(|m| m.name() == "Create")
        .unwrap();

    let request = CreateRequest {
        credentials: Credentials::Azure(AzureCredentials {
            tenant_id: "tenant".into(),
            client_id: "client".into(),
            secret: "pw".into(),
        }),
        resource_id: "0b7c".into(),
        payload: vec![
            Input::new("bucket", "logs"),
            Input::new("settings", Struct::new().with("versioned", true)),
        ],
    };

    let message = to_dynamic(&method, &request).unwrap();
    let bytes = message.encode_to_vec();
    let decoded = DynamicMessage::decode(method.input(), bytes.as_slice()).unwrap();
    let back: CreateRequest = from_dynamic(&decoded).unwrap();
    assert_eq!(back, request);
}

#[test]
fn responses_fill_in_proto_defaults() {
    let definition = definition();
    let reflect = definition
        .service()
        .methods()
        .find(|m| m.name() == "Reflect")
        .unwrap();
    let get = definition
        .service()
        .methods()
        .find(|m| m.name() == "Get")
        .unwrap();

    // Every scalar left at its default is omitted on the wire.
    let message = DynamicMessage::deserialize(
        reflect.output(),
        serde_json::json!({
            "method": "CREATE",
            "inputs": [{ "name": "bucket", "required": true }]
        }),
    )
    .unwrap();
    let response: ReflectMethodResponse = from_dynamic(&message).unwrap();
    assert_eq!(response.method, Method::Create);
    assert_eq!(response.inputs[0].field_type, FieldType::String);
    assert!(response.inputs[0].required);

    let message = DynamicMessage::deserialize(
        get.output(),
        serde_json::json!({
            "properties": [{ "name": "arn", "value": { "stringValue": "arn:aws:s3:::logs" } }],
            "usage": { "current": 3.0 }
        }),
    )
    .unwrap();
    let response: GetResponse = from_dynamic(&message).unwrap();
    assert_eq!(
        response.properties[0].value,
        Some(Value::StringValue("arn:aws:s3:::logs".into()))
    );
    let usage = response.usage.unwrap();
    assert_eq!(usage.kind, Limit::Limited);
    assert_eq!(usage.current, Some(3.0));
    assert_eq!(usage.limit, None);
}

#[test]
fn unreadable_response_names_its_message_type() {
    let definition = definition();
    let get = definition
        .service()
        .methods()
        .find(|m| m.name() == "Get")
        .unwrap();
    let message = DynamicMessage::new(get.output());

    let err = from_dynamic::<Vec<String>>(&message).unwrap_err();
    assert_eq!(err.kind, TransportErrorKind::DataLoss);
    assert!(err.message.starts_with(&format!("reading {}:", get.output().full_name())));
}

#[test]
fn status_codes_map_to_transport_kinds() {
    assert_eq!(
        kind_from_code(tonic::Code::Unavailable),
        TransportErrorKind::Unavailable
    );
    assert_eq!(
        kind_from_code(tonic::Code::FailedPrecondition),
        TransportErrorKind::FailedPrecondition
    );
    assert_eq!(
        kind_from_code(tonic::Code::Unauthenticated),
        TransportErrorKind::Unauthenticated
    );
    assert_eq!(kind_from_code(tonic::Code::Unknown), TransportErrorKind::Unknown);
}
