//! Schema fetching and structural contract validation.
//!
//! A service's schema is fetched as raw protobuf text and parsed without
//! resolving imports, so type names are kept exactly as the author wrote
//! them. Validation compares those names against the shared contract.

use distr_core::contract::{CONTRACT_PACKAGE, MAIN_SERVICE};
use distr_core::error::{DistrError, DistrResult};
use prost_types::FileDescriptorProto;
use tracing::debug;

/// Source of raw schema text, addressed by URL.
pub trait SchemaSource: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = DistrResult<String>> + Send;
}

/// Fetches schemas over HTTP(S) with a plain GET.
#[derive(Debug, Clone, Default)]
pub struct HttpSchemaFetcher {
    client: reqwest::Client,
}

impl SchemaSource for HttpSchemaFetcher {
    async fn fetch(&self, url: &str) -> DistrResult<String> {
        let fetch_error = |message: String| DistrError::SchemaFetch {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
            .error_for_status()
            .map_err(|e| fetch_error(e.to_string()))?;

        let body = response.text().await.map_err(|e| fetch_error(e.to_string()))?;
        debug!(url, bytes = body.len(), "Fetched schema");
        Ok(body)
    }
}

// ---------------------------------------------------------------------------
// Structural description
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescription {
    pub name: String,
    /// Request type name as written in the schema.
    pub request_type: String,
    pub response_type: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescription {
    pub name: String,
    pub methods: Vec<MethodDescription>,
}

/// One level of the namespace tree. Package segments become nested
/// namespaces, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,
    pub namespaces: Vec<Namespace>,
    pub messages: Vec<String>,
    pub enums: Vec<String>,
    pub services: Vec<ServiceDescription>,
}

impl Namespace {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.iter().find(|n| n.name == name)
    }

    pub fn service(&self, name: &str) -> Option<&ServiceDescription> {
        self.services.iter().find(|s| s.name == name)
    }

    fn namespace_mut_or_insert(&mut self, name: &str) -> &mut Namespace {
        let index = match self.namespaces.iter().position(|n| n.name == name) {
            Some(index) => index,
            None => {
                self.namespaces.push(Namespace::named(name));
                self.namespaces.len() - 1
            }
        };
        &mut self.namespaces[index]
    }
}

/// Parsed, unresolved view of a service schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDescription {
    pub root: Namespace,
}

impl SchemaDescription {
    /// Parses schema text. `name` is only used in error messages.
    pub fn parse(name: &str, text: &str) -> DistrResult<Self> {
        let file = protox_parse::parse(name, text)
            .map_err(|e| DistrError::SchemaParse(format!("{name}: {e}")))?;
        Ok(Self::from_file(&file))
    }

    pub fn from_file(file: &FileDescriptorProto) -> Self {
        let mut root = Namespace::default();
        let mut leaf = &mut root;
        for segment in file.package().split('.').filter(|s| !s.is_empty()) {
            leaf = leaf.namespace_mut_or_insert(segment);
        }

        leaf.messages
            .extend(file.message_type.iter().map(|m| m.name().to_string()));
        leaf.enums
            .extend(file.enum_type.iter().map(|e| e.name().to_string()));
        leaf.services.extend(file.service.iter().map(|service| ServiceDescription {
            name: service.name().to_string(),
            methods: service
                .method
                .iter()
                .map(|method| MethodDescription {
                    name: method.name().to_string(),
                    request_type: method.input_type().to_string(),
                    response_type: method.output_type().to_string(),
                    client_streaming: method.client_streaming(),
                    server_streaming: method.server_streaming(),
                })
                .collect(),
        }));

        Self { root }
    }
}

/// Fetches and parses the schema published at `url`.
pub async fn fetch_schema<S: SchemaSource>(source: &S, url: &str) -> DistrResult<SchemaDescription> {
    let text = source.fetch(url).await?;
    SchemaDescription::parse(url, &text)
}

/// The first top-level namespace of the schema, if any.
pub fn extract_namespace(description: &SchemaDescription) -> Option<String> {
    description.root.namespaces.first().map(|n| n.name.clone())
}

// ---------------------------------------------------------------------------
// Contract check
// ---------------------------------------------------------------------------

/// Method name, request type, response type (unqualified).
const REQUIRED_METHODS: [(&str, &str, &str); 6] = [
    ("Reflect", "ReflectMethodRequest", "ReflectMethodResponse"),
    ("Get", "GetRequest", "GetResponse"),
    ("Status", "StatusRequest", "StatusResponse"),
    ("Create", "CreateRequest", "CreateResponse"),
    ("Update", "UpdateRequest", "UpdateResponse"),
    ("Delete", "DeleteRequest", "DeleteResponse"),
];

fn contract_type(name: &str) -> String {
    format!("{CONTRACT_PACKAGE}.{name}")
}

fn type_matches(written: &str, expected: &str) -> bool {
    written.strip_prefix('.').unwrap_or(written) == contract_type(expected)
}

/// Checks that `namespace` declares a `MainService` with exactly the six
/// contract methods, returning the first violation found.
pub fn check_contract(description: &SchemaDescription, namespace: &str) -> Result<(), String> {
    let ns = description
        .root
        .namespace(namespace)
        .ok_or_else(|| format!("namespace {namespace} not found"))?;
    let service = ns
        .service(MAIN_SERVICE)
        .ok_or_else(|| format!("{namespace}.{MAIN_SERVICE} not declared"))?;

    for (name, request, response) in REQUIRED_METHODS {
        let method = service
            .methods
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| format!("method {name} missing"))?;
        if method.client_streaming || method.server_streaming {
            return Err(format!("method {name} must be unary"));
        }
        if !type_matches(&method.request_type, request) {
            return Err(format!(
                "method {name} takes {}, expected {}",
                method.request_type,
                contract_type(request)
            ));
        }
        if !type_matches(&method.response_type, response) {
            return Err(format!(
                "method {name} returns {}, expected {}",
                method.response_type,
                contract_type(response)
            ));
        }
    }

    if let Some(extra) = service
        .methods
        .iter()
        .find(|m| !REQUIRED_METHODS.iter().any(|(name, _, _)| *name == m.name))
    {
        return Err(format!("unexpected method {}", extra.name));
    }

    Ok(())
}

/// Whether `namespace` implements the contract exactly.
pub fn validate(description: &SchemaDescription, namespace: &str) -> bool {
    check_contract(description, namespace).is_ok()
}
