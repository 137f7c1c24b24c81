//! Schema-less value model exchanged with backend services.
//!
//! The serde representation follows the proto3 JSON mapping of the
//! `co.mechen.distr.common.v1` messages, so these types can be converted
//! to and from dynamic protobuf messages without a hand-written mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single value: exactly one of string, number, bool or a nested struct.
///
/// Serialized as a one-key object (`{"stringValue": "..."}`), which is how
/// a populated `oneof` appears in proto3 JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    StringValue(String),
    NumberValue(f64),
    BoolValue(bool),
    StructValue(Struct),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::StringValue(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::StringValue(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::NumberValue(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::BoolValue(value)
    }
}

impl From<Struct> for Value {
    fn from(value: Struct) -> Self {
        Value::StructValue(value)
    }
}

/// A named collection of values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Struct {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Struct {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// A named value sent to a service as part of a create/update/delete payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Input {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// A named value returned by a service describing a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Boolean,
    Struct,
}

/// Reflection description of an input a service expects for a method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    /// Nested fields, only meaningful for [`FieldType::Struct`].
    #[serde(default)]
    pub fields: Vec<Field>,
}
