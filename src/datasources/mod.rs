//! Read-only data sources.
//!
//! Singular data sources look one object up by key and fail when it does not
//! exist. Plural ones list every object and apply the `filter` blocks.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::{ApiResponse, CoolifyClient};
use crate::error::ProviderError;
use crate::filter::{apply_filters, decode_filters, filter_block, FILTER_BLOCK};
use crate::flatten::project_fields;
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use crate::validation;

pub mod application;
pub mod private_key;
pub mod project;
pub mod server;
pub mod service;
pub mod team;

/// A data source type.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Type name, e.g. `coolify_servers`.
    fn type_name(&self) -> &'static str;

    /// Data source schema.
    fn schema(&self) -> Schema;

    /// Validate a configuration object.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validation::validate(&self.schema(), config)
    }

    /// Read the data source, returning its full state.
    async fn read(&self, client: &CoolifyClient, config: &Value) -> Result<Value, ProviderError>;
}

/// Every data source the provider registers.
pub fn all() -> Vec<Box<dyn DataSource>> {
    vec![
        Box::new(private_key::PrivateKeyDataSource),
        Box::new(private_key::PrivateKeysDataSource),
        Box::new(server::ServerDataSource),
        Box::new(server::ServersDataSource),
        Box::new(server::ServerResourcesDataSource),
        Box::new(server::ServerDomainsDataSource),
        Box::new(project::ProjectDataSource),
        Box::new(project::ProjectsDataSource),
        Box::new(team::TeamDataSource),
        Box::new(team::TeamsDataSource),
        Box::new(application::ApplicationDataSource),
        Box::new(application::ApplicationsDataSource),
        Box::new(service::ServiceDataSource),
        Box::new(service::ServicesDataSource),
    ]
}

/// `(attribute, type)` pairs describing one flattened API object.
pub(crate) type Fields = Vec<(&'static str, AttributeType)>;

pub(crate) fn field_names(fields: &Fields) -> Vec<&'static str> {
    fields.iter().map(|(name, _)| *name).collect()
}

/// Add every field as a computed attribute, except `key` which is the
/// required lookup input.
pub(crate) fn lookup_schema(description: &str, key: (&'static str, Attribute), fields: &Fields) -> Schema {
    let mut schema = Schema::v0().with_description(description);
    for (name, ty) in fields {
        schema = schema.with_attribute(*name, Attribute::computed(ty.clone()));
    }
    schema.with_attribute(key.0, key.1)
}

/// Schema of a plural data source: `filter` blocks plus the computed list.
pub(crate) fn list_schema(description: &str, list: &str, fields: &Fields, filterable: &[&str]) -> Schema {
    let item = AttributeType::object(fields);
    Schema::v0()
        .with_description(description)
        .with_attribute(list, Attribute::computed(AttributeType::list(item)))
        .with_block(FILTER_BLOCK, filter_block(filterable))
}

/// Check a single lookup: 404 is "not found", anything but 200 is an error.
pub(crate) fn found<T>(response: ApiResponse<T>, noun: &str, key: &str) -> Result<T, ProviderError> {
    if response.is_not_found() {
        return Err(ProviderError::NotFound(format!("{} {} not found", noun, key)));
    }
    response.into_body(&format!("read {}", noun), StatusCode::OK)
}

/// Flatten one API object to the listed fields.
pub(crate) fn item<T: Serialize>(value: &T, fields: &Fields) -> Result<Value, ProviderError> {
    project_fields(value, &field_names(fields))
}

/// Merge the lookup inputs from `config` into a flattened object.
pub(crate) fn with_inputs(mut state: Value, config: &Value, inputs: &[&str]) -> Value {
    if let Value::Object(map) = &mut state {
        for input in inputs {
            map.insert(
                (*input).to_string(),
                config.get(*input).cloned().unwrap_or(Value::Null),
            );
        }
    }
    state
}

/// Filter flattened items and build the plural data source state.
pub(crate) fn filtered_list(config: &Value, list: &str, items: Vec<Value>) -> Result<Value, ProviderError> {
    let filters = decode_filters(config)?;
    let kept = apply_filters(items, &filters);
    let mut state = Map::new();
    state.insert(
        FILTER_BLOCK.to_string(),
        config.get(FILTER_BLOCK).cloned().unwrap_or(Value::Null),
    );
    state.insert(list.to_string(), Value::Array(kept));
    Ok(Value::Object(state))
}
