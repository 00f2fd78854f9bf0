//! Managed resources.
//!
//! Each adapter decodes the planned state into its model, calls the API,
//! checks the status code and flattens the answer back into state.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::warn;

use crate::api::{ApiResponse, CoolifyClient, EnvParent};
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation;

pub mod envs;
pub mod postgresql_database;
pub mod private_key;
pub mod project;
pub mod server;
pub mod service;

pub use envs::EnvsResource;
pub use postgresql_database::PostgresqlDatabaseResource;
pub use private_key::PrivateKeyResource;
pub use project::ProjectResource;
pub use server::ServerResource;
pub use service::ServiceResource;

/// A managed resource type.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name, e.g. `coolify_server`.
    fn type_name(&self) -> &'static str;

    /// Resource schema.
    fn schema(&self) -> Schema;

    /// Validate a configuration object.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validation::validate(&self.schema(), config)
    }

    /// Create the remote object and return the new state.
    async fn create(&self, client: &CoolifyClient, planned: &Value) -> Result<Value, ProviderError>;

    /// Refresh state. `None` means the remote object is gone.
    async fn read(&self, client: &CoolifyClient, state: &Value) -> Result<Option<Value>, ProviderError>;

    /// Apply an in-place update and return the new state.
    async fn update(
        &self,
        client: &CoolifyClient,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the remote object.
    async fn delete(&self, client: &CoolifyClient, state: &Value) -> Result<(), ProviderError>;

    /// Import an existing object by UUID.
    async fn import(&self, client: &CoolifyClient, id: &str) -> Result<Value, ProviderError> {
        self.read(client, &json!({ "uuid": id }))
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("{} {}", self.type_name(), id)))
    }
}

/// Every resource the provider registers.
pub fn all() -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(PrivateKeyResource),
        Box::new(ServerResource),
        Box::new(ProjectResource),
        Box::new(ServiceResource),
        Box::new(PostgresqlDatabaseResource),
        Box::new(EnvsResource::new(EnvParent::Application)),
        Box::new(EnvsResource::new(EnvParent::Service)),
    ]
}

/// The computed `uuid` attribute shared by every resource.
pub(crate) fn uuid_attribute(noun: &str) -> Attribute {
    Attribute::computed_string()
        .with_state_for_unknown()
        .with_description(format!("UUID of the {}.", noun))
}

/// Log and report a 404 on read.
pub(crate) fn is_gone<T>(response: &ApiResponse<T>, type_name: &str, uuid: &str) -> bool {
    if response.is_not_found() {
        warn!(resource_type = type_name, uuid, "remote object not found, removing from state");
        true
    } else {
        false
    }
}

/// Accept 200 on delete. A 404 means someone else already deleted it.
pub(crate) fn ensure_deleted<T>(response: &ApiResponse<T>, operation: &str) -> Result<(), ProviderError> {
    if response.is_not_found() {
        warn!(operation, "object already deleted");
        return Ok(());
    }
    response.ensure(operation, StatusCode::OK)
}
