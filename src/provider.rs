//! The Coolify provider: registration and dispatch.
//!
//! [`CoolifyProvider`] owns the registered resources and data sources and the
//! API client created by `configure`. Every operation looks the adapter up by
//! type name and hands it the client.

use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::api::CoolifyClient;
use crate::config::ProviderConfig;
use crate::datasources::{self, DataSource};
use crate::error::ProviderError;
use crate::plan::plan_resource;
use crate::resources::{self, Resource};
use crate::schema::{has_errors, Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation;
use crate::version::check_version;

/// Provider for the Coolify platform API.
pub struct CoolifyProvider {
    client: RwLock<Option<Arc<CoolifyClient>>>,
    resources: BTreeMap<&'static str, Box<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Box<dyn DataSource>>,
}

impl Default for CoolifyProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CoolifyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoolifyProvider")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("data_sources", &self.data_sources.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl CoolifyProvider {
    /// An unconfigured provider with every resource and data source registered.
    pub fn new() -> Self {
        Self {
            client: RwLock::new(None),
            resources: resources::all().into_iter().map(|r| (r.type_name(), r)).collect(),
            data_sources: datasources::all()
                .into_iter()
                .map(|d| (d.type_name(), d))
                .collect(),
        }
    }

    /// Whether `configure` has succeeded.
    pub async fn is_configured(&self) -> bool {
        self.client.read().await.is_some()
    }

    async fn client(&self) -> Result<Arc<CoolifyClient>, ProviderError> {
        self.client
            .read()
            .await
            .clone()
            .ok_or_else(|| ProviderError::Configuration("provider not configured".to_string()))
    }

    fn resource(&self, type_name: &str) -> Result<&dyn Resource, ProviderError> {
        self.resources
            .get(type_name)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    fn data_source(&self, type_name: &str) -> Result<&dyn DataSource, ProviderError> {
        self.data_sources
            .get(type_name)
            .map(|d| d.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }
}

#[async_trait::async_trait]
impl ProviderService for CoolifyProvider {
    fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        for (name, resource) in &self.resources {
            schema = schema.with_resource(*name, resource.schema());
        }
        for (name, data_source) in &self.data_sources {
            schema = schema.with_data_source(*name, data_source.schema());
        }
        schema
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validation::validate(&ProviderConfig::schema(), &config))
    }

    #[instrument(skip_all)]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let config = match ProviderConfig::resolve(&config) {
            Ok(config) => config,
            Err(diagnostics) => return Ok(diagnostics),
        };

        let client = match CoolifyClient::new(&config.endpoint, &config.token) {
            Ok(client) => client,
            Err(e) => {
                return Ok(vec![Diagnostic::error("Unable to create API client")
                    .with_detail(e.to_string())
                    .with_attribute("endpoint")])
            },
        };

        let response = match client.get_version().await {
            Ok(response) => response,
            Err(e) => {
                return Ok(vec![
                    Diagnostic::error("Unable to reach the platform API").with_detail(e.to_string())
                ])
            },
        };
        if response.status != StatusCode::OK {
            return Ok(vec![Diagnostic::error("Unable to read platform version").with_detail(
                format!("Received HTTP {} from GET /version: {}", response.status, response.raw),
            )]);
        }

        let version = response.body.unwrap_or_default();
        let diagnostics = check_version(&version).diagnostics();
        if has_errors(&diagnostics) {
            return Ok(diagnostics);
        }

        info!(endpoint = client.endpoint(), version = %version, "Provider configured");
        *self.client.write().await = Some(Arc::new(client));
        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.client.write().await.take();
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.resource(resource_type)?.validate(&config))
    }

    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let current = self.resource(resource_type)?.schema().version;
        if version < 0 || version as u64 > current {
            return Err(ProviderError::InvalidRequest(format!(
                "{} state version {} is newer than schema version {}",
                resource_type, version, current
            )));
        }
        Ok(state)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let schema = self.resource(resource_type)?.schema();
        Ok(plan_resource(&schema, prior_state.as_ref(), proposed_state))
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.create(&client, &planned_state).await
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        let state = resource.read(&client, &current_state).await?;
        if state.is_none() {
            debug!(resource_type, "Remote object is gone, dropping from state");
        }
        Ok(state.unwrap_or(Value::Null))
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.update(&client, &prior_state, &planned_state).await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.delete(&client, &current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        let state = resource.import(&client, id).await?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.data_source(data_source_type)?.validate(&config))
    }

    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        let client = self.client().await?;
        data_source.read(&client, &config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn platform(version: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/version"))
            .and(bearer_token("t0k3n"))
            .respond_with(ResponseTemplate::new(200).set_body_string(version))
            .mount(&server)
            .await;
        server
    }

    fn config(server: &MockServer) -> Value {
        json!({"endpoint": server.uri(), "token": "t0k3n"})
    }

    #[test]
    fn test_schema_registers_everything() {
        let provider = CoolifyProvider::new();
        let schema = provider.schema();
        assert_eq!(schema.resources.len(), 7);
        assert_eq!(schema.data_sources.len(), 14);
        assert!(schema.provider.attribute("token").unwrap().flags.sensitive);

        let metadata = provider.metadata();
        assert_eq!(metadata.resources[0], "coolify_application_envs");
    }

    #[tokio::test]
    async fn test_configure_checks_version() {
        let server = platform("4.0.0-beta.400").await;
        let provider = CoolifyProvider::new();
        let diags = provider.configure(config(&server)).await.unwrap();
        assert!(diags.is_empty(), "{:?}", diags);
        assert!(provider.is_configured().await);
    }

    #[tokio::test]
    async fn test_configure_rejects_old_platform() {
        let server = platform("4.0.0-beta.300").await;
        let provider = CoolifyProvider::new();
        let diags = provider.configure(config(&server)).await.unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Unsupported platform version");
        assert!(!provider.is_configured().await);
    }

    #[tokio::test]
    async fn test_configure_warns_on_unparseable_version() {
        let server = platform("nightly").await;
        let provider = CoolifyProvider::new();
        let diags = provider.configure(config(&server)).await.unwrap();
        assert_eq!(diags.len(), 1);
        assert!(!diags[0].is_error());
        assert!(provider.is_configured().await);
    }

    #[tokio::test]
    async fn test_configure_reports_version_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/version"))
            .respond_with(ResponseTemplate::new(401).set_body_string("{\"message\":\"Unauthenticated.\"}"))
            .mount(&server)
            .await;

        let provider = CoolifyProvider::new();
        let diags = provider.configure(config(&server)).await.unwrap();
        assert_eq!(diags[0].summary, "Unable to read platform version");
        assert!(diags[0].detail.as_deref().unwrap().contains("401"));
        assert!(!provider.is_configured().await);
    }

    #[tokio::test]
    async fn test_operations_require_configure() {
        let provider = CoolifyProvider::new();
        let err = provider
            .read("coolify_project", json!({"uuid": "p1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        let err = provider.read_data_source("coolify_teams", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unknown_types() {
        let provider = CoolifyProvider::new();
        assert!(matches!(
            provider.validate_resource_config("coolify_widget", json!({})).await,
            Err(ProviderError::UnknownResource(_))
        ));
        assert!(matches!(
            provider.validate_data_source_config("coolify_widgets", json!({})).await,
            Err(ProviderError::UnknownResource(_))
        ));
    }

    #[tokio::test]
    async fn test_plan_applies_defaults() {
        let provider = CoolifyProvider::new();
        let proposed = json!({
            "name": "edge-1",
            "ip": "10.0.0.5",
            "private_key_uuid": "k1",
        });
        let plan = provider
            .plan("coolify_server", None, proposed.clone(), proposed)
            .await
            .unwrap();
        assert_eq!(plan.planned_state["port"], 22);
        assert_eq!(plan.planned_state["user"], "root");
        assert!(!plan.requires_replace);
    }

    #[tokio::test]
    async fn test_upgrade_rejects_future_versions() {
        let provider = CoolifyProvider::new();
        let state = json!({"uuid": "p1"});
        assert_eq!(
            provider
                .upgrade_resource_state("coolify_project", 0, state.clone())
                .await
                .unwrap(),
            state
        );
        assert!(provider
            .upgrade_resource_state("coolify_project", 3, state)
            .await
            .is_err());
    }
}
