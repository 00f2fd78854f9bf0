//! `coolify_service`: a docker-compose based service.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::{ensure_deleted, is_gone, uuid_attribute, Resource};
use crate::api::models::{Service, ServiceRequest};
use crate::api::CoolifyClient;
use crate::error::ProviderError;
use crate::flatten::{decode_model, empty_as_null, encode_model, require_uuid};
use crate::schema::{Attribute, Schema};

/// The `coolify_service` resource.
#[derive(Debug, Default, Clone, Copy)]
pub struct ServiceResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ServiceModel {
    uuid: Option<String>,
    id: Option<i64>,
    server_uuid: Option<String>,
    project_uuid: Option<String>,
    environment_name: Option<String>,
    destination_uuid: Option<String>,
    name: Option<String>,
    description: Option<String>,
    compose: Option<String>,
    instant_deploy: Option<bool>,
}

fn encode_compose(compose: &Option<String>) -> Option<String> {
    compose.as_ref().map(|c| STANDARD.encode(c.as_bytes()))
}

impl ServiceModel {
    fn create_request(&self) -> ServiceRequest {
        ServiceRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            server_uuid: self.server_uuid.clone(),
            project_uuid: self.project_uuid.clone(),
            environment_name: self.environment_name.clone(),
            destination_uuid: self.destination_uuid.clone(),
            instant_deploy: self.instant_deploy,
            docker_compose_raw: encode_compose(&self.compose),
        }
    }

    /// Placement cannot change in place; only these fields are patched.
    fn update_request(&self) -> ServiceRequest {
        ServiceRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            docker_compose_raw: encode_compose(&self.compose),
            ..Default::default()
        }
    }

    /// The API returns ids rather than the placement UUIDs, so those come from
    /// the known state. The platform rewrites compose files (adds labels,
    /// reorders keys); the configured text is kept when it still matches
    /// modulo surrounding whitespace.
    fn flatten(service: Service, known: &ServiceModel) -> Self {
        let compose = match (service.docker_compose_raw, &known.compose) {
            (Some(remote), Some(local)) if remote.trim() == local.trim() => Some(local.clone()),
            (Some(remote), Some(local)) if remote.trim().is_empty() => Some(local.clone()),
            (remote, None) => remote,
            (Some(remote), Some(_)) => Some(remote),
            (None, local) => local.clone(),
        };
        Self {
            uuid: service.uuid,
            id: service.id,
            server_uuid: known.server_uuid.clone(),
            project_uuid: known.project_uuid.clone(),
            environment_name: known.environment_name.clone(),
            destination_uuid: known.destination_uuid.clone(),
            name: service.name,
            description: empty_as_null(service.description, known.description.as_deref()),
            compose,
            instant_deploy: known.instant_deploy,
        }
    }
}

async fn fetch(client: &CoolifyClient, uuid: &str) -> Result<Service, ProviderError> {
    client.get_service(uuid).await?.into_body("read service", StatusCode::OK)
}

#[async_trait]
impl Resource for ServiceResource {
    fn type_name(&self) -> &'static str {
        "coolify_service"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A service defined by a docker-compose file.")
            .with_attribute("uuid", uuid_attribute("service"))
            .with_attribute("id", Attribute::computed_int64().with_state_for_unknown())
            .with_attribute("server_uuid", Attribute::required_string().with_force_new())
            .with_attribute("project_uuid", Attribute::required_string().with_force_new())
            .with_attribute("environment_name", Attribute::required_string().with_force_new())
            .with_attribute("destination_uuid", Attribute::optional_string().with_force_new())
            .with_attribute("name", Attribute::optional_computed_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "compose",
                Attribute::required_string().with_description("docker-compose file contents."),
            )
            .with_attribute(
                "instant_deploy",
                Attribute::optional_computed_bool()
                    .with_default(json!(false))
                    .with_description("Deploy right after creating."),
            )
    }

    #[instrument(skip_all, fields(resource_type = "coolify_service"))]
    async fn create(&self, client: &CoolifyClient, planned: &Value) -> Result<Value, ProviderError> {
        let plan: ServiceModel = decode_model(planned)?;
        let created = client
            .create_service(&plan.create_request())
            .await?
            .into_body("create service", StatusCode::CREATED)?;
        info!(uuid = %created.uuid, "created service");

        let service = fetch(client, &created.uuid).await?;
        encode_model(&ServiceModel::flatten(service, &plan))
    }

    #[instrument(skip_all, fields(resource_type = "coolify_service"))]
    async fn read(&self, client: &CoolifyClient, state: &Value) -> Result<Option<Value>, ProviderError> {
        let uuid = require_uuid(state)?;
        let known: ServiceModel = decode_model(state)?;

        let response = client.get_service(&uuid).await?;
        if is_gone(&response, self.type_name(), &uuid) {
            return Ok(None);
        }
        let service = response.into_body("read service", StatusCode::OK)?;
        Ok(Some(encode_model(&ServiceModel::flatten(service, &known))?))
    }

    #[instrument(skip_all, fields(resource_type = "coolify_service"))]
    async fn update(
        &self,
        client: &CoolifyClient,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let uuid = require_uuid(prior)?;
        let plan: ServiceModel = decode_model(planned)?;

        client
            .update_service(&uuid, &plan.update_request())
            .await?
            .ensure("update service", StatusCode::OK)?;
        info!(uuid = %uuid, "updated service");

        let service = fetch(client, &uuid).await?;
        encode_model(&ServiceModel::flatten(service, &plan))
    }

    #[instrument(skip_all, fields(resource_type = "coolify_service"))]
    async fn delete(&self, client: &CoolifyClient, state: &Value) -> Result<(), ProviderError> {
        let uuid = require_uuid(state)?;
        let response = client.delete_service(&uuid).await?;
        ensure_deleted(&response, "delete service")?;
        info!(uuid = %uuid, "deleted service");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::plan_resource;

    const COMPOSE: &str = "services:\n  whoami:\n    image: traefik/whoami\n";

    fn model() -> ServiceModel {
        ServiceModel {
            server_uuid: Some("s1".to_string()),
            project_uuid: Some("p1".to_string()),
            environment_name: Some("production".to_string()),
            name: Some("whoami".to_string()),
            compose: Some(COMPOSE.to_string()),
            instant_deploy: Some(false),
            ..Default::default()
        }
    }

    #[test]
    fn test_compose_is_base64_on_the_wire() {
        let request = model().create_request();
        let encoded = request.docker_compose_raw.unwrap();
        assert_eq!(STANDARD.decode(encoded).unwrap(), COMPOSE.as_bytes());
        assert_eq!(request.server_uuid.as_deref(), Some("s1"));
    }

    #[test]
    fn test_update_request_omits_placement() {
        let request = model().update_request();
        assert!(request.server_uuid.is_none());
        assert!(request.project_uuid.is_none());
        assert!(request.instant_deploy.is_none());
        assert!(request.docker_compose_raw.is_some());
    }

    #[test]
    fn test_flatten_compose() {
        let known = model();
        let service = Service {
            uuid: Some("svc1".to_string()),
            docker_compose_raw: Some(format!("{}\n", COMPOSE)),
            ..Default::default()
        };
        let flat = ServiceModel::flatten(service, &known);
        assert_eq!(flat.compose.as_deref(), Some(COMPOSE));
        assert_eq!(flat.server_uuid.as_deref(), Some("s1"));

        let drifted = Service {
            docker_compose_raw: Some("services: {}\n".to_string()),
            ..Default::default()
        };
        let flat = ServiceModel::flatten(drifted, &known);
        assert_eq!(flat.compose.as_deref(), Some("services: {}\n"));
    }

    #[test]
    fn test_placement_change_replaces() {
        let schema = ServiceResource.schema();
        let prior = encode_model(&ServiceModel {
            uuid: Some("svc1".to_string()),
            ..model()
        })
        .unwrap();
        let mut proposed = encode_model(&model()).unwrap();
        proposed["environment_name"] = json!("staging");

        let result = plan_resource(&schema, Some(&prior), proposed);
        assert!(result.requires_replace);
    }
}
