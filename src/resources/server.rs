//! `coolify_server`: a machine the platform deploys to over SSH.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::{ensure_deleted, is_gone, uuid_attribute, Resource};
use crate::api::models::{Server, ServerRequest};
use crate::api::CoolifyClient;
use crate::error::ProviderError;
use crate::flatten::{decode_model, empty_as_null, encode_model, require_uuid};
use crate::schema::{Attribute, AttributeType, Schema, Validator};

/// Proxies the platform can put in front of a server.
pub const PROXY_TYPES: &[&str] = &["traefik", "caddy", "none"];

/// The `coolify_server` resource.
#[derive(Debug, Default, Clone, Copy)]
pub struct ServerResource;

/// Object type of the computed `settings` attribute.
pub fn settings_type() -> AttributeType {
    use AttributeType::{Bool, Int64, String};
    AttributeType::object(&[
        ("id", Int64),
        ("server_id", Int64),
        ("concurrent_builds", Int64),
        ("dynamic_timeout", Int64),
        ("force_disabled", Bool),
        ("force_server_cleanup", Bool),
        ("is_build_server", Bool),
        ("is_cloudflare_tunnel", Bool),
        ("is_jump_server", Bool),
        ("is_logdrain_custom_enabled", Bool),
        ("is_metrics_enabled", Bool),
        ("is_reachable", Bool),
        ("is_sentinel_enabled", Bool),
        ("is_swarm_manager", Bool),
        ("is_swarm_worker", Bool),
        ("is_usable", Bool),
        ("docker_cleanup_frequency", String),
        ("docker_cleanup_threshold", Int64),
        ("delete_unused_networks", Bool),
        ("delete_unused_volumes", Bool),
        ("server_timezone", String),
        ("wildcard_domain", String),
        ("created_at", String),
        ("updated_at", String),
    ])
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ServerModel {
    uuid: Option<String>,
    id: Option<i64>,
    name: Option<String>,
    description: Option<String>,
    ip: Option<String>,
    port: Option<i64>,
    user: Option<String>,
    private_key_uuid: Option<String>,
    proxy_type: Option<String>,
    instant_validate: Option<bool>,
    high_disk_usage_notification_sent: Option<bool>,
    unreachable_count: Option<i64>,
    unreachable_notification_sent: Option<bool>,
    settings: Option<Value>,
}

impl ServerModel {
    fn request(&self, creating: bool) -> ServerRequest {
        ServerRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            ip: self.ip.clone(),
            port: self.port,
            user: self.user.clone(),
            private_key_uuid: self.private_key_uuid.clone(),
            proxy_type: self.proxy_type.clone(),
            is_build_server: None,
            instant_validate: if creating { self.instant_validate } else { None },
        }
    }

    /// `private_key_uuid` and `instant_validate` are never returned.
    fn flatten(server: Server, known: &ServerModel) -> Result<Self, ProviderError> {
        let settings = match server.settings {
            Some(settings) => Some(serde_json::to_value(settings)?),
            None => None,
        };
        Ok(Self {
            uuid: server.uuid,
            id: server.id,
            name: server.name,
            description: empty_as_null(server.description, known.description.as_deref()),
            ip: server.ip,
            port: server.port,
            user: server.user,
            private_key_uuid: known.private_key_uuid.clone(),
            proxy_type: server.proxy_type.map(|p| p.to_lowercase()),
            instant_validate: known.instant_validate,
            high_disk_usage_notification_sent: server.high_disk_usage_notification_sent,
            unreachable_count: server.unreachable_count,
            unreachable_notification_sent: server.unreachable_notification_sent,
            settings,
        })
    }
}

async fn fetch(client: &CoolifyClient, uuid: &str) -> Result<Server, ProviderError> {
    client.get_server(uuid).await?.into_body("read server", StatusCode::OK)
}

#[async_trait]
impl Resource for ServerResource {
    fn type_name(&self) -> &'static str {
        "coolify_server"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A server the platform deploys resources to.")
            .with_attribute("uuid", uuid_attribute("server"))
            .with_attribute("id", Attribute::computed_int64().with_state_for_unknown())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "ip",
                Attribute::required_string().with_description("IP address or hostname."),
            )
            .with_attribute(
                "port",
                Attribute::optional_computed_int64()
                    .with_default(json!(22))
                    .with_validator(Validator::Between(1, 65535)),
            )
            .with_attribute(
                "user",
                Attribute::optional_computed_string().with_default(json!("root")),
            )
            .with_attribute(
                "private_key_uuid",
                Attribute::required_string().with_description("UUID of the key used for SSH."),
            )
            .with_attribute(
                "proxy_type",
                Attribute::optional_computed_string().with_validator(Validator::one_of(PROXY_TYPES)),
            )
            .with_attribute(
                "instant_validate",
                Attribute::optional_computed_bool()
                    .with_default(json!(false))
                    .with_description("Validate the server right after creating it."),
            )
            .with_attribute("high_disk_usage_notification_sent", Attribute::computed_bool())
            .with_attribute("unreachable_count", Attribute::computed_int64())
            .with_attribute("unreachable_notification_sent", Attribute::computed_bool())
            .with_attribute("settings", Attribute::computed(settings_type()))
    }

    #[instrument(skip_all, fields(resource_type = "coolify_server"))]
    async fn create(&self, client: &CoolifyClient, planned: &Value) -> Result<Value, ProviderError> {
        let plan: ServerModel = decode_model(planned)?;
        let created = client
            .create_server(&plan.request(true))
            .await?
            .into_body("create server", StatusCode::CREATED)?;
        info!(uuid = %created.uuid, "created server");

        let server = fetch(client, &created.uuid).await?;
        encode_model(&ServerModel::flatten(server, &plan)?)
    }

    #[instrument(skip_all, fields(resource_type = "coolify_server"))]
    async fn read(&self, client: &CoolifyClient, state: &Value) -> Result<Option<Value>, ProviderError> {
        let uuid = require_uuid(state)?;
        let known: ServerModel = decode_model(state)?;

        let response = client.get_server(&uuid).await?;
        if is_gone(&response, self.type_name(), &uuid) {
            return Ok(None);
        }
        let server = response.into_body("read server", StatusCode::OK)?;
        Ok(Some(encode_model(&ServerModel::flatten(server, &known)?)?))
    }

    #[instrument(skip_all, fields(resource_type = "coolify_server"))]
    async fn update(
        &self,
        client: &CoolifyClient,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let uuid = require_uuid(prior)?;
        let plan: ServerModel = decode_model(planned)?;

        client
            .update_server(&uuid, &plan.request(false))
            .await?
            .ensure("update server", StatusCode::CREATED)?;
        info!(uuid = %uuid, "updated server");

        let server = fetch(client, &uuid).await?;
        encode_model(&ServerModel::flatten(server, &plan)?)
    }

    #[instrument(skip_all, fields(resource_type = "coolify_server"))]
    async fn delete(&self, client: &CoolifyClient, state: &Value) -> Result<(), ProviderError> {
        let uuid = require_uuid(state)?;
        let response = client.delete_server(&uuid).await?;
        ensure_deleted(&response, "delete server")?;
        info!(uuid = %uuid, "deleted server");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::ServerSettings;
    use crate::plan::plan_resource;

    #[test]
    fn test_flatten_preserves_write_only_fields() {
        let known = ServerModel {
            private_key_uuid: Some("k1".to_string()),
            instant_validate: Some(true),
            ..Default::default()
        };
        let server = Server {
            uuid: Some("s1".to_string()),
            name: Some("edge".to_string()),
            description: Some(String::new()),
            proxy_type: Some("TRAEFIK".to_string()),
            settings: Some(ServerSettings {
                is_reachable: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };

        let model = ServerModel::flatten(server, &known).unwrap();
        assert_eq!(model.private_key_uuid.as_deref(), Some("k1"));
        assert_eq!(model.instant_validate, Some(true));
        assert_eq!(model.proxy_type.as_deref(), Some("traefik"));
        assert_eq!(model.description, None);
        assert_eq!(model.settings.unwrap()["is_reachable"], true);
    }

    #[test]
    fn test_instant_validate_only_sent_on_create() {
        let model = ServerModel {
            instant_validate: Some(true),
            ..Default::default()
        };
        assert_eq!(model.request(true).instant_validate, Some(true));
        assert_eq!(model.request(false).instant_validate, None);
    }

    #[test]
    fn test_plan_defaults() {
        let result = plan_resource(
            &ServerResource.schema(),
            None,
            json!({"name": "edge", "ip": "10.0.0.5", "private_key_uuid": "k1"}),
        );
        assert_eq!(result.planned_state["port"], 22);
        assert_eq!(result.planned_state["user"], "root");
        assert_eq!(result.planned_state["instant_validate"], false);
    }

    #[test]
    fn test_proxy_type_validation() {
        let diags = ServerResource.validate(&json!({
            "name": "edge", "ip": "10.0.0.5", "private_key_uuid": "k1", "proxy_type": "nginx"
        }));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("proxy_type"));
    }
}
