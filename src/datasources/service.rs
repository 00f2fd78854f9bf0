//! `coolify_service` and `coolify_services`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{filtered_list, found, item, list_schema, lookup_schema, with_inputs, DataSource, Fields};
use crate::api::CoolifyClient;
use crate::error::ProviderError;
use crate::flatten::require_uuid;
use crate::schema::{Attribute, AttributeType, Schema};

fn fields() -> Fields {
    use AttributeType::{Bool, Int64};
    vec![
        ("uuid", AttributeType::String),
        ("id", Int64),
        ("name", AttributeType::String),
        ("description", AttributeType::String),
        ("status", AttributeType::String),
        ("server_status", Bool),
        ("service_type", AttributeType::String),
        ("environment_id", Int64),
        ("server_id", Int64),
        ("destination_id", Int64),
        ("destination_type", AttributeType::String),
        ("docker_compose_raw", AttributeType::String),
        ("connect_to_docker_network", Bool),
        ("config_hash", AttributeType::String),
        ("created_at", AttributeType::String),
        ("updated_at", AttributeType::String),
    ]
}

/// Looks up one service by UUID.
#[derive(Debug, Default, Clone, Copy)]
pub struct ServiceDataSource;

#[async_trait]
impl DataSource for ServiceDataSource {
    fn type_name(&self) -> &'static str {
        "coolify_service"
    }

    fn schema(&self) -> Schema {
        lookup_schema(
            "Look up a service by UUID.",
            ("uuid", Attribute::required_string()),
            &fields(),
        )
    }

    #[instrument(skip_all, fields(data_source_type = "coolify_service"))]
    async fn read(&self, client: &CoolifyClient, config: &Value) -> Result<Value, ProviderError> {
        let uuid = require_uuid(config)?;
        let service = found(client.get_service(&uuid).await?, "service", &uuid)?;
        Ok(with_inputs(item(&service, &fields())?, config, &["uuid"]))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ServicesDataSource;

#[async_trait]
impl DataSource for ServicesDataSource {
    fn type_name(&self) -> &'static str {
        "coolify_services"
    }

    fn schema(&self) -> Schema {
        list_schema(
            "List services.",
            "services",
            &fields(),
            &["name", "description", "uuid", "status", "server_status"],
        )
    }

    #[instrument(skip_all, fields(data_source_type = "coolify_services"))]
    async fn read(&self, client: &CoolifyClient, config: &Value) -> Result<Value, ProviderError> {
        let services = client
            .list_services()
            .await?
            .into_body("list services", StatusCode::OK)?;
        debug!(count = services.len(), "listed services");

        let fields = fields();
        let items = services
            .iter()
            .map(|service| item(service, &fields))
            .collect::<Result<Vec<_>, _>>()?;
        filtered_list(config, "services", items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Service;
    use serde_json::json;

    #[test]
    fn test_item_drops_rendered_compose() {
        let service = Service {
            uuid: Some("s1".to_string()),
            docker_compose_raw: Some("services: {}".to_string()),
            docker_compose: Some("rendered".to_string()),
            server_status: Some(false),
            ..Default::default()
        };
        let flat = item(&service, &fields()).unwrap();
        assert!(flat.get("docker_compose").is_none());
        assert_eq!(flat["docker_compose_raw"], "services: {}");
        assert_eq!(flat["server_status"], false);
    }

    #[test]
    fn test_list_filters_on_server_status() {
        let config = json!({"filter": [{"name": "server_status", "values": ["true"]}]});
        assert!(ServicesDataSource.validate(&config).is_empty());

        let items = vec![
            json!({"uuid": "a", "server_status": true}),
            json!({"uuid": "b", "server_status": false}),
        ];
        let state = filtered_list(&config, "services", items).unwrap();
        assert_eq!(state["services"], json!([{"uuid": "a", "server_status": true}]));
    }
}
