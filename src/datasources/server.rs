//! Server data sources: `coolify_server`, `coolify_servers`,
//! `coolify_server_resources` and `coolify_server_domains`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{filtered_list, found, item, list_schema, lookup_schema, with_inputs, DataSource, Fields};
use crate::api::models::Server;
use crate::api::CoolifyClient;
use crate::error::ProviderError;
use crate::flatten::require_uuid;
use crate::resources::server::settings_type;
use crate::schema::{Attribute, AttributeType, Schema};

fn server_fields() -> Fields {
    use AttributeType::{Bool, Int64};
    vec![
        ("uuid", AttributeType::String),
        ("id", Int64),
        ("name", AttributeType::String),
        ("description", AttributeType::String),
        ("ip", AttributeType::String),
        ("port", Int64),
        ("user", AttributeType::String),
        ("proxy_type", AttributeType::String),
        ("high_disk_usage_notification_sent", Bool),
        ("unreachable_count", Int64),
        ("unreachable_notification_sent", Bool),
        ("log_drain_notification_sent", Bool),
        ("swarm_cluster", AttributeType::String),
        ("validation_logs", AttributeType::String),
        ("settings", settings_type()),
    ]
}

fn resource_fields() -> Fields {
    vec![
        ("id", AttributeType::Int64),
        ("uuid", AttributeType::String),
        ("name", AttributeType::String),
        ("type", AttributeType::String),
        ("status", AttributeType::String),
        ("created_at", AttributeType::String),
        ("updated_at", AttributeType::String),
    ]
}

/// Proxy types are reported upper-case by some platform versions.
fn server_item(mut server: Server, fields: &Fields) -> Result<Value, ProviderError> {
    server.proxy_type = server.proxy_type.map(|p| p.to_lowercase());
    item(&server, fields)
}

/// Looks up one server by UUID.
#[derive(Debug, Default, Clone, Copy)]
pub struct ServerDataSource;

#[async_trait]
impl DataSource for ServerDataSource {
    fn type_name(&self) -> &'static str {
        "coolify_server"
    }

    fn schema(&self) -> Schema {
        lookup_schema(
            "Look up a server by UUID.",
            ("uuid", Attribute::required_string()),
            &server_fields(),
        )
    }

    #[instrument(skip_all, fields(data_source_type = "coolify_server"))]
    async fn read(&self, client: &CoolifyClient, config: &Value) -> Result<Value, ProviderError> {
        let uuid = require_uuid(config)?;
        let server = found(client.get_server(&uuid).await?, "server", &uuid)?;
        let state = server_item(server, &server_fields())?;
        Ok(with_inputs(state, config, &["uuid"]))
    }
}

/// Lists servers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ServersDataSource;

#[async_trait]
impl DataSource for ServersDataSource {
    fn type_name(&self) -> &'static str {
        "coolify_servers"
    }

    fn schema(&self) -> Schema {
        list_schema(
            "List servers.",
            "servers",
            &server_fields(),
            &["name", "description", "ip", "port", "user", "uuid", "proxy_type"],
        )
    }

    #[instrument(skip_all, fields(data_source_type = "coolify_servers"))]
    async fn read(&self, client: &CoolifyClient, config: &Value) -> Result<Value, ProviderError> {
        let servers = client
            .list_servers()
            .await?
            .into_body("list servers", StatusCode::OK)?;
        debug!(count = servers.len(), "listed servers");

        let fields = server_fields();
        let items = servers
            .into_iter()
            .map(|server| server_item(server, &fields))
            .collect::<Result<Vec<_>, _>>()?;
        filtered_list(config, "servers", items)
    }
}

/// Applications, databases and services running on one server.
#[derive(Debug, Default, Clone, Copy)]
pub struct ServerResourcesDataSource;

#[async_trait]
impl DataSource for ServerResourcesDataSource {
    fn type_name(&self) -> &'static str {
        "coolify_server_resources"
    }

    fn schema(&self) -> Schema {
        list_schema(
            "List the resources deployed on a server.",
            "resources",
            &resource_fields(),
            &["name", "type", "status", "uuid"],
        )
        .with_attribute("uuid", Attribute::required_string().with_description("UUID of the server."))
    }

    #[instrument(skip_all, fields(data_source_type = "coolify_server_resources"))]
    async fn read(&self, client: &CoolifyClient, config: &Value) -> Result<Value, ProviderError> {
        let uuid = require_uuid(config)?;
        let resources = found(
            client.list_server_resources(&uuid).await?,
            "server resources",
            &uuid,
        )?;
        debug!(count = resources.len(), "listed server resources");

        let fields = resource_fields();
        let items = resources
            .iter()
            .map(|resource| item(resource, &fields))
            .collect::<Result<Vec<_>, _>>()?;
        let state = filtered_list(config, "resources", items)?;
        Ok(with_inputs(state, config, &["uuid"]))
    }
}

/// Domains served by one server, grouped by IP.
#[derive(Debug, Default, Clone, Copy)]
pub struct ServerDomainsDataSource;

fn domain_type() -> AttributeType {
    AttributeType::object(&[
        ("ip", AttributeType::String),
        ("domains", AttributeType::list(AttributeType::String)),
    ])
}

#[async_trait]
impl DataSource for ServerDomainsDataSource {
    fn type_name(&self) -> &'static str {
        "coolify_server_domains"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("List the domains served by a server.")
            .with_attribute("uuid", Attribute::required_string().with_description("UUID of the server."))
            .with_attribute("domains", Attribute::computed(AttributeType::list(domain_type())))
    }

    #[instrument(skip_all, fields(data_source_type = "coolify_server_domains"))]
    async fn read(&self, client: &CoolifyClient, config: &Value) -> Result<Value, ProviderError> {
        let uuid = require_uuid(config)?;
        let domains = found(client.list_server_domains(&uuid).await?, "server domains", &uuid)?;
        debug!(count = domains.len(), "listed server domains");

        let state = serde_json::json!({ "domains": domains });
        Ok(with_inputs(state, config, &["uuid"]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::ServerResource;
    use crate::filter::{filter_block, FILTER_BLOCK};
    use serde_json::json;

    fn has_filter(schema: &Schema) -> bool {
        schema.block.blocks.contains_key(FILTER_BLOCK)
    }

    #[test]
    fn test_server_item_lowercases_proxy() {
        let server = Server {
            uuid: Some("s1".to_string()),
            proxy_type: Some("CADDY".to_string()),
            port: Some(22),
            ..Default::default()
        };
        let flat = server_item(server, &server_fields()).unwrap();
        assert_eq!(flat["proxy_type"], "caddy");
        assert_eq!(flat["port"], 22);
        assert_eq!(flat["settings"], Value::Null);
    }

    #[test]
    fn test_resource_item_uses_type_key() {
        let resource = ServerResource {
            uuid: Some("a1".to_string()),
            resource_type: Some("application".to_string()),
            ..Default::default()
        };
        let flat = item(&resource, &resource_fields()).unwrap();
        assert_eq!(flat["type"], "application");
    }

    #[test]
    fn test_filter_schemas() {
        assert!(has_filter(&ServersDataSource.schema()));
        assert!(has_filter(&ServerResourcesDataSource.schema()));
        assert!(!has_filter(&ServerDomainsDataSource.schema()));
        assert!(!has_filter(&ServerDataSource.schema()));
    }

    #[test]
    fn test_resources_requires_uuid() {
        let diags = ServerResourcesDataSource.validate(&json!({}));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("uuid"));
    }

    #[test]
    fn test_filter_block_reused() {
        assert_eq!(
            ServersDataSource.schema().block.blocks.get(FILTER_BLOCK).map(|b| b.nesting_mode),
            Some(filter_block(&[]).nesting_mode)
        );
    }
}
