//! `coolify_private_key` and `coolify_private_keys`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{filtered_list, found, item, list_schema, lookup_schema, with_inputs, DataSource, Fields};
use crate::api::CoolifyClient;
use crate::error::ProviderError;
use crate::flatten::require_uuid;
use crate::schema::{Attribute, AttributeType, Schema};

const FILTERABLE: &[&str] = &["name", "description", "uuid", "is_git_related", "team_id", "fingerprint"];

/// Key attributes without the private key itself.
fn fields() -> Fields {
    use AttributeType::{Bool, Int64};
    vec![
        ("uuid", AttributeType::String),
        ("id", Int64),
        ("name", AttributeType::String),
        ("description", AttributeType::String),
        ("public_key", AttributeType::String),
        ("fingerprint", AttributeType::String),
        ("is_git_related", Bool),
        ("team_id", Int64),
        ("created_at", AttributeType::String),
        ("updated_at", AttributeType::String),
    ]
}

/// Looks up one private key by UUID.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrivateKeyDataSource;

#[async_trait]
impl DataSource for PrivateKeyDataSource {
    fn type_name(&self) -> &'static str {
        "coolify_private_key"
    }

    fn schema(&self) -> Schema {
        lookup_schema(
            "Look up a private key by UUID.",
            ("uuid", Attribute::required_string()),
            &fields(),
        )
        .with_attribute("private_key", Attribute::computed_string().sensitive())
    }

    #[instrument(skip_all, fields(data_source_type = "coolify_private_key"))]
    async fn read(&self, client: &CoolifyClient, config: &Value) -> Result<Value, ProviderError> {
        let uuid = require_uuid(config)?;
        let key = found(client.get_private_key(&uuid).await?, "private key", &uuid)?;

        let mut state = item(&key, &fields())?;
        if let Value::Object(map) = &mut state {
            map.insert(
                "private_key".to_string(),
                key.private_key.map_or(Value::Null, Value::String),
            );
        }
        Ok(with_inputs(state, config, &["uuid"]))
    }
}

/// Lists private keys. The key material is never included.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrivateKeysDataSource;

#[async_trait]
impl DataSource for PrivateKeysDataSource {
    fn type_name(&self) -> &'static str {
        "coolify_private_keys"
    }

    fn schema(&self) -> Schema {
        list_schema("List private keys.", "private_keys", &fields(), FILTERABLE)
    }

    #[instrument(skip_all, fields(data_source_type = "coolify_private_keys"))]
    async fn read(&self, client: &CoolifyClient, config: &Value) -> Result<Value, ProviderError> {
        let keys = client
            .list_private_keys()
            .await?
            .into_body("list private keys", StatusCode::OK)?;
        debug!(count = keys.len(), "listed private keys");

        let fields = fields();
        let items = keys
            .iter()
            .map(|key| item(key, &fields))
            .collect::<Result<Vec<_>, _>>()?;
        filtered_list(config, "private_keys", items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::PrivateKey;
    use serde_json::json;

    #[test]
    fn test_list_items_omit_key_material() {
        let key = PrivateKey {
            uuid: Some("k1".to_string()),
            private_key: Some("-----BEGIN".to_string()),
            ..Default::default()
        };
        let flat = item(&key, &fields()).unwrap();
        assert!(flat.get("private_key").is_none());
        assert_eq!(flat["uuid"], "k1");
    }

    #[test]
    fn test_filter_names_are_validated() {
        let diags = PrivateKeysDataSource.validate(&json!({
            "filter": [{"name": "private_key", "values": ["x"]}]
        }));
        assert_eq!(diags.len(), 1);

        assert!(PrivateKeysDataSource
            .validate(&json!({"filter": [{"name": "team_id", "values": ["0"]}]}))
            .is_empty());
    }

    #[test]
    fn test_single_schema() {
        let schema = PrivateKeyDataSource.schema();
        assert!(schema.attribute("uuid").unwrap().flags.required);
        assert!(schema.attribute("private_key").unwrap().flags.sensitive);
    }
}
