//! `coolify_application_envs` and `coolify_service_envs`: the complete set of
//! environment variables of an application or service.
//!
//! Variables are identified by `key` plus `is_preview`; the same key may exist
//! once for regular and once for preview deployments.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use super::{ensure_deleted, is_gone, Resource};
use crate::api::models::{BulkEnvironmentRequest, EnvironmentVariable, EnvironmentVariableRequest};
use crate::api::{CoolifyClient, EnvParent};
use crate::error::ProviderError;
use crate::flatten::{decode_model, encode_model, require_uuid};
use crate::schema::{has_errors, Attribute, Block, Diagnostic, NestedBlock, Schema};
use crate::validation;

/// Environment variables of one application or service.
#[derive(Debug, Clone, Copy)]
pub struct EnvsResource {
    parent: EnvParent,
}

impl EnvsResource {
    /// Resource managing the variables of `parent` objects.
    pub fn new(parent: EnvParent) -> Self {
        Self { parent }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct EnvsModel {
    uuid: Option<String>,
    id: Option<String>,
    env: Option<Vec<EnvModel>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct EnvModel {
    key: String,
    value: String,
    #[serde(default)]
    is_literal: bool,
    #[serde(default)]
    is_multiline: bool,
    #[serde(default)]
    is_shown_once: bool,
    #[serde(default)]
    is_build_time: bool,
    #[serde(default)]
    is_preview: bool,
}

type EnvKey = (String, bool);

impl EnvModel {
    fn identity(&self) -> EnvKey {
        (self.key.clone(), self.is_preview)
    }

    fn request(&self) -> EnvironmentVariableRequest {
        EnvironmentVariableRequest {
            key: self.key.clone(),
            value: self.value.clone(),
            is_literal: self.is_literal,
            is_multiline: self.is_multiline,
            is_shown_once: self.is_shown_once,
            is_build_time: self.is_build_time,
            is_preview: self.is_preview,
        }
    }

    /// Values of shown-once variables are hidden after creation; keep the
    /// known value for those.
    fn flatten(remote: &EnvironmentVariable, known: Option<&EnvModel>) -> Self {
        let is_shown_once = remote
            .is_shown_once
            .or(known.map(|k| k.is_shown_once))
            .unwrap_or(false);
        let value = match known {
            Some(known) if is_shown_once => known.value.clone(),
            _ => remote
                .value
                .clone()
                .or_else(|| known.map(|k| k.value.clone()))
                .unwrap_or_default(),
        };
        Self {
            key: remote.key.clone().unwrap_or_default(),
            value,
            is_literal: remote.is_literal.unwrap_or(false),
            is_multiline: remote.is_multiline.unwrap_or(false),
            is_shown_once,
            is_build_time: remote.is_build_time.unwrap_or(false),
            is_preview: remote.is_preview.unwrap_or(false),
        }
    }
}

fn remote_identity(env: &EnvironmentVariable) -> Option<EnvKey> {
    env.key
        .as_ref()
        .map(|key| (key.clone(), env.is_preview.unwrap_or(false)))
}

/// One error per `env` entry whose key and preview flag repeat an earlier one.
fn duplicate_identities(config: &Value) -> Vec<Diagnostic> {
    let Some(entries) = config.get("env").and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter_map(|entry| {
            let key = entry.get("key")?.as_str()?;
            let preview = entry.get("is_preview").and_then(Value::as_bool).unwrap_or(false);
            if seen.insert((key, preview)) {
                return None;
            }
            let scope = if preview { "preview" } else { "regular" };
            Some(
                Diagnostic::error("Duplicate environment variable")
                    .with_detail(format!("'{}' is set more than once for {} deployments.", key, scope))
                    .with_attribute("env"),
            )
        })
        .collect()
}

impl EnvsResource {
    fn noun(&self) -> &'static str {
        self.parent.noun()
    }

    async fn list(&self, client: &CoolifyClient, uuid: &str) -> Result<Option<Vec<EnvironmentVariable>>, ProviderError> {
        let response = client.list_envs(self.parent, uuid).await?;
        if is_gone(&response, self.type_name(), uuid) {
            return Ok(None);
        }
        let operation = format!("list {} environment variables", self.noun());
        response.into_body(&operation, StatusCode::OK).map(Some)
    }

    /// Upsert `desired` and remove every remote variable not in it.
    async fn sync(&self, client: &CoolifyClient, uuid: &str, desired: &[EnvModel]) -> Result<(), ProviderError> {
        if !desired.is_empty() {
            let body = BulkEnvironmentRequest {
                data: desired.iter().map(EnvModel::request).collect(),
            };
            let operation = format!("update {} environment variables", self.noun());
            client
                .bulk_update_envs(self.parent, uuid, &body)
                .await?
                .ensure(&operation, StatusCode::CREATED)?;
            debug!(count = desired.len(), "upserted environment variables");
        }

        let wanted: HashSet<EnvKey> = desired.iter().map(EnvModel::identity).collect();
        let remote = self.list(client, uuid).await?.ok_or_else(|| {
            ProviderError::NotFound(format!("{} {}", self.noun(), uuid))
        })?;
        for env in remote {
            let stale = remote_identity(&env).map_or(false, |id| !wanted.contains(&id));
            if let (true, Some(env_uuid)) = (stale, env.uuid.as_deref()) {
                let operation = format!("delete {} environment variable", self.noun());
                client
                    .delete_env(self.parent, uuid, env_uuid)
                    .await?
                    .ensure(&operation, StatusCode::OK)?;
                debug!(key = env.key.as_deref().unwrap_or_default(), "removed environment variable");
            }
        }
        Ok(())
    }

    fn state(uuid: &str, env: Vec<EnvModel>) -> Result<Value, ProviderError> {
        encode_model(&EnvsModel {
            uuid: Some(uuid.to_string()),
            id: Some(uuid.to_string()),
            env: Some(env),
        })
    }
}

#[async_trait]
impl Resource for EnvsResource {
    fn type_name(&self) -> &'static str {
        match self.parent {
            EnvParent::Application => "coolify_application_envs",
            EnvParent::Service => "coolify_service_envs",
        }
    }

    fn schema(&self) -> Schema {
        let flag = || Attribute::optional_computed_bool().with_default(json!(false));
        let env = Block::new()
            .with_description("One environment variable.")
            .with_attribute("key", Attribute::required_string())
            .with_attribute("value", Attribute::required_string().sensitive())
            .with_attribute("is_literal", flag())
            .with_attribute("is_multiline", flag())
            .with_attribute("is_shown_once", flag())
            .with_attribute("is_build_time", flag())
            .with_attribute("is_preview", flag());

        Schema::v0()
            .with_description(format!(
                "All environment variables of a {}. Variables not listed here are removed.",
                self.noun()
            ))
            .with_attribute(
                "uuid",
                Attribute::required_string()
                    .with_force_new()
                    .with_description(format!("UUID of the {}.", self.noun())),
            )
            .with_attribute("id", Attribute::computed_string().with_state_for_unknown())
            .with_block("env", NestedBlock::set(env))
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = validation::validate(&self.schema(), config);
        if has_errors(&diagnostics) {
            return diagnostics;
        }
        diagnostics.extend(duplicate_identities(config));
        diagnostics
    }

    #[instrument(skip_all)]
    async fn create(&self, client: &CoolifyClient, planned: &Value) -> Result<Value, ProviderError> {
        let uuid = require_uuid(planned)?;
        let plan: EnvsModel = decode_model(planned)?;
        let desired = plan.env.unwrap_or_default();

        self.sync(client, &uuid, &desired).await?;
        info!(parent = self.noun(), uuid = %uuid, count = desired.len(), "environment variables created");
        Self::state(&uuid, desired)
    }

    #[instrument(skip_all)]
    async fn read(&self, client: &CoolifyClient, state: &Value) -> Result<Option<Value>, ProviderError> {
        let uuid = require_uuid(state)?;
        let known: EnvsModel = decode_model(state)?;
        let known = known.env.unwrap_or_default();

        let Some(remote) = self.list(client, &uuid).await? else {
            return Ok(None);
        };

        let env = known
            .iter()
            .filter_map(|k| {
                remote
                    .iter()
                    .find(|r| remote_identity(r).as_ref() == Some(&k.identity()))
                    .map(|r| EnvModel::flatten(r, Some(k)))
            })
            .collect();
        Ok(Some(Self::state(&uuid, env)?))
    }

    #[instrument(skip_all)]
    async fn update(
        &self,
        client: &CoolifyClient,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let uuid = require_uuid(prior)?;
        let plan: EnvsModel = decode_model(planned)?;
        let desired = plan.env.unwrap_or_default();

        self.sync(client, &uuid, &desired).await?;
        info!(parent = self.noun(), uuid = %uuid, count = desired.len(), "environment variables updated");
        Self::state(&uuid, desired)
    }

    #[instrument(skip_all)]
    async fn delete(&self, client: &CoolifyClient, state: &Value) -> Result<(), ProviderError> {
        let uuid = require_uuid(state)?;
        let known: EnvsModel = decode_model(state)?;
        let managed: HashSet<EnvKey> = known
            .env
            .unwrap_or_default()
            .iter()
            .map(EnvModel::identity)
            .collect();

        let Some(remote) = self.list(client, &uuid).await? else {
            return Ok(());
        };
        let operation = format!("delete {} environment variable", self.noun());
        for env in remote {
            let owned = remote_identity(&env).map_or(false, |id| managed.contains(&id));
            if let (true, Some(env_uuid)) = (owned, env.uuid.as_deref()) {
                let response = client.delete_env(self.parent, &uuid, env_uuid).await?;
                ensure_deleted(&response, &operation)?;
            }
        }
        info!(parent = self.noun(), uuid = %uuid, count = managed.len(), "environment variables deleted");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn import(&self, client: &CoolifyClient, id: &str) -> Result<Value, ProviderError> {
        let remote = self
            .list(client, id)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("{} {}", self.noun(), id)))?;
        let env = remote.iter().map(|r| EnvModel::flatten(r, None)).collect();
        Self::state(id, env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::plan_resource;

    fn remote(key: &str, value: &str, preview: bool) -> EnvironmentVariable {
        EnvironmentVariable {
            uuid: Some(format!("uuid-{}-{}", key, preview)),
            key: Some(key.to_string()),
            value: Some(value.to_string()),
            is_preview: Some(preview),
            ..Default::default()
        }
    }

    #[test]
    fn test_type_names() {
        assert_eq!(
            EnvsResource::new(EnvParent::Application).type_name(),
            "coolify_application_envs"
        );
        assert_eq!(EnvsResource::new(EnvParent::Service).type_name(), "coolify_service_envs");
    }

    #[test]
    fn test_flatten_shown_once_keeps_known_value() {
        let mut r = remote("TOKEN", "", false);
        r.is_shown_once = Some(true);
        let known = EnvModel {
            key: "TOKEN".to_string(),
            value: "s3cret".to_string(),
            is_shown_once: true,
            ..Default::default()
        };

        assert_eq!(EnvModel::flatten(&r, Some(&known)).value, "s3cret");
        assert_eq!(EnvModel::flatten(&r, None).value, "");
    }

    #[test]
    fn test_identity_includes_preview() {
        assert_ne!(
            remote_identity(&remote("A", "1", false)),
            remote_identity(&remote("A", "1", true))
        );
    }

    #[test]
    fn test_env_set_defaults_and_order() {
        let resource = EnvsResource::new(EnvParent::Application);
        let prior = json!({
            "uuid": "app1",
            "id": "app1",
            "env": [
                {"key": "A", "value": "1", "is_literal": false, "is_multiline": false,
                 "is_shown_once": false, "is_build_time": false, "is_preview": false},
                {"key": "B", "value": "2", "is_literal": false, "is_multiline": false,
                 "is_shown_once": false, "is_build_time": false, "is_preview": false}
            ]
        });
        let proposed = json!({
            "uuid": "app1",
            "env": [{"key": "B", "value": "2"}, {"key": "A", "value": "1"}]
        });

        let result = plan_resource(&resource.schema(), Some(&prior), proposed);
        assert!(result.changes.is_empty(), "{:?}", result.changes);
        assert_eq!(result.planned_state["id"], "app1");
    }

    #[test]
    fn test_repeated_identity_is_rejected() {
        let resource = EnvsResource::new(EnvParent::Application);
        let config = json!({
            "uuid": "app1",
            "env": [{"key": "A", "value": "1"}, {"key": "A", "value": "2"}]
        });
        let diags = resource.validate(&config);
        assert_eq!(diags.len(), 1, "{:?}", diags);
        assert_eq!(diags[0].summary, "Duplicate environment variable");
        assert_eq!(diags[0].attribute.as_deref(), Some("env"));
        assert!(diags[0].is_error());
    }

    #[test]
    fn test_same_key_for_preview_is_allowed() {
        let resource = EnvsResource::new(EnvParent::Service);
        let config = json!({
            "uuid": "svc1",
            "env": [
                {"key": "A", "value": "1"},
                {"key": "A", "value": "2", "is_preview": true},
                {"key": "A", "value": "3", "is_preview": true}
            ]
        });
        let diags = resource.validate(&config);
        assert_eq!(diags.len(), 1, "{:?}", diags);
        assert!(diags[0].detail.as_deref().unwrap_or_default().contains("preview"));
    }

    #[test]
    fn test_parent_change_replaces() {
        let resource = EnvsResource::new(EnvParent::Service);
        let prior = json!({"uuid": "svc1", "id": "svc1", "env": []});
        let proposed = json!({"uuid": "svc2", "env": []});
        assert!(plan_resource(&resource.schema(), Some(&prior), proposed).requires_replace);
    }
}
