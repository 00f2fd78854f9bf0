//! `coolify_project`: a named group of environments.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use super::{ensure_deleted, is_gone, uuid_attribute, Resource};
use crate::api::models::{Environment, Project, ProjectRequest};
use crate::api::CoolifyClient;
use crate::error::ProviderError;
use crate::flatten::{decode_model, empty_as_null, encode_model, require_uuid};
use crate::schema::{Attribute, AttributeType, Schema};

/// The `coolify_project` resource.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectResource;

/// Object type of one entry in `environments`.
pub fn environment_type() -> AttributeType {
    AttributeType::object(&[
        ("id", AttributeType::Int64),
        ("name", AttributeType::String),
        ("description", AttributeType::String),
        ("project_id", AttributeType::Int64),
        ("created_at", AttributeType::String),
        ("updated_at", AttributeType::String),
    ])
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ProjectModel {
    uuid: Option<String>,
    id: Option<i64>,
    name: Option<String>,
    description: Option<String>,
    environments: Option<Vec<Environment>>,
}

impl ProjectModel {
    fn request(&self) -> ProjectRequest {
        ProjectRequest {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    fn flatten(project: Project, known: &ProjectModel) -> Self {
        Self {
            uuid: project.uuid,
            id: project.id,
            name: project.name,
            description: empty_as_null(project.description, known.description.as_deref()),
            environments: project.environments,
        }
    }
}

async fn fetch(client: &CoolifyClient, uuid: &str) -> Result<Project, ProviderError> {
    client.get_project(uuid).await?.into_body("read project", StatusCode::OK)
}

#[async_trait]
impl Resource for ProjectResource {
    fn type_name(&self) -> &'static str {
        "coolify_project"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A project. The platform creates a `production` environment with it.")
            .with_attribute("uuid", uuid_attribute("project"))
            .with_attribute("id", Attribute::computed_int64().with_state_for_unknown())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "environments",
                Attribute::computed(AttributeType::list(environment_type())),
            )
    }

    #[instrument(skip_all, fields(resource_type = "coolify_project"))]
    async fn create(&self, client: &CoolifyClient, planned: &Value) -> Result<Value, ProviderError> {
        let plan: ProjectModel = decode_model(planned)?;
        let created = client
            .create_project(&plan.request())
            .await?
            .into_body("create project", StatusCode::CREATED)?;
        info!(uuid = %created.uuid, "created project");

        let project = fetch(client, &created.uuid).await?;
        encode_model(&ProjectModel::flatten(project, &plan))
    }

    #[instrument(skip_all, fields(resource_type = "coolify_project"))]
    async fn read(&self, client: &CoolifyClient, state: &Value) -> Result<Option<Value>, ProviderError> {
        let uuid = require_uuid(state)?;
        let known: ProjectModel = decode_model(state)?;

        let response = client.get_project(&uuid).await?;
        if is_gone(&response, self.type_name(), &uuid) {
            return Ok(None);
        }
        let project = response.into_body("read project", StatusCode::OK)?;
        Ok(Some(encode_model(&ProjectModel::flatten(project, &known))?))
    }

    #[instrument(skip_all, fields(resource_type = "coolify_project"))]
    async fn update(
        &self,
        client: &CoolifyClient,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let uuid = require_uuid(prior)?;
        let plan: ProjectModel = decode_model(planned)?;

        client
            .update_project(&uuid, &plan.request())
            .await?
            .ensure("update project", StatusCode::CREATED)?;
        info!(uuid = %uuid, "updated project");

        let project = fetch(client, &uuid).await?;
        encode_model(&ProjectModel::flatten(project, &plan))
    }

    #[instrument(skip_all, fields(resource_type = "coolify_project"))]
    async fn delete(&self, client: &CoolifyClient, state: &Value) -> Result<(), ProviderError> {
        let uuid = require_uuid(state)?;
        let response = client.delete_project(&uuid).await?;
        ensure_deleted(&response, "delete project")?;
        info!(uuid = %uuid, "deleted project");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_shape() {
        let project = Project {
            id: Some(2),
            uuid: Some("p1".to_string()),
            name: Some("infra".to_string()),
            description: None,
            environments: Some(vec![Environment {
                id: Some(7),
                name: Some("production".to_string()),
                project_id: Some(2),
                ..Default::default()
            }]),
        };

        let state = encode_model(&ProjectModel::flatten(project, &ProjectModel::default())).unwrap();
        assert_eq!(state["uuid"], "p1");
        assert_eq!(state["description"], Value::Null);
        assert_eq!(state["environments"][0]["name"], "production");
        assert_eq!(state["environments"][0]["project_id"], 2);
    }

    #[test]
    fn test_validate_requires_name() {
        let diags = ProjectResource.validate(&json!({"description": "x"}));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("name"));
    }
}
