//! `coolify_project` and `coolify_projects`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{filtered_list, found, item, list_schema, lookup_schema, with_inputs, DataSource, Fields};
use crate::api::CoolifyClient;
use crate::error::ProviderError;
use crate::flatten::require_uuid;
use crate::resources::project::environment_type;
use crate::schema::{Attribute, AttributeType, Schema};

fn project_fields() -> Fields {
    vec![
        ("uuid", AttributeType::String),
        ("id", AttributeType::Int64),
        ("name", AttributeType::String),
        ("description", AttributeType::String),
    ]
}

/// Looks up one project, including its environments.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectDataSource;

#[async_trait]
impl DataSource for ProjectDataSource {
    fn type_name(&self) -> &'static str {
        "coolify_project"
    }

    fn schema(&self) -> Schema {
        let mut fields = project_fields();
        fields.push(("environments", AttributeType::list(environment_type())));
        lookup_schema("Look up a project by UUID.", ("uuid", Attribute::required_string()), &fields)
    }

    #[instrument(skip_all, fields(data_source_type = "coolify_project"))]
    async fn read(&self, client: &CoolifyClient, config: &Value) -> Result<Value, ProviderError> {
        let uuid = require_uuid(config)?;
        let project = found(client.get_project(&uuid).await?, "project", &uuid)?;

        let mut fields = project_fields();
        fields.push(("environments", AttributeType::list(environment_type())));
        Ok(with_inputs(item(&project, &fields)?, config, &["uuid"]))
    }
}

/// Lists projects.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectsDataSource;

#[async_trait]
impl DataSource for ProjectsDataSource {
    fn type_name(&self) -> &'static str {
        "coolify_projects"
    }

    fn schema(&self) -> Schema {
        list_schema(
            "List projects.",
            "projects",
            &project_fields(),
            &["name", "description", "uuid", "id"],
        )
    }

    #[instrument(skip_all, fields(data_source_type = "coolify_projects"))]
    async fn read(&self, client: &CoolifyClient, config: &Value) -> Result<Value, ProviderError> {
        let projects = client
            .list_projects()
            .await?
            .into_body("list projects", StatusCode::OK)?;
        debug!(count = projects.len(), "listed projects");

        let fields = project_fields();
        let items = projects
            .iter()
            .map(|project| item(project, &fields))
            .collect::<Result<Vec<_>, _>>()?;
        filtered_list(config, "projects", items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{Environment, Project};
    use serde_json::json;

    #[test]
    fn test_single_includes_environments() {
        let schema = ProjectDataSource.schema();
        assert!(schema.attribute("environments").unwrap().flags.computed);

        let project = Project {
            uuid: Some("p1".to_string()),
            environments: Some(vec![Environment {
                name: Some("production".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let mut fields = project_fields();
        fields.push(("environments", AttributeType::list(environment_type())));
        let flat = item(&project, &fields).unwrap();
        assert_eq!(flat["environments"][0]["name"], "production");
    }

    #[test]
    fn test_filter_on_id() {
        assert!(ProjectsDataSource
            .validate(&json!({"filter": [{"name": "id", "values": ["1", "2"]}]}))
            .is_empty());
    }
}
