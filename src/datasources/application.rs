//! `coolify_application` and `coolify_applications`.
//!
//! Applications are read-only here; they are deployed from the platform UI
//! or through git integrations and only referenced from configuration.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{filtered_list, found, item, list_schema, lookup_schema, with_inputs, DataSource, Fields};
use crate::api::CoolifyClient;
use crate::error::ProviderError;
use crate::flatten::require_uuid;
use crate::schema::{Attribute, AttributeType, Schema};

const FILTERABLE: &[&str] = &[
    "name",
    "description",
    "uuid",
    "fqdn",
    "status",
    "git_repository",
    "git_branch",
];

fn fields() -> Fields {
    use AttributeType::{Bool, Int64, String};
    vec![
        ("uuid", String),
        ("id", Int64),
        ("name", String),
        ("description", String),
        ("fqdn", String),
        ("status", String),
        ("build_pack", String),
        ("git_repository", String),
        ("git_branch", String),
        ("git_commit_sha", String),
        ("base_directory", String),
        ("publish_directory", String),
        ("install_command", String),
        ("build_command", String),
        ("start_command", String),
        ("ports_exposes", String),
        ("ports_mappings", String),
        ("static_image", String),
        ("dockerfile", String),
        ("docker_registry_image_name", String),
        ("docker_registry_image_tag", String),
        ("health_check_enabled", Bool),
        ("health_check_path", String),
        ("limits_memory", String),
        ("limits_cpus", String),
        ("destination_type", String),
        ("destination_id", Int64),
        ("environment_id", Int64),
        ("source_id", Int64),
        ("created_at", String),
        ("updated_at", String),
    ]
}

/// Looks up one application by UUID.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApplicationDataSource;

#[async_trait]
impl DataSource for ApplicationDataSource {
    fn type_name(&self) -> &'static str {
        "coolify_application"
    }

    fn schema(&self) -> Schema {
        lookup_schema(
            "Look up an application by UUID.",
            ("uuid", Attribute::required_string()),
            &fields(),
        )
    }

    #[instrument(skip_all, fields(data_source_type = "coolify_application"))]
    async fn read(&self, client: &CoolifyClient, config: &Value) -> Result<Value, ProviderError> {
        let uuid = require_uuid(config)?;
        let application = found(client.get_application(&uuid).await?, "application", &uuid)?;
        Ok(with_inputs(item(&application, &fields())?, config, &["uuid"]))
    }
}

/// Lists applications.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApplicationsDataSource;

#[async_trait]
impl DataSource for ApplicationsDataSource {
    fn type_name(&self) -> &'static str {
        "coolify_applications"
    }

    fn schema(&self) -> Schema {
        list_schema("List applications.", "applications", &fields(), FILTERABLE)
    }

    #[instrument(skip_all, fields(data_source_type = "coolify_applications"))]
    async fn read(&self, client: &CoolifyClient, config: &Value) -> Result<Value, ProviderError> {
        let applications = client
            .list_applications()
            .await?
            .into_body("list applications", StatusCode::OK)?;
        debug!(count = applications.len(), "listed applications");

        let fields = fields();
        let items = applications
            .iter()
            .map(|application| item(application, &fields))
            .collect::<Result<Vec<_>, _>>()?;
        filtered_list(config, "applications", items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Application;
    use crate::filter::{one_pass_filter, Filter};

    #[test]
    fn test_every_filterable_name_is_a_field() {
        let names = super::super::field_names(&fields());
        for name in FILTERABLE {
            assert!(names.contains(name), "{}", name);
        }
    }

    #[test]
    fn test_filter_on_git_branch() {
        let application = Application {
            uuid: Some("a1".to_string()),
            git_branch: Some("main".to_string()),
            health_check_enabled: Some(true),
            ..Default::default()
        };
        let flat = item(&application, &fields()).unwrap();
        assert_eq!(flat["health_check_enabled"], true);

        let main = Filter {
            name: "git_branch".to_string(),
            values: vec!["develop".to_string(), "main".to_string()],
        };
        assert!(one_pass_filter(&flat, &[main]));

        let develop = Filter {
            name: "git_branch".to_string(),
            values: vec!["develop".to_string()],
        };
        assert!(!one_pass_filter(&flat, &[develop]));
    }
}
