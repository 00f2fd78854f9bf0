//! `coolify_team` and `coolify_teams`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{filtered_list, found, item, list_schema, lookup_schema, with_inputs, DataSource, Fields};
use crate::api::CoolifyClient;
use crate::error::ProviderError;
use crate::flatten::{opt_bool, opt_i64};
use crate::schema::{Attribute, AttributeType, Schema};

fn team_fields() -> Fields {
    vec![
        ("id", AttributeType::Int64),
        ("name", AttributeType::String),
        ("description", AttributeType::String),
        ("personal_team", AttributeType::Bool),
        ("show_boarding", AttributeType::Bool),
        ("custom_server_limit", AttributeType::String),
        ("created_at", AttributeType::String),
        ("updated_at", AttributeType::String),
    ]
}

fn member_fields() -> Fields {
    vec![
        ("id", AttributeType::Int64),
        ("name", AttributeType::String),
        ("email", AttributeType::String),
        ("email_verified_at", AttributeType::String),
        ("created_at", AttributeType::String),
        ("updated_at", AttributeType::String),
    ]
}

/// Looks up one team by id, optionally with its members.
#[derive(Debug, Default, Clone, Copy)]
pub struct TeamDataSource;

#[async_trait]
impl DataSource for TeamDataSource {
    fn type_name(&self) -> &'static str {
        "coolify_team"
    }

    fn schema(&self) -> Schema {
        lookup_schema(
            "Look up a team by id.",
            ("id", Attribute::required_int64()),
            &team_fields(),
        )
        .with_attribute(
            "with_members",
            Attribute::optional_bool().with_description("Also fetch the team members."),
        )
        .with_attribute(
            "members",
            Attribute::computed(AttributeType::list(AttributeType::object(&member_fields()))),
        )
    }

    #[instrument(skip_all, fields(data_source_type = "coolify_team"))]
    async fn read(&self, client: &CoolifyClient, config: &Value) -> Result<Value, ProviderError> {
        let id = opt_i64(config, "id")
            .ok_or_else(|| ProviderError::InvalidRequest("team id is required".to_string()))?;
        let key = id.to_string();
        let team = found(client.get_team(id).await?, "team", &key)?;

        let mut state = item(&team, &team_fields())?;
        let members = if opt_bool(config, "with_members").unwrap_or(false) {
            let members = found(client.list_team_members(id).await?, "team members", &key)?;
            debug!(count = members.len(), "listed team members");
            let fields = member_fields();
            let items = members
                .iter()
                .map(|member| item(member, &fields))
                .collect::<Result<Vec<_>, _>>()?;
            Value::Array(items)
        } else {
            Value::Null
        };
        if let Value::Object(map) = &mut state {
            map.insert("members".to_string(), members);
        }
        Ok(with_inputs(state, config, &["id", "with_members"]))
    }
}

/// Lists teams visible to the token.
#[derive(Debug, Default, Clone, Copy)]
pub struct TeamsDataSource;

#[async_trait]
impl DataSource for TeamsDataSource {
    fn type_name(&self) -> &'static str {
        "coolify_teams"
    }

    fn schema(&self) -> Schema {
        list_schema(
            "List teams.",
            "teams",
            &team_fields(),
            &["name", "description", "id", "personal_team"],
        )
    }

    #[instrument(skip_all, fields(data_source_type = "coolify_teams"))]
    async fn read(&self, client: &CoolifyClient, config: &Value) -> Result<Value, ProviderError> {
        let teams = client.list_teams().await?.into_body("list teams", StatusCode::OK)?;
        debug!(count = teams.len(), "listed teams");

        let fields = team_fields();
        let items = teams
            .iter()
            .map(|team| item(team, &fields))
            .collect::<Result<Vec<_>, _>>()?;
        filtered_list(config, "teams", items)
    }
}
