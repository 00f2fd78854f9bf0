//! Platform API models.
//!
//! Response models keep every field optional: the platform omits or nulls
//! fields depending on version and entity state. Request bodies skip unset
//! fields so PATCH calls only send what changed.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

/// Body returned by create endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UuidResponse {
    /// UUID of the created object.
    pub uuid: String,
}

/// Generic `{"message": ...}` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human readable message.
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// A team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub personal_team: Option<bool>,
    pub show_boarding: Option<bool>,
    pub custom_server_limit: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub members: Option<Vec<TeamMember>>,
}

/// A member of a team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub email_verified_at: Option<String>,
    pub force_password_reset: Option<bool>,
    pub marketing_emails: Option<bool>,
    pub two_factor_confirmed_at: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Private keys
// ---------------------------------------------------------------------------

/// An SSH private key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrivateKey {
    pub id: Option<i64>,
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub private_key: Option<String>,
    pub public_key: Option<String>,
    pub fingerprint: Option<String>,
    pub is_git_related: Option<bool>,
    pub team_id: Option<i64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Body of `POST /security/keys` and `PATCH /security/keys/{uuid}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrivateKeyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Servers
// ---------------------------------------------------------------------------

/// A server managed by the platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub id: Option<i64>,
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub ip: Option<String>,
    pub user: Option<String>,
    pub port: Option<i64>,
    pub proxy_type: Option<String>,
    pub high_disk_usage_notification_sent: Option<bool>,
    pub unreachable_count: Option<i64>,
    pub unreachable_notification_sent: Option<bool>,
    pub log_drain_notification_sent: Option<bool>,
    pub swarm_cluster: Option<String>,
    pub validation_logs: Option<String>,
    pub settings: Option<ServerSettings>,
}

/// Per-server settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub id: Option<i64>,
    pub server_id: Option<i64>,
    pub concurrent_builds: Option<i64>,
    pub dynamic_timeout: Option<i64>,
    pub force_disabled: Option<bool>,
    pub force_server_cleanup: Option<bool>,
    pub is_build_server: Option<bool>,
    pub is_cloudflare_tunnel: Option<bool>,
    pub is_jump_server: Option<bool>,
    pub is_logdrain_custom_enabled: Option<bool>,
    pub is_metrics_enabled: Option<bool>,
    pub is_reachable: Option<bool>,
    pub is_sentinel_enabled: Option<bool>,
    pub is_swarm_manager: Option<bool>,
    pub is_swarm_worker: Option<bool>,
    pub is_usable: Option<bool>,
    pub docker_cleanup_frequency: Option<String>,
    pub docker_cleanup_threshold: Option<i64>,
    pub delete_unused_networks: Option<bool>,
    pub delete_unused_volumes: Option<bool>,
    pub server_timezone: Option<String>,
    pub wildcard_domain: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Body of `POST /servers` and `PATCH /servers/{uuid}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_build_server: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instant_validate: Option<bool>,
}

/// An application, database or service running on a server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerResource {
    pub id: Option<i64>,
    pub uuid: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Domains served from one IP of a server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerDomain {
    pub ip: Option<String>,
    #[serde(default)]
    pub domains: Vec<String>,
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// A project grouping environments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Option<i64>,
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub environments: Option<Vec<Environment>>,
}

/// An environment inside a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub project_id: Option<i64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Body of `POST /projects` and `PATCH /projects/{uuid}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Applications
// ---------------------------------------------------------------------------

/// An application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: Option<i64>,
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub fqdn: Option<String>,
    pub status: Option<String>,
    pub build_pack: Option<String>,
    pub git_repository: Option<String>,
    pub git_branch: Option<String>,
    pub git_commit_sha: Option<String>,
    pub base_directory: Option<String>,
    pub publish_directory: Option<String>,
    pub install_command: Option<String>,
    pub build_command: Option<String>,
    pub start_command: Option<String>,
    pub ports_exposes: Option<String>,
    pub ports_mappings: Option<String>,
    pub static_image: Option<String>,
    pub dockerfile: Option<String>,
    pub docker_registry_image_name: Option<String>,
    pub docker_registry_image_tag: Option<String>,
    pub health_check_enabled: Option<bool>,
    pub health_check_path: Option<String>,
    pub limits_memory: Option<String>,
    pub limits_cpus: Option<String>,
    pub destination_type: Option<String>,
    pub destination_id: Option<i64>,
    pub environment_id: Option<i64>,
    pub source_id: Option<i64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// A one-click or docker-compose service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: Option<i64>,
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub server_status: Option<bool>,
    pub service_type: Option<String>,
    pub environment_id: Option<i64>,
    pub server_id: Option<i64>,
    pub destination_id: Option<i64>,
    pub destination_type: Option<String>,
    pub docker_compose_raw: Option<String>,
    pub docker_compose: Option<String>,
    pub connect_to_docker_network: Option<bool>,
    pub config_hash: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Body of `POST /services` and `PATCH /services/{uuid}`.
///
/// `docker_compose_raw` must already be base64-encoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instant_deploy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_compose_raw: Option<String>,
}

// ---------------------------------------------------------------------------
// Databases
// ---------------------------------------------------------------------------

/// A PostgreSQL database as returned by `GET /databases/{uuid}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostgresqlDatabase {
    pub id: Option<i64>,
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub status: Option<String>,
    pub is_public: Option<bool>,
    pub public_port: Option<i64>,
    pub postgres_user: Option<String>,
    pub postgres_password: Option<String>,
    pub postgres_db: Option<String>,
    pub limits_memory: Option<String>,
    pub limits_cpus: Option<String>,
    pub internal_db_url: Option<String>,
    pub external_db_url: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Body of `POST /databases/postgresql` and `PATCH /databases/{uuid}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostgresqlDatabaseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postgres_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postgres_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postgres_db: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits_memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits_cpus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instant_deploy: Option<bool>,
}

// ---------------------------------------------------------------------------
// Environment variables
// ---------------------------------------------------------------------------

/// An environment variable of an application or service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub uuid: Option<String>,
    pub key: Option<String>,
    pub value: Option<String>,
    pub real_value: Option<String>,
    pub is_literal: Option<bool>,
    pub is_multiline: Option<bool>,
    pub is_shown_once: Option<bool>,
    pub is_build_time: Option<bool>,
    pub is_preview: Option<bool>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// One variable in a bulk upsert.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnvironmentVariableRequest {
    pub key: String,
    pub value: String,
    pub is_literal: bool,
    pub is_multiline: bool,
    pub is_shown_once: bool,
    pub is_build_time: bool,
    pub is_preview: bool,
}

/// Body of `PATCH /{applications|services}/{uuid}/envs/bulk`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkEnvironmentRequest {
    pub data: Vec<EnvironmentVariableRequest>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_decodes_partial_payload() {
        let server: Server = serde_json::from_value(json!({
            "uuid": "srv1",
            "name": "localhost",
            "ip": "host.docker.internal",
            "port": 22,
            "settings": {"is_reachable": true, "wildcard_domain": null}
        }))
        .unwrap();

        assert_eq!(server.uuid.as_deref(), Some("srv1"));
        assert_eq!(server.port, Some(22));
        assert!(server.description.is_none());
        let settings = server.settings.unwrap();
        assert_eq!(settings.is_reachable, Some(true));
        assert!(settings.wildcard_domain.is_none());
    }

    #[test]
    fn test_server_resource_type_rename() {
        let resource: ServerResource =
            serde_json::from_value(json!({"uuid": "a", "type": "application"})).unwrap();
        assert_eq!(resource.resource_type.as_deref(), Some("application"));
    }

    #[test]
    fn test_request_skips_unset_fields() {
        let body = ProjectRequest {
            name: Some("infra".to_string()),
            description: None,
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"name": "infra"}));
    }

    #[test]
    fn test_bulk_env_request_shape() {
        let body = BulkEnvironmentRequest {
            data: vec![EnvironmentVariableRequest {
                key: "PORT".to_string(),
                value: "3000".to_string(),
                is_build_time: true,
                ..Default::default()
            }],
        };
        let encoded = serde_json::to_value(&body).unwrap();
        assert_eq!(encoded["data"][0]["key"], "PORT");
        assert_eq!(encoded["data"][0]["is_build_time"], true);
        assert_eq!(encoded["data"][0]["is_preview"], false);
    }
}
