//! REST client for the platform API.
//!
//! Every call returns an [`ApiResponse`] carrying the HTTP status so adapters
//! can check it against what the operation expects. Transport failures and
//! undecodable bodies are [`ApiError`]s. There are no retries.

use std::fmt;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, trace};
use url::Url;

use crate::error::{ApiError, ProviderError};

use super::models::{
    Application, BulkEnvironmentRequest, EnvironmentVariable, MessageResponse, PostgresqlDatabase,
    PostgresqlDatabaseRequest, PrivateKey, PrivateKeyRequest, Project, ProjectRequest, Server,
    ServerDomain, ServerRequest, ServerResource, Service, ServiceRequest, Team, TeamMember,
    UuidResponse,
};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Query flags sent when deleting services and databases.
const CLEANUP_QUERY: [(&str, &str); 4] = [
    ("delete_configurations", "true"),
    ("delete_volumes", "true"),
    ("docker_cleanup", "true"),
    ("delete_connected_networks", "true"),
];

/// A response from the platform API.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    /// HTTP status code.
    pub status: StatusCode,
    /// Decoded body, present for successful responses with a non-empty body.
    pub body: Option<T>,
    /// Raw response body.
    pub raw: String,
}

impl<T> ApiResponse<T> {
    /// Whether the API answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }

    /// Fail with [`ProviderError::UnexpectedStatus`] unless the status is `expected`.
    pub fn ensure(&self, operation: &str, expected: StatusCode) -> Result<(), ProviderError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(ProviderError::unexpected_status(
                operation,
                self.status,
                self.raw.clone(),
            ))
        }
    }

    /// Check the status and return the decoded body.
    pub fn into_body(self, operation: &str, expected: StatusCode) -> Result<T, ProviderError> {
        self.ensure(operation, expected)?;
        self.body.ok_or_else(|| {
            ProviderError::Api(ApiError::Decode {
                path: operation.to_string(),
                message: "empty response body".to_string(),
            })
        })
    }
}

/// Client for the platform REST API.
#[derive(Clone)]
pub struct CoolifyClient {
    http: Client,
    base: Url,
}

impl fmt::Debug for CoolifyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoolifyClient")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

impl CoolifyClient {
    /// Create a client for `endpoint` (including the `/api/v1` prefix).
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an http(s) URL or the token
    /// cannot be used as a header value.
    pub fn new(endpoint: &str, token: &str) -> Result<Self, ApiError> {
        Self::with_timeout(endpoint, token, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with a custom request timeout.
    ///
    /// # Errors
    ///
    /// See [`CoolifyClient::new`].
    pub fn with_timeout(endpoint: &str, token: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base =
            Url::parse(endpoint).map_err(|e| ApiError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(ApiError::InvalidEndpoint(endpoint.to_string()));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::Client("API token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("terraform-provider-coolify/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self { http, base })
    }

    /// The base URL requests are resolved against.
    pub fn endpoint(&self) -> &str {
        self.base.as_str()
    }

    fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidEndpoint(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    #[instrument(level = "debug", skip(self, body, query), fields(path = %segments.join("/")))]
    async fn send<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let path = segments.join("/");
        let url = self.url(segments, query)?;

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| ApiError::Request {
            path: path.clone(),
            source,
        })?;
        let status = response.status();
        let raw = response.text().await.map_err(|source| ApiError::Request {
            path: path.clone(),
            source,
        })?;
        debug!(status = status.as_u16(), "API call completed");
        trace!(body = %raw, "API response body");

        let body = if status.is_success() && !raw.trim().is_empty() {
            let decoded = serde_json::from_str(&raw).map_err(|e| ApiError::Decode {
                path,
                message: e.to_string(),
            })?;
            Some(decoded)
        } else {
            None
        };

        Ok(ApiResponse { status, body, raw })
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<ApiResponse<T>, ApiError> {
        self.send::<T, ()>(Method::GET, segments, &[], None).await
    }

    async fn post<T, B>(&self, segments: &[&str], body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, segments, &[], Some(body)).await
    }

    async fn patch<T, B>(&self, segments: &[&str], body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::PATCH, segments, &[], Some(body)).await
    }

    async fn delete(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<ApiResponse<MessageResponse>, ApiError> {
        self.send::<MessageResponse, ()>(Method::DELETE, segments, query, None)
            .await
    }

    // -- version ------------------------------------------------------------

    /// `GET /version`. The body is plain text, e.g. `4.0.0-beta.380`.
    pub async fn get_version(&self) -> Result<ApiResponse<String>, ApiError> {
        let url = self.url(&["version"], &[])?;
        let response = self.http.get(url).send().await.map_err(|source| ApiError::Request {
            path: "version".to_string(),
            source,
        })?;
        let status = response.status();
        let raw = response.text().await.map_err(|source| ApiError::Request {
            path: "version".to_string(),
            source,
        })?;
        let version = raw.trim().trim_matches('"').to_string();
        let body = (status.is_success() && !version.is_empty()).then_some(version);
        Ok(ApiResponse { status, body, raw })
    }

    // -- teams --------------------------------------------------------------

    /// `GET /teams`.
    pub async fn list_teams(&self) -> Result<ApiResponse<Vec<Team>>, ApiError> {
        self.get(&["teams"]).await
    }

    /// `GET /teams/{id}`.
    pub async fn get_team(&self, id: i64) -> Result<ApiResponse<Team>, ApiError> {
        self.get(&["teams", &id.to_string()]).await
    }

    /// `GET /teams/{id}/members`.
    pub async fn list_team_members(&self, id: i64) -> Result<ApiResponse<Vec<TeamMember>>, ApiError> {
        self.get(&["teams", &id.to_string(), "members"]).await
    }

    // -- private keys -------------------------------------------------------

    /// `GET /security/keys`.
    pub async fn list_private_keys(&self) -> Result<ApiResponse<Vec<PrivateKey>>, ApiError> {
        self.get(&["security", "keys"]).await
    }

    /// `GET /security/keys/{uuid}`.
    pub async fn get_private_key(&self, uuid: &str) -> Result<ApiResponse<PrivateKey>, ApiError> {
        self.get(&["security", "keys", uuid]).await
    }

    /// `POST /security/keys`.
    pub async fn create_private_key(
        &self,
        body: &PrivateKeyRequest,
    ) -> Result<ApiResponse<UuidResponse>, ApiError> {
        self.post(&["security", "keys"], body).await
    }

    /// `PATCH /security/keys/{uuid}`.
    pub async fn update_private_key(
        &self,
        uuid: &str,
        body: &PrivateKeyRequest,
    ) -> Result<ApiResponse<UuidResponse>, ApiError> {
        self.patch(&["security", "keys", uuid], body).await
    }

    /// `DELETE /security/keys/{uuid}`.
    pub async fn delete_private_key(&self, uuid: &str) -> Result<ApiResponse<MessageResponse>, ApiError> {
        self.delete(&["security", "keys", uuid], &[]).await
    }

    // -- servers ------------------------------------------------------------

    /// `GET /servers`.
    pub async fn list_servers(&self) -> Result<ApiResponse<Vec<Server>>, ApiError> {
        self.get(&["servers"]).await
    }

    /// `GET /servers/{uuid}`.
    pub async fn get_server(&self, uuid: &str) -> Result<ApiResponse<Server>, ApiError> {
        self.get(&["servers", uuid]).await
    }

    /// `POST /servers`.
    pub async fn create_server(&self, body: &ServerRequest) -> Result<ApiResponse<UuidResponse>, ApiError> {
        self.post(&["servers"], body).await
    }

    /// `PATCH /servers/{uuid}`.
    pub async fn update_server(
        &self,
        uuid: &str,
        body: &ServerRequest,
    ) -> Result<ApiResponse<UuidResponse>, ApiError> {
        self.patch(&["servers", uuid], body).await
    }

    /// `DELETE /servers/{uuid}`.
    pub async fn delete_server(&self, uuid: &str) -> Result<ApiResponse<MessageResponse>, ApiError> {
        self.delete(&["servers", uuid], &[]).await
    }

    /// `GET /servers/{uuid}/resources`.
    pub async fn list_server_resources(
        &self,
        uuid: &str,
    ) -> Result<ApiResponse<Vec<ServerResource>>, ApiError> {
        self.get(&["servers", uuid, "resources"]).await
    }

    /// `GET /servers/{uuid}/domains`.
    pub async fn list_server_domains(&self, uuid: &str) -> Result<ApiResponse<Vec<ServerDomain>>, ApiError> {
        self.get(&["servers", uuid, "domains"]).await
    }

    // -- projects -----------------------------------------------------------

    /// `GET /projects`.
    pub async fn list_projects(&self) -> Result<ApiResponse<Vec<Project>>, ApiError> {
        self.get(&["projects"]).await
    }

    /// `GET /projects/{uuid}`.
    pub async fn get_project(&self, uuid: &str) -> Result<ApiResponse<Project>, ApiError> {
        self.get(&["projects", uuid]).await
    }

    /// `POST /projects`.
    pub async fn create_project(&self, body: &ProjectRequest) -> Result<ApiResponse<UuidResponse>, ApiError> {
        self.post(&["projects"], body).await
    }

    /// `PATCH /projects/{uuid}`.
    pub async fn update_project(
        &self,
        uuid: &str,
        body: &ProjectRequest,
    ) -> Result<ApiResponse<Project>, ApiError> {
        self.patch(&["projects", uuid], body).await
    }

    /// `DELETE /projects/{uuid}`.
    pub async fn delete_project(&self, uuid: &str) -> Result<ApiResponse<MessageResponse>, ApiError> {
        self.delete(&["projects", uuid], &[]).await
    }

    // -- applications -------------------------------------------------------

    /// `GET /applications`.
    pub async fn list_applications(&self) -> Result<ApiResponse<Vec<Application>>, ApiError> {
        self.get(&["applications"]).await
    }

    /// `GET /applications/{uuid}`.
    pub async fn get_application(&self, uuid: &str) -> Result<ApiResponse<Application>, ApiError> {
        self.get(&["applications", uuid]).await
    }

    // -- services -----------------------------------------------------------

    /// `GET /services`.
    pub async fn list_services(&self) -> Result<ApiResponse<Vec<Service>>, ApiError> {
        self.get(&["services"]).await
    }

    /// `GET /services/{uuid}`.
    pub async fn get_service(&self, uuid: &str) -> Result<ApiResponse<Service>, ApiError> {
        self.get(&["services", uuid]).await
    }

    /// `POST /services`.
    pub async fn create_service(&self, body: &ServiceRequest) -> Result<ApiResponse<UuidResponse>, ApiError> {
        self.post(&["services"], body).await
    }

    /// `PATCH /services/{uuid}`.
    pub async fn update_service(
        &self,
        uuid: &str,
        body: &ServiceRequest,
    ) -> Result<ApiResponse<UuidResponse>, ApiError> {
        self.patch(&["services", uuid], body).await
    }

    /// `DELETE /services/{uuid}` with full cleanup.
    pub async fn delete_service(&self, uuid: &str) -> Result<ApiResponse<MessageResponse>, ApiError> {
        self.delete(&["services", uuid], &CLEANUP_QUERY).await
    }

    // -- databases ----------------------------------------------------------

    /// `POST /databases/postgresql`.
    pub async fn create_postgresql_database(
        &self,
        body: &PostgresqlDatabaseRequest,
    ) -> Result<ApiResponse<UuidResponse>, ApiError> {
        self.post(&["databases", "postgresql"], body).await
    }

    /// `GET /databases/{uuid}`.
    pub async fn get_postgresql_database(
        &self,
        uuid: &str,
    ) -> Result<ApiResponse<PostgresqlDatabase>, ApiError> {
        self.get(&["databases", uuid]).await
    }

    /// `PATCH /databases/{uuid}`.
    pub async fn update_postgresql_database(
        &self,
        uuid: &str,
        body: &PostgresqlDatabaseRequest,
    ) -> Result<ApiResponse<MessageResponse>, ApiError> {
        self.patch(&["databases", uuid], body).await
    }

    /// `DELETE /databases/{uuid}` with full cleanup.
    pub async fn delete_database(&self, uuid: &str) -> Result<ApiResponse<MessageResponse>, ApiError> {
        self.delete(&["databases", uuid], &CLEANUP_QUERY).await
    }

    // -- environment variables ----------------------------------------------

    /// `GET /{parent}/{uuid}/envs`.
    pub async fn list_envs(
        &self,
        parent: EnvParent,
        uuid: &str,
    ) -> Result<ApiResponse<Vec<EnvironmentVariable>>, ApiError> {
        self.get(&[parent.as_segment(), uuid, "envs"]).await
    }

    /// `PATCH /{parent}/{uuid}/envs/bulk`.
    pub async fn bulk_update_envs(
        &self,
        parent: EnvParent,
        uuid: &str,
        body: &BulkEnvironmentRequest,
    ) -> Result<ApiResponse<Vec<EnvironmentVariable>>, ApiError> {
        self.patch(&[parent.as_segment(), uuid, "envs", "bulk"], body).await
    }

    /// `DELETE /{parent}/{uuid}/envs/{env_uuid}`.
    pub async fn delete_env(
        &self,
        parent: EnvParent,
        uuid: &str,
        env_uuid: &str,
    ) -> Result<ApiResponse<MessageResponse>, ApiError> {
        self.delete(&[parent.as_segment(), uuid, "envs", env_uuid], &[]).await
    }
}

/// Which kind of object owns a set of environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvParent {
    /// `/applications/{uuid}/envs`
    Application,
    /// `/services/{uuid}/envs`
    Service,
}

impl EnvParent {
    fn as_segment(self) -> &'static str {
        match self {
            Self::Application => "applications",
            Self::Service => "services",
        }
    }

    /// Human readable name used in diagnostics.
    pub fn noun(self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Service => "service",
        }
    }
}
