//! Provider configuration.
//!
//! `endpoint` and `token` come from the provider block, falling back to the
//! `COOLIFY_ENDPOINT` and `COOLIFY_TOKEN` environment variables. Empty strings
//! count as unset.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::schema::{Attribute, Diagnostic, Schema};

/// Environment variable holding the API endpoint.
pub const ENDPOINT_ENV: &str = "COOLIFY_ENDPOINT";
/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "COOLIFY_TOKEN";
/// Endpoint used when neither the config nor the environment sets one.
pub const DEFAULT_ENDPOINT: &str = "https://app.coolify.io/api/v1";

const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Default, Deserialize)]
struct ProviderConfigModel {
    endpoint: Option<String>,
    token: Option<String>,
}

/// Resolved provider configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Normalised API endpoint ending in `/api/v1`.
    pub endpoint: String,
    /// API token.
    pub token: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl ProviderConfig {
    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Manage a self-hosted deployment platform through its REST API.")
            .with_attribute(
                "endpoint",
                Attribute::optional_string().with_description(format!(
                    "API endpoint. Falls back to {}, then {}.",
                    ENDPOINT_ENV, DEFAULT_ENDPOINT
                )),
            )
            .with_attribute(
                "token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(format!("API token. Falls back to {}.", TOKEN_ENV)),
            )
    }

    /// Resolve the configuration against the process environment.
    pub fn resolve(config: &Value) -> Result<Self, Vec<Diagnostic>> {
        Self::resolve_with(config, |key| std::env::var(key).ok())
    }

    /// Resolve the configuration with a custom environment lookup.
    pub fn resolve_with<F>(config: &Value, env: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model: ProviderConfigModel = if config.is_null() {
            ProviderConfigModel::default()
        } else {
            serde_json::from_value(config.clone()).map_err(|e| {
                vec![Diagnostic::error("Invalid provider configuration").with_detail(e.to_string())]
            })?
        };

        let mut diagnostics = Vec::new();

        let endpoint = non_empty(model.endpoint)
            .or_else(|| non_empty(env(ENDPOINT_ENV)))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let endpoint = match normalize_endpoint(&endpoint) {
            Ok(endpoint) => Some(endpoint),
            Err(detail) => {
                diagnostics.push(
                    Diagnostic::error("Invalid API endpoint")
                        .with_detail(detail)
                        .with_attribute("endpoint"),
                );
                None
            },
        };

        let token = non_empty(model.token).or_else(|| non_empty(env(TOKEN_ENV)));
        if token.is_none() {
            diagnostics.push(
                Diagnostic::error("Missing API token")
                    .with_detail(format!(
                        "Set the token attribute in the provider configuration or the {} environment variable.",
                        TOKEN_ENV
                    ))
                    .with_attribute("token"),
            );
        }

        match (endpoint, token) {
            (Some(endpoint), Some(token)) if diagnostics.is_empty() => Ok(Self { endpoint, token }),
            _ => Err(diagnostics),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Strip trailing slashes, append `/api/v1` when missing and check the URL.
pub fn normalize_endpoint(raw: &str) -> Result<String, String> {
    let mut endpoint = raw.trim().trim_end_matches('/').to_string();
    if !endpoint.ends_with(API_PREFIX) {
        endpoint.push_str(API_PREFIX);
    }

    let url = Url::parse(&endpoint).map_err(|e| format!("{:?} is not a valid URL: {}", raw, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("{:?} must use http or https", raw));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(format!("{:?} has no host", raw));
    }
    Ok(endpoint)
}
