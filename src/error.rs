//! Error types for the Coolify provider.
//!
//! [`ApiError`] covers failures talking to the platform API (transport,
//! decoding, bad endpoint). [`ProviderError`] is what resource and data source
//! adapters return; the gRPC layer turns it into an error diagnostic.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Errors raised by the platform REST client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP request could not be sent or the body could not be read.
    #[error("request to {path} failed: {source}")]
    Request {
        /// API path that was requested.
        path: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not match the expected model.
    #[error("failed to decode response from {path}: {message}")]
    Decode {
        /// API path that was requested.
        path: String,
        /// Decoder message.
        message: String,
    },

    /// The configured endpoint is not a usable URL.
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Errors that can occur while serving provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested remote object was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider is not (or incorrectly) configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The platform API could not be reached or answered garbage.
    #[error("API client error: {0}")]
    Api(#[from] ApiError),

    /// The platform API answered with a status code the operation does not expect.
    #[error("Unexpected HTTP status code {status} while trying to {operation}")]
    UnexpectedStatus {
        /// What the adapter was doing, e.g. `create server`.
        operation: String,
        /// HTTP status code returned by the API.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Invalid request from the host.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Build an [`ProviderError::UnexpectedStatus`] error.
    pub fn unexpected_status(
        operation: impl Into<String>,
        status: reqwest::StatusCode,
        body: impl Into<String>,
    ) -> Self {
        Self::UnexpectedStatus {
            operation: operation.into(),
            status: status.as_u16(),
            body: body.into(),
        }
    }

    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_) => "serialization error (see Debug output)",
            Self::Transport(_) => "transport error (see Debug output)",
            Self::Api(_) => "API client error (see Debug output)",
            Self::UnexpectedStatus { body, .. } => body,
            Self::Unimplemented(msg) => msg,
            Self::InvalidRequest(msg) => msg,
        }
    }

    /// Render this error as a single error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::UnexpectedStatus {
                operation,
                status,
                body,
            } => Diagnostic::error("Unexpected HTTP status code").with_detail(format!(
                "Received {} while trying to {}. Details: {}",
                status, operation, body
            )),
            Self::Api(err) => {
                Diagnostic::error("Client Error").with_detail(format!("Unable to reach API: {}", err))
            },
            other => Diagnostic::error(other.to_string()),
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            },
            ProviderError::Api(err) => tonic::Status::unavailable(err.to_string()),
            ProviderError::UnexpectedStatus { status, .. } if status == 401 || status == 403 => {
                tonic::Status::permission_denied(err_status_message(status))
            },
            ProviderError::UnexpectedStatus { status, .. } => {
                tonic::Status::unknown(err_status_message(status))
            },
            ProviderError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
            ProviderError::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
        }
    }
}

fn err_status_message(status: u16) -> String {
    format!("platform API returned HTTP {}", status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DiagnosticSeverity;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("server abc".to_string());
        assert_eq!(format!("{}", err), "Resource not found: server abc");

        let err = ProviderError::UnknownResource("coolify_widget".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: coolify_widget");

        let err = ProviderError::unexpected_status(
            "create project",
            reqwest::StatusCode::UNPROCESSABLE_ENTITY,
            "{\"message\":\"name is required\"}",
        );
        assert_eq!(
            format!("{}", err),
            "Unexpected HTTP status code 422 while trying to create project"
        );
    }

    #[test]
    fn test_unexpected_status_diagnostic() {
        let err = ProviderError::unexpected_status(
            "read server",
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "boom",
        );
        let diag = err.to_diagnostic();
        assert_eq!(diag.severity, DiagnosticSeverity::Error);
        assert_eq!(diag.summary, "Unexpected HTTP status code");
        let detail = diag.detail.unwrap();
        assert!(detail.contains("500"));
        assert!(detail.contains("read server"));
        assert!(detail.contains("boom"));
    }

    #[test]
    fn test_error_to_status() {
        let status: tonic::Status = ProviderError::NotFound("x".to_string()).into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let status: tonic::Status = ProviderError::Configuration("x".to_string()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::unexpected_status(
            "read team",
            reqwest::StatusCode::UNAUTHORIZED,
            "",
        )
        .into();
        assert_eq!(status.code(), tonic::Code::PermissionDenied);

        let status: tonic::Status = ProviderError::unexpected_status(
            "read team",
            reqwest::StatusCode::BAD_GATEWAY,
            "",
        )
        .into();
        assert_eq!(status.code(), tonic::Code::Unknown);
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::Configuration("missing token".to_string());
        assert_eq!(err.message(), "missing token");

        let err = ProviderError::unexpected_status("delete", reqwest::StatusCode::CONFLICT, "busy");
        assert_eq!(err.message(), "busy");
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::Decode {
            path: "/servers".to_string(),
            message: "expected array".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to decode response from /servers: expected array"
        );

        let err: ProviderError = ApiError::InvalidEndpoint("ftp://x".to_string()).into();
        assert!(matches!(err, ProviderError::Api(_)));
        assert_eq!(err.to_diagnostic().summary, "Client Error");
    }
}
