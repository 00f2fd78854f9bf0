//! Coolify provider
//!
//! An infrastructure-as-code provider plugin for the Coolify self-hosted
//! deployment platform. It manages private keys, servers, projects, services,
//! PostgreSQL databases and application/service environment variables, and
//! exposes read-only data sources for those plus teams and applications.
//!
//! # Overview
//!
//! - **Protocol**: gRPC service compiled from `proto/provider.proto`; all
//!   configuration and state values travel as JSON documents
//! - **Provider**: [`CoolifyProvider`] registers every resource and data
//!   source and dispatches requests to them
//! - **API client**: [`api::CoolifyClient`], a thin REST client that returns the
//!   status code with every response so adapters can check it
//! - **Planning and validation**: schema-driven, shared by every resource
//!
//! # Handshake Protocol
//!
//! When started via [`serve`], the provider prints one line to stdout:
//!
//! ```text
//! COOLIFY_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `COOLIFY_PROVIDER|<protocol_version>|<address>`. Logs go to stderr.
//!
//! # Provider Configuration
//!
//! ```hcl
//! provider "coolify" {
//!   endpoint = "https://coolify.example.com"   # or COOLIFY_ENDPOINT
//!   token    = var.coolify_token               # or COOLIFY_TOKEN
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod datasources;
pub mod error;
pub mod filter;
pub mod flatten;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;
pub mod version;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use error::{ApiError, ProviderError};
pub use logging::{init_logging_with_default, try_init_logging};
pub use provider::CoolifyProvider;
pub use schema::ProviderSchema;
pub use server::{serve, serve_with_options, ProviderService, ServeOptions};
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata, HANDSHAKE_PREFIX, PROTOCOL_VERSION};
pub use validation::{is_valid, validate, validate_result};
