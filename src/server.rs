//! gRPC serving for the provider.
//!
//! [`ProviderService`] is the JSON-level interface the provider implements.
//! [`serve`] wraps it in the generated gRPC service, prints the handshake
//! line and runs until the host sends SIGINT or SIGTERM.
//!
//! # Signal Handling
//!
//! On a shutdown signal the server stops accepting connections and waits up
//! to [`ServeOptions::shutdown_timeout`] for in-flight requests. The
//! provider's `stop()` is called afterwards in every case.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tonic::transport::Server;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ProviderError;
use crate::generated as pb;
use crate::schema::{has_errors, BlockNestingMode, Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::types::{
    ImportedResource, PlanResult, ProviderMetadata, HANDSHAKE_PREFIX, PROTOCOL_VERSION,
    REATTACH_ENV,
};

/// Interface the gRPC layer drives.
///
/// Values are plain `serde_json::Value`s; encoding to protocol bytes and
/// converting errors to diagnostics happen in the gRPC wrapper.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources and data sources.
    fn schema(&self) -> ProviderSchema;

    /// Return the registered type names. Derived from the schema by default.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        ProviderMetadata {
            resources: schema.resources.into_keys().collect(),
            data_sources: schema.data_sources.into_keys().collect(),
            plan_destroy: true,
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(&self, _config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(vec![])
    }

    /// Configure the provider with credentials and settings.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        _resource_type: &str,
        _config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(vec![])
    }

    /// Upgrade resource state from an older schema version.
    async fn upgrade_resource_state(
        &self,
        _resource_type: &str,
        _version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        Ok(state)
    }

    /// Plan changes for a resource. `prior_state` is `None` on create.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource.
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError>;

    /// Refresh a resource. `Value::Null` means the remote object is gone.
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError>;

    /// Update an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;

    /// Adopt an existing remote object by id.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Unimplemented(format!(
            "import is not supported for {}",
            resource_type
        )))
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source's configuration.
    async fn validate_data_source_config(
        &self,
        _data_source_type: &str,
        _config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(vec![])
    }

    /// Read a data source.
    async fn read_data_source(&self, data_source_type: &str, _config: Value) -> Result<Value, ProviderError> {
        Err(ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

/// Empty payloads decode to `null`.
fn decode(bytes: &[u8]) -> Result<Value, ProviderError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(bytes)?)
}

fn encode(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<pb::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| pb::Diagnostic {
            severity: match d.severity {
                DiagnosticSeverity::Error => pb::diagnostic::Severity::Error as i32,
                DiagnosticSeverity::Warning => pb::diagnostic::Severity::Warning as i32,
            },
            summary: d.summary,
            detail: d.detail.unwrap_or_default(),
            attribute: d.attribute.unwrap_or_default(),
        })
        .collect()
}

fn error_to_diagnostics(err: &ProviderError) -> Vec<pb::Diagnostic> {
    diagnostics_to_proto(vec![err.to_diagnostic()])
}

/// Log the outcome of a validating RPC and convert its diagnostics.
fn finish_validation(
    rpc: &'static str,
    type_name: &str,
    result: Result<Vec<Diagnostic>, ProviderError>,
) -> Vec<pb::Diagnostic> {
    match result {
        Ok(diagnostics) => {
            if has_errors(&diagnostics) {
                warn!(rpc, type_name, diagnostics = diagnostics.len(), "completed with errors");
            } else {
                debug!(rpc, type_name, "completed");
            }
            diagnostics_to_proto(diagnostics)
        },
        Err(e) => {
            error!(rpc, type_name, error = %e, "failed");
            error_to_diagnostics(&e)
        },
    }
}

fn schema_to_proto(schema: &crate::schema::Schema) -> pb::Schema {
    pb::Schema {
        version: schema.version as i64,
        block: Some(block_to_proto(&schema.block)),
    }
}

fn block_to_proto(block: &crate::schema::Block) -> pb::Block {
    let attributes = block
        .attributes
        .iter()
        .map(|(name, attr)| pb::Attribute {
            name: name.clone(),
            r#type: serde_json::to_vec(&attr.attr_type).unwrap_or_default(),
            required: attr.flags.required,
            optional: attr.flags.optional,
            computed: attr.flags.computed,
            sensitive: attr.flags.sensitive,
            description: attr.description.clone().unwrap_or_default(),
            force_new: attr.force_new,
            default_value: attr.default.as_ref().map(encode).unwrap_or_default(),
        })
        .collect();

    let block_types = block
        .blocks
        .iter()
        .map(|(name, nested)| pb::NestedBlock {
            type_name: name.clone(),
            block: Some(block_to_proto(&nested.block)),
            nesting_mode: match nested.nesting_mode {
                BlockNestingMode::Single => pb::nested_block::NestingMode::Single as i32,
                BlockNestingMode::List => pb::nested_block::NestingMode::List as i32,
                BlockNestingMode::Set => pb::nested_block::NestingMode::Set as i32,
            },
            min_items: nested.min_items as i32,
            max_items: nested.max_items as i32,
        })
        .collect();

    pb::Block {
        attributes,
        block_types,
        description: block.description.clone().unwrap_or_default(),
    }
}

type Reply<T> = Result<tonic::Response<T>, tonic::Status>;

/// Split an adapter result into its value and the diagnostics to return.
fn settle<T>(
    rpc: &'static str,
    type_name: &str,
    result: Result<T, ProviderError>,
) -> (Option<T>, Vec<pb::Diagnostic>) {
    match result {
        Ok(value) => {
            debug!(rpc, type_name, "completed");
            (Some(value), Vec::new())
        },
        Err(e) => {
            error!(rpc, type_name, error = %e, "failed");
            (None, error_to_diagnostics(&e))
        },
    }
}

fn encode_state(state: Option<Value>) -> Vec<u8> {
    state.as_ref().map(encode).unwrap_or_default()
}

fn reply<T>(message: T) -> Reply<T> {
    Ok(tonic::Response::new(message))
}

/// The generated gRPC service backed by a [`ProviderService`].
///
/// Every failure becomes an error diagnostic in the response; the gRPC
/// status is always OK.
struct ProviderGrpcService<P: ProviderService> {
    provider: Arc<P>,
}

#[tonic::async_trait]
impl<P: ProviderService> pb::provider_server::Provider for ProviderGrpcService<P> {
    #[instrument(skip_all, name = "grpc.get_metadata")]
    async fn get_metadata(&self, _request: tonic::Request<pb::GetMetadataRequest>) -> Reply<pb::GetMetadataResponse> {
        let metadata = self.provider.metadata();
        reply(pb::GetMetadataResponse {
            server_capabilities: Some(pb::ServerCapabilities {
                plan_destroy: metadata.plan_destroy,
            }),
            resources: metadata.resources,
            data_sources: metadata.data_sources,
            diagnostics: Vec::new(),
        })
    }

    #[instrument(skip_all, name = "grpc.get_schema")]
    async fn get_schema(&self, _request: tonic::Request<pb::GetSchemaRequest>) -> Reply<pb::GetSchemaResponse> {
        let schema = self.provider.schema();
        let convert = |schemas: &std::collections::BTreeMap<String, crate::schema::Schema>| {
            schemas
                .iter()
                .map(|(name, schema)| (name.clone(), schema_to_proto(schema)))
                .collect()
        };
        reply(pb::GetSchemaResponse {
            provider: Some(schema_to_proto(&schema.provider)),
            resources: convert(&schema.resources),
            data_sources: convert(&schema.data_sources),
            diagnostics: Vec::new(),
        })
    }

    #[instrument(skip_all, name = "grpc.validate_provider_config")]
    async fn validate_provider_config(
        &self,
        request: tonic::Request<pb::ValidateProviderConfigRequest>,
    ) -> Reply<pb::ValidateProviderConfigResponse> {
        let req = request.into_inner();
        let result = async { self.provider.validate_provider_config(decode(&req.config)?).await }.await;
        reply(pb::ValidateProviderConfigResponse {
            diagnostics: finish_validation("ValidateProviderConfig", "provider", result),
        })
    }

    #[instrument(skip_all, name = "grpc.configure", fields(host_version = %request.get_ref().host_version))]
    async fn configure(&self, request: tonic::Request<pb::ConfigureRequest>) -> Reply<pb::ConfigureResponse> {
        let req = request.into_inner();
        let result = async { self.provider.configure(decode(&req.config)?).await }.await;
        reply(pb::ConfigureResponse {
            diagnostics: finish_validation("Configure", "provider", result),
        })
    }

    #[instrument(skip_all, name = "grpc.stop")]
    async fn stop(&self, _request: tonic::Request<pb::StopRequest>) -> Reply<pb::StopResponse> {
        info!("host requested stop");
        let error = match self.provider.stop().await {
            Ok(()) => String::new(),
            Err(e) => {
                error!(error = %e, "stop failed");
                e.to_string()
            },
        };
        reply(pb::StopResponse { error })
    }

    #[instrument(skip_all, name = "grpc.validate_resource_config", fields(resource_type = %request.get_ref().resource_type))]
    async fn validate_resource_config(
        &self,
        request: tonic::Request<pb::ValidateResourceConfigRequest>,
    ) -> Reply<pb::ValidateResourceConfigResponse> {
        let req = request.into_inner();
        let result = async {
            let config = decode(&req.config)?;
            self.provider.validate_resource_config(&req.resource_type, config).await
        }
        .await;
        reply(pb::ValidateResourceConfigResponse {
            diagnostics: finish_validation("ValidateResourceConfig", &req.resource_type, result),
        })
    }

    #[instrument(skip_all, name = "grpc.upgrade_resource_state", fields(resource_type = %request.get_ref().resource_type))]
    async fn upgrade_resource_state(
        &self,
        request: tonic::Request<pb::UpgradeResourceStateRequest>,
    ) -> Reply<pb::UpgradeResourceStateResponse> {
        let req = request.into_inner();
        let result = async {
            let state = decode(&req.raw_state)?;
            self.provider
                .upgrade_resource_state(&req.resource_type, req.version, state)
                .await
        }
        .await;
        let (state, diagnostics) = settle("UpgradeResourceState", &req.resource_type, result);
        reply(pb::UpgradeResourceStateResponse {
            upgraded_state: encode_state(state),
            diagnostics,
        })
    }

    #[instrument(skip_all, name = "grpc.plan", fields(resource_type = %request.get_ref().resource_type))]
    async fn plan(&self, request: tonic::Request<pb::PlanRequest>) -> Reply<pb::PlanResponse> {
        let req = request.into_inner();
        let result = async {
            let prior_state = Some(decode(&req.prior_state)?).filter(|prior| !prior.is_null());
            let proposed_state = decode(&req.proposed_state)?;
            let config = decode(&req.config)?;
            self.provider
                .plan(&req.resource_type, prior_state, proposed_state, config)
                .await
        }
        .await;

        let (plan, diagnostics) = settle("Plan", &req.resource_type, result);
        let Some(plan) = plan else {
            return reply(pb::PlanResponse {
                diagnostics,
                ..Default::default()
            });
        };
        info!(
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            destroy = plan.is_destroy(),
            "planned"
        );
        reply(pb::PlanResponse {
            planned_state: encode(&plan.planned_state),
            changes: plan.changes.into_iter().map(Into::into).collect(),
            requires_replace: plan.requires_replace,
            diagnostics,
        })
    }

    #[instrument(skip_all, name = "grpc.create", fields(resource_type = %request.get_ref().resource_type))]
    async fn create(&self, request: tonic::Request<pb::CreateRequest>) -> Reply<pb::CreateResponse> {
        let req = request.into_inner();
        let result = async { self.provider.create(&req.resource_type, decode(&req.planned_state)?).await }.await;
        let (state, diagnostics) = settle("Create", &req.resource_type, result);
        reply(pb::CreateResponse {
            state: encode_state(state),
            diagnostics,
        })
    }

    #[instrument(skip_all, name = "grpc.read", fields(resource_type = %request.get_ref().resource_type))]
    async fn read(&self, request: tonic::Request<pb::ReadRequest>) -> Reply<pb::ReadResponse> {
        let req = request.into_inner();
        let result = async { self.provider.read(&req.resource_type, decode(&req.current_state)?).await }.await;
        let (state, diagnostics) = settle("Read", &req.resource_type, result);
        if state.as_ref().is_some_and(Value::is_null) {
            info!("remote object is gone");
        }
        reply(pb::ReadResponse {
            state: encode_state(state),
            diagnostics,
        })
    }

    #[instrument(skip_all, name = "grpc.update", fields(resource_type = %request.get_ref().resource_type))]
    async fn update(&self, request: tonic::Request<pb::UpdateRequest>) -> Reply<pb::UpdateResponse> {
        let req = request.into_inner();
        let result = async {
            let prior_state = decode(&req.prior_state)?;
            let planned_state = decode(&req.planned_state)?;
            self.provider
                .update(&req.resource_type, prior_state, planned_state)
                .await
        }
        .await;
        let (state, diagnostics) = settle("Update", &req.resource_type, result);
        reply(pb::UpdateResponse {
            state: encode_state(state),
            diagnostics,
        })
    }

    #[instrument(skip_all, name = "grpc.delete", fields(resource_type = %request.get_ref().resource_type))]
    async fn delete(&self, request: tonic::Request<pb::DeleteRequest>) -> Reply<pb::DeleteResponse> {
        let req = request.into_inner();
        let result = async { self.provider.delete(&req.resource_type, decode(&req.current_state)?).await }.await;
        let (_, diagnostics) = settle("Delete", &req.resource_type, result);
        reply(pb::DeleteResponse { diagnostics })
    }

    #[instrument(
        skip_all,
        name = "grpc.import_resource_state",
        fields(resource_type = %request.get_ref().resource_type, id = %request.get_ref().id)
    )]
    async fn import_resource_state(
        &self,
        request: tonic::Request<pb::ImportResourceStateRequest>,
    ) -> Reply<pb::ImportResourceStateResponse> {
        let req = request.into_inner();
        let result = self.provider.import_resource(&req.resource_type, &req.id).await;
        let (imported, diagnostics) = settle("ImportResourceState", &req.resource_type, result);
        let imported = imported
            .unwrap_or_default()
            .into_iter()
            .map(|r| pb::ImportedResource {
                resource_type: r.resource_type,
                state: encode(&r.state),
            })
            .collect();
        reply(pb::ImportResourceStateResponse { imported, diagnostics })
    }

    #[instrument(
        skip_all,
        name = "grpc.validate_data_source_config",
        fields(data_source_type = %request.get_ref().data_source_type)
    )]
    async fn validate_data_source_config(
        &self,
        request: tonic::Request<pb::ValidateDataSourceConfigRequest>,
    ) -> Reply<pb::ValidateDataSourceConfigResponse> {
        let req = request.into_inner();
        let result = async {
            let config = decode(&req.config)?;
            self.provider
                .validate_data_source_config(&req.data_source_type, config)
                .await
        }
        .await;
        reply(pb::ValidateDataSourceConfigResponse {
            diagnostics: finish_validation("ValidateDataSourceConfig", &req.data_source_type, result),
        })
    }

    #[instrument(skip_all, name = "grpc.read_data_source", fields(data_source_type = %request.get_ref().data_source_type))]
    async fn read_data_source(
        &self,
        request: tonic::Request<pb::ReadDataSourceRequest>,
    ) -> Reply<pb::ReadDataSourceResponse> {
        let req = request.into_inner();
        let result = async {
            let config = decode(&req.config)?;
            self.provider.read_data_source(&req.data_source_type, config).await
        }
        .await;
        let (state, diagnostics) = settle("ReadDataSource", &req.data_source_type, result);
        reply(pb::ReadDataSourceResponse {
            state: encode_state(state),
            diagnostics,
        })
    }
}

/// Options for running the provider server.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// How long to wait for in-flight requests after a shutdown signal.
    /// Default: 30 seconds.
    pub shutdown_timeout: Duration,
    /// Address to bind. `None` picks an ephemeral port on 127.0.0.1.
    pub address: Option<SocketAddr>,
    /// Debug mode: also print a reattach hint to stderr so the host can
    /// connect to a provider started by hand (e.g. under a debugger).
    pub debug: bool,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
            address: None,
            debug: false,
        }
    }
}

impl ServeOptions {
    /// Create new serve options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Bind to a fixed address.
    pub fn with_address(mut self, address: SocketAddr) -> Self {
        self.address = Some(address);
        self
    }

    /// Enable or disable debug mode.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// The line printed on stdout once the server is listening.
pub fn handshake_line(addr: SocketAddr) -> String {
    format!("{}|{}|{}", HANDSHAKE_PREFIX, PROTOCOL_VERSION, addr)
}

/// Wait for SIGTERM or SIGINT (CTRL+C on Windows).
///
/// If the handlers cannot be installed the future never completes and the
/// server runs until the host kills it.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let handlers = signal(SignalKind::terminate())
            .and_then(|term| signal(SignalKind::interrupt()).map(|int| (term, int)));
        let (mut sigterm, mut sigint) = match handlers {
            Ok(handlers) => handlers,
            Err(e) => {
                error!(error = %e, "Failed to install signal handlers");
                return std::future::pending::<()>().await;
            },
        };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
            _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        }
    }

    #[cfg(windows)]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install CTRL+C handler");
            return std::future::pending::<()>().await;
        }
        info!("Received CTRL+C, initiating graceful shutdown");
    }

    #[cfg(not(any(unix, windows)))]
    {
        std::future::pending::<()>().await;
    }
}

/// Serve a provider with default options.
///
/// Binds an ephemeral port on 127.0.0.1, prints the handshake
/// `COOLIFY_PROVIDER|<version>|<address>` to stdout and runs until a shutdown
/// signal arrives.
pub async fn serve<P: ProviderService>(provider: P) -> Result<(), Box<dyn std::error::Error>> {
    serve_with_options(provider, ServeOptions::default()).await
}

/// Serve a provider with custom options. See [`serve`].
pub async fn serve_with_options<P: ProviderService>(
    provider: P,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let bind = options
        .address
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 0)));
    let listener = TcpListener::bind(bind).await?;
    serve_on_listener(provider, listener, options, wait_for_shutdown_signal()).await
}

/// Serve on an already-bound listener until `shutdown` completes.
pub async fn serve_on_listener<P, F>(
    provider: P,
    listener: TcpListener,
    options: ServeOptions,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    P: ProviderService,
    F: Future<Output = ()>,
{
    let addr = listener.local_addr()?;
    println!("{}", handshake_line(addr));
    if options.debug {
        eprintln!("Provider started in debug mode. To attach, set in the host's environment:");
        eprintln!();
        eprintln!("\t{}='{}'", REATTACH_ENV, handshake_line(addr));
        eprintln!();
    }
    info!(address = %addr, debug = options.debug, "Provider server starting");

    let provider = Arc::new(provider);
    let service = pb::provider_server::ProviderServer::new(ProviderGrpcService {
        provider: Arc::clone(&provider),
    });

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(
        Server::builder()
            .add_service(service)
            .serve_with_incoming_shutdown(
                tokio_stream::wrappers::TcpListenerStream::new(listener),
                async {
                    stop_rx.await.ok();
                },
            ),
    );

    tokio::select! {
        result = &mut server => {
            // The server exited before any signal.
            result??;
        }
        _ = shutdown => {
            let _ = stop_tx.send(());
            // Only the drain is bounded by the timeout.
            match tokio::time::timeout(options.shutdown_timeout, &mut server).await {
                Ok(Ok(Ok(()))) => info!("Server shutdown complete"),
                Ok(Ok(Err(e))) => error!(error = %e, "Server error during shutdown"),
                Ok(Err(e)) => error!(error = %e, "Server task failed during shutdown"),
                Err(_) => {
                    warn!(timeout = ?options.shutdown_timeout, "Shutdown timeout exceeded, forcing shutdown");
                    server.abort();
                },
            }
        }
    }

    debug!("Calling provider stop()");
    if let Err(e) = provider.stop().await {
        warn!(error = %e, "Provider stop() returned error");
    }

    info!("Provider shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generated::provider_server::Provider;
    use crate::schema::{Attribute, Block, NestedBlock, Schema};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct EchoProvider {
        stopped: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl ProviderService for EchoProvider {
        fn schema(&self) -> ProviderSchema {
            ProviderSchema::new()
                .with_resource("coolify_project", Schema::v0().with_attribute("name", Attribute::required_string()))
                .with_data_source("coolify_teams", Schema::v0())
        }

        async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
            if config.get("token").is_none() {
                return Ok(vec![Diagnostic::error("Missing API token").with_attribute("token")]);
            }
            Ok(vec![])
        }

        async fn stop(&self) -> Result<(), ProviderError> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn plan(
            &self,
            _resource_type: &str,
            prior_state: Option<Value>,
            proposed_state: Value,
            _config: Value,
        ) -> Result<PlanResult, ProviderError> {
            Ok(PlanResult::with_changes(proposed_state, vec![], prior_state.is_some()))
        }

        async fn create(&self, _resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
            Ok(planned_state)
        }

        async fn read(&self, _resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
            if current_state["uuid"] == "gone" {
                return Ok(Value::Null);
            }
            Ok(current_state)
        }

        async fn update(&self, _resource_type: &str, _prior: Value, planned: Value) -> Result<Value, ProviderError> {
            Ok(planned)
        }

        async fn delete(&self, _resource_type: &str, _current: Value) -> Result<(), ProviderError> {
            Err(ProviderError::unexpected_status(
                "delete project",
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                "boom",
            ))
        }
    }

    fn service() -> ProviderGrpcService<EchoProvider> {
        ProviderGrpcService {
            provider: Arc::new(EchoProvider::default()),
        }
    }

    #[test]
    fn test_generated_module_matches_proto() {
        let proto = include_str!("../proto/provider.proto");
        let generated = include_str!("generated.rs");
        let rpcs: Vec<&str> = proto
            .lines()
            .filter_map(|line| line.trim().strip_prefix("rpc "))
            .filter_map(|rest| rest.split('(').next())
            .collect();

        assert_eq!(rpcs.len(), 15);
        for rpc in rpcs {
            let route = format!("\"/{}/{}\"", pb::provider_server::SERVICE_NAME, rpc);
            assert!(generated.contains(&route), "no route for {}", rpc);
        }
        assert_eq!(pb::provider_server::SERVICE_NAME, "coolify.provider.v1.Provider");
    }

    #[test]
    fn test_wire_round_trip() {
        use prost::Message;

        let diagnostic = pb::Diagnostic {
            severity: pb::diagnostic::Severity::Warning as i32,
            summary: "Unparseable platform version".to_string(),
            ..Default::default()
        };
        let decoded = pb::Diagnostic::decode(diagnostic.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, diagnostic);
        assert_eq!(decoded.severity(), pb::diagnostic::Severity::Warning);
    }

    #[test]
    fn test_decode_empty_is_null() {
        assert_eq!(decode(b"").unwrap(), Value::Null);
        assert_eq!(decode(b"{\"a\":1}").unwrap(), json!({"a": 1}));
        assert!(matches!(decode(b"{oops"), Err(ProviderError::Serialization(_))));
    }

    #[test]
    fn test_block_to_proto_is_sorted() {
        let block = Block::new()
            .with_attribute("uuid", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_block("filter", NestedBlock::list(Block::new()));
        let proto = block_to_proto(&block);
        let names: Vec<_> = proto.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["name", "uuid"]);
        assert!(proto.attributes[0].force_new);
        assert_eq!(
            proto.block_types[0].nesting_mode,
            pb::nested_block::NestingMode::List as i32
        );
    }

    #[test]
    fn test_handshake_line() {
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        assert_eq!(handshake_line(addr), "COOLIFY_PROVIDER|1|127.0.0.1:4000");
    }

    #[tokio::test]
    async fn test_configure_diagnostics_reach_the_wire() {
        let response = service()
            .configure(tonic::Request::new(pb::ConfigureRequest {
                config: b"{}".to_vec(),
                host_version: "1.9.0".to_string(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].attribute, "token");
        assert_eq!(
            response.diagnostics[0].severity,
            pb::diagnostic::Severity::Error as i32
        );
    }

    #[tokio::test]
    async fn test_errors_become_diagnostics() {
        let response = service()
            .delete(tonic::Request::new(pb::DeleteRequest {
                resource_type: "coolify_project".to_string(),
                current_state: b"{\"uuid\":\"p1\"}".to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Unexpected HTTP status code");
        assert!(response.diagnostics[0].detail.contains("boom"));
    }

    #[tokio::test]
    async fn test_malformed_state_becomes_diagnostic() {
        let response = service()
            .create(tonic::Request::new(pb::CreateRequest {
                resource_type: "coolify_project".to_string(),
                planned_state: b"not json".to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.state.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn test_read_gone_is_json_null() {
        let response = service()
            .read(tonic::Request::new(pb::ReadRequest {
                resource_type: "coolify_project".to_string(),
                current_state: b"{\"uuid\":\"gone\"}".to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.state, b"null".to_vec());
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_plan_without_prior_state() {
        let response = service()
            .plan(tonic::Request::new(pb::PlanRequest {
                resource_type: "coolify_project".to_string(),
                prior_state: vec![],
                proposed_state: b"{\"name\":\"p\"}".to_vec(),
                config: b"{\"name\":\"p\"}".to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(!response.requires_replace);
        assert_eq!(decode(&response.planned_state).unwrap(), json!({"name": "p"}));
    }

    #[tokio::test]
    async fn test_metadata_is_sorted() {
        let response = service()
            .get_metadata(tonic::Request::new(pb::GetMetadataRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.resources, vec!["coolify_project"]);
        assert_eq!(response.data_sources, vec!["coolify_teams"]);
        assert!(response.server_capabilities.unwrap().plan_destroy);
    }

    #[tokio::test]
    async fn test_import_default_is_unimplemented() {
        let response = service()
            .import_resource_state(tonic::Request::new(pb::ImportResourceStateRequest {
                resource_type: "coolify_project".to_string(),
                id: "p1".to_string(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.imported.is_empty());
        assert!(response.diagnostics[0].summary.contains("import is not supported"));
    }

    #[tokio::test]
    async fn test_data_source_default_is_unknown() {
        let response = service()
            .read_data_source(tonic::Request::new(pb::ReadDataSourceRequest {
                data_source_type: "coolify_teams".to_string(),
                config: b"{}".to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.state.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].severity, pb::diagnostic::Severity::Error as i32);
    }

    #[tokio::test]
    async fn test_shutdown_calls_stop() {
        let provider = EchoProvider::default();
        let stopped = Arc::clone(&provider.stopped);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        tx.send(()).unwrap();

        let serving = serve_on_listener(
            provider,
            listener,
            ServeOptions::new().with_shutdown_timeout(Duration::from_secs(2)),
            async {
                rx.await.ok();
            },
        );
        let result = tokio::time::timeout(Duration::from_secs(5), serving)
            .await
            .unwrap();
        assert!(result.is_ok());
        assert!(stopped.load(Ordering::SeqCst));
    }
}
