//! Logging setup.
//!
//! All logs are written to **stderr**; stdout carries only the handshake line.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log filter (e.g. `info`, `terraform_provider_coolify=debug`)
//!
//! ```bash
//! RUST_LOG=terraform_provider_coolify::api=trace ./terraform-provider-coolify
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn filter_or(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Initialize logging with the level used when `RUST_LOG` is unset.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(filter_or(default_level))
        .with(stderr_layer())
        .init();
}

/// Try to initialize logging, returning false if a subscriber is already set.
pub fn try_init_logging(default_level: &str) -> bool {
    tracing_subscriber::registry()
        .with(filter_or(default_level))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("terraform_provider_coolify=debug").is_ok());
        assert!(EnvFilter::try_new("warn,terraform_provider_coolify::api=trace").is_ok());
    }

    #[test]
    fn test_try_init_is_idempotent() {
        let first = try_init_logging("debug");
        // A second global subscriber can never be installed in the same process.
        assert!(!try_init_logging("debug"));
        let _ = first;
    }
}
