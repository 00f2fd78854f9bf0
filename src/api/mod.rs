//! Platform REST API: client and JSON models.

pub mod client;
pub mod models;

pub use client::{ApiResponse, CoolifyClient, EnvParent};
