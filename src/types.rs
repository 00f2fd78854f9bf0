//! Values passed between [`crate::server::ProviderService`] and the gRPC
//! layer, plus the handshake constants.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::generated as pb;

/// Protocol version printed in the handshake line.
pub const PROTOCOL_VERSION: u32 = 1;

/// First field of the handshake line, e.g. `COOLIFY_PROVIDER|1|127.0.0.1:50051`.
pub const HANDSHAKE_PREFIX: &str = "COOLIFY_PROVIDER";

/// Environment variable the host reads to attach to a provider started in
/// debug mode.
pub const REATTACH_ENV: &str = "COOLIFY_PROVIDER_REATTACH";

/// One attribute that differs between prior state and plan.
///
/// `before` is `None` for an attribute being set for the first time and
/// `after` is `None` for one being cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Top-level attribute or block name.
    pub path: String,
    /// Prior value.
    pub before: Option<Value>,
    /// Planned value.
    pub after: Option<Value>,
}

impl AttributeChange {
    /// `path` goes from unset to `value`.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: None,
            after: Some(value),
        }
    }

    /// `path` goes from `value` to unset.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(value),
            after: None,
        }
    }

    /// `path` goes from `before` to `after`.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(before),
            after: Some(after),
        }
    }
}

impl From<AttributeChange> for pb::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        let side = |value: Option<Value>| {
            value
                .and_then(|v| serde_json::to_vec(&v).ok())
                .unwrap_or_default()
        };
        Self {
            path: change.path,
            before: side(change.before),
            after: side(change.after),
        }
    }
}

/// Outcome of planning one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// State the apply step receives; `null` for a destroy.
    pub planned_state: Value,
    /// Differences from prior state, sorted by path.
    pub changes: Vec<AttributeChange>,
    /// Whether a `force_new` attribute changed.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Nothing to do; `state` is planned as is.
    pub fn no_change(state: Value) -> Self {
        Self::with_changes(state, Vec::new(), false)
    }

    /// A plan with `changes`.
    pub fn with_changes(planned_state: Value, changes: Vec<AttributeChange>, requires_replace: bool) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }

    /// Whether this plan deletes the remote object.
    pub fn is_destroy(&self) -> bool {
        self.planned_state.is_null()
    }
}

/// State adopted by `ImportResourceState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// Resource type, e.g. `coolify_project`.
    pub resource_type: String,
    /// Full state, as a read would return it.
    pub state: Value,
}

impl ImportedResource {
    /// State for `resource_type`.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// What `GetMetadata` reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Resource type names in name order.
    pub resources: Vec<String>,
    /// Data source type names in name order.
    pub data_sources: Vec<String>,
    /// Whether `Plan` accepts a null proposed state.
    pub plan_destroy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_change_to_proto() {
        let added: pb::AttributeChange = AttributeChange::added("ip", json!("10.0.0.5")).into();
        assert!(added.before.is_empty());
        assert_eq!(added.after, b"\"10.0.0.5\"".to_vec());

        let port: pb::AttributeChange = AttributeChange::modified("port", json!(22), json!(2222)).into();
        assert_eq!((port.before, port.after), (b"22".to_vec(), b"2222".to_vec()));

        let cleared: pb::AttributeChange = AttributeChange::removed("description", json!("old")).into();
        assert!(cleared.after.is_empty());
    }

    #[test]
    fn test_destroy_plan() {
        assert!(!PlanResult::no_change(json!({"uuid": "abc"})).is_destroy());
        let destroy = PlanResult::with_changes(
            Value::Null,
            vec![AttributeChange::removed("name", json!("infra"))],
            false,
        );
        assert!(destroy.is_destroy());
    }
}
