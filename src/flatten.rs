//! Conversions between state JSON and model structs.
//!
//! State objects are the serde encoding of the adapter's model struct, so
//! `None` fields become `null`. API responses are flattened into the model,
//! then the model is encoded back into state.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ProviderError;

/// Decode a config, plan or state object into a model struct.
pub fn decode_model<T: DeserializeOwned>(value: &Value) -> Result<T, ProviderError> {
    if value.is_null() {
        return Err(ProviderError::InvalidRequest("expected an object, got null".to_string()));
    }
    Ok(serde_json::from_value(value.clone())?)
}

/// Encode a model struct as a state object.
pub fn encode_model<T: Serialize>(model: &T) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(model)?)
}

/// Read a string attribute; `null` and absent are `None`.
pub fn opt_string(state: &Value, name: &str) -> Option<String> {
    state.get(name).and_then(Value::as_str).map(str::to_string)
}

/// Read an integer attribute.
///
/// Whole floats such as `3.0` count as integers.
pub fn opt_i64(state: &Value, name: &str) -> Option<i64> {
    state.get(name).and_then(whole_i64)
}

/// An integer, or a float with no fractional part inside the `i64` range.
pub fn whole_i64(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Read a boolean attribute.
pub fn opt_bool(state: &Value, name: &str) -> Option<bool> {
    state.get(name).and_then(Value::as_bool)
}

/// Read the `uuid` attribute every resource is keyed by.
pub fn require_uuid(state: &Value) -> Result<String, ProviderError> {
    opt_string(state, "uuid")
        .filter(|uuid| !uuid.is_empty())
        .ok_or_else(|| ProviderError::InvalidRequest("state has no uuid".to_string()))
}

/// The platform answers `""` for optional text it never received. Keep such
/// attributes `null` when the configuration left them unset.
pub fn empty_as_null(api: Option<String>, configured: Option<&str>) -> Option<String> {
    match (api, configured) {
        (Some(value), None) if value.is_empty() => None,
        (api, _) => api,
    }
}

/// Encode a serialisable API object as a state object, dropping keys that are
/// not part of `keep`.
pub fn project_fields<T: Serialize>(value: &T, keep: &[&str]) -> Result<Value, ProviderError> {
    let encoded = serde_json::to_value(value)?;
    let mut out = Map::new();
    for name in keep {
        out.insert(
            (*name).to_string(),
            encoded.get(*name).cloned().unwrap_or(Value::Null),
        );
    }
    Ok(Value::Object(out))
}
