//! Filtering for plural data sources.
//!
//! ```hcl
//! data "coolify_servers" "edge" {
//!   filter {
//!     name   = "proxy_type"
//!     values = ["traefik", "caddy"]
//!   }
//!   filter {
//!     name   = "port"
//!     values = ["22"]
//!   }
//! }
//! ```
//!
//! An item is kept when every `filter` block matches; a block matches when
//! the attribute equals any of its values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Validator};

/// Name of the filter block on plural data sources.
pub const FILTER_BLOCK: &str = "filter";

/// One configured `filter` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Attribute to match on.
    pub name: String,
    /// Accepted values.
    pub values: Vec<String>,
}

/// Schema of the `filter` block for a data source filterable on `attributes`.
pub fn filter_block(attributes: &[&str]) -> NestedBlock {
    NestedBlock::list(
        Block::new()
            .with_description("Keep only items whose attribute matches one of the values.")
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Attribute to filter on.")
                    .with_validator(Validator::one_of(attributes)),
            )
            .with_attribute(
                "values",
                Attribute::new(AttributeType::list(AttributeType::String), AttributeFlags::REQUIRED)
                    .with_description("Values to match. Any value matching is enough.")
                    .with_validator(Validator::LengthAtLeast(1)),
            ),
    )
}

/// Read the filter blocks from a data source configuration.
pub fn decode_filters(config: &Value) -> Result<Vec<Filter>, ProviderError> {
    match config.get(FILTER_BLOCK) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(filters) => Ok(serde_json::from_value(filters.clone())?),
    }
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Whether `item` (a flattened state object) passes every filter.
pub fn one_pass_filter(item: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| {
        item.get(&filter.name)
            .and_then(render)
            .map_or(false, |actual| filter.values.iter().any(|v| *v == actual))
    })
}

/// Keep the items passing every filter.
pub fn apply_filters(items: Vec<Value>, filters: &[Filter]) -> Vec<Value> {
    items
        .into_iter()
        .filter(|item| one_pass_filter(item, filters))
        .collect()
}
