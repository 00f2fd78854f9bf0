//! Configuration validation against a [`Schema`].
//!
//! Run by `ValidateProviderConfig`, `ValidateResourceConfig` and
//! `ValidateDataSourceConfig` before anything talks to the platform API.
//!
//! # Example
//!
//! ```
//! use terraform_provider_coolify::schema::{Attribute, Schema, Validator};
//! use terraform_provider_coolify::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute(
//!         "proxy_type",
//!         Attribute::optional_string().with_validator(Validator::one_of(&["traefik", "caddy", "none"])),
//!     );
//!
//! assert!(validate(&schema, &json!({"name": "edge-1", "proxy_type": "caddy"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "edge-1", "proxy_type": "nginx"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("proxy_type".to_string()));
//! ```

use serde_json::{Map, Value};

use crate::flatten::whole_i64;
use crate::schema::{Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, NestedBlock, Schema, Validator};

/// Check `config` against `schema`. No diagnostics means it is valid.
///
/// Unknown keys, missing required attributes, configured computed attributes,
/// wrong value types, failing validators and block counts outside
/// `min_items..=max_items` are each reported once at their dotted path.
/// Validators only run on values of the right type.
pub fn validate(schema: &Schema, config: &Value) -> Vec<Diagnostic> {
    let mut checker = Checker::default();
    checker.block(&schema.block, config, "");
    checker.diagnostics
}

/// [`validate`] as a `Result`.
pub fn validate_result(schema: &Schema, config: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, config);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Whether `config` passes [`validate`].
pub fn is_valid(schema: &Schema, config: &Value) -> bool {
    validate(schema, config).is_empty()
}

#[derive(Default)]
struct Checker {
    diagnostics: Vec<Diagnostic>,
}

impl Checker {
    fn report(&mut self, path: &str, summary: String, detail: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::error(summary).with_detail(detail).with_attribute(path));
    }

    fn block(&mut self, block: &Block, value: &Value, path: &str) {
        let fields = match value {
            Value::Null => return,
            Value::Object(fields) => fields,
            other => {
                self.report(path, "Expected object".to_string(), format!("Got {}", kind(other)));
                return;
            },
        };

        for key in fields.keys() {
            if !block.attributes.contains_key(key) && !block.blocks.contains_key(key) {
                let at = join(path, key);
                self.report(
                    &at,
                    format!("Unsupported argument '{}'", at),
                    "An argument with this name is not expected here",
                );
            }
        }
        for (name, attr) in &block.attributes {
            self.attribute(attr, fields.get(name), &join(path, name));
        }
        for (name, nested) in &block.blocks {
            self.nested(nested, fields.get(name), &join(path, name));
        }
    }

    fn attribute(&mut self, attr: &Attribute, value: Option<&Value>, path: &str) {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            if attr.flags.required {
                self.report(
                    path,
                    format!("Missing required attribute '{}'", path),
                    "This attribute is required and must be provided",
                );
            }
            return;
        };

        if !attr.flags.is_configurable() {
            self.report(
                path,
                format!("Invalid configuration for '{}'", path),
                "This attribute is computed by the provider and cannot be set",
            );
            return;
        }

        let before = self.diagnostics.len();
        self.value(&attr.attr_type, value, path);
        if self.diagnostics.len() > before {
            return;
        }
        for validator in &attr.validators {
            if let Some(detail) = violation(validator, value) {
                let summary = match validator {
                    Validator::LengthAtLeast(_) => format!("Invalid length for '{}'", path),
                    _ => format!("Invalid value for '{}'", path),
                };
                self.report(path, summary, detail);
            }
        }
    }

    fn value(&mut self, expected: &AttributeType, value: &Value, path: &str) {
        let matches = match (expected, value) {
            (AttributeType::String, Value::String(_)) | (AttributeType::Bool, Value::Bool(_)) => true,
            (AttributeType::Int64, v) => is_int64(v),
            (AttributeType::List(element), Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    self.value(element, item, &format!("{}.{}", path, i));
                }
                true
            },
            (AttributeType::Object(types), Value::Object(fields)) => {
                self.object(types.iter(), fields, path);
                true
            },
            _ => false,
        };
        if !matches {
            self.report(
                path,
                format!("Invalid type for attribute '{}'", path),
                format!("Expected {}, got {}", expected.label(), kind(value)),
            );
        }
    }

    fn object<'a>(
        &mut self,
        types: impl Iterator<Item = (&'a String, &'a AttributeType)>,
        fields: &Map<String, Value>,
        path: &str,
    ) {
        for (name, ty) in types {
            if let Some(value) = fields.get(name).filter(|v| !v.is_null()) {
                self.value(ty, value, &join(path, name));
            }
        }
    }

    fn nested(&mut self, nested: &NestedBlock, value: Option<&Value>, path: &str) {
        let value = value.filter(|v| !v.is_null());
        match (nested.nesting_mode, value) {
            (BlockNestingMode::Single, None) => self.count(nested, 0, path),
            (BlockNestingMode::Single, Some(v)) => self.block(&nested.block, v, path),
            (_, None) => self.count(nested, 0, path),
            (_, Some(Value::Array(items))) => {
                self.count(nested, items.len(), path);
                for (i, item) in items.iter().enumerate() {
                    self.block(&nested.block, item, &format!("{}.{}", path, i));
                }
            },
            (_, Some(other)) => self.report(
                path,
                format!("Expected list for block '{}'", path),
                format!("Got {}", kind(other)),
            ),
        }
    }

    fn count(&mut self, nested: &NestedBlock, len: usize, path: &str) {
        let min = nested.min_items as usize;
        let max = nested.max_items as usize;
        if len < min {
            self.report(
                path,
                format!("Block '{}' requires at least {} item(s), got {}", path, min, len),
                "Add the missing blocks",
            );
        }
        if max > 0 && len > max {
            self.report(
                path,
                format!("Block '{}' allows at most {} item(s), got {}", path, max, len),
                "Remove the extra blocks",
            );
        }
    }
}

/// What is wrong with `value`, if anything.
fn violation(validator: &Validator, value: &Value) -> Option<String> {
    match validator {
        Validator::OneOf(allowed) => {
            let s = value.as_str()?;
            if allowed.iter().any(|a| a == s) {
                return None;
            }
            let quoted: Vec<_> = allowed.iter().map(|a| format!("\"{}\"", a)).collect();
            Some(format!("Value must be one of: {}, got: \"{}\"", quoted.join(", "), s))
        },
        Validator::LengthAtLeast(min) => {
            let len = match value {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                _ => return None,
            };
            (len < *min).then(|| format!("Length must be at least {}, got: {}", min, len))
        },
        Validator::Between(min, max) => {
            let n = value.as_i64()?;
            (!(*min..=*max).contains(&n))
                .then(|| format!("Value must be between {} and {}, got: {}", min, max, n))
        },
    }
}

fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// HCL numbers may arrive as `42.0`.
fn is_int64(value: &Value) -> bool {
    whole_i64(value).is_some()
}
