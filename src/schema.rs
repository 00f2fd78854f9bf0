//! Attribute and block descriptions for the provider, resource and data
//! source schemas.
//!
//! Every adapter publishes a [`Schema`]. The host decodes configuration with
//! it; the provider uses it for [`crate::validation`] and [`crate::plan`].
//! Attributes and blocks are kept in name order so the schema sent over the
//! wire is stable.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// Text, including UUIDs, URLs and compose files.
    String,
    /// Whole number such as a port or an ID.
    Int64,
    /// Flag.
    Bool,
    /// Ordered list of one element type.
    List(Box<AttributeType>),
    /// Object with fixed field names, e.g. server `settings`.
    Object(BTreeMap<String, AttributeType>),
}

impl AttributeType {
    /// `list(element)`.
    pub fn list(element: AttributeType) -> Self {
        Self::List(Box::new(element))
    }

    /// An object type from `(field, type)` pairs.
    pub fn object(fields: &[(&str, AttributeType)]) -> Self {
        Self::Object(
            fields
                .iter()
                .map(|(name, ty)| ((*name).to_string(), ty.clone()))
                .collect(),
        )
    }

    /// `list(object)`, the shape of every plural data source output.
    pub fn list_of_objects(fields: &[(&str, AttributeType)]) -> Self {
        Self::list(Self::object(fields))
    }

    /// Name used in type error diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int64 => "int64",
            Self::Bool => "bool",
            Self::List(_) => "list",
            Self::Object(_) => "object",
        }
    }
}

/// Who sets an attribute: the configuration, the provider, or either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// Must be configured.
    pub required: bool,
    /// May be configured.
    pub optional: bool,
    /// Filled in from the platform API.
    pub computed: bool,
    /// Never shown in plans or logs.
    pub sensitive: bool,
}

impl AttributeFlags {
    /// Must be configured.
    pub const REQUIRED: Self = Self::new(true, false, false);
    /// May be configured; stays null otherwise.
    pub const OPTIONAL: Self = Self::new(false, true, false);
    /// Read back from the platform only.
    pub const COMPUTED: Self = Self::new(false, false, true);
    /// May be configured; the platform picks a value otherwise.
    pub const OPTIONAL_COMPUTED: Self = Self::new(false, true, true);

    const fn new(required: bool, optional: bool, computed: bool) -> Self {
        Self {
            required,
            optional,
            computed,
            sensitive: false,
        }
    }

    /// Whether configuration may set the attribute.
    pub fn is_configurable(&self) -> bool {
        self.required || self.optional
    }
}

/// A check run on a configured value once its type is known to be right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    /// String must be one of these, e.g. a proxy type.
    OneOf(Vec<String>),
    /// String length or list length lower bound.
    LengthAtLeast(usize),
    /// Inclusive integer range, e.g. a TCP port.
    Between(i64, i64),
}

impl Validator {
    /// [`Validator::OneOf`] from string slices.
    pub fn one_of(values: &[&str]) -> Self {
        Self::OneOf(values.iter().map(|v| (*v).to_string()).collect())
    }
}

/// One attribute of a schema or block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Value type.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Presence flags.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Documentation shown by the host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// A change replaces the remote object instead of updating it.
    #[serde(default)]
    pub force_new: bool,
    /// Value planned when the configuration leaves the attribute unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Plan the prior state value instead of an unknown one.
    #[serde(default)]
    pub use_state_for_unknown: bool,
    /// Checks on configured values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
}

impl Attribute {
    /// An attribute with no description, default or validators.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            default: None,
            use_state_for_unknown: false,
            validators: Vec::new(),
        }
    }

    /// Required string.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::REQUIRED)
    }

    /// Optional string.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::OPTIONAL)
    }

    /// Computed string.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::COMPUTED)
    }

    /// Optional string the platform fills in when unset.
    pub fn optional_computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::OPTIONAL_COMPUTED)
    }

    /// Required integer.
    pub fn required_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::REQUIRED)
    }

    /// Optional integer.
    pub fn optional_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::OPTIONAL)
    }

    /// Computed integer.
    pub fn computed_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::COMPUTED)
    }

    /// Optional integer the platform fills in when unset.
    pub fn optional_computed_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::OPTIONAL_COMPUTED)
    }

    /// Optional flag.
    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::OPTIONAL)
    }

    /// Computed flag.
    pub fn computed_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::COMPUTED)
    }

    /// Optional flag the platform fills in when unset.
    pub fn optional_computed_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::OPTIONAL_COMPUTED)
    }

    /// A computed attribute of any type, e.g. a list of environments.
    pub fn computed(attr_type: AttributeType) -> Self {
        Self::new(attr_type, AttributeFlags::COMPUTED)
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Changing the value replaces the remote object.
    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Planned value when unset.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Carry the prior value through plans; for identifiers that never change.
    pub fn with_state_for_unknown(mut self) -> Self {
        self.use_state_for_unknown = true;
        self
    }

    /// Add a check.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Hide the value in plans and logs.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }
}

/// How often a nested block may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockNestingMode {
    /// At most once.
    #[default]
    Single,
    /// Any number of times; order matters (`filter`).
    List,
    /// Any number of times; order is ignored (`env`).
    Set,
}

/// Attributes and nested blocks at one level of configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Attributes by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Attribute>,
    /// Nested blocks by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub blocks: BTreeMap<String, NestedBlock>,
    /// Documentation shown by the host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Block {
    /// Empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Add a nested block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A [`Block`] used inside another one, with its repetition rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedBlock {
    /// Contents.
    #[serde(flatten)]
    pub block: Block,
    /// Repetition.
    #[serde(default)]
    pub nesting_mode: BlockNestingMode,
    /// Fewest occurrences allowed.
    #[serde(default)]
    pub min_items: u32,
    /// Most occurrences allowed; 0 means no limit.
    #[serde(default)]
    pub max_items: u32,
    /// A change to the contents replaces the remote object.
    #[serde(default)]
    pub force_new: bool,
}

impl NestedBlock {
    fn repeated(block: Block, nesting_mode: BlockNestingMode) -> Self {
        Self {
            block,
            nesting_mode,
            min_items: 0,
            max_items: 0,
            force_new: false,
        }
    }

    /// Ordered, repeatable block.
    pub fn list(block: Block) -> Self {
        Self::repeated(block, BlockNestingMode::List)
    }

    /// Unordered, repeatable block; compared as a multiset when planning.
    pub fn set(block: Block) -> Self {
        Self::repeated(block, BlockNestingMode::Set)
    }

    /// Require at least `min` occurrences.
    pub fn with_min_items(mut self, min: u32) -> Self {
        self.min_items = min;
        self
    }

    /// Allow at most `max` occurrences.
    pub fn with_max_items(mut self, max: u32) -> Self {
        self.max_items = max;
        self
    }
}

/// Schema of the provider block, a resource or a data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// State version; bumped when stored state needs upgrading.
    #[serde(default)]
    pub version: u64,
    /// Root block.
    #[serde(flatten)]
    pub block: Block,
}

impl Schema {
    /// An empty schema at `version`.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            block: Block::new(),
        }
    }

    /// An empty schema at version 0. Every schema here is still at 0.
    pub fn v0() -> Self {
        Self::new(0)
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.block.description = Some(description.into());
        self
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attr);
        self
    }

    /// Add a nested block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.block.blocks.insert(name.into(), block);
        self
    }

    /// A top-level attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.get(name)
    }
}

/// Everything `GetSchema` returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// The `provider "coolify"` block.
    #[serde(default)]
    pub provider: Schema,
    /// Resource schemas by type name.
    #[serde(default)]
    pub resources: BTreeMap<String, Schema>,
    /// Data source schemas by type name.
    #[serde(default)]
    pub data_sources: BTreeMap<String, Schema>,
}

impl ProviderSchema {
    /// Empty schema set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider block schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Register a resource schema.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    /// Register a data source schema.
    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }
}

/// Whether a diagnostic stops the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// The operation failed.
    Error,
    /// The operation went ahead.
    Warning,
}

/// A message for the user, optionally pointing at an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Error or warning.
    pub severity: DiagnosticSeverity,
    /// One line, e.g. `Missing API token`.
    pub summary: String,
    /// Longer explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Dotted attribute path, e.g. `filter.0.name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    fn with_severity(severity: DiagnosticSeverity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Error, summary)
    }

    /// Warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Warning, summary)
    }

    /// Add a longer explanation.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Point at `attribute`; an empty path means the whole object.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        self.attribute = (!attribute.is_empty()).then_some(attribute);
        self
    }

    /// Whether this is an error.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        if let Some(attribute) = &self.attribute {
            write!(f, " (at {})", attribute)?;
        }
        Ok(())
    }
}

/// Whether any of `diagnostics` is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_object_type() {
        let settings = AttributeType::object(&[
            ("wildcard_domain", AttributeType::String),
            ("concurrent_builds", AttributeType::Int64),
        ]);
        let AttributeType::Object(fields) = &settings else {
            panic!("expected object, got {:?}", settings);
        };
        let names: Vec<_> = fields.keys().map(String::as_str).collect();
        assert_eq!(names, ["concurrent_builds", "wildcard_domain"]);
        assert_eq!(settings.label(), "object");
        assert_eq!(AttributeType::list_of_objects(&[]).label(), "list");
    }

    #[test]
    fn test_flags() {
        assert!(AttributeFlags::OPTIONAL_COMPUTED.is_configurable());
        assert!(AttributeFlags::REQUIRED.is_configurable());
        assert!(!AttributeFlags::COMPUTED.is_configurable());
        assert!(Attribute::required_string().sensitive().flags.sensitive);
    }

    #[test]
    fn test_server_port_attribute() {
        let port = Attribute::optional_computed_int64()
            .with_description("SSH port of the server.")
            .with_default(json!(22))
            .with_validator(Validator::Between(1, 65535));

        assert_eq!(port.attr_type, AttributeType::Int64);
        assert!(port.flags.optional && port.flags.computed);
        assert_eq!(port.default, Some(json!(22)));
        assert_eq!(port.validators, vec![Validator::Between(1, 65535)]);

        assert!(Attribute::computed_string().with_state_for_unknown().use_state_for_unknown);
        assert!(Attribute::required_string().with_force_new().force_new);
    }

    #[test]
    fn test_schema_serializes_in_name_order() {
        let schema = Schema::v0()
            .with_attribute("uuid", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string());

        let encoded = serde_json::to_value(&schema).unwrap();
        let names: Vec<_> = encoded["attributes"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(names, ["description", "name", "uuid"]);
        assert!(schema.attribute("missing").is_none());
    }

    #[test]
    fn test_env_block() {
        let env = NestedBlock::set(Block::new().with_attribute("key", Attribute::required_string()))
            .with_min_items(1);
        assert_eq!(env.nesting_mode, BlockNestingMode::Set);
        assert_eq!((env.min_items, env.max_items), (1, 0));
        assert_eq!(NestedBlock::list(Block::new()).nesting_mode, BlockNestingMode::List);
    }

    #[test]
    fn test_diagnostic_display() {
        let err = Diagnostic::error("Missing API token")
            .with_detail("Set COOLIFY_TOKEN.")
            .with_attribute("token");
        assert_eq!(err.to_string(), "Missing API token: Set COOLIFY_TOKEN. (at token)");
        assert!(has_errors(&[Diagnostic::warning("old"), err]));
        assert!(!has_errors(&[Diagnostic::warning("old")]));
        assert_eq!(Diagnostic::error("Expected object").with_attribute("").attribute, None);
    }
}
