//! Configuration type definitions.

use serde::{Deserialize, Serialize};

use crate::core::value::ElementType;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Record flattening behavior.
    #[serde(default)]
    pub flatten: FlattenConfig,

    /// SQL result set conversion behavior.
    #[serde(default)]
    pub sql: SqlConfig,
}

/// Record flattening configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlattenConfig {
    /// Separator between nested field names (default: ".").
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Sort column names when any map was flattened (default: true).
    #[serde(default = "default_true")]
    pub sort_when_map_seen: bool,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            sort_when_map_seen: true,
        }
    }
}

/// SQL result set conversion configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqlConfig {
    /// Name given to tables built from rows (default: empty).
    #[serde(default)]
    pub table_name: String,

    /// Maximum rows to read. Unlimited if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_limit: Option<usize>,

    /// What to do when two converters share a source type name.
    #[serde(default)]
    pub converter_policy: ConverterPolicy,

    /// Declarative converters that parse text input.
    #[serde(default)]
    pub string_converters: Vec<StringConverterConfig>,
}

/// Precedence rule for converters registered under the same source type name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConverterPolicy {
    /// The earliest registration is used; later ones are logged and ignored.
    #[default]
    FirstWins,
    /// A second registration for the same name is an error.
    Reject,
}

/// A converter that parses the text form of a column into `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringConverterConfig {
    /// Converter name, used in logs.
    pub name: String,

    /// Driver-reported type name to match (case-sensitive).
    pub input_type_name: String,

    /// Element type the text is parsed into.
    pub target: ElementType,

    /// Whether the resulting column is nullable (default: true).
    #[serde(default = "default_true")]
    pub nullable: bool,

    /// Text values treated as NULL (e.g. "NULL", "").
    #[serde(default)]
    pub null_values: Vec<String>,
}

fn default_separator() -> String {
    ".".to_string()
}

fn default_true() -> bool {
    true
}
