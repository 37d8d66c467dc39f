//! Configuration validation.

use std::collections::HashSet;

use super::{Config, ConverterPolicy};
use crate::error::{ConvertError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Flatten validation
    if config.flatten.separator.is_empty() {
        return Err(ConvertError::Config(
            "flatten.separator must not be empty".into(),
        ));
    }

    // SQL validation - only check if explicitly set
    if let Some(0) = config.sql.row_limit {
        return Err(ConvertError::Config(
            "sql.row_limit must be at least 1 (omit it for no limit)".into(),
        ));
    }

    let mut seen = HashSet::new();
    for conv in &config.sql.string_converters {
        if conv.name.is_empty() {
            return Err(ConvertError::Config(
                "sql.string_converters[].name is required".into(),
            ));
        }
        if conv.input_type_name.is_empty() {
            return Err(ConvertError::Config(format!(
                "sql.string_converters '{}': input_type_name is required",
                conv.name
            )));
        }
        if !seen.insert(conv.input_type_name.as_str())
            && config.sql.converter_policy == ConverterPolicy::Reject
        {
            return Err(ConvertError::Config(format!(
                "sql.string_converters: input type '{}' is configured more than once",
                conv.input_type_name
            )));
        }
    }

    Ok(())
}
