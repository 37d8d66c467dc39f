//! Converters adapting driver-reported column types to column element types.
//!
//! A [`Converter`] names the driver type it applies to, the [`ScanType`] raw
//! values are scanned into, the [`FieldType`] of the resulting column, and a
//! function from the scanned value to a column [`Value`]. A
//! [`ConverterRegistry`] holds converters in precedence order: the first one
//! whose matcher accepts a column's type name is used.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveTime, TimeZone, Utc};
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, warn};

use crate::config::{ConverterPolicy, SqlConfig, StringConverterConfig};
use crate::core::registry::Representable;
use crate::core::value::{ElementType, FieldType, Value};
use crate::error::{BoxError, ConvertError, Result};

use super::scan::{parse_text, ScanType, ScanValue};

/// Conversion function. Receives `None` for SQL NULL.
pub type ConvertFn =
    Arc<dyn Fn(Option<ScanValue>) -> std::result::Result<Value, BoxError> + Send + Sync>;

/// How a converter selects the columns it applies to.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Exact, case-sensitive type name.
    Name(String),
    /// Regular expression over the type name.
    Pattern(Regex),
}

impl Matcher {
    /// Exact name matcher.
    pub fn name(name: impl Into<String>) -> Self {
        Matcher::Name(name.into())
    }

    /// Regex matcher.
    pub fn pattern(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Matcher::Pattern)
            .map_err(|e| ConvertError::Config(format!("invalid type pattern '{}': {}", pattern, e)))
    }

    /// Check if the driver type name matches.
    pub fn matches(&self, type_name: &str) -> bool {
        match self {
            Matcher::Name(name) => name == type_name,
            Matcher::Pattern(re) => re.is_match(type_name),
        }
    }

    /// Name or pattern text.
    pub fn as_str(&self) -> &str {
        match self {
            Matcher::Name(name) => name,
            Matcher::Pattern(re) => re.as_str(),
        }
    }

    /// Whether `self` can never be reached because `earlier` is consulted first.
    fn shadowed_by(&self, earlier: &Matcher) -> bool {
        match (self, earlier) {
            (Matcher::Name(name), _) => earlier.matches(name),
            (Matcher::Pattern(a), Matcher::Pattern(b)) => a.as_str() == b.as_str(),
            (Matcher::Pattern(_), Matcher::Name(_)) => false,
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Name(name) => f.write_str(name),
            Matcher::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// A named conversion from a driver type to a column type.
#[derive(Clone)]
pub struct Converter {
    name: String,
    matcher: Matcher,
    input: ScanType,
    target: FieldType,
    convert: ConvertFn,
}

impl Converter {
    /// Create a converter from a conversion function.
    pub fn new<F>(
        name: impl Into<String>,
        matcher: Matcher,
        input: ScanType,
        target: FieldType,
        convert: F,
    ) -> Self
    where
        F: Fn(Option<ScanValue>) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            matcher,
            input,
            target,
            convert: Arc::new(convert),
        }
    }

    /// Identity converter for a representable scan type.
    ///
    /// Returns `None` when the scan type has no element type.
    pub fn identity(type_name: &str, scan_type: ScanType, nullable: bool) -> Option<Self> {
        let element = scan_type.element_type()?;
        Some(Self::new(
            format!("default {}", scan_type),
            Matcher::name(type_name),
            scan_type,
            FieldType { element, nullable },
            move |v: Option<ScanValue>| match v {
                None | Some(ScanValue::Null) => Ok(Value::Null(element)),
                Some(v) => {
                    let shown = v.to_string();
                    v.into_value()
                        .ok_or_else(|| format!("'{}' has no {} representation", shown, element).into())
                }
            },
        ))
    }

    /// Parse the text form of a column into `target`.
    pub fn parse_text(name: impl Into<String>, matcher: Matcher, target: FieldType) -> Self {
        Self::parse_text_with_nulls(name, matcher, target, Vec::new())
    }

    /// Parse the text form of a column, mapping any of `null_values` to NULL.
    pub fn parse_text_with_nulls(
        name: impl Into<String>,
        matcher: Matcher,
        target: FieldType,
        null_values: Vec<String>,
    ) -> Self {
        let element = target.element;
        Self::new(name, matcher, ScanType::Text, target, move |v: Option<ScanValue>| {
            let text = match v {
                Some(ScanValue::Text(text)) => text,
                None | Some(ScanValue::Null) => return Ok(Value::Null(element)),
                Some(other) => other.to_string(),
            };
            if null_values.iter().any(|n| *n == text) {
                return Ok(Value::Null(element));
            }
            let scanned = parse_text(&text, scan_type_of(element))?;
            scanned
                .into_value()
                .ok_or_else(|| format!("'{}' has no {} representation", text, element).into())
        })
    }

    /// Build a text-parsing converter from configuration.
    pub fn from_config(config: &StringConverterConfig) -> Self {
        Self::parse_text_with_nulls(
            config.name.clone(),
            Matcher::name(config.input_type_name.clone()),
            FieldType {
                element: config.target,
                nullable: config.nullable,
            },
            config.null_values.clone(),
        )
    }

    /// Decimal columns as nullable `f64`.
    pub fn decimal_to_f64(matcher: Matcher) -> Self {
        Self::new(
            "decimal to float64",
            matcher,
            ScanType::Decimal,
            FieldType::nullable(ElementType::Float64),
            |v: Option<ScanValue>| match v {
                None | Some(ScanValue::Null) => Ok(Value::Null(ElementType::Float64)),
                Some(ScanValue::Decimal(d)) => d
                    .to_f64()
                    .map(Value::Float64)
                    .ok_or_else(|| format!("decimal {} out of range for float64", d).into()),
                Some(other) => Err(unexpected(&other, ScanType::Decimal)),
            },
        )
    }

    /// Timestamp-without-time-zone columns as nullable timestamps, read as UTC.
    pub fn naive_datetime_to_timestamp(matcher: Matcher) -> Self {
        Self::new(
            "datetime to timestamp",
            matcher,
            ScanType::DateTime,
            FieldType::nullable(ElementType::Timestamp),
            |v: Option<ScanValue>| match v {
                None | Some(ScanValue::Null) => Ok(Value::Null(ElementType::Timestamp)),
                Some(ScanValue::DateTime(dt)) => Ok(Value::Timestamp(Utc.from_utc_datetime(&dt))),
                Some(other) => Err(unexpected(&other, ScanType::DateTime)),
            },
        )
    }

    /// Date columns as nullable timestamps at midnight UTC.
    pub fn date_to_timestamp(matcher: Matcher) -> Self {
        Self::new(
            "date to timestamp",
            matcher,
            ScanType::Date,
            FieldType::nullable(ElementType::Timestamp),
            |v: Option<ScanValue>| match v {
                None | Some(ScanValue::Null) => Ok(Value::Null(ElementType::Timestamp)),
                Some(ScanValue::Date(d)) => Ok(Value::Timestamp(
                    Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)),
                )),
                Some(other) => Err(unexpected(&other, ScanType::Date)),
            },
        )
    }

    /// Any scan type as a nullable string (uuid, json, utf-8 bytes, ...).
    pub fn to_text(matcher: Matcher, input: ScanType) -> Self {
        Self::new(
            format!("{} to string", input),
            matcher,
            input,
            FieldType::nullable(ElementType::String),
            |v: Option<ScanValue>| match v {
                None | Some(ScanValue::Null) => Ok(Value::Null(ElementType::String)),
                Some(v) => match v.scan_as(ScanType::Text)? {
                    ScanValue::Text(s) => Ok(Value::String(s)),
                    other => Err(unexpected(&other, ScanType::Text)),
                },
            },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Scan type raw values are scanned into before conversion.
    pub fn input(&self) -> ScanType {
        self.input
    }

    /// Field type of the resulting column.
    pub fn target(&self) -> FieldType {
        self.target
    }

    /// Run the conversion function.
    pub fn apply(&self, value: Option<ScanValue>) -> std::result::Result<Value, BoxError> {
        (self.convert)(value)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("name", &self.name)
            .field("matcher", &self.matcher)
            .field("input", &self.input)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

fn unexpected(value: &ScanValue, expected: ScanType) -> BoxError {
    let actual = value
        .scan_type()
        .map(|t| t.as_str())
        .unwrap_or("null");
    format!("expected {} input, got {}", expected, actual).into()
}

/// Scan type whose values convert directly into `element`.
fn scan_type_of(element: ElementType) -> ScanType {
    match element {
        ElementType::Int8 => ScanType::I8,
        ElementType::Int16 => ScanType::I16,
        ElementType::Int32 => ScanType::I32,
        ElementType::Int64 => ScanType::I64,
        ElementType::UInt8 => ScanType::U8,
        ElementType::UInt16 => ScanType::U16,
        ElementType::UInt32 => ScanType::U32,
        ElementType::UInt64 => ScanType::U64,
        ElementType::Float32 => ScanType::F32,
        ElementType::Float64 => ScanType::F64,
        ElementType::String => ScanType::Text,
        ElementType::Bool => ScanType::Bool,
        ElementType::Timestamp => ScanType::Timestamp,
    }
}

/// Ordered list of converters. The first matching entry wins.
#[derive(Debug, Clone, Default)]
pub struct ConverterRegistry {
    entries: Vec<Converter>,
    policy: ConverterPolicy,
}

impl ConverterRegistry {
    /// Create an empty registry.
    pub fn new(policy: ConverterPolicy) -> Self {
        Self {
            entries: Vec::new(),
            policy,
        }
    }

    /// Create a registry holding the configured string converters.
    pub fn from_config(config: &SqlConfig) -> Result<Self> {
        let mut registry = Self::new(config.converter_policy);
        for conv in &config.string_converters {
            registry.register(Converter::from_config(conv))?;
        }
        Ok(registry)
    }

    /// Append a converter at the lowest precedence.
    ///
    /// A converter that can never match because an earlier entry covers its
    /// type name is logged and kept under [`ConverterPolicy::FirstWins`], and
    /// rejected under [`ConverterPolicy::Reject`].
    pub fn register(&mut self, converter: Converter) -> Result<()> {
        if let Some(earlier) = self
            .entries
            .iter()
            .find(|e| converter.matcher.shadowed_by(&e.matcher))
        {
            match self.policy {
                ConverterPolicy::FirstWins => warn!(
                    "Converter '{}' for {} is shadowed by earlier converter '{}'",
                    converter.name, converter.matcher, earlier.name
                ),
                ConverterPolicy::Reject => {
                    return Err(ConvertError::DuplicateConverter(
                        converter.matcher.as_str().to_string(),
                    ))
                }
            }
        }
        debug!(
            "Registered converter '{}' for {} ({} -> {})",
            converter.name, converter.matcher, converter.input, converter.target
        );
        self.entries.push(converter);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, converter: Converter) -> Result<Self> {
        self.register(converter)?;
        Ok(self)
    }

    /// First converter matching `type_name`.
    pub fn lookup(&self, type_name: &str) -> Option<&Converter> {
        self.entries.iter().find(|c| c.matcher.matches(type_name))
    }

    pub fn policy(&self) -> ConverterPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Converter> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn numeric_string() -> Converter {
        Converter::parse_text(
            "numeric strings",
            Matcher::name("NUMERIC_STRING"),
            FieldType::nullable(ElementType::Float64),
        )
    }

    #[test]
    fn test_matcher() {
        assert!(Matcher::name("INT").matches("INT"));
        assert!(!Matcher::name("INT").matches("int"));

        let m = Matcher::pattern("^(?i)varchar").unwrap();
        assert!(m.matches("VARCHAR(20)"));
        assert!(!m.matches("NVARCHAR"));

        assert!(Matcher::pattern("(").is_err());
    }

    #[test]
    fn test_parse_text() {
        let conv = numeric_string();
        assert_eq!(conv.input(), ScanType::Text);
        assert_eq!(
            conv.apply(Some(ScanValue::Text("2.5".into()))).unwrap(),
            Value::Float64(2.5)
        );
        assert_eq!(conv.apply(None).unwrap(), Value::Null(ElementType::Float64));
        assert!(conv.apply(Some(ScanValue::Text("x".into()))).is_err());
    }

    #[test]
    fn test_null_values() {
        let conv = Converter::from_config(&StringConverterConfig {
            name: "counts".into(),
            input_type_name: "COUNT_TEXT".into(),
            target: ElementType::Int64,
            nullable: true,
            null_values: vec!["NULL".into(), "".into()],
        });

        assert_eq!(
            conv.apply(Some(ScanValue::Text("NULL".into()))).unwrap(),
            Value::Null(ElementType::Int64)
        );
        assert_eq!(
            conv.apply(Some(ScanValue::Text("".into()))).unwrap(),
            Value::Null(ElementType::Int64)
        );
        assert_eq!(
            conv.apply(Some(ScanValue::Text("12".into()))).unwrap(),
            Value::Int64(12)
        );
    }

    #[test]
    fn test_identity() {
        let conv = Converter::identity("INT", ScanType::I32, true).unwrap();
        assert_eq!(conv.target(), FieldType::nullable(ElementType::Int32));
        assert_eq!(conv.apply(Some(ScanValue::I32(3))).unwrap(), Value::Int32(3));
        assert_eq!(conv.apply(None).unwrap(), Value::Null(ElementType::Int32));

        assert!(Converter::identity("MONEY", ScanType::Decimal, true).is_none());
    }

    #[test]
    fn test_builtin_converters() {
        let conv = Converter::decimal_to_f64(Matcher::name("numeric"));
        assert_eq!(
            conv.apply(Some(ScanValue::Decimal(Decimal::new(125, 2)))).unwrap(),
            Value::Float64(1.25)
        );

        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let conv = Converter::date_to_timestamp(Matcher::name("date"));
        assert_eq!(
            conv.apply(Some(ScanValue::Date(date))).unwrap(),
            Value::Timestamp(Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap())
        );

        let conv = Converter::naive_datetime_to_timestamp(Matcher::name("timestamp"));
        let dt = date.and_hms_opt(12, 30, 0).unwrap();
        assert_eq!(
            conv.apply(Some(ScanValue::DateTime(dt))).unwrap(),
            Value::Timestamp(Utc.with_ymd_and_hms(2024, 2, 29, 12, 30, 0).unwrap())
        );
        assert!(conv.apply(Some(ScanValue::I32(1))).is_err());

        let conv = Converter::to_text(Matcher::name("uuid"), ScanType::Uuid);
        assert_eq!(
            conv.apply(Some(ScanValue::Uuid(uuid::Uuid::nil()))).unwrap(),
            Value::from("00000000-0000-0000-0000-000000000000")
        );
    }

    #[test]
    fn test_first_match_wins() {
        let registry = ConverterRegistry::default()
            .with(numeric_string())
            .unwrap()
            .with(Converter::parse_text(
                "as int",
                Matcher::pattern("^NUMERIC").unwrap(),
                FieldType::nullable(ElementType::Int64),
            ))
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("NUMERIC_STRING").unwrap().name(), "numeric strings");
        assert_eq!(registry.lookup("NUMERIC").unwrap().name(), "as int");
        assert!(registry.lookup("TEXT").is_none());
    }

    #[test]
    fn test_shadowed_converter_first_wins() {
        let mut registry = ConverterRegistry::new(ConverterPolicy::FirstWins);
        registry.register(numeric_string()).unwrap();
        registry
            .register(Converter::parse_text(
                "later",
                Matcher::name("NUMERIC_STRING"),
                FieldType::nullable(ElementType::Int64),
            ))
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("NUMERIC_STRING").unwrap().name(), "numeric strings");
    }

    #[test]
    fn test_shadowed_converter_reject() {
        let mut registry = ConverterRegistry::new(ConverterPolicy::Reject);
        registry
            .register(Converter::to_text(Matcher::pattern("^json").unwrap(), ScanType::Json))
            .unwrap();

        let err = registry
            .register(Converter::to_text(Matcher::name("jsonb"), ScanType::Json))
            .unwrap_err();
        assert!(matches!(err, ConvertError::DuplicateConverter(name) if name == "jsonb"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_from_config() {
        let config = SqlConfig {
            string_converters: vec![StringConverterConfig {
                name: "numbers".into(),
                input_type_name: "NUMERIC_STRING".into(),
                target: ElementType::Float64,
                nullable: false,
                null_values: vec![],
            }],
            ..Default::default()
        };
        let registry = ConverterRegistry::from_config(&config).unwrap();
        let conv = registry.lookup("NUMERIC_STRING").unwrap();
        assert_eq!(conv.target(), FieldType::required(ElementType::Float64));
    }
}
