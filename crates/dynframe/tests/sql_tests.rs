//! Integration tests for SQL result set conversion.

use std::fmt::Write as FmtWrite;
use std::sync::{Arc, Mutex};

use dynframe::sql::rows;
use dynframe::{
    from_rows, from_rows_with, ColumnMeta, Config, ConvertError, Converter, ConverterPolicy,
    ConverterRegistry, ElementType, FieldType, FromRowsOptions, Matcher, ScanType, ScanValue,
    Severity, Value,
};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Layer that records formatted events for assertions.
#[derive(Clone, Default)]
struct CaptureLayer {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl CaptureLayer {
    fn messages(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events
            .lock()
            .unwrap()
            .push((*event.metadata().level(), visitor.0));
    }
}

struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.0, "{:?}", value);
        }
    }
}

fn numeric_strings() -> ConverterRegistry {
    ConverterRegistry::default()
        .with(Converter::parse_text(
            "numeric strings",
            Matcher::name("NUMERIC_STRING"),
            FieldType::nullable(ElementType::Float64),
        ))
        .unwrap()
}

#[test]
fn test_duplicate_column_names_fail() {
    let columns = vec![
        ColumnMeta::new("x", "INT", ScanType::I32),
        ColumnMeta::new("x", "INT", ScanType::I32),
    ];
    let mut cursor = rows(vec![vec![ScanValue::I32(1), ScanValue::I32(2)]]);

    let err = from_rows(&columns, &mut cursor, &ConverterRegistry::default()).unwrap_err();
    assert!(matches!(err, ConvertError::DuplicateColumnName(name) if name == "x"));
}

#[test]
fn test_unsupported_column_is_dropped_with_warning() {
    let columns = vec![
        ColumnMeta::new("id", "BIGINT", ScanType::I64),
        ColumnMeta::new("shape", "GEOMETRY", ScanType::Bytes),
        ColumnMeta::new("label", "VARCHAR", ScanType::Text),
    ];
    let mut cursor = rows(vec![
        vec![
            ScanValue::I64(1),
            ScanValue::Bytes(vec![1, 2, 3]),
            ScanValue::Text("a".into()),
        ],
        vec![ScanValue::I64(2), ScanValue::Null, ScanValue::Null],
    ]);

    let capture = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let table = tracing::subscriber::with_default(subscriber, || {
        from_rows(&columns, &mut cursor, &ConverterRegistry::default())
    })
    .unwrap();

    assert_eq!(table.column_names(), vec!["id", "label"]);
    assert_eq!(table.row_count(), 2);
    assert!(table.is_rectangular());
    assert_eq!(
        table.column("label").unwrap().values(),
        vec![Value::from("a"), Value::Null(ElementType::String)]
    );

    let warnings = capture.messages(Level::WARN);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("Dropping column shape"));
    assert!(warnings[0].contains("GEOMETRY"));

    let info = capture.messages(Level::INFO);
    assert!(info.iter().any(|m| m.contains("Converted 2 rows")));
}

#[test]
fn test_each_dropped_column_is_logged() {
    let columns = vec![
        ColumnMeta::new("shape", "GEOMETRY", ScanType::Bytes).with_nullable(false),
        ColumnMeta::new("id", "BIGINT", ScanType::I64),
        ColumnMeta::new("raw", "OPAQUE", ScanType::Bytes),
    ];
    let mut cursor = rows(vec![vec![
        ScanValue::Bytes(vec![9]),
        ScanValue::I64(1),
        ScanValue::Null,
    ]]);

    let capture = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let table = tracing::subscriber::with_default(subscriber, || {
        from_rows(&columns, &mut cursor, &ConverterRegistry::default())
    })
    .unwrap();

    assert_eq!(table.column_names(), vec!["id"]);
    let warnings = capture.messages(Level::WARN);
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].contains("Dropping column shape of type GEOMETRY"));
    assert!(warnings[1].contains("Dropping column raw of type OPAQUE"));
}

#[test]
fn test_numeric_string_converter() {
    let columns = vec![ColumnMeta::new("amount", "NUMERIC_STRING", ScanType::Text)];
    let mut cursor = rows(vec![
        vec![ScanValue::Text("1.5".into())],
        vec![ScanValue::Text("-2".into())],
        vec![ScanValue::Null],
    ]);

    let table = from_rows(&columns, &mut cursor, &numeric_strings()).unwrap();
    let amount = table.column("amount").unwrap();

    assert_eq!(amount.element_type(), ElementType::Float64);
    assert_eq!(
        amount.values(),
        vec![
            Value::Float64(1.5),
            Value::Float64(-2.0),
            Value::Null(ElementType::Float64)
        ]
    );
}

#[test]
fn test_row_conversion_failure_returns_no_table() {
    let columns = vec![ColumnMeta::new("amount", "NUMERIC_STRING", ScanType::Text)];
    let mut cursor = rows(vec![
        vec![ScanValue::Text("1".into())],
        vec![ScanValue::Text("n/a".into())],
    ]);

    let err = from_rows(&columns, &mut cursor, &numeric_strings()).unwrap_err();
    match err {
        ConvertError::RowConversion { row, column, .. } => {
            assert_eq!(row, 1);
            assert_eq!(column, "amount");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_default_converter_coerces_scan_type() {
    // Reported as INT but the driver hands over wider values.
    let columns = vec![ColumnMeta::new("n", "INT", ScanType::I32).with_nullable(false)];
    let mut cursor = rows(vec![vec![ScanValue::I64(7)], vec![ScanValue::I16(8)]]);

    let table = from_rows(&columns, &mut cursor, &ConverterRegistry::default()).unwrap();
    let n = table.column("n").unwrap();
    assert!(!n.is_nullable());
    assert_eq!(n.values(), vec![Value::Int32(7), Value::Int32(8)]);
}

#[test]
fn test_config_driven_conversion() {
    let yaml = r#"
sql:
  table_name: metrics
  row_limit: 2
  string_converters:
    - name: counts
      input_type_name: COUNT_TEXT
      target: int64
      null_values: ["NULL"]
"#;
    let config = Config::from_yaml(yaml).unwrap();
    let registry = ConverterRegistry::from_config(&config.sql).unwrap();
    let options = FromRowsOptions::from_config(&config.sql);

    let columns = vec![ColumnMeta::new("count", "COUNT_TEXT", ScanType::Text)];
    let mut cursor = rows(vec![
        vec![ScanValue::Text("NULL".into())],
        vec![ScanValue::Text("4".into())],
        vec![ScanValue::Text("5".into())],
    ]);

    let table = from_rows_with(&columns, &mut cursor, &registry, &options).unwrap();

    assert_eq!(table.name(), "metrics");
    assert_eq!(
        table.column("count").unwrap().values(),
        vec![Value::Null(ElementType::Int64), Value::Int64(4)]
    );
    assert_eq!(table.notices().len(), 1);
    assert_eq!(table.notices()[0].severity, Severity::Warning);
    assert!(table.notices()[0].text.contains("limited to 2"));
}

#[test]
fn test_reject_policy_on_shadowed_converter() {
    let mut registry = ConverterRegistry::new(ConverterPolicy::Reject);
    registry
        .register(Converter::decimal_to_f64(Matcher::name("NUMERIC")))
        .unwrap();

    let err = registry
        .register(Converter::to_text(Matcher::name("NUMERIC"), ScanType::Decimal))
        .unwrap_err();
    assert!(matches!(err, ConvertError::DuplicateConverter(_)));
}

#[test]
fn test_empty_result_set() {
    let columns = vec![ColumnMeta::new("id", "INT", ScanType::I32)];
    let mut cursor = rows(Vec::<Vec<ScanValue>>::new());

    let table = from_rows(&columns, &mut cursor, &ConverterRegistry::default()).unwrap();
    assert_eq!(table.column_names(), vec!["id"]);
    assert_eq!(table.row_count(), 0);
}
