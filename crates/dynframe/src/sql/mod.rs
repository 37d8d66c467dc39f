//! SQL result sets to columnar tables.
//!
//! [`from_rows`] reads a result set through a [`RowCursor`], driven by the
//! column metadata the driver reports:
//!
//! 1. A [`ScanPlan`] is built from the metadata and the [`ConverterRegistry`]
//!    (duplicate names fail, unrepresentable columns are dropped)
//! 2. Rows are read in cursor order and appended through the plan
//! 3. An optional row limit truncates the result and attaches a notice
//!
//! # Example
//!
//! ```rust
//! use dynframe::sql::{from_rows, rows, ColumnMeta, ConverterRegistry, ScanType, ScanValue};
//!
//! let columns = vec![ColumnMeta::new("id", "INT", ScanType::I64)];
//! let mut cursor = rows(vec![vec![ScanValue::I64(1)], vec![ScanValue::I64(2)]]);
//! let table = from_rows(&columns, &mut cursor, &ConverterRegistry::default()).unwrap();
//! assert_eq!(table.row_count(), 2);
//! ```

pub mod converter;
pub mod plan;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod scan;

use tracing::{info, warn};

use crate::config::SqlConfig;
use crate::core::table::{Notice, Table};
use crate::error::{BoxError, ConvertError, Result};

pub use converter::{ConvertFn, Converter, ConverterRegistry, Matcher};
pub use plan::{ScanPlan, SlotKind};
#[cfg(feature = "postgres")]
pub use postgres::PgRows;
pub use scan::{ColumnMeta, ScanType, ScanValue};

/// Source of raw rows, read strictly in order.
pub trait RowCursor {
    /// Next row, or `None` when the result set is exhausted.
    fn next_row(&mut self) -> std::result::Result<Option<Vec<ScanValue>>, BoxError>;
}

/// [`RowCursor`] over an in-memory iterator of rows.
#[derive(Debug, Clone)]
pub struct IterCursor<I> {
    rows: I,
}

impl<I> IterCursor<I> {
    pub fn new(rows: I) -> Self {
        Self { rows }
    }
}

impl<I: Iterator<Item = Vec<ScanValue>>> RowCursor for IterCursor<I> {
    fn next_row(&mut self) -> std::result::Result<Option<Vec<ScanValue>>, BoxError> {
        Ok(self.rows.next())
    }
}

/// Cursor over in-memory rows.
pub fn rows<I: IntoIterator<Item = Vec<ScanValue>>>(rows: I) -> IterCursor<I::IntoIter> {
    IterCursor::new(rows.into_iter())
}

/// Upper bound on rows preallocated per column when a row limit is set.
const MAX_PREALLOCATED_ROWS: usize = 1024;

/// Options for [`from_rows_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FromRowsOptions {
    /// Name of the resulting table.
    pub table_name: String,

    /// Maximum rows to read. Unlimited if not set.
    pub row_limit: Option<usize>,
}

impl FromRowsOptions {
    pub fn from_config(config: &SqlConfig) -> Self {
        Self {
            table_name: config.table_name.clone(),
            row_limit: config.row_limit,
        }
    }
}

/// Text of the notice attached to a table truncated at `limit` rows.
pub fn row_limit_notice(limit: usize) -> String {
    format!(
        "Results have been limited to {} because the SQL row limit was reached",
        limit
    )
}

/// Read every row from `cursor` into an unnamed table.
pub fn from_rows<C: RowCursor + ?Sized>(
    columns: &[ColumnMeta],
    cursor: &mut C,
    converters: &ConverterRegistry,
) -> Result<Table> {
    from_rows_with(columns, cursor, converters, &FromRowsOptions::default())
}

/// Read rows from `cursor` into a table.
///
/// Returns an error and no table when the metadata has duplicate column
/// names, when the cursor fails, or when any row fails to convert.
pub fn from_rows_with<C: RowCursor + ?Sized>(
    columns: &[ColumnMeta],
    cursor: &mut C,
    converters: &ConverterRegistry,
    options: &FromRowsOptions,
) -> Result<Table> {
    let plan = ScanPlan::build(columns, converters)?;
    let len_hint = options.row_limit.map(|limit| limit.min(MAX_PREALLOCATED_ROWS));
    let mut table = plan.new_table(&options.table_name, len_hint)?;

    let mut count = 0usize;
    while let Some(row) = cursor.next_row().map_err(ConvertError::Cursor)? {
        if let Some(limit) = options.row_limit {
            if count >= limit {
                warn!("Result set truncated at SQL row limit of {} rows", limit);
                table.add_notice(Notice::warning(row_limit_notice(limit)));
                break;
            }
        }
        plan.append_row(&mut table, row)?;
        count += 1;
    }

    info!(
        "Converted {} rows into {} columns ({} dropped)",
        count,
        table.num_columns(),
        plan.dropped().len()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::Severity;

    struct FailingCursor {
        remaining: usize,
    }

    impl RowCursor for FailingCursor {
        fn next_row(&mut self) -> std::result::Result<Option<Vec<ScanValue>>, BoxError> {
            if self.remaining == 0 {
                return Err("connection reset".into());
            }
            self.remaining -= 1;
            Ok(Some(vec![ScanValue::I64(1)]))
        }
    }

    fn id_column() -> Vec<ColumnMeta> {
        vec![ColumnMeta::new("id", "BIGINT", ScanType::I64)]
    }

    #[test]
    fn test_row_limit_adds_notice() {
        let mut cursor = rows((0..5).map(|i| vec![ScanValue::I64(i)]));
        let options = FromRowsOptions {
            table_name: "ids".into(),
            row_limit: Some(3),
        };
        let table =
            from_rows_with(&id_column(), &mut cursor, &ConverterRegistry::default(), &options)
                .unwrap();

        assert_eq!(table.name(), "ids");
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.notices().len(), 1);
        assert_eq!(table.notices()[0].severity, Severity::Warning);
        assert_eq!(
            table.notices()[0].text,
            "Results have been limited to 3 because the SQL row limit was reached"
        );
    }

    #[test]
    fn test_exact_row_limit_has_no_notice() {
        let mut cursor = rows((0..3).map(|i| vec![ScanValue::I64(i)]));
        let options = FromRowsOptions {
            row_limit: Some(3),
            ..Default::default()
        };
        let table =
            from_rows_with(&id_column(), &mut cursor, &ConverterRegistry::default(), &options)
                .unwrap();

        assert_eq!(table.row_count(), 3);
        assert!(table.notices().is_empty());
    }

    #[test]
    fn test_huge_row_limit_does_not_preallocate() {
        let config = crate::config::Config::from_yaml("sql:\n  row_limit: 18446744073709551615\n")
            .unwrap();
        let options = FromRowsOptions::from_config(&config.sql);
        assert_eq!(options.row_limit, Some(usize::MAX));

        let mut cursor = rows(vec![vec![ScanValue::I64(7)]]);
        let table =
            from_rows_with(&id_column(), &mut cursor, &ConverterRegistry::default(), &options)
                .unwrap();

        assert_eq!(table.row_count(), 1);
        assert!(table.notices().is_empty());
    }

    #[test]
    fn test_cursor_error_is_fatal() {
        let mut cursor = FailingCursor { remaining: 2 };
        let err = from_rows(&id_column(), &mut cursor, &ConverterRegistry::default()).unwrap_err();
        assert!(matches!(err, ConvertError::Cursor(_)));
        assert!(err.format_detailed().contains("connection reset"));
    }

    #[test]
    fn test_options_from_config() {
        let config = SqlConfig {
            table_name: "results".into(),
            row_limit: Some(10),
            ..Default::default()
        };
        let options = FromRowsOptions::from_config(&config);
        assert_eq!(options.table_name, "results");
        assert_eq!(options.row_limit, Some(10));
    }
}
