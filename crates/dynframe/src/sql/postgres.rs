//! PostgreSQL result sets as a [`RowCursor`].
//!
//! Connecting and running the query is the caller's concern; [`PgRows`] takes
//! the statement columns and the fetched rows and reads values by the type
//! name PostgreSQL reports for each column.

use std::error::Error;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::{Row, Statement};

use crate::config::ConverterPolicy;
use crate::core::table::Table;
use crate::error::{BoxError, Result};

use super::converter::{Converter, ConverterRegistry, Matcher};
use super::scan::{ColumnMeta, ScanType, ScanValue};
use super::{from_rows_with, FromRowsOptions, RowCursor};

/// Wire bytes of a value of any type.
struct RawValue(Vec<u8>);

impl<'a> FromSql<'a> for RawValue {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> std::result::Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawValue(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Natural scan type for a PostgreSQL type name.
///
/// Types without a dedicated scan type are read as raw wire bytes.
pub fn scan_type_for(type_name: &str) -> ScanType {
    match type_name.to_lowercase().as_str() {
        "bool" | "boolean" => ScanType::Bool,
        "char" => ScanType::I8,
        "int2" | "smallint" => ScanType::I16,
        "int4" | "integer" | "int" => ScanType::I32,
        "int8" | "bigint" => ScanType::I64,
        "oid" => ScanType::U32,
        "float4" | "real" => ScanType::F32,
        "float8" | "double precision" => ScanType::F64,
        "text" | "varchar" | "bpchar" | "name" | "citext" => ScanType::Text,
        "numeric" | "decimal" => ScanType::Decimal,
        "uuid" => ScanType::Uuid,
        "json" | "jsonb" => ScanType::Json,
        "timestamptz" | "timestamp with time zone" => ScanType::Timestamp,
        "timestamp" | "timestamp without time zone" => ScanType::DateTime,
        "date" => ScanType::Date,
        "time" | "time without time zone" => ScanType::Time,
        _ => ScanType::Bytes,
    }
}

macro_rules! get {
    ($row:expr, $idx:expr, $ty:ty, $variant:expr) => {
        $row.try_get::<_, Option<$ty>>($idx)?
            .map($variant)
            .unwrap_or_default()
    };
}

fn read_value(
    row: &Row,
    idx: usize,
    scan_type: ScanType,
) -> std::result::Result<ScanValue, tokio_postgres::Error> {
    Ok(match scan_type {
        ScanType::Bool => get!(row, idx, bool, ScanValue::Bool),
        ScanType::I8 => get!(row, idx, i8, ScanValue::I8),
        ScanType::I16 => get!(row, idx, i16, ScanValue::I16),
        ScanType::I32 => get!(row, idx, i32, ScanValue::I32),
        ScanType::I64 => get!(row, idx, i64, ScanValue::I64),
        ScanType::U32 => get!(row, idx, u32, ScanValue::U32),
        ScanType::F32 => get!(row, idx, f32, ScanValue::F32),
        ScanType::F64 => get!(row, idx, f64, ScanValue::F64),
        ScanType::Text => get!(row, idx, String, ScanValue::Text),
        ScanType::Decimal => get!(row, idx, Decimal, ScanValue::Decimal),
        ScanType::Uuid => get!(row, idx, uuid::Uuid, ScanValue::Uuid),
        ScanType::Json => get!(row, idx, serde_json::Value, ScanValue::Json),
        ScanType::Timestamp => get!(row, idx, DateTime<Utc>, ScanValue::Timestamp),
        ScanType::DateTime => get!(row, idx, NaiveDateTime, ScanValue::DateTime),
        ScanType::Date => get!(row, idx, NaiveDate, ScanValue::Date),
        ScanType::Time => get!(row, idx, NaiveTime, ScanValue::Time),
        ScanType::U8 | ScanType::U16 | ScanType::U64 | ScanType::Bytes => {
            get!(row, idx, RawValue, |raw: RawValue| ScanValue::Bytes(raw.0))
        }
    })
}

/// Fetched PostgreSQL rows.
pub struct PgRows {
    columns: Vec<ColumnMeta>,
    rows: std::vec::IntoIter<Row>,
}

impl PgRows {
    /// Wrap rows fetched for a statement with the given columns.
    pub fn new(columns: &[tokio_postgres::Column], rows: Vec<Row>) -> Self {
        let columns = columns
            .iter()
            .map(|c| {
                let type_name = c.type_().name();
                ColumnMeta::new(c.name(), type_name, scan_type_for(type_name))
            })
            .collect();
        Self {
            columns,
            rows: rows.into_iter(),
        }
    }

    /// Wrap rows fetched for a prepared statement.
    pub fn from_statement(statement: &Statement, rows: Vec<Row>) -> Self {
        Self::new(statement.columns(), rows)
    }

    /// Column metadata. PostgreSQL does not report nullability, so every
    /// column is treated as nullable.
    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    /// Converters for PostgreSQL types that have no column representation:
    /// numeric as float64, timestamp and date as UTC timestamps, uuid and
    /// json as strings.
    pub fn default_converters(policy: ConverterPolicy) -> Result<ConverterRegistry> {
        ConverterRegistry::new(policy)
            .with(Converter::decimal_to_f64(Matcher::name("numeric")))?
            .with(Converter::naive_datetime_to_timestamp(Matcher::name("timestamp")))?
            .with(Converter::date_to_timestamp(Matcher::name("date")))?
            .with(Converter::to_text(Matcher::name("uuid"), ScanType::Uuid))?
            .with(Converter::to_text(Matcher::pattern("^jsonb?$")?, ScanType::Json))
    }

    /// Read all rows into a table.
    pub fn into_table(
        mut self,
        converters: &ConverterRegistry,
        options: &FromRowsOptions,
    ) -> Result<Table> {
        let columns = std::mem::take(&mut self.columns);
        from_rows_with(&columns, &mut self, converters, options)
    }
}

impl RowCursor for PgRows {
    fn next_row(&mut self) -> std::result::Result<Option<Vec<ScanValue>>, BoxError> {
        let Some(row) = self.rows.next() else {
            return Ok(None);
        };
        let mut values = Vec::with_capacity(row.len());
        for (idx, column) in row.columns().iter().enumerate() {
            values.push(read_value(&row, idx, scan_type_for(column.type_().name()))?);
        }
        Ok(Some(values))
    }
}
