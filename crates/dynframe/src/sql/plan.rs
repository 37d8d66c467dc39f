//! Per-result-set scan plan.
//!
//! Built once from the column metadata of a result set, a [`ScanPlan`] decides
//! for every column which converter applies and whether it can be
//! represented at all, then appends rows one at a time. A row is converted
//! and type-checked in full before any column is touched, so a failing row
//! leaves the table unchanged.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::core::registry::new_column;
use crate::core::table::Table;
use crate::core::value::Value;
use crate::error::{ConvertError, Result};

use super::converter::{Converter, ConverterRegistry};
use super::scan::{ColumnMeta, ScanValue};

/// Whether a scan slot accepts NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Value-or-null slot.
    Nullable,
    /// Value-only slot; NULL is a scan error.
    Required,
}

#[derive(Debug, Clone)]
struct ScanSlot {
    /// Position of the column in the raw row.
    index: usize,
    column: String,
    kind: SlotKind,
    converter: Converter,
}

impl ScanSlot {
    fn convert(&self, raw: ScanValue, row: usize) -> Result<Value> {
        let scanned = raw
            .scan_as(self.converter.input())
            .map_err(|message| ConvertError::scan(&self.column, message))?;

        let input = match (scanned, self.kind) {
            (ScanValue::Null, SlotKind::Nullable) => None,
            (ScanValue::Null, SlotKind::Required) => {
                return Err(ConvertError::scan(
                    &self.column,
                    "NULL value in non-nullable column",
                ))
            }
            (v, _) => Some(v),
        };

        self.converter
            .apply(input)
            .map_err(|e| ConvertError::row_conversion(row, &self.column, e))
    }
}

/// Scan slots for the retained columns of one result set.
#[derive(Debug, Clone)]
pub struct ScanPlan {
    slots: Vec<ScanSlot>,
    dropped: Vec<String>,
    width: usize,
}

impl ScanPlan {
    /// Build the plan for `columns`.
    ///
    /// Duplicate column names fail the whole plan. Columns whose type has no
    /// converter and no representable scan type are dropped with a warning.
    pub fn build(columns: &[ColumnMeta], converters: &ConverterRegistry) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for meta in columns {
            if !seen.insert(meta.name.as_str()) {
                return Err(ConvertError::DuplicateColumnName(meta.name.clone()));
            }
        }

        let mut slots = Vec::with_capacity(columns.len());
        let mut dropped = Vec::new();

        for (index, meta) in columns.iter().enumerate() {
            let nullable = meta.is_nullable();
            let kind = if nullable {
                SlotKind::Nullable
            } else {
                SlotKind::Required
            };

            let converter = match converters.lookup(&meta.database_type_name) {
                Some(conv) => {
                    debug!(
                        "Column {} ({}) uses converter '{}'",
                        meta.name,
                        meta.database_type_name,
                        conv.name()
                    );
                    conv.clone()
                }
                None => match Converter::identity(
                    &meta.database_type_name,
                    meta.scan_type,
                    nullable,
                ) {
                    Some(conv) => conv,
                    None => {
                        let reason = ConvertError::ColumnNotSupported {
                            column: meta.name.clone(),
                            type_name: meta.database_type_name.clone(),
                        };
                        warn!(
                            "Dropping column {} of type {}: {}",
                            meta.name, meta.database_type_name, reason
                        );
                        dropped.push(meta.name.clone());
                        continue;
                    }
                },
            };

            slots.push(ScanSlot {
                index,
                column: meta.name.clone(),
                kind,
                converter,
            });
        }

        Ok(Self {
            slots,
            dropped,
            width: columns.len(),
        })
    }

    /// Names of the retained columns, in result set order.
    pub fn column_names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.column.as_str()).collect()
    }

    /// Names of the dropped columns.
    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }

    /// Number of values expected per raw row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Create an empty table with one column per retained slot.
    pub fn new_table(&self, name: &str, len_hint: Option<usize>) -> Result<Table> {
        let mut table = Table::new(name);
        for slot in &self.slots {
            table.push_column(new_column(
                slot.column.clone(),
                slot.converter.target(),
                len_hint,
            ))?;
        }
        Ok(table)
    }

    /// Convert one raw row and append it to `table`.
    ///
    /// `table` must come from [`new_table`](Self::new_table) on this plan.
    pub fn append_row(&self, table: &mut Table, mut row: Vec<ScanValue>) -> Result<()> {
        if row.len() != self.width {
            return Err(ConvertError::UnsupportedShape(format!(
                "row has {} values, result set has {} columns",
                row.len(),
                self.width
            )));
        }
        if table.num_columns() != self.slots.len() {
            return Err(ConvertError::UnsupportedShape(format!(
                "table {} has {} columns, scan plan has {}",
                table.name(),
                table.num_columns(),
                self.slots.len()
            )));
        }

        let row_index = table.row_count();
        let mut converted = Vec::with_capacity(self.slots.len());
        for (slot, column) in self.slots.iter().zip(table.columns()) {
            let raw = std::mem::take(&mut row[slot.index]);
            let value = slot.convert(raw, row_index)?;
            column.check(&value)?;
            if value.is_null() && !column.is_nullable() {
                return Err(ConvertError::scan(
                    &slot.column,
                    format!("converter '{}' produced NULL for non-nullable column", slot.converter.name()),
                ));
            }
            converted.push(value);
        }

        for (column, value) in table.columns_mut().iter_mut().zip(converted) {
            column.append(value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConverterPolicy;
    use crate::core::value::{ElementType, FieldType};
    use crate::sql::converter::Matcher;
    use crate::sql::scan::ScanType;

    fn registry() -> ConverterRegistry {
        ConverterRegistry::new(ConverterPolicy::FirstWins)
            .with(Converter::parse_text(
                "numeric strings",
                Matcher::name("NUMERIC_STRING"),
                FieldType::nullable(ElementType::Float64),
            ))
            .unwrap()
    }

    #[test]
    fn test_duplicate_names_build_nothing() {
        let columns = vec![
            ColumnMeta::new("x", "INT", ScanType::I32),
            ColumnMeta::new("x", "TEXT", ScanType::Text),
        ];
        let err = ScanPlan::build(&columns, &registry()).unwrap_err();
        assert!(matches!(err, ConvertError::DuplicateColumnName(name) if name == "x"));
    }

    #[test]
    fn test_unrepresentable_column_dropped() {
        let columns = vec![
            ColumnMeta::new("id", "INT", ScanType::I32),
            ColumnMeta::new("shape", "GEOMETRY", ScanType::Bytes),
            ColumnMeta::new("amount", "NUMERIC_STRING", ScanType::Text),
        ];
        let plan = ScanPlan::build(&columns, &registry()).unwrap();

        assert_eq!(plan.column_names(), vec!["id", "amount"]);
        assert_eq!(plan.dropped(), ["shape".to_string()]);
        assert_eq!(plan.width(), 3);

        let table = plan.new_table("t", Some(8)).unwrap();
        assert_eq!(
            table.column("amount").unwrap().field_type(),
            FieldType::nullable(ElementType::Float64)
        );
        assert_eq!(
            table.column("id").unwrap().field_type(),
            FieldType::nullable(ElementType::Int32)
        );
    }

    #[test]
    fn test_every_unrepresentable_column_is_dropped() {
        let columns = vec![
            ColumnMeta::new("shape", "GEOMETRY", ScanType::Bytes).with_nullable(false),
            ColumnMeta::new("id", "INT", ScanType::I32),
            ColumnMeta::new("blob", "OPAQUE", ScanType::Bytes),
        ];
        let plan = ScanPlan::build(&columns, &registry()).unwrap();

        assert_eq!(plan.column_names(), vec!["id"]);
        assert_eq!(plan.dropped(), ["shape".to_string(), "blob".to_string()]);

        let mut table = plan.new_table("t", None).unwrap();
        plan.append_row(
            &mut table,
            vec![ScanValue::Bytes(vec![0]), ScanValue::I32(4), ScanValue::Null],
        )
        .unwrap();
        assert_eq!(table.column("id").unwrap().values(), vec![Value::Int32(4)]);
    }

    #[test]
    fn test_reported_nullability() {
        let columns = vec![ColumnMeta::new("id", "INT", ScanType::I32).with_nullable(false)];
        let plan = ScanPlan::build(&columns, &registry()).unwrap();
        let mut table = plan.new_table("t", None).unwrap();

        assert!(!table.column("id").unwrap().is_nullable());

        plan.append_row(&mut table, vec![ScanValue::I64(5)]).unwrap();
        let err = plan.append_row(&mut table, vec![ScanValue::Null]).unwrap_err();
        assert!(matches!(err, ConvertError::Scan { .. }));
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.column("id").unwrap().values(), vec![Value::Int32(5)]);
    }

    #[test]
    fn test_failed_row_is_not_committed() {
        let columns = vec![
            ColumnMeta::new("id", "INT", ScanType::I32),
            ColumnMeta::new("amount", "NUMERIC_STRING", ScanType::Text),
        ];
        let plan = ScanPlan::build(&columns, &registry()).unwrap();
        let mut table = plan.new_table("t", None).unwrap();

        plan.append_row(
            &mut table,
            vec![ScanValue::I32(1), ScanValue::Text("1.5".into())],
        )
        .unwrap();
        let err = plan
            .append_row(
                &mut table,
                vec![ScanValue::I32(2), ScanValue::Text("oops".into())],
            )
            .unwrap_err();

        assert!(matches!(err, ConvertError::RowConversion { row: 1, ref column, .. } if column == "amount"));
        assert_eq!(table.row_count(), 1);
        assert!(table.is_rectangular());
    }

    #[test]
    fn test_row_width_checked() {
        let columns = vec![ColumnMeta::new("id", "INT", ScanType::I32)];
        let plan = ScanPlan::build(&columns, &registry()).unwrap();
        let mut table = plan.new_table("t", None).unwrap();

        assert!(plan.append_row(&mut table, vec![]).is_err());
    }
}
