//! Column accumulator: the live set of columns built during one conversion.
//!
//! Columns are created lazily the first time a field name is seen. Rows are
//! closed with [`ColumnAccumulator::end_row`], which null-pads every column
//! that did not receive a value, so records that omit fields still produce
//! a rectangular table. A column first seen at row `k` is back-filled with
//! `k` nulls.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::core::registry;
use crate::core::table::Table;
use crate::core::value::{FieldType, Value};
use crate::core::Column;
use crate::error::{ConvertError, Result};

/// Per-call column state.
#[derive(Debug, Default)]
pub struct ColumnAccumulator {
    columns: HashMap<String, Column>,
    /// Distinct field names in first-seen order.
    order: Vec<String>,
    saw_map: bool,
    lead: Option<String>,
    /// Number of closed rows.
    rows: usize,
}

impl ColumnAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to the column `name`, creating the column on first sight.
    ///
    /// `nullable` marks a newly created column nullable even if `value` is
    /// not null. Existing columns must match the value's element type.
    pub fn upsert(&mut self, name: &str, value: Value, nullable: bool) -> Result<()> {
        if let Some(column) = self.columns.get_mut(name) {
            if column.len() > self.rows {
                return Err(ConvertError::DuplicateColumnName(name.to_string()));
            }
            return column.append(value);
        }

        let field_type = FieldType {
            element: value.element_type(),
            nullable: nullable || value.is_null(),
        };
        let mut column = registry::new_column(name, field_type, None);
        column.pad_to(self.rows);
        column.append(value)?;

        debug!("New column '{}' ({}) at row {}", name, field_type, self.rows);
        self.order.push(name.to_string());
        self.columns.insert(name.to_string(), column);
        Ok(())
    }

    /// Record that a map was visited during this conversion.
    pub fn mark_map_seen(&mut self) {
        self.saw_map = true;
    }

    /// Whether a map was visited during this conversion.
    pub fn saw_map(&self) -> bool {
        self.saw_map
    }

    /// Mark `name` as the lead column. The first marked name wins.
    pub fn mark_lead(&mut self, name: &str) {
        match &self.lead {
            None => self.lead = Some(name.to_string()),
            Some(existing) if existing != name => {
                warn!(
                    "Field '{}' is marked as lead column but '{}' already is; keeping '{}'",
                    name, existing, existing
                );
            }
            Some(_) => {}
        }
    }

    /// Close the current row, null-padding columns that received no value.
    pub fn end_row(&mut self) {
        self.rows += 1;
        for column in self.columns.values_mut() {
            column.pad_to(self.rows);
        }
    }

    /// Number of closed rows.
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Column names in emission order.
    ///
    /// Names are in first-seen order, sorted lexicographically if a map was
    /// seen and `sort_when_map_seen` is set. The lead column, if any, is
    /// moved to the front.
    pub fn final_field_order(&self, sort_when_map_seen: bool) -> Vec<String> {
        let mut names = self.order.clone();
        if self.saw_map && sort_when_map_seen {
            names.sort();
        }
        if let Some(lead) = &self.lead {
            if let Some(pos) = names.iter().position(|n| n == lead) {
                let lead = names.remove(pos);
                names.insert(0, lead);
            }
        }
        names
    }

    /// Consume the accumulator into a table.
    pub fn finish(mut self, name: &str, sort_when_map_seen: bool) -> Result<Table> {
        let mut table = Table::new(name);
        for field in self.final_field_order(sort_when_map_seen) {
            if let Some(column) = self.columns.remove(&field) {
                table.push_column(column)?;
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::ElementType;

    #[test]
    fn test_first_write_defines_type() {
        let mut acc = ColumnAccumulator::new();
        acc.upsert("a", Value::Int64(1), false).unwrap();
        acc.end_row();

        let err = acc.upsert("a", Value::from("x"), false).unwrap_err();
        assert!(matches!(err, ConvertError::TypeMismatch { .. }));
    }

    #[test]
    fn test_same_field_twice_in_row_is_duplicate() {
        let mut acc = ColumnAccumulator::new();
        acc.upsert("a", Value::Int64(1), false).unwrap();

        let err = acc.upsert("a", Value::Int64(2), false).unwrap_err();
        assert!(matches!(err, ConvertError::DuplicateColumnName(name) if name == "a"));
    }

    #[test]
    fn test_missing_and_late_fields_are_null_padded() {
        let mut acc = ColumnAccumulator::new();
        acc.upsert("a", Value::Int64(1), false).unwrap();
        acc.end_row();
        acc.upsert("b", Value::from("late"), false).unwrap();
        acc.end_row();

        let table = acc.finish("t", true).unwrap();
        assert!(table.is_rectangular());
        assert_eq!(table.row_count(), 2);

        let a = table.column("a").unwrap();
        assert_eq!(a.values(), vec![Value::Int64(1), Value::Null(ElementType::Int64)]);
        assert!(a.is_nullable());

        let b = table.column("b").unwrap();
        assert_eq!(b.values(), vec![Value::Null(ElementType::String), Value::from("late")]);
        assert!(b.is_nullable());
    }

    #[test]
    fn test_final_order_sorts_only_after_map() {
        let mut acc = ColumnAccumulator::new();
        acc.upsert("b", Value::Int64(1), false).unwrap();
        acc.upsert("a", Value::Int64(2), false).unwrap();
        assert_eq!(acc.final_field_order(true), vec!["b", "a"]);

        acc.mark_map_seen();
        assert_eq!(acc.final_field_order(true), vec!["a", "b"]);
        assert_eq!(acc.final_field_order(false), vec!["b", "a"]);
    }

    #[test]
    fn test_lead_moves_to_front_keeping_rest() {
        let mut acc = ColumnAccumulator::new();
        for name in ["x", "y", "z"] {
            acc.upsert(name, Value::Bool(true), false).unwrap();
        }
        acc.mark_lead("z");
        acc.mark_lead("y");
        assert_eq!(acc.final_field_order(true), vec!["z", "x", "y"]);
    }
}
