//! Named, ordered collection of columns.

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};

use super::column::Column;

/// Severity of a [`Notice`] attached to a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A message about how a table was produced (e.g. truncation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub severity: Severity,
    pub text: String,
}

impl Notice {
    /// Create a warning notice.
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            text: text.into(),
        }
    }
}

/// A named table of columns.
///
/// Column names are unique. Columns are expected to share a row count; the
/// conversion entry points guarantee this for the tables they return.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    notices: Vec<Notice>,
}

impl Table {
    /// Create an empty named table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            notices: Vec::new(),
        }
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the table name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Add a column at the end. Fails if a column with the same name exists.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if self.column(column.name()).is_some() {
            return Err(ConvertError::DuplicateColumnName(column.name().to_string()));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    /// Find a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows (length of the longest column).
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(Column::len).max().unwrap_or(0)
    }

    /// Whether every column holds the same number of values.
    pub fn is_rectangular(&self) -> bool {
        let rows = self.row_count();
        self.columns.iter().all(|c| c.len() == rows)
    }

    /// Notices attached while building the table.
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Attach a notice.
    pub fn add_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Consume the table, returning its columns.
    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::{ElementType, FieldType, Value};

    fn int_column(name: &str, values: &[i64]) -> Column {
        let mut col = Column::new(name, FieldType::required(ElementType::Int64));
        for v in values {
            col.append(Value::Int64(*v)).unwrap();
        }
        col
    }

    #[test]
    fn test_push_column_rejects_duplicates() {
        let mut table = Table::new("t");
        table.push_column(int_column("a", &[1])).unwrap();

        let err = table.push_column(int_column("a", &[2])).unwrap_err();
        assert!(matches!(err, ConvertError::DuplicateColumnName(name) if name == "a"));
        assert_eq!(table.num_columns(), 1);
    }

    #[test]
    fn test_row_count_and_shape() {
        let mut table = Table::new("t");
        assert_eq!(table.row_count(), 0);
        assert!(table.is_rectangular());

        table.push_column(int_column("a", &[1, 2])).unwrap();
        table.push_column(int_column("b", &[3])).unwrap();
        assert_eq!(table.row_count(), 2);
        assert!(!table.is_rectangular());
        assert_eq!(table.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_notices() {
        let mut table = Table::new("t");
        table.add_notice(Notice::warning("truncated"));
        assert_eq!(table.notices()[0].severity, Severity::Warning);
    }
}
