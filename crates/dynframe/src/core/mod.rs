//! Core table model.
//!
//! - [`value`]: the closed set of element types and leaf values
//! - [`column`]: typed column storage with a declared-type check on every append
//! - [`table`]: named, ordered collections of columns
//! - [`registry`]: the single place where columns are constructed

pub mod column;
pub mod registry;
pub mod table;
pub mod value;

pub use column::{Column, ColumnData};
pub use registry::{column_for, new_column, Representable};
pub use table::{Notice, Severity, Table};
pub use value::{Element, ElementType, FieldType, Value};
