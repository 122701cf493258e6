use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;

/// Sentinel written in place of every missing cell after load.
pub const PLACEHOLDER: &str = "-";

/// A single cell of an uploaded risk register.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    /// A cell that was empty in the uploaded file.
    Placeholder,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            // Whole numbers print like the spreadsheet shows them: 3, not 3.0
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Placeholder => f.write_str(PLACEHOLDER),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Placeholder => serializer.serialize_str(PLACEHOLDER),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// In-memory risk register: header names plus rows in file order.
///
/// Columns come straight from the uploaded header row, so there is no fixed
/// schema. Every row has exactly `columns.len()` cells. Filtering never edits
/// a table in place; each stage produces a new one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RiskTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl RiskTable {
    /// Builds a table, padding short rows with placeholders and cutting long ones.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Placeholder);
                row
            })
            .collect();
        RiskTable { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact header match.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterates one column's cells, or nothing if the column is absent.
    pub fn column_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a CellValue> + use<'a> {
        let idx = self.column_index(name);
        self.rows
            .iter()
            .filter_map(move |row| idx.and_then(|i| row.get(i)))
    }

    /// Keeps the rows accepted by `keep`, in their original order.
    pub fn retain_rows<F>(&self, mut keep: F) -> RiskTable
    where
        F: FnMut(&[CellValue]) -> bool,
    {
        RiskTable {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| keep(row))
                .cloned()
                .collect(),
        }
    }
}

impl Serialize for RiskTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RiskTable", 2)?;
        state.serialize_field("columns", &self.columns)?;
        state.serialize_field("rows", &self.rows)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_display_without_trailing_zero() {
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Placeholder.to_string(), "-");
    }

    #[test]
    fn short_rows_are_padded() {
        let table = RiskTable::new(
            vec!["A".into(), "B".into()],
            vec![vec![CellValue::from("x")]],
        );
        assert_eq!(table.rows()[0], vec![CellValue::from("x"), CellValue::Placeholder]);
    }

    #[test]
    fn missing_column_yields_no_values() {
        let table = RiskTable::new(vec!["A".into()], vec![vec![CellValue::from("x")]]);
        assert_eq!(table.column_values("B").count(), 0);
        assert_eq!(table.column_values("A").count(), 1);
    }

    #[test]
    fn serializes_placeholder_as_dash() {
        let table = RiskTable::new(
            vec!["A".into(), "B".into()],
            vec![vec![CellValue::Number(1.0), CellValue::Placeholder]],
        );
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["rows"][0][1], "-");
        assert_eq!(json["columns"][0], "A");
    }
}
