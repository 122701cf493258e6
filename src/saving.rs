use crate::table::{CellValue, RiskTable};
use chrono::{Local, NaiveDateTime};
use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::path::Path;
use thiserror::Error;

/// Default location of the export store
pub const DEFAULT_DB_PATH: &str = "risk_data.db";

lazy_static! {
    static ref TABLE_NAME: Regex = Regex::new(r"^risk_\d{8}_\d{6}(_\d+)?$").unwrap();
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("not a risk export table: {0}")]
    InvalidTableName(String),

    #[error("table has no columns to store")]
    EmptyTable,
}

/// Persist a risk table under a new timestamped name
///
/// Opens the store, writes the table in a single transaction and closes the
/// store again before returning.
///
/// # Arguments
/// * `table` - The filtered table
/// * `db_path` - SQLite file, created if missing
///
/// # Returns
/// * `Result<String, PersistError>` - Name of the table that was created
///
/// # Examples
/// ```no_run
/// use risk_dashboard::saving::{persist, DEFAULT_DB_PATH};
/// use risk_dashboard::table::RiskTable;
///
/// let table = RiskTable::new(vec!["Risk Level".into()], vec![vec!["High".into()]]);
/// let name = persist(&table, DEFAULT_DB_PATH).unwrap();
/// assert!(name.starts_with("risk_"));
/// ```
pub fn persist(table: &RiskTable, db_path: impl AsRef<Path>) -> Result<String, PersistError> {
    persist_at(table, db_path, Local::now().naive_local())
}

/// Same as [`persist`] with an explicit timestamp for the table name.
///
/// When a table for the same second already exists, `_1`, `_2`, ... is
/// appended so an earlier export is never overwritten.
pub fn persist_at(
    table: &RiskTable,
    db_path: impl AsRef<Path>,
    timestamp: NaiveDateTime,
) -> Result<String, PersistError> {
    if table.columns().is_empty() {
        return Err(PersistError::EmptyTable);
    }

    let mut conn = Connection::open(db_path.as_ref())?;
    let base = table_name_for(timestamp);
    let mut name = base.clone();
    let mut suffix = 0;
    while table_exists(&conn, &name)? {
        suffix += 1;
        name = format!("{}_{}", base, suffix);
    }
    if suffix > 0 {
        warn!("{} already exists, writing export as {}", base, name);
    }

    let affinities: Vec<&str> = (0..table.columns().len())
        .map(|i| column_affinity(table, i))
        .collect();
    let column_defs: Vec<String> = table
        .columns()
        .iter()
        .zip(&affinities)
        .map(|(col, affinity)| format!("{} {}", quote_ident(col), affinity))
        .collect();
    let placeholders = vec!["?"; table.columns().len()].join(", ");

    let tx = conn.transaction()?;
    tx.execute(
        &format!("CREATE TABLE {} ({})", quote_ident(&name), column_defs.join(", ")),
        [],
    )?;
    {
        let mut insert = tx.prepare(&format!(
            "INSERT INTO {} VALUES ({})",
            quote_ident(&name),
            placeholders
        ))?;
        for row in table.rows() {
            insert.execute(params_from_iter(
                row.iter()
                    .zip(&affinities)
                    .map(|(cell, affinity)| to_sql_value(cell, affinity)),
            ))?;
        }
    }
    tx.commit()?;

    info!(
        "persisted {} rows to table {} in {}",
        table.len(),
        name,
        db_path.as_ref().display()
    );
    Ok(name)
}

/// List exported tables, oldest first
///
/// # Arguments
/// * `db_path` - SQLite file
///
/// # Returns
/// * `Result<Vec<String>, PersistError>` - Names matching the export naming scheme
pub fn list_tables(db_path: impl AsRef<Path>) -> Result<Vec<String>, PersistError> {
    let conn = Connection::open(db_path.as_ref())?;
    let mut stmt =
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.into_iter().filter(|n| is_export_table(n)).collect())
}

/// Read an exported table back
///
/// # Arguments
/// * `db_path` - SQLite file
/// * `name` - A name returned by [`persist`] or [`list_tables`]
///
/// # Returns
/// * `Result<RiskTable, PersistError>` - The stored table
pub fn load_table(db_path: impl AsRef<Path>, name: &str) -> Result<RiskTable, PersistError> {
    if !is_export_table(name) {
        return Err(PersistError::InvalidTableName(name.to_string()));
    }

    let conn = Connection::open(db_path.as_ref())?;
    let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(name)))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(from_sql_value))
                .collect::<Result<Vec<_>, _>>()
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RiskTable::new(columns, rows))
}

/// Table name for an export taken at `timestamp`: `risk_YYYYMMDD_HHMMSS`.
pub fn table_name_for(timestamp: NaiveDateTime) -> String {
    format!("risk_{}", timestamp.format("%Y%m%d_%H%M%S"))
}

pub fn is_export_table(name: &str) -> bool {
    TABLE_NAME.is_match(name)
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool, rusqlite::Error> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// REAL for all-numeric columns, INTEGER for all-boolean, TEXT otherwise
fn column_affinity(table: &RiskTable, idx: usize) -> &'static str {
    let rows = table.rows();
    if rows.is_empty() {
        return "TEXT";
    }
    if rows.iter().all(|r| matches!(r[idx], CellValue::Number(_))) {
        "REAL"
    } else if rows.iter().all(|r| matches!(r[idx], CellValue::Bool(_))) {
        "INTEGER"
    } else {
        "TEXT"
    }
}

// Mixed columns are stored as the text the dashboard shows
fn to_sql_value(cell: &CellValue, affinity: &str) -> Value {
    match cell {
        CellValue::Number(n) if affinity == "REAL" => Value::Real(*n),
        CellValue::Bool(b) if affinity == "INTEGER" => Value::Integer(i64::from(*b)),
        other => Value::Text(other.to_string()),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Placeholder,
        ValueRef::Integer(i) => CellValue::Number(i as f64),
        ValueRef::Real(f) => CellValue::Number(f),
        ValueRef::Text(t) => CellValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => CellValue::Text(format!("<{} bytes>", b.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn names_encode_the_second() {
        assert_eq!(table_name_for(stamp()), "risk_20240309_140507");
    }

    #[test]
    fn export_names_are_validated() {
        assert!(is_export_table("risk_20240309_140507"));
        assert!(is_export_table("risk_20240309_140507_2"));
        assert!(!is_export_table("risk_2024"));
        assert!(!is_export_table("risk_20240309_140507; DROP TABLE x"));
        assert!(!is_export_table("sqlite_master"));
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("Risk \"Level\""), "\"Risk \"\"Level\"\"\"");
    }
}
