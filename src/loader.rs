use crate::table::{CellValue, RiskTable};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use log::{debug, info};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// Reasons an upload could not be turned into a [`RiskTable`].
///
/// Every variant is surfaced to the user as a prompt to upload a different file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read spreadsheet: {0}")]
    Parse(#[from] calamine::Error),

    #[error("workbook has no worksheets")]
    NoWorksheet,

    #[error("worksheet has no header row")]
    Empty,

    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),
}

/// Load a risk register from uploaded spreadsheet bytes
///
/// Parses the first worksheet, using its first row as column headers. After
/// parsing, rows in which every cell is empty are dropped and the remaining
/// empty cells are replaced with the placeholder.
///
/// # Arguments
/// * `bytes` - Raw contents of the uploaded `.xlsx` (or other workbook) file
///
/// # Returns
/// * `Result<RiskTable, LoadError>` - The cleaned table or the reason it could not be read
///
/// # Examples
/// ```no_run
/// use risk_dashboard::loader::load;
///
/// let bytes = std::fs::read("risks.xlsx").unwrap();
/// match load(&bytes) {
///     Ok(table) => println!("Loaded {} risks", table.len()),
///     Err(e) => eprintln!("Please upload another file: {}", e),
/// }
/// ```
pub fn load(bytes: &[u8]) -> Result<RiskTable, LoadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(LoadError::NoWorksheet)??;

    let mut rows = range.rows();
    let header = rows.next().ok_or(LoadError::Empty)?;
    let columns = header_names(header);

    let mut dropped = 0usize;
    let mut data = Vec::new();
    for row in rows {
        if row.iter().all(is_empty) {
            dropped += 1;
            continue;
        }
        data.push(row.iter().map(to_cell).collect());
    }

    debug!("dropped {} empty rows", dropped);
    let table = RiskTable::new(columns, data);
    info!(
        "loaded risk table: {} rows x {} columns",
        table.len(),
        table.columns().len()
    );
    Ok(table)
}

/// Load a risk register from a file on disk
///
/// # Arguments
/// * `path` - Path to the workbook
///
/// # Returns
/// * `Result<RiskTable, LoadError>` - The cleaned table or an error
pub fn load_path(path: impl AsRef<Path>) -> Result<RiskTable, LoadError> {
    let bytes = std::fs::read(path)?;
    load(&bytes)
}

// Blank headers become "Unnamed: <i>"; repeats get ".1", ".2" suffixes,
// extended further when a generated name is already taken
fn header_names(header: &[Data]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let mut name = if is_empty(cell) {
                format!("Unnamed: {}", i)
            } else {
                to_cell(cell).to_string()
            };
            let mut count = counts.get(&name).copied().unwrap_or(0);
            while count > 0 {
                counts.insert(name.clone(), count + 1);
                name = format!("{}.{}", name, count);
                count = counts.get(&name).copied().unwrap_or(0);
            }
            counts.insert(name.clone(), count + 1);
            name
        })
        .collect()
}

// Only truly absent cells count; whitespace is kept as written
fn is_empty(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.is_empty(),
        _ => false,
    }
}

fn to_cell(cell: &Data) -> CellValue {
    if is_empty(cell) {
        return CellValue::Placeholder;
    }

    match cell {
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) if ts.time() == chrono::NaiveTime::MIN => {
                CellValue::Text(ts.format("%Y-%m-%d").to_string())
            }
            Some(ts) => CellValue::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Number(dt.as_f64()),
        },
        other => CellValue::Text(other.to_string()),
    }
}
