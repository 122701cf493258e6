use crate::table::RiskTable;
use log::debug;
use std::collections::{BTreeSet, HashSet};

/// Column headers the category filters look for, in the active display language.
#[derive(Clone, Copy, Debug)]
pub struct FilterLabels<'a> {
    pub risk_level: &'a str,
    pub risk_type: &'a str,
}

/// What the user picked in the sidebar and the search box.
///
/// A `None` value set means the multi-select was never touched, which keeps
/// every observed value. `Some` with an empty set keeps nothing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterSelection {
    pub risk_levels: Option<BTreeSet<String>>,
    pub risk_types: Option<BTreeSet<String>>,
    pub keyword: Option<String>,
}

impl FilterSelection {
    pub fn with_levels<I, S>(mut self, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.risk_levels = Some(levels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.risk_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Search term, if one was typed.
    pub fn active_keyword(&self) -> Option<&str> {
        self.keyword.as_deref().filter(|k| !k.is_empty())
    }
}

/// The selection a fresh page starts with: nothing deselected, no search.
pub fn default_selection() -> FilterSelection {
    FilterSelection::default()
}

/// Distinct display values of a column in first-seen order.
///
/// These are the options offered by a multi-select. Absent columns give an
/// empty list.
pub fn distinct_values(table: &RiskTable, column: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    table
        .column_values(column)
        .map(|v| v.to_string())
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

/// Narrow a table by risk level, then risk type, then keyword.
///
/// Each stage runs on the previous stage's output. A category stage is skipped
/// when its column is not in the table, so a header that does not match the
/// active language leaves that filter inert instead of failing. Row order is
/// kept and no rows are invented.
pub fn filter(table: &RiskTable, selection: &FilterSelection, labels: FilterLabels<'_>) -> RiskTable {
    let by_level = keep_selected(table, labels.risk_level, selection.risk_levels.as_ref());
    let by_type = keep_selected(&by_level, labels.risk_type, selection.risk_types.as_ref());
    let categorised = by_type.len();
    let result = match selection.active_keyword() {
        Some(keyword) => search(&by_type, keyword),
        None => by_type,
    };

    debug!(
        "filter kept {} of {} rows (after level {}, after type {})",
        result.len(),
        table.len(),
        by_level.len(),
        categorised
    );
    result
}

/// Case-insensitive substring search across every cell of each row.
pub fn search(table: &RiskTable, keyword: &str) -> RiskTable {
    let needle = keyword.to_lowercase();
    table.retain_rows(|row| {
        row.iter()
            .any(|cell| cell.to_string().to_lowercase().contains(&needle))
    })
}

fn keep_selected(table: &RiskTable, column: &str, selected: Option<&BTreeSet<String>>) -> RiskTable {
    match (table.column_index(column), selected) {
        (Some(idx), Some(values)) => {
            table.retain_rows(|row| values.contains(&row[idx].to_string()))
        }
        _ => table.clone(),
    }
}
