use crate::table::RiskTable;
use serde::Serialize;

/// Metric cards shown above the table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total: usize,
    pub high_count: usize,
    /// Share of high risks in percent, rounded to one decimal.
    pub high_percent: f64,
}

impl SummaryStats {
    /// The percentage as shown on the card, e.g. `66.7%`.
    pub fn percent_display(&self) -> String {
        format!("{:.1}%", self.high_percent)
    }
}

/// Count all rows and the rows whose risk level equals `high_label`.
///
/// `high_label` is the locale's literal for "high" and is passed in by the
/// caller. An absent risk-level column counts zero high risks; an empty table
/// reports 0% rather than dividing by zero.
pub fn summarize(table: &RiskTable, risk_level_column: &str, high_label: &str) -> SummaryStats {
    let total = table.len();
    let high_count = table
        .column_values(risk_level_column)
        .filter(|v| v.to_string() == high_label)
        .count();

    let high_percent = if total == 0 {
        0.0
    } else {
        round1(high_count as f64 / total as f64 * 100.0)
    };

    SummaryStats {
        total,
        high_count,
        high_percent,
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
