use crate::filter::{self, FilterSelection};
use crate::graph::{self, Chart};
use crate::i18n::Texts;
use crate::summary::{self, SummaryStats};
use crate::table::RiskTable;

/// Everything one render of the dashboard needs, derived from a loaded table.
#[derive(Clone, Debug)]
pub struct DashboardView {
    pub filtered: RiskTable,
    pub summary: SummaryStats,
    pub pie: Option<Chart>,
    pub bar: Option<Chart>,
    /// Multi-select options, taken from the unfiltered table
    pub level_options: Vec<String>,
    pub type_options: Vec<String>,
}

impl DashboardView {
    /// Run filter, summary and chart building over `table`.
    ///
    /// Column names and the "high" literal come from `texts`; `table` itself is
    /// only read.
    pub fn build(table: &RiskTable, selection: &FilterSelection, texts: &Texts) -> Self {
        let labels = texts.filter_labels();
        let filtered = filter::filter(table, selection, labels);
        let summary = summary::summarize(&filtered, labels.risk_level, texts.high_value);
        let pie = graph::build_pie(&filtered, labels.risk_level, texts.pie_chart);
        let bar = graph::build_bar(&filtered, labels.risk_type, texts.bar_chart);

        DashboardView {
            level_options: filter::distinct_values(table, labels.risk_level),
            type_options: filter::distinct_values(table, labels.risk_type),
            filtered,
            summary,
            pie,
            bar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Locale;
    use crate::table::CellValue;

    fn sample() -> RiskTable {
        let rows = [("High", "Network"), ("Low", "Network"), ("High", "Data")]
            .iter()
            .map(|(l, t)| vec![CellValue::from(*l), CellValue::from(*t)])
            .collect();
        RiskTable::new(vec!["Risk Level".into(), "Risk Type".into()], rows)
    }

    #[test]
    fn english_view_engages_filters_and_charts() {
        let texts = Locale::English.texts();
        let view = DashboardView::build(&sample(), &FilterSelection::default(), texts);
        assert_eq!(view.summary.total, 3);
        assert_eq!(view.summary.high_count, 2);
        assert_eq!(view.summary.high_percent, 66.7);
        assert_eq!(view.level_options, vec!["High", "Low"]);
        assert_eq!(view.pie.unwrap().categories.len(), 2);
        assert_eq!(view.bar.unwrap().categories[0].label, "Network");
    }

    #[test]
    fn options_survive_narrowing() {
        let texts = Locale::English.texts();
        let selection = FilterSelection::default().with_levels(["Low"]);
        let view = DashboardView::build(&sample(), &selection, texts);
        assert_eq!(view.filtered.len(), 1);
        assert_eq!(view.level_options, vec!["High", "Low"]);
    }

    #[test]
    fn persian_view_on_english_headers_degrades() {
        let texts = Locale::Persian.texts();
        let selection = FilterSelection::default().with_levels(["Low"]);
        let view = DashboardView::build(&sample(), &selection, texts);
        assert_eq!(view.filtered.len(), 3);
        assert_eq!(view.summary.high_count, 0);
        assert!(view.pie.is_none());
        assert!(view.bar.is_none());
        assert!(view.level_options.is_empty());
    }
}
