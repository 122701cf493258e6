use crate::summary::round1;
use crate::table::RiskTable;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use plotters::coord::ranged1d::SegmentValue;
use plotters::element::Pie;
use plotters::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Starting angle of the first pie wedge, in degrees
pub const PIE_START_ANGLE: f64 = 90.0;

/// Seaborn's "Set2" palette, used for bars and wedges
const SET2: [RGBColor; 8] = [
    RGBColor(102, 194, 165),
    RGBColor(252, 141, 98),
    RGBColor(141, 160, 203),
    RGBColor(231, 138, 195),
    RGBColor(166, 216, 84),
    RGBColor(255, 217, 47),
    RGBColor(229, 196, 148),
    RGBColor(179, 179, 179),
];

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error("png encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Available chart types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum GraphType {
    /// Risk-level distribution, one wedge per level
    Pie,

    /// Risk-type frequency, one bar per type
    Bar,
}

/// One wedge or bar
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartCategory {
    pub label: String,
    pub count: usize,
    /// Share of all rows, rounded to one decimal
    pub percent: f64,
}

/// Chart data derived from a table, independent of how it is drawn
///
/// Categories are ordered by descending count; ties keep first-seen order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Chart {
    pub graph_type: GraphType,
    pub title: String,
    pub column: String,
    pub categories: Vec<ChartCategory>,
    pub start_angle: f64,
}

/// Pixel size of a rendered chart
#[derive(Clone, Copy, Debug)]
pub struct GraphOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// Build the risk-level pie chart
///
/// # Arguments
/// * `table` - The filtered table
/// * `column` - Header of the risk-level column in the active language
/// * `title` - Chart caption
///
/// # Returns
/// * `Option<Chart>` - `None` when the column is absent or there are no rows
pub fn build_pie(table: &RiskTable, column: &str, title: &str) -> Option<Chart> {
    build(table, column, title, GraphType::Pie)
}

/// Build the risk-type bar chart
///
/// Same inputs and `None` cases as [`build_pie`].
pub fn build_bar(table: &RiskTable, column: &str, title: &str) -> Option<Chart> {
    build(table, column, title, GraphType::Bar)
}

fn build(table: &RiskTable, column: &str, title: &str, graph_type: GraphType) -> Option<Chart> {
    table.column_index(column)?;
    if table.is_empty() {
        return None;
    }

    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in table.column_values(column) {
        let key = value.to_string();
        let count = counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }

    // Stable sort keeps first-seen order among equal counts
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));

    let total = table.len() as f64;
    let categories = order
        .into_iter()
        .map(|label| {
            let count = counts[&label];
            ChartCategory {
                percent: round1(count as f64 / total * 100.0),
                label,
                count,
            }
        })
        .collect();

    Some(Chart {
        graph_type,
        title: title.to_string(),
        column: column.to_string(),
        categories,
        start_angle: PIE_START_ANGLE,
    })
}

/// Render a chart to PNG bytes
///
/// Draws into an in-memory RGB buffer and encodes it as PNG.
///
/// # Arguments
/// * `chart` - Chart data from [`build_pie`] or [`build_bar`]
/// * `options` - Output size
///
/// # Returns
/// * `Result<Vec<u8>, GraphError>` - PNG image data
pub fn render_png(chart: &Chart, options: &GraphOptions) -> Result<Vec<u8>, GraphError> {
    let (width, height) = (options.width, options.height);
    let mut pixels = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;
        match chart.graph_type {
            GraphType::Pie => draw_pie(&root, chart)?,
            GraphType::Bar => draw_bar(&root, chart)?,
        }
        root.present().map_err(render_err)?;
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(&pixels, width, height, image::ColorType::Rgb8)?;
    Ok(png)
}

fn draw_pie(root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>, chart: &Chart) -> Result<(), GraphError> {
    let area = root
        .titled(&chart.title, ("sans-serif", 26))
        .map_err(render_err)?;
    let (w, h) = area.dim_in_pixel();
    let center = ((w / 2) as i32, (h / 2) as i32);
    let radius = w.min(h) as f64 * 0.35;

    let sizes: Vec<f64> = chart.categories.iter().map(|c| c.count as f64).collect();
    let colors: Vec<RGBColor> = (0..sizes.len()).map(|i| SET2[i % SET2.len()]).collect();
    let labels: Vec<String> = chart
        .categories
        .iter()
        .map(|c| format!("{} ({:.1}%)", c.label, c.percent))
        .collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(chart.start_angle);
    pie.label_style(("sans-serif", 16).into_font().color(&BLACK));
    area.draw(&pie).map_err(render_err)?;
    Ok(())
}

fn draw_bar(root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>, chart: &Chart) -> Result<(), GraphError> {
    let n = chart.categories.len() as u32;
    let max = chart.categories.iter().map(|c| c.count).max().unwrap_or(0) as u32;
    let labels: Vec<String> = chart.categories.iter().map(|c| c.label.clone()).collect();

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, ("sans-serif", 26))
        .margin(10)
        .x_label_area_size(120)
        .y_label_area_size(40)
        .build_cartesian_2d((0..n).into_segmented(), 0u32..max + 1)
        .map_err(render_err)?;

    let formatter = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    };

    // Category names are drawn rotated so long labels do not collide
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(n as usize)
        .x_label_formatter(&formatter)
        .x_label_style(
            ("sans-serif", 14)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .y_desc("Count")
        .draw()
        .map_err(render_err)?;

    ctx.draw_series(chart.categories.iter().enumerate().map(|(i, c)| {
        let x0 = SegmentValue::Exact(i as u32);
        let x1 = SegmentValue::Exact(i as u32 + 1);
        let mut bar = Rectangle::new(
            [(x0, 0), (x1, c.count as u32)],
            SET2[i % SET2.len()].filled(),
        );
        bar.set_margin(0, 0, 6, 6);
        bar
    }))
    .map_err(render_err)?;

    Ok(())
}

fn render_err<E: std::fmt::Display>(e: E) -> GraphError {
    GraphError::Render(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CellValue;

    fn types(values: &[&str]) -> RiskTable {
        RiskTable::new(
            vec!["Risk Type".into()],
            values.iter().map(|v| vec![CellValue::from(*v)]).collect(),
        )
    }

    #[test]
    fn categories_sorted_by_frequency() {
        let table = types(&["Data", "Network", "Access", "Network", "Access", "Network"]);
        let chart = build_bar(&table, "Risk Type", "Types").unwrap();
        let labels: Vec<_> = chart.categories.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Network", "Access", "Data"]);
        assert_eq!(chart.categories[0].count, 3);
        assert_eq!(chart.categories[0].percent, 50.0);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let chart = build_pie(&types(&["B", "A", "A", "B"]), "Risk Type", "t").unwrap();
        let labels: Vec<_> = chart.categories.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["B", "A"]);
        assert_eq!(chart.start_angle, PIE_START_ANGLE);
    }

    #[test]
    fn percentages_have_one_decimal() {
        let chart = build_pie(&types(&["High", "Low", "High"]), "Risk Type", "t").unwrap();
        assert_eq!(chart.categories[0].percent, 66.7);
        assert_eq!(chart.categories[1].percent, 33.3);
    }

    #[test]
    fn absent_column_or_empty_table_builds_nothing() {
        assert!(build_pie(&types(&["High"]), "Risk Level", "t").is_none());
        assert!(build_bar(&types(&[]), "Risk Type", "t").is_none());
    }

    #[test]
    fn building_does_not_touch_the_table() {
        let table = types(&["Data", "Network"]);
        let before = table.clone();
        let _ = build_bar(&table, "Risk Type", "t");
        assert_eq!(table, before);
    }
}
