use crate::table::{CellValue, RiskTable};
use printpdf::{IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point};
use rust_xlsxwriter::{Format, Workbook};
use thiserror::Error;

pub const XLSX_FILENAME: &str = "risk_report.xlsx";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PDF_FILENAME: &str = "risk_report.pdf";
pub const PDF_MIME: &str = "application/pdf";

/// Longest cell text printed in the PDF report
pub const PDF_CELL_MAX_CHARS: usize = 30;

// A4 portrait with 10mm side margins
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;
const TABLE_WIDTH: f32 = 190.0;
const ROW_HEIGHT: f32 = 10.0;

// DejaVu Sans covers Latin and the Persian alphabet
static FONT_REGULAR: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");
static FONT_BOLD: &[u8] = include_bytes!("../assets/fonts/DejaVuSans-Bold.ttf");

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("spreadsheet export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("pdf export failed: {0}")]
    Pdf(#[from] printpdf::Error),
}

/// Convert a risk table to XLSX format
///
/// Writes a bold header row followed by every row, keeping column and row
/// order. Numbers and booleans keep their type; everything else is text.
///
/// # Arguments
/// * `table` - The filtered table to export
///
/// # Returns
/// * `Result<Vec<u8>, ExportError>` - XLSX file content as bytes or an error
///
/// # Examples
/// ```
/// use risk_dashboard::table::RiskTable;
/// use risk_dashboard::downloader::to_xlsx;
///
/// let table = RiskTable::new(vec!["Risk Level".into()], vec![vec!["High".into()]]);
/// let xlsx = to_xlsx(&table).unwrap();
/// assert!(xlsx.starts_with(b"PK"));
/// ```
pub fn to_xlsx(table: &RiskTable) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();

    for (c, name) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, name, &bold)?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, cell) in row.iter().enumerate() {
            let c = c as u16;
            match cell {
                CellValue::Number(n) => {
                    worksheet.write_number(r, c, *n)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
                other => {
                    worksheet.write_string(r, c, &other.to_string())?;
                }
            }
        }
    }

    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}

/// Convert a risk table to a PDF report
///
/// The report has a centred title, a centred date line, a bordered header row
/// sized so all columns share the page width, and one bordered row per record
/// with each cell cut to [`PDF_CELL_MAX_CHARS`] characters. A new page starts
/// whenever the next row would run past the bottom margin.
///
/// # Arguments
/// * `table` - The filtered table to export
/// * `report_title` - Heading, already localised
/// * `report_date` - Date line, already localised and formatted
///
/// # Returns
/// * `Result<Vec<u8>, ExportError>` - PDF file content as bytes or an error
pub fn to_pdf(table: &RiskTable, report_title: &str, report_date: &str) -> Result<Vec<u8>, ExportError> {
    let (doc, page, layer) =
        PdfDocument::new(report_title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let bold = doc.add_external_font(FONT_BOLD)?;
    let regular = doc.add_external_font(FONT_REGULAR)?;

    let mut layer = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT - MARGIN;

    centered_text(&layer, report_title, 12.0, y - 7.0, &bold);
    y -= ROW_HEIGHT;
    centered_text(&layer, report_date, 10.0, y - 7.0, &regular);
    y -= ROW_HEIGHT * 2.0;

    let columns = table.columns();
    if columns.is_empty() {
        return Ok(doc.save_to_bytes()?);
    }
    let col_width = (TABLE_WIDTH / columns.len() as f32).floor();

    for (c, name) in columns.iter().enumerate() {
        let x = MARGIN + c as f32 * col_width;
        cell_border(&layer, x, y, col_width);
        let text = visual_order(&truncate(name, PDF_CELL_MAX_CHARS));
        let offset = (col_width - approx_text_width(&text, 9.0)).max(2.0) / 2.0;
        layer.use_text(text, 9.0, Mm(x + offset), Mm(y - 6.5), &bold);
    }
    y -= ROW_HEIGHT;

    let mut page_no = 1;
    for row in table.rows() {
        if y - ROW_HEIGHT < MARGIN {
            page_no += 1;
            let (next_page, next_layer) =
                doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Page {}", page_no));
            layer = doc.get_page(next_page).get_layer(next_layer);
            y = PAGE_HEIGHT - MARGIN;
        }

        for (c, cell) in row.iter().enumerate() {
            let x = MARGIN + c as f32 * col_width;
            cell_border(&layer, x, y, col_width);
            let text = visual_order(&truncate(&cell.to_string(), PDF_CELL_MAX_CHARS));
            layer.use_text(text, 8.0, Mm(x + 1.0), Mm(y - 6.5), &regular);
        }
        y -= ROW_HEIGHT;
    }

    Ok(doc.save_to_bytes()?)
}

/// Cut a string to at most `max` characters (not bytes).
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Reorder right-to-left text for a renderer that only draws left to right.
///
/// Text without Arabic-script characters is returned unchanged. Otherwise the
/// characters are reversed while runs of digits and Latin letters keep their
/// reading order, so `"تاریخ: 2024-05-01"` prints with the date intact.
/// Letters are not joined into their contextual forms.
pub fn visual_order(text: &str) -> String {
    if !text.chars().any(is_rtl) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut ltr_run: Vec<char> = Vec::new();
    for c in text.chars().rev() {
        if c.is_ascii_alphanumeric() || (!ltr_run.is_empty() && matches!(c, '-' | '.' | '/')) {
            ltr_run.push(c);
        } else {
            out.extend(ltr_run.drain(..).rev());
            out.push(c);
        }
    }
    out.extend(ltr_run.drain(..).rev());
    out
}

fn is_rtl(c: char) -> bool {
    matches!(c, '\u{0590}'..='\u{08FF}' | '\u{FB1D}'..='\u{FDFF}' | '\u{FE70}'..='\u{FEFF}')
}

fn centered_text(layer: &PdfLayerReference, text: &str, size: f32, y: f32, font: &IndirectFontRef) {
    let text = visual_order(text);
    let text = text.as_str();
    let x = ((PAGE_WIDTH - approx_text_width(text, size)) / 2.0).max(MARGIN);
    layer.use_text(text, size, Mm(x), Mm(y), font);
}

// Glyph metrics are not consulted; half an em per glyph is close enough for DejaVu Sans
fn approx_text_width(text: &str, size_pt: f32) -> f32 {
    text.chars().count() as f32 * size_pt * 0.5 * 0.3528
}

fn cell_border(layer: &PdfLayerReference, x: f32, top: f32, width: f32) {
    let bottom = top - ROW_HEIGHT;
    let points = vec![
        (Point::new(Mm(x), Mm(top)), false),
        (Point::new(Mm(x + width), Mm(top)), false),
        (Point::new(Mm(x + width), Mm(bottom)), false),
        (Point::new(Mm(x), Mm(bottom)), false),
    ];
    layer.add_line(Line {
        points,
        is_closed: true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RiskTable {
        RiskTable::new(
            vec!["Risk Level".into(), "Risk Type".into(), "Score".into()],
            vec![
                vec!["High".into(), "Network".into(), CellValue::Number(9.0)],
                vec!["Low".into(), CellValue::Placeholder, CellValue::Number(1.5)],
            ],
        )
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ریسک‌های", 3).chars().count(), 3);
        assert_eq!(truncate("ab", 30), "ab");
    }

    #[test]
    fn xlsx_is_a_zip_container() {
        let bytes = to_xlsx(&sample()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn pdf_has_header_and_spans_pages() {
        let short = to_pdf(&sample(), "IT Risk Analysis Report", "Report Date: 2024-01-01").unwrap();
        assert!(short.starts_with(b"%PDF"));

        let rows: Vec<Vec<CellValue>> = (0..120)
            .map(|i| {
                vec![
                    CellValue::from("High"),
                    CellValue::Text(format!("Type {}", i)),
                    CellValue::Number(i as f64),
                ]
            })
            .collect();
        let long = RiskTable::new(sample().columns().to_vec(), rows);
        let bytes = to_pdf(&long, "IT Risk Analysis Report", "Report Date: 2024-01-01").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > short.len());
    }

    #[test]
    fn persian_report_embeds_a_unicode_font() {
        let texts = crate::i18n::Locale::Persian.texts();
        let table = RiskTable::new(
            vec![texts.risk_level.into(), texts.risk_type.into()],
            vec![vec![texts.high_value.into(), "شبکه".into()]],
        );
        let date_line = format!("{}: 2024-05-01", texts.report_date);
        let bytes = to_pdf(&table, texts.report_title, &date_line).unwrap();

        let contains = |needle: &[u8]| bytes.windows(needle.len()).any(|w| w == needle);
        assert!(bytes.starts_with(b"%PDF"));
        assert!(contains(b"FontFile2"));
        assert!(!contains(b"Helvetica"));
    }

    #[test]
    fn rtl_text_is_reversed_around_latin_runs() {
        assert_eq!(visual_order("Risk Level"), "Risk Level");
        assert_eq!(visual_order("سطح"), "حطس");
        assert_eq!(visual_order("تاریخ: 2024-05-01"), "2024-05-01 :خیرات");
        assert_eq!(visual_order("ریسک 12"), "12 کسیر");
    }

    #[test]
    fn pdf_without_columns_still_renders() {
        let bytes = to_pdf(&RiskTable::default(), "t", "d").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
