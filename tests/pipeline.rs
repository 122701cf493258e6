use risk_dashboard::dashboard::DashboardView;
use risk_dashboard::downloader;
use risk_dashboard::filter::{self, FilterSelection};
use risk_dashboard::i18n::Locale;
use risk_dashboard::loader::{self, LoadError};
use risk_dashboard::summary;
use risk_dashboard::table::CellValue;
use rust_xlsxwriter::Workbook;
use tempfile::tempdir;

// Header, three risks, an all-empty row between the first two and one missing description
fn register_xlsx() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let header = ["Risk ID", "Risk Level", "Risk Type", "Description"];
    for (c, name) in header.iter().enumerate() {
        sheet.write_string(0, c as u16, *name).unwrap();
    }

    sheet.write_number(1, 0, 1.0).unwrap();
    sheet.write_string(1, 1, "High").unwrap();
    sheet.write_string(1, 2, "Network").unwrap();
    sheet.write_string(1, 3, "Firewall misconfiguration").unwrap();

    // row 2 left empty

    sheet.write_number(3, 0, 2.0).unwrap();
    sheet.write_string(3, 1, "Low").unwrap();
    sheet.write_string(3, 2, "Network").unwrap();

    sheet.write_number(4, 0, 3.0).unwrap();
    sheet.write_string(4, 1, "High").unwrap();
    sheet.write_string(4, 2, "Data").unwrap();
    sheet.write_string(4, 3, "Unencrypted backups").unwrap();

    workbook.save_to_buffer().unwrap()
}

#[test]
fn upload_drops_empty_rows_and_fills_gaps() {
    let table = loader::load(&register_xlsx()).unwrap();

    assert_eq!(
        table.columns(),
        &["Risk ID", "Risk Level", "Risk Type", "Description"]
    );
    assert_eq!(table.len(), 3);
    assert_eq!(table.rows()[0][0].to_string(), "1");
    assert_eq!(table.rows()[1][3], CellValue::Placeholder);
    assert_eq!(table.rows()[1][3].to_string(), "-");
    assert!(
        table
            .rows()
            .iter()
            .all(|row| row.iter().any(|cell| *cell != CellValue::Placeholder))
    );
}

#[test]
fn load_path_reads_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("risks.xlsx");
    std::fs::write(&path, register_xlsx()).unwrap();

    assert_eq!(loader::load_path(&path).unwrap().len(), 3);
    assert!(matches!(
        loader::load_path(dir.path().join("missing.xlsx")),
        Err(LoadError::Io(_))
    ));
}

#[test]
fn english_dashboard_over_an_upload() {
    let table = loader::load(&register_xlsx()).unwrap();
    let texts = Locale::English.texts();

    let view = DashboardView::build(&table, &FilterSelection::default(), texts);
    assert_eq!(view.summary.total, 3);
    assert_eq!(view.summary.high_count, 2);
    assert_eq!(view.summary.percent_display(), "66.7%");

    let pie = view.pie.unwrap();
    assert_eq!(pie.start_angle, 90.0);
    let bar = view.bar.unwrap();
    assert_eq!(bar.categories[0].label, "Network");
    assert_eq!(bar.categories[0].count, 2);

    let network = FilterSelection::default().with_keyword("NETWORK");
    let view = DashboardView::build(&table, &network, texts);
    assert_eq!(view.filtered.len(), 2);
    assert_eq!(view.summary.high_count, 1);
    assert_eq!(view.summary.high_percent, 50.0);
}

#[test]
fn keyword_hits_any_column() {
    let table = loader::load(&register_xlsx()).unwrap();
    let hits = filter::search(&table, "backups");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits.rows()[0][2].to_string(), "Data");

    assert!(filter::search(&table, "no such risk").is_empty());
}

#[test]
fn filtering_everything_out_gives_zero_percent() {
    let table = loader::load(&register_xlsx()).unwrap();
    let texts = Locale::English.texts();
    let nothing = FilterSelection::default().with_types(Vec::<String>::new());

    let view = DashboardView::build(&table, &nothing, texts);
    assert!(view.filtered.is_empty());
    assert_eq!(view.summary.total, 0);
    assert_eq!(view.summary.high_percent, 0.0);
    assert!(view.pie.is_none());
    assert_eq!(view.type_options, vec!["Network", "Data"]);

    let stats = summary::summarize(&view.filtered, "Risk Level", "High");
    assert_eq!(stats.high_count, 0);
}

#[test]
fn xlsx_export_reloads_as_the_filtered_rows() {
    let table = loader::load(&register_xlsx()).unwrap();
    let texts = Locale::English.texts();
    let selection = FilterSelection::default().with_keyword("network");
    let view = DashboardView::build(&table, &selection, texts);
    assert_eq!(view.filtered.len(), 2);

    let exported = downloader::to_xlsx(&view.filtered).unwrap();
    let reloaded = loader::load(&exported).unwrap();

    // the placeholder is written out as its text
    let expected: Vec<Vec<CellValue>> = view
        .filtered
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    CellValue::Placeholder => CellValue::Text("-".to_string()),
                    other => other.clone(),
                })
                .collect()
        })
        .collect();

    assert_eq!(reloaded.columns(), view.filtered.columns());
    assert_eq!(reloaded.rows(), expected.as_slice());
}

#[test]
fn headers_and_whitespace_are_taken_as_written() {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Risk Level ").unwrap();
    sheet.write_string(0, 1, "Risk Type").unwrap();
    sheet.write_string(1, 0, "High").unwrap();
    sheet.write_string(1, 1, "Network").unwrap();
    sheet.write_string(2, 0, " ").unwrap();
    sheet.write_string(2, 1, " ").unwrap();
    sheet.write_string(3, 0, "Low").unwrap();
    sheet.write_string(3, 1, "Data").unwrap();
    let table = loader::load(&workbook.save_to_buffer().unwrap()).unwrap();

    assert_eq!(table.columns(), &["Risk Level ", "Risk Type"]);
    assert_eq!(table.len(), 3);
    assert_eq!(table.rows()[1][0], CellValue::Text(" ".to_string()));

    // "Risk Level " is not the level column, so only the type stage applies
    let texts = Locale::English.texts();
    let selection = FilterSelection::default()
        .with_levels(["Low"])
        .with_types(["Network", "Data"]);
    let view = DashboardView::build(&table, &selection, texts);
    assert_eq!(view.filtered.len(), 2);
    assert_eq!(view.summary.high_count, 0);
}

#[test]
fn pdf_export_of_an_upload() {
    let table = loader::load(&register_xlsx()).unwrap();
    let texts = Locale::English.texts();
    let bytes = downloader::to_pdf(&table, texts.report_title, "Report Date: 2024-05-01").unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}
