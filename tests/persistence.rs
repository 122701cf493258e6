use chrono::NaiveDate;
use risk_dashboard::saving::{self, PersistError};
use risk_dashboard::table::{CellValue, RiskTable};
use tempfile::tempdir;

fn filtered() -> RiskTable {
    RiskTable::new(
        vec!["Risk ID".into(), "Risk Level".into(), "Description".into()],
        vec![
            vec![
                CellValue::Number(1.0),
                "High".into(),
                "Firewall misconfiguration".into(),
            ],
            vec![CellValue::Number(3.0), "High".into(), CellValue::Placeholder],
        ],
    )
}

#[test]
fn persist_creates_timestamped_tables() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("risk_data.db");
    let stamp = NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();

    let first = saving::persist_at(&filtered(), &db, stamp).unwrap();
    let second = saving::persist_at(&filtered(), &db, stamp).unwrap();
    assert_eq!(first, "risk_20240501_093000");
    assert_eq!(second, "risk_20240501_093000_1");

    let tables = saving::list_tables(&db).unwrap();
    assert_eq!(tables, vec![first.clone(), second]);

    let stored = saving::load_table(&db, &first).unwrap();
    assert_eq!(stored.columns(), filtered().columns());
    assert_eq!(stored.len(), 2);
    assert_eq!(stored.rows()[0][0], CellValue::Number(1.0));
    assert_eq!(stored.rows()[1][2].to_string(), "-");
}

#[test]
fn persist_with_current_time_is_listed() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("risk_data.db");

    let name = saving::persist(&filtered(), &db).unwrap();
    assert!(saving::is_export_table(&name));
    assert!(saving::list_tables(&db).unwrap().contains(&name));
}

#[test]
fn mixed_columns_keep_their_display_text() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("risk_data.db");
    let table = RiskTable::new(
        vec!["Score".into()],
        vec![vec![CellValue::Number(9.0)], vec!["n/a".into()]],
    );

    let name = saving::persist(&table, &db).unwrap();
    let stored = saving::load_table(&db, &name).unwrap();
    assert_eq!(stored.rows()[0][0].to_string(), "9");
    assert_eq!(stored.rows()[1][0].to_string(), "n/a");
}

#[test]
fn unwritable_store_is_a_persist_error() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("no").join("such").join("dir").join("risk_data.db");

    let err = saving::persist(&filtered(), &db).unwrap_err();
    assert!(matches!(err, PersistError::Sqlite(_)));
}

#[test]
fn tables_without_columns_are_refused() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("risk_data.db");
    let err = saving::persist(&RiskTable::default(), &db).unwrap_err();
    assert!(matches!(err, PersistError::EmptyTable));
}

#[test]
fn foreign_table_names_are_rejected() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("risk_data.db");
    let err = saving::load_table(&db, "sqlite_master").unwrap_err();
    assert!(matches!(err, PersistError::InvalidTableName(_)));
}
