use std::io::Write;
use std::path::Path;

use minute_recon::{run, Minute, ReportError, Window};

fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn minute(s: &str) -> Minute {
    Minute::parse(s).unwrap()
}

#[test]
fn report_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let transactions = write_file(
        dir.path(),
        "transactions.csv",
        "timestamp,status,count\n\
         2024-01-01 00:00:00,approved,5\n\
         2024-01-01 00:00:00,denied,2\n\
         2024-01-01 00:01:00,approved,1\n",
    );
    let auth_codes = write_file(
        dir.path(),
        "transactions_auth_codes.csv",
        "timestamp,auth_code,count\n\
         2024-01-01 00:00:00,00,7\n\
         2024-01-01 00:00:00,05,3\n",
    );

    let report = run(&transactions, &auth_codes, Window::All).unwrap();
    assert_eq!(report.len(), 2);

    assert_eq!(report[0].ts, minute("2024-01-01 00:00"));
    assert_eq!(report[0].counts.approved, 5);
    assert_eq!(report[0].counts.denied, 2);
    assert_eq!(report[0].counts.refunded, 0);
    assert_eq!(report[0].auth_00_count, Some(7));

    assert_eq!(report[1].ts, minute("2024-01-01 00:01"));
    assert_eq!(report[1].counts.approved, 1);
    assert_eq!(report[1].auth_00_count, None);
}

#[test]
fn window_reaches_back_from_latest_auth_code() {
    let dir = tempfile::tempdir().unwrap();
    let transactions = write_file(
        dir.path(),
        "transactions.csv",
        "timestamp,status,count\n\
         2024-01-01 10:00,approved,1\n\
         2024-01-01 12:30,approved,1\n",
    );
    let auth_codes = write_file(
        dir.path(),
        "auth_codes.csv",
        "timestamp,auth_code,count\n\
         2024-01-01 13:00,91,1\n",
    );

    let report = run(&transactions, &auth_codes, Window::OneHour).unwrap();
    let minutes: Vec<_> = report.iter().map(|row| row.ts).collect();
    assert_eq!(minutes, [minute("2024-01-01 12:30")]);

    let report = run(&transactions, &auth_codes, Window::SixHours).unwrap();
    assert_eq!(report.len(), 2);
}

#[test]
fn missing_auth_codes_file() {
    let dir = tempfile::tempdir().unwrap();
    let transactions = write_file(dir.path(), "transactions.csv", "timestamp,status,count\n");

    let err = run(&transactions, &dir.path().join("missing.csv"), Window::All).unwrap_err();
    match err {
        ReportError::InputUnavailable { input, source } => {
            assert!(input.ends_with("missing.csv"));
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn malformed_row_fails_whole_run() {
    let dir = tempfile::tempdir().unwrap();
    let transactions = write_file(
        dir.path(),
        "transactions.csv",
        "timestamp,status,count\n\
         2024-01-01 00:00,approved,5\n\
         2024-01-01 00:01,approved,five\n",
    );
    let auth_codes = write_file(dir.path(), "auth_codes.csv", "timestamp,auth_code,count\n");

    let err = run(&transactions, &auth_codes, Window::All).unwrap_err();
    assert!(matches!(err, ReportError::Parse { line: 3, .. }));
    assert!(err.to_string().contains("transactions.csv"));
}

#[test]
fn header_only_transactions_give_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let transactions = write_file(dir.path(), "transactions.csv", "timestamp,status,count\n");
    let auth_codes = write_file(
        dir.path(),
        "auth_codes.csv",
        "timestamp,auth_code,count\n\
         2024-01-01 00:00,00,7\n",
    );

    assert!(run(&transactions, &auth_codes, Window::All).unwrap().is_empty());
}

#[test]
fn schema_error_names_the_column() {
    let dir = tempfile::tempdir().unwrap();
    let transactions = write_file(dir.path(), "transactions.csv", "timestamp,state,count\n");
    let auth_codes = write_file(dir.path(), "auth_codes.csv", "timestamp,auth_code,count\n");

    let err = run(&transactions, &auth_codes, Window::All).unwrap_err();
    assert!(matches!(err, ReportError::Schema { column: "status", .. }));
}
