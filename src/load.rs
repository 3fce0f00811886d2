use std::fs::File;
use std::path::Path;

use log::info;

use crate::{AggregateError, AuthCodeRecord, FieldError, MinuteAggregator, ReportRow, TransactionRecord, Window};

/// Possible errors to occur while building a report from input files
///
/// Every error aborts the whole run. There are no partial reports.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Cannot read {input}")]
    InputUnavailable {
        input: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{input} is missing the column `{column}`")]
    Schema {
        input: String,
        column: &'static str,
    },
    #[error("{input}, line {line}: {source}")]
    Parse {
        input: String,
        line: u64,
        #[source]
        source: RowError,
    },
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Why a single input row could not be read
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error(transparent)]
    Field(#[from] FieldError),
    /// The row itself is broken, like a ragged row or invalid UTF-8
    #[error(transparent)]
    Csv(csv::Error),
}

/// The raw text fields of a transactions row
#[derive(Debug, serde::Deserialize)]
struct TransactionRow<'a> {
    timestamp: &'a str,
    status: &'a str,
    count: &'a str,
}

/// The raw text fields of an auth codes row
#[derive(Debug, serde::Deserialize)]
struct AuthCodeRow<'a> {
    timestamp: &'a str,
    auth_code: &'a str,
    count: &'a str,
}

/// Reads all transaction records from a CSV source
///
/// `input` names the source in error messages.
pub fn read_transactions<R: std::io::Read>(input: &str, reader: R) -> Result<Vec<TransactionRecord>, ReportError> {
    read_records(input, reader, &["timestamp", "status", "count"], |record, headers| {
        let row: TransactionRow = record.deserialize(Some(headers))?;
        Ok(TransactionRecord::parse(row.timestamp, row.status, row.count))
    })
}

/// Reads all auth code records from a CSV source
///
/// `input` names the source in error messages.
pub fn read_auth_codes<R: std::io::Read>(input: &str, reader: R) -> Result<Vec<AuthCodeRecord>, ReportError> {
    read_records(input, reader, &["timestamp", "auth_code", "count"], |record, headers| {
        let row: AuthCodeRow = record.deserialize(Some(headers))?;
        Ok(AuthCodeRecord::parse(row.timestamp, row.auth_code, row.count))
    })
}

/// Reads all transaction records from a CSV file
pub fn load_transactions(path: &Path) -> Result<Vec<TransactionRecord>, ReportError> {
    let input = path.display().to_string();
    let records = read_transactions(&input, open(&input, path)?)?;
    info!("loaded {} transaction records from {input}", records.len());

    Ok(records)
}

/// Reads all auth code records from a CSV file
pub fn load_auth_codes(path: &Path) -> Result<Vec<AuthCodeRecord>, ReportError> {
    let input = path.display().to_string();
    let records = read_auth_codes(&input, open(&input, path)?)?;
    info!("loaded {} auth code records from {input}", records.len());

    Ok(records)
}

/// Builds the report for `window` out of a transactions and an auth codes file
///
/// Both files are loaded side by side. Joining starts once both are in.
pub fn run(transactions: &Path, auth_codes: &Path, window: Window) -> Result<Vec<ReportRow>, ReportError> {
    let aggregator = load_aggregator(transactions, auth_codes)?;

    Ok(aggregator.report_window(window))
}

/// Loads both files into a [`MinuteAggregator`]
pub fn load_aggregator(transactions: &Path, auth_codes: &Path) -> Result<MinuteAggregator, ReportError> {
    let (transaction_records, auth_code_records) = std::thread::scope(|scope| {
        let auth_code_loader = scope.spawn(|| load_auth_codes(auth_codes));
        let transaction_records = load_transactions(transactions);
        let auth_code_records = auth_code_loader
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
        (transaction_records, auth_code_records)
    });

    let mut aggregator = MinuteAggregator::new();
    for record in transaction_records? {
        aggregator.add_transaction(record)?;
    }
    for record in auth_code_records? {
        aggregator.add_auth_code(record)?;
    }

    Ok(aggregator)
}

fn open(input: &str, path: &Path) -> Result<File, ReportError> {
    File::open(path).map_err(|source| ReportError::InputUnavailable {
        input: input.to_owned(),
        source,
    })
}

/// Reads every row of `reader`, turning each one into a record with `parse`
///
/// `parse` gets the row and the header. Its outer error is a structural CSV
/// problem, the inner one a field which could not be parsed.
fn read_records<R, T, F>(input: &str, reader: R, columns: &[&'static str], parse: F) -> Result<Vec<T>, ReportError>
    where R: std::io::Read,
          F: Fn(&csv::StringRecord, &csv::StringRecord) -> Result<Result<T, FieldError>, csv::Error>,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|source| csv_error(input, source))?
        .clone();

    // an empty source has no header at all, and simply no records
    if !headers.is_empty() {
        if let Some(column) = columns.iter().find(|column| !headers.iter().any(|header| header == **column)) {
            return Err(ReportError::Schema {
                input: input.to_owned(),
                column: *column,
            });
        }
    }

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| csv_error(input, source))?;
        let line = record.position().map_or(0, csv::Position::line);
        let parsed = parse(&record, &headers).map_err(|source| csv_error(input, source))?;
        records.push(parsed.map_err(|source| ReportError::Parse {
            input: input.to_owned(),
            line,
            source: source.into(),
        })?);
    }

    Ok(records)
}

fn csv_error(input: &str, source: csv::Error) -> ReportError {
    if source.is_io_error() {
        return ReportError::InputUnavailable {
            input: input.to_owned(),
            source: source.into(),
        };
    }

    ReportError::Parse {
        input: input.to_owned(),
        line: source.position().map_or(0, csv::Position::line),
        source: RowError::Csv(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column() {
        let err = read_auth_codes("auth codes", "timestamp,code,count\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ReportError::Schema { column: "auth_code", .. }));
        assert_eq!(err.to_string(), "auth codes is missing the column `auth_code`");
    }

    #[test]
    fn header_only_and_empty_sources() {
        assert!(read_transactions("transactions", "timestamp,status,count\n".as_bytes()).unwrap().is_empty());
        assert!(read_transactions("transactions", "".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn columns_in_any_order() {
        let records = read_transactions(
            "transactions",
            "count,extra,status,timestamp\n3,x,denied,2024-01-01 00:00\n".as_bytes(),
        ).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status(), "denied");
        assert_eq!(records[0].count(), 3);
    }

    #[test]
    fn bad_count_names_line_and_value() {
        let data = "timestamp,status,count\n\
                    2024-01-01 00:00,approved,1\n\
                    2024-01-01 00:01,approved,many\n\
                    2024-01-01 00:02,approved,2\n";
        let err = read_transactions("transactions", data.as_bytes()).unwrap_err();
        match &err {
            ReportError::Parse { line, source: RowError::Field(field), .. } => {
                assert_eq!(*line, 3);
                assert_eq!(field.field, "count");
                assert_eq!(field.value, "many");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "transactions, line 3: cannot parse count from `many`");
    }

    #[test]
    fn bad_timestamp_aborts() {
        let data = "timestamp,auth_code,count\nsoon,00,1\n";
        let err = read_auth_codes("auth codes", data.as_bytes()).unwrap_err();
        assert!(matches!(err, ReportError::Parse { line: 2, .. }));
    }

    #[test]
    fn ragged_row_is_parse_error() {
        let data = "timestamp,status,count\n2024-01-01 00:00,approved,1\n2024-01-01 00:00,approved\n";
        let err = read_transactions("transactions", data.as_bytes()).unwrap_err();
        assert!(matches!(err, ReportError::Parse { line: 3, source: RowError::Csv(_), .. }));
    }

    #[test]
    fn invalid_utf8_is_parse_error() {
        let data = b"timestamp,status,count\n2024-01-01 00:00,\xff\xfe,1\n";
        let err = read_transactions("transactions", &data[..]).unwrap_err();
        assert!(matches!(err, ReportError::Parse { line: 2, source: RowError::Csv(_), .. }));
    }

    #[test]
    fn leading_zeros_of_auth_codes_survive() {
        let data = "timestamp,auth_code,count\n2024-01-01 00:00,00,1\n2024-01-01 00:00,0,1\n";
        let records = read_auth_codes("auth codes", data.as_bytes()).unwrap();
        let codes: Vec<_> = records.iter().map(AuthCodeRecord::auth_code).collect();
        assert_eq!(codes, ["00", "0"]);
    }

    #[test]
    fn missing_file() {
        let err = load_transactions(Path::new("/nonexistent/transactions.csv")).unwrap_err();
        assert!(matches!(err, ReportError::InputUnavailable { .. }));
    }
}
