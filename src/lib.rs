pub use self::{
    aggregator::{aggregate, MinuteAggregator, Window},
    load::{load_aggregator, load_auth_codes, load_transactions, read_auth_codes, read_transactions, run, ReportError, RowError},
    record::{AuthCodeRecord, FieldError, Minute, Status, TransactionRecord, APPROVAL_CODE},
    report::{write_report, AggregateError, ReportRow, StatusCounts, Summary},
};

mod aggregator;
mod load;
mod record;
mod report;
