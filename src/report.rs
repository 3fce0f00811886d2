use crate::record::{Minute, Status};

/// Possible errors to occur while accumulating counts
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("The counts for {ts} exceed the supported range")]
    CountOverflow { ts: Minute },
}

/// The number of transactions per recognized status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub approved: u64,
    pub denied: u64,
    pub reversed: u64,
    pub backend_reversed: u64,
    pub failed: u64,
    pub refunded: u64,
}

impl StatusCounts {
    /// The count for a single status
    pub fn get(&self, status: Status) -> u64 {
        match status {
            Status::Approved => self.approved,
            Status::Denied => self.denied,
            Status::Reversed => self.reversed,
            Status::BackendReversed => self.backend_reversed,
            Status::Failed => self.failed,
            Status::Refunded => self.refunded,
        }
    }

    /// Adds `count` to the sum of `status`
    ///
    /// Returns `None` if the sum would overflow, leaving the counts untouched.
    pub fn add(&mut self, status: Status, count: u64) -> Option<()> {
        let slot = match status {
            Status::Approved => &mut self.approved,
            Status::Denied => &mut self.denied,
            Status::Reversed => &mut self.reversed,
            Status::BackendReversed => &mut self.backend_reversed,
            Status::Failed => &mut self.failed,
            Status::Refunded => &mut self.refunded,
        };
        *slot = slot.checked_add(count)?;

        Some(())
    }
}

/// One minute of the reconciliation report
///
/// The row pairs the per-status transaction counts of a minute with the
/// number of `00` authorizations in the same minute. `auth_00_count` is
/// `None` if there was no `00` record at all for the minute, and `Some(0)`
/// if there were `00` records which happened to sum up to zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportRow {
    pub ts: Minute,
    pub counts: StatusCounts,
    pub auth_00_count: Option<u64>,
}

impl ReportRow {
    /// The report columns, in output order
    pub const COLUMNS: [&'static str; 8] = [
        "ts",
        "approved",
        "denied",
        "reversed",
        "backend_reversed",
        "failed",
        "refunded",
        "auth_00_count",
    ];
}

impl serde::Serialize for ReportRow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: serde::Serializer
    {
        use serde::ser::SerializeStruct;
        let mut map = serializer.serialize_struct("ReportRow", 8)?;

        map.serialize_field("ts", &self.ts)?;
        map.serialize_field("approved", &self.counts.approved)?;
        map.serialize_field("denied", &self.counts.denied)?;
        map.serialize_field("reversed", &self.counts.reversed)?;
        map.serialize_field("backend_reversed", &self.counts.backend_reversed)?;
        map.serialize_field("failed", &self.counts.failed)?;
        map.serialize_field("refunded", &self.counts.refunded)?;
        map.serialize_field("auth_00_count", &self.auth_00_count)?;

        map.end()
    }
}

/// Writes the rows as CSV, preceded by the header even if there are no rows
pub fn write_report<W: std::io::Write>(writer: W, rows: &[ReportRow]) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(ReportRow::COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Headline figures over a report window
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Summary {
    /// Transactions of every status, including unrecognized ones
    pub total_transactions: u64,
    pub approved: u64,
    /// `00` authorizations, including minutes without transaction activity
    pub auth_00: u64,
    /// Share of approved transactions in percent, `0` without transactions
    pub approval_rate: f64,
}

impl Summary {
    pub fn new(total_transactions: u64, approved: u64, auth_00: u64) -> Self {
        let approval_rate = match total_transactions {
            0 => 0.0,
            total => approved as f64 / total as f64 * 100.0,
        };

        Self {
            total_transactions,
            approved,
            auth_00,
            approval_rate,
        }
    }
}
