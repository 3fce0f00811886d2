use std::collections::BTreeMap;
use std::ops::Bound;

use log::debug;

use crate::{AggregateError, AuthCodeRecord, Minute, ReportRow, Status, StatusCounts, Summary, TransactionRecord};

/// How far back from the latest minute a report reaches
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Window {
    FifteenMinutes,
    OneHour,
    SixHours,
    /// No cutoff at all
    #[default]
    All,
}

impl Window {
    fn length(&self) -> Option<chrono::Duration> {
        match self {
            Window::FifteenMinutes => Some(chrono::Duration::minutes(15)),
            Window::OneHour => Some(chrono::Duration::hours(1)),
            Window::SixHours => Some(chrono::Duration::hours(6)),
            Window::All => None,
        }
    }

    /// The first minute inside the window ending at `latest`
    pub fn cutoff(&self, latest: Minute) -> Option<Minute> {
        let start = latest.datetime().checked_sub_signed(self.length()?)?;
        Minute::from_datetime(start)
    }
}

impl std::str::FromStr for Window {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "15m" => Ok(Window::FifteenMinutes),
            "1h" => Ok(Window::OneHour),
            "6h" => Ok(Window::SixHours),
            "all" => Ok(Window::All),
            other => Err(format!("unknown window `{other}`, expected one of 15m, 1h, 6h, all")),
        }
    }
}

/// The transaction counts collected for one minute
#[derive(Debug, Default)]
struct MinuteTally {
    counts: StatusCounts,
    /// Transactions with a status outside of [`Status`]
    unrecognized: u64,
}

/// Accumulates transaction and auth code records into per-minute reports
///
/// Both inputs are grouped independently. The join only happens when a
/// report is requested, and it is driven by the transactions: minutes that
/// only ever saw auth codes never show up as report rows.
#[derive(Debug, Default)]
pub struct MinuteAggregator {
    /// Transaction counts, keyed and therefore ordered by minute
    transactions: BTreeMap<Minute, MinuteTally>,
    /// The summed up `00` authorizations per minute
    approvals: BTreeMap<Minute, u64>,
    /// The latest minute seen in either input
    latest: Option<Minute>,
}

impl MinuteAggregator {
    /// Creates a new, empty aggregator
    pub fn new() -> Self {
        Self {
            transactions: BTreeMap::new(),
            approvals: BTreeMap::new(),
            latest: None,
        }
    }

    /// The latest minute seen in either input
    pub fn latest(&self) -> Option<Minute> {
        self.latest
    }

    /// Adds the count of one transaction record to its minute
    ///
    /// Records with an unrecognized status still open a report row for their
    /// minute, but they don't contribute to any of the status columns.
    pub fn add_transaction(&mut self, record: TransactionRecord) -> Result<(), AggregateError> {
        let ts = record.timestamp();
        self.observe(ts);
        let tally = self.transactions.entry(ts).or_default();

        match Status::from_label(record.status()) {
            Some(status) => tally
                .counts
                .add(status, record.count())
                .ok_or(AggregateError::CountOverflow { ts })?,
            None => {
                debug!("{ts}: leaving {} transactions with status `{}` out of the report", record.count(), record.status());
                tally.unrecognized = tally.unrecognized
                    .checked_add(record.count())
                    .ok_or(AggregateError::CountOverflow { ts })?;
            }
        }

        Ok(())
    }

    /// Adds the count of one auth code record to its minute
    ///
    /// Only `00` authorizations are counted, all other codes are ignored.
    pub fn add_auth_code(&mut self, record: AuthCodeRecord) -> Result<(), AggregateError> {
        let ts = record.timestamp();
        self.observe(ts);
        if !record.is_approval() {
            return Ok(());
        }

        let approvals = self.approvals.entry(ts).or_insert(0);
        *approvals = approvals
            .checked_add(record.count())
            .ok_or(AggregateError::CountOverflow { ts })?;

        Ok(())
    }

    /// The full report, one row per transaction minute in ascending order
    pub fn report(&self) -> Vec<ReportRow> {
        self.report_window(Window::All)
    }

    /// The report restricted to the minutes inside `window`
    pub fn report_window(&self, window: Window) -> Vec<ReportRow> {
        self.transactions
            .range((self.lower_bound(window), Bound::Unbounded))
            .map(|(&ts, tally)| ReportRow {
                ts,
                counts: tally.counts,
                auth_00_count: self.approvals.get(&ts).copied(),
            })
            .collect()
    }

    /// Headline figures over the minutes inside `window`
    pub fn summary(&self, window: Window) -> Result<Summary, AggregateError> {
        let lower = self.lower_bound(window);
        let mut total = 0u64;
        let mut approved = 0u64;
        for (&ts, tally) in self.transactions.range((lower, Bound::Unbounded)) {
            let minute_total = Status::ALL
                .into_iter()
                .try_fold(tally.unrecognized, |sum, status| sum.checked_add(tally.counts.get(status)));
            total = minute_total
                .and_then(|minute_total| total.checked_add(minute_total))
                .ok_or(AggregateError::CountOverflow { ts })?;
            approved = approved
                .checked_add(tally.counts.approved)
                .ok_or(AggregateError::CountOverflow { ts })?;
        }

        let mut auth_00 = 0u64;
        for (&ts, &count) in self.approvals.range((lower, Bound::Unbounded)) {
            auth_00 = auth_00
                .checked_add(count)
                .ok_or(AggregateError::CountOverflow { ts })?;
        }

        Ok(Summary::new(total, approved, auth_00))
    }

    fn observe(&mut self, ts: Minute) {
        self.latest = self.latest.max(Some(ts));
    }

    fn lower_bound(&self, window: Window) -> Bound<Minute> {
        match self.latest.and_then(|latest| window.cutoff(latest)) {
            Some(cutoff) => Bound::Included(cutoff),
            None => Bound::Unbounded,
        }
    }
}

/// Joins per-minute transaction counts with the `00` authorizations of the same minute
///
/// The result holds one row per distinct transaction minute, ordered by
/// minute. Minutes without any `00` authorization get an `auth_00_count` of
/// `None`.
pub fn aggregate<T, A>(transactions: T, auth_codes: A) -> Result<Vec<ReportRow>, AggregateError>
    where T: IntoIterator<Item = TransactionRecord>,
          A: IntoIterator<Item = AuthCodeRecord>,
{
    let mut aggregator = MinuteAggregator::new();
    for record in transactions {
        aggregator.add_transaction(record)?;
    }
    for record in auth_codes {
        aggregator.add_auth_code(record)?;
    }

    Ok(aggregator.report())
}
