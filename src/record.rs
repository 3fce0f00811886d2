use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};

/// The auth code counted by the report
pub const APPROVAL_CODE: &str = "00";

/// A field of an input row that could not be parsed into its expected type
#[derive(Debug, thiserror::Error)]
#[error("cannot parse {field} from `{value}`")]
pub struct FieldError {
    pub field: &'static str,
    pub value: String,
}

impl FieldError {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_owned(),
        }
    }
}

/// A timestamp truncated to minute precision
///
/// Minutes are the grouping and join key of the report, so two records
/// falling into the same minute always land in the same bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Minute(NaiveDateTime);

impl Minute {
    const NAIVE_FORMATS: [&'static str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    /// Parses a date-time string and truncates it to the minute
    ///
    /// Accepted are `YYYY-MM-DD HH:MM[:SS[.f]]` (with either a space or a `T`
    /// as separator), RFC 3339 timestamps with an offset, which are converted
    /// to UTC, and bare dates, which are read as midnight.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let parsed = Self::NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
            .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })?;

        Self::from_datetime(parsed)
    }

    /// Truncates the date-time to the start of its minute
    pub fn from_datetime(datetime: NaiveDateTime) -> Option<Self> {
        datetime
            .with_second(0)
            .and_then(|dt| dt.with_nanosecond(0))
            .map(Self)
    }

    /// The start of the minute
    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }
}

impl std::fmt::Display for Minute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S"))
    }
}

impl serde::Serialize for Minute {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: serde::Serializer
    {
        serializer.collect_str(self)
    }
}

/// The transaction statuses broken out in the report
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Approved,
    Denied,
    Reversed,
    /// Reversed by the backend instead of the merchant
    BackendReversed,
    Failed,
    Refunded,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Approved,
        Status::Denied,
        Status::Reversed,
        Status::BackendReversed,
        Status::Failed,
        Status::Refunded,
    ];

    /// Looks up the status by its exact, case-sensitive label
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.label() == label)
    }

    /// The label used both in the input data and as the report column name
    pub fn label(&self) -> &'static str {
        match self {
            Status::Approved => "approved",
            Status::Denied => "denied",
            Status::Reversed => "reversed",
            Status::BackendReversed => "backend_reversed",
            Status::Failed => "failed",
            Status::Refunded => "refunded",
        }
    }
}

/// A pre-aggregated number of transactions with one status in one minute
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRecord {
    timestamp: Minute,
    status: String,
    count: u64,
}

impl TransactionRecord {
    pub fn new(timestamp: Minute, status: impl Into<String>, count: u64) -> Self {
        Self {
            timestamp,
            status: status.into(),
            count,
        }
    }

    /// Builds a record from the raw text fields of an input row
    pub fn parse(timestamp: &str, status: &str, count: &str) -> Result<Self, FieldError> {
        Ok(Self::new(parse_timestamp(timestamp)?, status.trim(), parse_count(count)?))
    }

    pub fn timestamp(&self) -> Minute {
        self.timestamp
    }

    /// The raw status, which may be outside of the recognized [`Status`]es
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

/// A pre-aggregated number of authorization responses with one code in one minute
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthCodeRecord {
    timestamp: Minute,
    auth_code: String,
    count: u64,
}

impl AuthCodeRecord {
    pub fn new(timestamp: Minute, auth_code: impl Into<String>, count: u64) -> Self {
        Self {
            timestamp,
            auth_code: auth_code.into(),
            count,
        }
    }

    /// Builds a record from the raw text fields of an input row
    ///
    /// The auth code stays text, so `00` and `0` remain distinct codes.
    pub fn parse(timestamp: &str, auth_code: &str, count: &str) -> Result<Self, FieldError> {
        Ok(Self::new(parse_timestamp(timestamp)?, auth_code.trim(), parse_count(count)?))
    }

    pub fn timestamp(&self) -> Minute {
        self.timestamp
    }

    pub fn auth_code(&self) -> &str {
        &self.auth_code
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Whether the record carries the approval code `00`
    pub fn is_approval(&self) -> bool {
        self.auth_code == APPROVAL_CODE
    }
}

fn parse_timestamp(value: &str) -> Result<Minute, FieldError> {
    Minute::parse(value).ok_or_else(|| FieldError::new("timestamp", value))
}

fn parse_count(value: &str) -> Result<u64, FieldError> {
    value
        .trim()
        .parse()
        .map_err(|_| FieldError::new("count", value))
}
