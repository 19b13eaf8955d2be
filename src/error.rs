use chrono::NaiveDate;
use thiserror::Error;

/// Errors produced by the flood risk pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Every endpoint of an external provider failed.
    #[error("{service} unavailable after {attempts} attempts: {last}")]
    ProviderUnavailable { service: &'static str, attempts: usize, last: String },

    /// A provider table did not contain a column matching any heuristic.
    #[error("no {role} column found; available columns: {available:?}")]
    MissingColumn { role: &'static str, available: Vec<String> },

    /// Dryness was requested for a date outside the forecast horizon.
    #[error("date {date} outside supported window [{first}, {last}]")]
    OutOfWindow { date: NaiveDate, first: NaiveDate, last: NaiveDate },

    /// A required aggregate was missing or NaN.
    #[error("{0} could not be computed")]
    NotComputable(&'static str),

    /// Invalid input, rejected before any network call.
    #[error("invalid input: {0}")]
    Validation(String),

    /// None of the projection strategies produced a usable planar CRS.
    #[error("no projection strategy succeeded: {0}")]
    Projection(String),

    /// A provider returned a payload that could not be decoded.
    #[error("failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    /// A single transport failure.
    #[error("request to {url} failed: {reason}")]
    Http { url: String, reason: String },
}

impl Error {
    /// True for conditions where callers should fall back to the static index.
    pub fn is_not_computable(&self) -> bool {
        matches!(self, Error::OutOfWindow { .. } | Error::NotComputable(_))
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub(crate) fn decode(what: &'static str, reason: impl ToString) -> Self {
        Error::Decode { what, reason: reason.to_string() }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_kinds() {
        let d = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert!(Error::OutOfWindow { date: d, first: d, last: d }.is_not_computable());
        assert!(Error::NotComputable("et24").is_not_computable());
        assert!(!Error::validation("radius").is_not_computable());
    }

    #[test]
    fn missing_column_lists_available() {
        let err = Error::MissingColumn { role: "time", available: vec!["a".into(), "b".into()] };
        let msg = err.to_string();
        assert!(msg.contains("time") && msg.contains("\"a\"") && msg.contains("\"b\""));
    }
}
