use crate::error::{Error, Result};

/// A single column-name heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnMatcher {
    /// Exact, case-sensitive name.
    Exact(&'static str),
    /// Lowercased name contains every fragment.
    ContainsAll(&'static [&'static str]),
}

impl ColumnMatcher {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            ColumnMatcher::Exact(expected) => name == *expected,
            ColumnMatcher::ContainsAll(fragments) => {
                let lower = name.to_lowercase();
                fragments.iter().all(|f| lower.contains(f))
            }
        }
    }
}

/// Ordered heuristics locating one column role in a provider table.
/// Earlier matchers win; within a matcher, the first column in table order wins.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMatchers {
    pub role: &'static str,
    pub matchers: &'static [ColumnMatcher],
}

impl ColumnMatchers {
    /// Time axis of a Meteomatics time series table.
    pub const TIME: ColumnMatchers = ColumnMatchers {
        role: "time",
        matchers: &[ColumnMatcher::Exact("validdate"), ColumnMatcher::Exact("time")],
    };

    /// Hourly precipitation values.
    pub const PRECIPITATION: ColumnMatchers = ColumnMatchers {
        role: "precipitation",
        matchers: &[ColumnMatcher::ContainsAll(&["precip", "1h"]), ColumnMatcher::ContainsAll(&["precip"])],
    };

    /// Index of the resolved column in `available`.
    pub fn resolve<S: AsRef<str>>(&self, available: &[S]) -> Result<usize> {
        self.matchers.iter()
            .find_map(|m| available.iter().position(|name| m.matches(name.as_ref())))
            .ok_or_else(|| Error::MissingColumn {
                role: self.role,
                available: available.iter().map(|s| s.as_ref().to_string()).collect(),
            })
    }
}
