use serde::{Deserialize, Serialize};

/// One extracted court case, flattened from the portal's nested grid.
///
/// Immutable once constructed. Records are appended to the run's result
/// sequence in discovery order and never deduplicated or re-sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Case number as displayed in the grid
    pub case_number: String,
    /// Absolute URL of the case detail page
    pub case_link: String,
    /// Case type column (e.g. "Criminal", "Civil")
    pub case_type: String,
    /// Court location column
    pub location: String,
    /// Party name as listed on the case row itself
    pub party_name: String,
}

/// Identity token for one party row on the current page.
///
/// The grid reflows on expand/collapse, so rows are always re-located by
/// this token, never by positional index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyHandle {
    /// The row's `data-uid` attribute, unique within a page
    pub uid: String,
}

impl PartyHandle {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into() }
    }
}

/// Address of one case row inside a party's nested table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseHandle {
    /// Owning party row's identity token
    pub party_uid: String,
    /// 1-based ordinal of the case row within the nested table
    pub row: usize,
}

/// Outcome of the page-level bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSignal {
    /// The results grid body is present
    Results,
    /// The "no results" banner is visible
    NoResults,
    /// Neither signal appeared before the deadline
    TimedOut,
}

/// Toggle state of a party row's expand control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandState {
    /// The "plus" icon is showing; the nested table is hidden
    Collapsed,
    /// The "minus" icon is showing; the nested table is revealed
    Expanded,
}

/// Result of asking the pager to move to the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerAdvance {
    /// The next-page control was enabled and was clicked
    Advanced,
    /// The control is missing or disabled; this was the last page
    Exhausted,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
