use anyhow::Result;
use async_trait::async_trait;

use crate::types::{CaseHandle, CaseRecord, ExpandState, PageSignal, PartyHandle};

/// The DOM operations the traversal engine needs from a results page.
///
/// The real implementation drives a WebDriver session against the portal's
/// Kendo grid; tests substitute a scripted mock. Every method takes `&self`
/// and re-queries the page, because the grid reflows on expand/collapse and
/// cached element references go stale.
///
/// Granularity matters for the failure policy: each method is the smallest
/// unit the engine can skip independently. A failing `read_case` discards
/// one case row; a failing `expand` discards one party; a failing
/// `party_rows` ends the page.
#[async_trait]
pub trait GridSession {
    /// Block until the results grid body is present or the "no results"
    /// banner is visible, whichever comes first, up to the session's wait
    /// budget. Never errors; a missed deadline is reported as
    /// [`PageSignal::TimedOut`].
    async fn await_page(&self) -> PageSignal;

    /// All top-level party rows currently rendered, in DOM order,
    /// excluding decorative and placeholder rows.
    async fn party_rows(&self) -> Result<Vec<PartyHandle>>;

    /// The party's display name from the main grid.
    async fn party_name(&self, party: &PartyHandle) -> Result<String>;

    /// Current state of the party row's expand/collapse control.
    /// Errors when the control is missing from the row.
    async fn expand_state(&self, party: &PartyHandle) -> Result<ExpandState>;

    /// Click the expand control of a collapsed party row.
    async fn expand(&self, party: &PartyHandle) -> Result<()>;

    /// Block until the party's nested case table is visible, up to the
    /// session's wait budget.
    async fn await_case_table(&self, party: &PartyHandle) -> Result<()>;

    /// Handles for the case rows inside the party's nested table, again
    /// filtered to top-level data rows.
    async fn case_rows(&self, party: &PartyHandle) -> Result<Vec<CaseHandle>>;

    /// Read all five record fields from one nested case row. Any missing
    /// field fails the whole read; the engine never sees partial records.
    async fn read_case(&self, case: &CaseHandle) -> Result<CaseRecord>;

    /// Click the pager's next-page control if it exists and is enabled.
    async fn advance_page(&self) -> Result<crate::types::PagerAdvance>;
}
