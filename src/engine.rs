use tracing::{debug, info, warn};

use crate::session::GridSession;
use crate::types::{CaseRecord, ExpandState, PageSignal, PagerAdvance};

/// Name recorded for a party whose display name could not be read.
/// Name lookup is best-effort; the party's cases are still collected.
const UNKNOWN_PARTY: &str = "N/A";

/// What a traversal run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalReport {
    /// Extracted records, in discovery order
    pub records: Vec<CaseRecord>,
    /// Highest page ordinal reached (starts at 1)
    pub pages_visited: u32,
}

/// Walk every (party, case) pair across all result pages.
///
/// Starts from a session already positioned on the first results page and
/// returns whatever was collected, possibly nothing. This function never
/// fails: every recoverable problem is absorbed at the smallest unit that
/// can be skipped (one case row, one party, one page) with a logged
/// diagnostic, and every termination condition is a graceful completion.
///
/// Termination conditions, all equivalent to "no more data":
/// - the "no results" banner is visible
/// - the page-level wait times out
/// - a page renders zero party rows (first page: nothing found;
///   later page: pagination exhausted)
/// - the pager's next control is missing, disabled, or fails to click
pub async fn traverse<S: GridSession + ?Sized>(session: &S) -> TraversalReport {
    let mut records: Vec<CaseRecord> = Vec::new();
    let mut page_num: u32 = 1;

    loop {
        info!("Scraping page {} of party results", page_num);

        match session.await_page().await {
            PageSignal::NoResults => {
                info!("No search results matched the selection criteria");
                break;
            }
            PageSignal::TimedOut => {
                warn!("Timeout waiting for search results or 'no results' banner");
                break;
            }
            PageSignal::Results => {}
        }

        let parties = match session.party_rows().await {
            Ok(parties) => parties,
            Err(e) => {
                warn!("Could not enumerate party rows: {e:#}");
                break;
            }
        };

        if parties.is_empty() {
            if page_num == 1 {
                info!("No party results found");
            } else {
                // The grid exposes no total count; an empty later page is
                // the last-page signal.
                debug!("Page {} rendered no party rows", page_num);
            }
            break;
        }

        for party in &parties {
            let name = match session.party_name(party).await {
                Ok(name) => name,
                Err(e) => {
                    debug!("Party name not found in main grid: {e:#}");
                    UNKNOWN_PARTY.to_string()
                }
            };
            info!("Processing party: {name}");

            // Expansion is idempotent: only a collapsed row gets clicked.
            // A missing control or a failed click makes the nested table
            // unreachable, so the whole party is skipped.
            match session.expand_state(party).await {
                Ok(ExpandState::Expanded) => {}
                Ok(ExpandState::Collapsed) => {
                    if let Err(e) = session.expand(party).await {
                        warn!("Could not click expand control for party {name}: {e:#}");
                        continue;
                    }
                }
                Err(e) => {
                    warn!("No expand control for party {name}: {e:#}");
                    continue;
                }
            }

            if let Err(e) = session.await_case_table(party).await {
                warn!("Nested case table for party {name} never became visible: {e:#}");
                continue;
            }

            let cases = match session.case_rows(party).await {
                Ok(cases) => cases,
                Err(e) => {
                    warn!("Could not enumerate case rows for party {name}: {e:#}");
                    continue;
                }
            };

            for case in &cases {
                match session.read_case(case).await {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        warn!("Skipping malformed case row for party {name}: {e:#}");
                    }
                }
            }
        }

        match session.advance_page().await {
            Ok(PagerAdvance::Advanced) => page_num += 1,
            Ok(PagerAdvance::Exhausted) => {
                info!("No more pages of party results");
                break;
            }
            Err(e) => {
                // An unclickable pager is the normal end-of-results
                // condition, same as a disabled one.
                info!("No more pages of party results ({e:#})");
                break;
            }
        }
    }

    info!(
        "Traversal finished: {} record(s) across {} page(s)",
        records.len(),
        page_num
    );

    TraversalReport {
        records,
        pages_visited: page_num,
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;
