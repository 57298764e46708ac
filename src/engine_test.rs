// Unit tests for the traversal engine, driven by a scripted mock session.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use pretty_assertions::assert_eq;

use super::*;
use crate::session::GridSession;
use crate::types::{CaseHandle, PartyHandle};

fn rec(n: u32) -> CaseRecord {
    CaseRecord {
        case_number: format!("CR-{n:03}"),
        case_link: format!("https://example.gov/case/{n}"),
        case_type: "Criminal".to_string(),
        location: "Ada County".to_string(),
        party_name: format!("Party {n}"),
    }
}

struct MockParty {
    uid: &'static str,
    /// `None` simulates a failed name lookup in the main grid
    name: Option<&'static str>,
    /// Row starts out already expanded
    starts_expanded: bool,
    /// Expand control missing from the row entirely
    has_control: bool,
    /// Expand control present but the click fails
    click_fails: bool,
    /// `None` entries are malformed rows whose field read fails
    cases: Vec<Option<CaseRecord>>,
}

impl MockParty {
    fn plain(uid: &'static str, cases: Vec<Option<CaseRecord>>) -> Self {
        Self {
            uid,
            name: Some("Doe, Jane"),
            starts_expanded: false,
            has_control: true,
            click_fails: false,
            cases,
        }
    }
}

struct MockPage {
    no_results: bool,
    times_out: bool,
    parties: Vec<MockParty>,
}

impl MockPage {
    fn with_parties(parties: Vec<MockParty>) -> Self {
        Self {
            no_results: false,
            times_out: false,
            parties,
        }
    }

    fn no_results() -> Self {
        Self {
            no_results: true,
            times_out: false,
            parties: Vec::new(),
        }
    }

    fn timing_out() -> Self {
        Self {
            no_results: false,
            times_out: true,
            parties: Vec::new(),
        }
    }
}

#[derive(Default)]
struct MockState {
    current_page: usize,
    expand_clicks: usize,
    expanded: HashSet<String>,
}

struct MockSession {
    pages: Vec<MockPage>,
    /// Pager lookup fails even though more pages exist
    pager_fails: bool,
    state: Mutex<MockState>,
}

impl MockSession {
    fn new(pages: Vec<MockPage>) -> Self {
        let mut expanded = HashSet::new();
        for page in &pages {
            for party in &page.parties {
                if party.starts_expanded {
                    expanded.insert(party.uid.to_string());
                }
            }
        }
        Self {
            pages,
            pager_fails: false,
            state: Mutex::new(MockState {
                expanded,
                ..MockState::default()
            }),
        }
    }

    fn page(&self) -> &MockPage {
        &self.pages[self.state.lock().unwrap().current_page]
    }

    fn party(&self, uid: &str) -> Result<&MockParty> {
        self.page()
            .parties
            .iter()
            .find(|p| p.uid == uid)
            .ok_or_else(|| anyhow!("stale party uid {uid}"))
    }

    fn expand_clicks(&self) -> usize {
        self.state.lock().unwrap().expand_clicks
    }
}

#[async_trait]
impl GridSession for MockSession {
    async fn await_page(&self) -> PageSignal {
        let page = self.page();
        if page.times_out {
            PageSignal::TimedOut
        } else if page.no_results {
            PageSignal::NoResults
        } else {
            PageSignal::Results
        }
    }

    async fn party_rows(&self) -> Result<Vec<PartyHandle>> {
        Ok(self
            .page()
            .parties
            .iter()
            .map(|p| PartyHandle::new(p.uid))
            .collect())
    }

    async fn party_name(&self, party: &PartyHandle) -> Result<String> {
        self.party(&party.uid)?
            .name
            .map(str::to_string)
            .ok_or_else(|| anyhow!("party name link not found"))
    }

    async fn expand_state(&self, party: &PartyHandle) -> Result<ExpandState> {
        let mock = self.party(&party.uid)?;
        if !mock.has_control {
            return Err(anyhow!("expand control not found"));
        }
        if self.state.lock().unwrap().expanded.contains(&party.uid) {
            Ok(ExpandState::Expanded)
        } else {
            Ok(ExpandState::Collapsed)
        }
    }

    async fn expand(&self, party: &PartyHandle) -> Result<()> {
        let click_fails = self.party(&party.uid)?.click_fails;
        let mut state = self.state.lock().unwrap();
        state.expand_clicks += 1;
        if click_fails {
            return Err(anyhow!("expand click intercepted"));
        }
        state.expanded.insert(party.uid.clone());
        Ok(())
    }

    async fn await_case_table(&self, party: &PartyHandle) -> Result<()> {
        if self.state.lock().unwrap().expanded.contains(&party.uid) {
            Ok(())
        } else {
            Err(anyhow!("nested case table never became visible"))
        }
    }

    async fn case_rows(&self, party: &PartyHandle) -> Result<Vec<CaseHandle>> {
        let mock = self.party(&party.uid)?;
        Ok((1..=mock.cases.len())
            .map(|row| CaseHandle {
                party_uid: party.uid.to_string(),
                row,
            })
            .collect())
    }

    async fn read_case(&self, case: &CaseHandle) -> Result<CaseRecord> {
        self.party(&case.party_uid)?
            .cases
            .get(case.row - 1)
            .ok_or_else(|| anyhow!("stale case row"))?
            .clone()
            .ok_or_else(|| anyhow!("missing link attribute"))
    }

    async fn advance_page(&self) -> Result<PagerAdvance> {
        if self.pager_fails {
            return Err(anyhow!("timed out waiting for next-page control"));
        }
        let mut state = self.state.lock().unwrap();
        if state.current_page + 1 < self.pages.len() {
            state.current_page += 1;
            Ok(PagerAdvance::Advanced)
        } else {
            Ok(PagerAdvance::Exhausted)
        }
    }
}

#[tokio::test]
async fn no_results_banner_yields_empty_run() {
    let session = MockSession::new(vec![MockPage::no_results()]);

    let report = traverse(&session).await;

    assert_eq!(report.records, Vec::<CaseRecord>::new());
    assert_eq!(report.pages_visited, 1);
}

#[tokio::test]
async fn wait_timeout_is_graceful_completion() {
    let session = MockSession::new(vec![MockPage::timing_out()]);

    let report = traverse(&session).await;

    assert!(report.records.is_empty());
    assert_eq!(report.pages_visited, 1);
}

#[tokio::test]
async fn empty_first_page_terminates() {
    let session = MockSession::new(vec![MockPage::with_parties(vec![])]);

    let report = traverse(&session).await;

    assert!(report.records.is_empty());
    assert_eq!(report.pages_visited, 1);
}

#[tokio::test]
async fn empty_later_page_is_the_last_page_signal() {
    let session = MockSession::new(vec![
        MockPage::with_parties(vec![MockParty::plain("p1", vec![Some(rec(1))])]),
        MockPage::with_parties(vec![]),
    ]);

    let report = traverse(&session).await;

    assert_eq!(report.records, vec![rec(1)]);
    assert_eq!(report.pages_visited, 2);
}

#[tokio::test]
async fn already_expanded_party_is_never_reclicked() {
    let mut party = MockParty::plain("p1", vec![Some(rec(1))]);
    party.starts_expanded = true;
    let session = MockSession::new(vec![MockPage::with_parties(vec![party])]);

    let report = traverse(&session).await;

    assert_eq!(report.records, vec![rec(1)]);
    assert_eq!(session.expand_clicks(), 0);
}

#[tokio::test]
async fn collapsed_party_is_clicked_exactly_once() {
    let session = MockSession::new(vec![MockPage::with_parties(vec![MockParty::plain(
        "p1",
        vec![Some(rec(1)), Some(rec(2))],
    )])]);

    let report = traverse(&session).await;

    assert_eq!(report.records, vec![rec(1), rec(2)]);
    assert_eq!(session.expand_clicks(), 1);
}

#[tokio::test]
async fn malformed_case_row_does_not_affect_siblings() {
    let session = MockSession::new(vec![MockPage::with_parties(vec![MockParty::plain(
        "p1",
        vec![Some(rec(1)), None, Some(rec(3))],
    )])]);

    let report = traverse(&session).await;

    // The malformed row simply does not appear; order is preserved
    assert_eq!(report.records, vec![rec(1), rec(3)]);
}

#[tokio::test]
async fn expand_click_failure_skips_only_that_party() {
    let mut broken = MockParty::plain("p1", vec![Some(rec(1))]);
    broken.click_fails = true;
    let healthy = MockParty::plain("p2", vec![Some(rec(2))]);
    let session = MockSession::new(vec![MockPage::with_parties(vec![broken, healthy])]);

    let report = traverse(&session).await;

    assert_eq!(report.records, vec![rec(2)]);
}

#[tokio::test]
async fn missing_expand_control_skips_only_that_party() {
    let mut bare = MockParty::plain("p1", vec![Some(rec(1))]);
    bare.has_control = false;
    let healthy = MockParty::plain("p2", vec![Some(rec(2))]);
    let session = MockSession::new(vec![MockPage::with_parties(vec![bare, healthy])]);

    let report = traverse(&session).await;

    assert_eq!(report.records, vec![rec(2)]);
}

#[tokio::test]
async fn unnamed_party_still_yields_its_cases() {
    let mut party = MockParty::plain("p1", vec![Some(rec(1))]);
    party.name = None;
    let session = MockSession::new(vec![MockPage::with_parties(vec![party])]);

    let report = traverse(&session).await;

    assert_eq!(report.records, vec![rec(1)]);
}

#[tokio::test]
async fn traversal_halts_when_the_pager_reports_disabled() {
    let pages: Vec<MockPage> = (1..=4)
        .map(|n| {
            MockPage::with_parties(vec![MockParty::plain(
                match n {
                    1 => "p1",
                    2 => "p2",
                    3 => "p3",
                    _ => "p4",
                },
                vec![Some(rec(n))],
            )])
        })
        .collect();
    let session = MockSession::new(pages);

    let report = traverse(&session).await;

    assert_eq!(report.records, vec![rec(1), rec(2), rec(3), rec(4)]);
    assert_eq!(report.pages_visited, 4);
}

#[tokio::test]
async fn failing_pager_ends_traversal_gracefully() {
    // More pages exist, but the pager never becomes reachable; the run
    // keeps what it has and stops on the current page.
    let mut session = MockSession::new(vec![
        MockPage::with_parties(vec![MockParty::plain("p1", vec![Some(rec(1))])]),
        MockPage::with_parties(vec![MockParty::plain("p2", vec![Some(rec(2))])]),
    ]);
    session.pager_fails = true;

    let report = traverse(&session).await;

    assert_eq!(report.records, vec![rec(1)]);
    assert_eq!(report.pages_visited, 1);
}

#[tokio::test]
async fn two_page_scenario_collects_three_records() {
    // Page 1: one party with two cases, one party unreachable because its
    // expand click fails. Page 2: one party with one case.
    let mut unreachable = MockParty::plain("p2", vec![Some(rec(99))]);
    unreachable.click_fails = true;
    let session = MockSession::new(vec![
        MockPage::with_parties(vec![
            MockParty::plain("p1", vec![Some(rec(1)), Some(rec(2))]),
            unreachable,
        ]),
        MockPage::with_parties(vec![MockParty::plain("p3", vec![Some(rec(3))])]),
    ]);

    let report = traverse(&session).await;

    assert_eq!(report.records, vec![rec(1), rec(2), rec(3)]);
    assert_eq!(report.pages_visited, 2);
}
