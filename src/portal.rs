use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator, elements::Element};
use serde_json::json;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::driver::GLOBAL_DRIVER_MANAGER;
use crate::session::GridSession;
use crate::types::{CaseHandle, CaseRecord, ExpandState, PageSignal, PagerAdvance, PartyHandle};

/// Odyssey portal front page. Overridable with `--portal-url`.
pub const DEFAULT_PORTAL_URL: &str = "https://mycourts.idaho.gov/odysseyportal/";

// Search bootstrap locators. The smart-search link carries no id or class,
// so the absolute path is the only stable handle the page offers.
const SMART_SEARCH_LINK: &str = "/html/body/div[1]/div[3]/div/div[1]/a";
const SEARCH_INPUT: &str = "#caseCriteria_SearchCriteria";
const SUBMIT_BUTTON: &str = "#btnSSSubmit";

// Kendo grid locators. The grid marks top-level data rows with
// `k-master-row`; everything else in the tbody is grouping or detail
// chrome and is skipped.
const GRID_BODY: &str = "//div[@id='Grid']/table/tbody";
const NO_RESULTS_BANNER: &str =
    "//div[@id='partyNoResults' and not(contains(@style, 'display: none'))]";
const PAGER: &str = "//div[contains(@class, 'k-pager-wrap') and contains(@class, 'k-grid-pager')]";

fn party_rows_xpath() -> String {
    format!("{GRID_BODY}/tr[contains(@class, 'k-master-row')]")
}

fn party_name_xpath(uid: &str) -> String {
    format!("//tr[@data-uid='{uid}']//a[@class='partyDataLink']")
}

fn expand_control_xpath(uid: &str) -> String {
    format!(
        "//tr[@data-uid='{uid}']//a[contains(@class, 'k-icon k-minus') or contains(@class, 'k-icon k-plus')]"
    )
}

/// The nested case table always lives in the structural sibling row
/// immediately following its party row, addressed by the party's
/// `data-uid` rather than by position, since expansion reflows the grid.
fn nested_tbody_xpath(uid: &str) -> String {
    format!(
        "//tr[@data-uid='{uid}']/following-sibling::tr[1]//div[contains(@class, 'party-results-container')]//table/tbody"
    )
}

fn case_rows_xpath(uid: &str) -> String {
    format!(
        "{}/tr[contains(@class, 'k-master-row')]",
        nested_tbody_xpath(uid)
    )
}

fn case_row_xpath(case: &CaseHandle) -> String {
    format!(
        "({}/tr[contains(@class, 'k-master-row')])[{}]",
        nested_tbody_xpath(&case.party_uid),
        case.row
    )
}

fn next_button_xpath() -> String {
    format!("{PAGER}//a[contains(@class, 'k-i-arrow-e') and not(contains(@class, 'k-state-disabled'))]")
}

/// Supported browser types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserType {
    /// Mozilla Firefox
    Firefox,
    /// Google Chrome/Chromium
    Chrome,
}

impl std::str::FromStr for BrowserType {
    type Err = anyhow::Error;

    /// Parse browser type from string (case-insensitive)
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "firefox" => Ok(BrowserType::Firefox),
            "chrome" | "chromium" => Ok(BrowserType::Chrome),
            _ => anyhow::bail!("Unsupported browser: {}", s),
        }
    }
}

/// A live WebDriver session against the court-records portal.
///
/// Owns the browser for the duration of one search run; there is no safe
/// concurrent access, so everything on it is strictly sequential. The
/// caller is responsible for invoking [`Portal::close`] on every exit path.
pub struct Portal {
    client: Client,
    /// Shared budget for every bounded condition wait
    wait_timeout: Duration,
    poll_interval: Duration,
    /// Fixed pause after an expand click; the grid animates the nested
    /// table in and exposes nothing observable mid-animation
    expand_settle: Duration,
    /// Fixed pause after a page-advance click
    page_settle: Duration,
}

impl Portal {
    /// Connect a new browser session.
    ///
    /// Starts a WebDriver process if none is reachable. `headless` defaults
    /// off at the CLI because the operator has to see the CAPTCHA.
    pub async fn open(
        browser_type: BrowserType,
        headless: bool,
        wait_timeout: Duration,
    ) -> Result<Self> {
        info!("Connecting to {:?} WebDriver", browser_type);

        let webdriver_url = GLOBAL_DRIVER_MANAGER.ensure_driver(browser_type).await?;

        let mut caps = serde_json::Map::new();
        match browser_type {
            BrowserType::Firefox => {
                let mut args: Vec<String> = Vec::new();
                if headless {
                    args.push("--headless".to_string());
                }
                caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
            }
            BrowserType::Chrome => {
                let mut args = vec!["--no-sandbox".to_string()];
                if headless {
                    args.push("--headless=new".to_string());
                    args.push("--disable-gpu".to_string());
                    args.push("--disable-dev-shm-usage".to_string());
                }
                caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
            }
        }

        debug!("Connecting to WebDriver at {}", webdriver_url);
        let client = ClientBuilder::rustls()
            .capabilities(caps)
            .connect(&webdriver_url)
            .await
            .context("Failed to connect to WebDriver")?;

        Ok(Portal {
            client,
            wait_timeout,
            poll_interval: Duration::from_millis(250),
            expand_settle: Duration::from_secs(1),
            page_settle: Duration::from_secs(2),
        })
    }

    /// Navigate to the portal, open smart search and type the search name.
    /// Leaves the page sitting on the CAPTCHA, ready for the operator.
    pub async fn begin_search(&self, portal_url: &str, search_name: &str) -> Result<()> {
        self.goto(portal_url).await?;

        let link = self
            .wait_for_present(Locator::XPath(SMART_SEARCH_LINK))
            .await
            .context("Smart Search link did not appear")?;
        link.click().await.context("Failed to open Smart Search")?;

        let input = self
            .wait_for_present(Locator::Css(SEARCH_INPUT))
            .await
            .context("Search criteria input did not appear")?;
        input
            .send_keys(search_name)
            .await
            .context("Failed to type search name")?;

        Ok(())
    }

    /// Submit the prepared search. Call after the CAPTCHA gate.
    pub async fn submit_search(&self) -> Result<()> {
        let button = self
            .wait_for_present(Locator::Css(SUBMIT_BUTTON))
            .await
            .context("Submit button did not appear")?;
        button.click().await.context("Failed to submit search")?;
        Ok(())
    }

    /// Get the window out of the operator's way once the CAPTCHA is
    /// solved. Best-effort; some drivers reject window manipulation.
    pub async fn shrink_window(&self) {
        info!("Shrinking the browser window");
        if let Err(e) = self.client.set_window_size(640, 480).await {
            debug!("Could not resize browser window: {}", e);
        }
    }

    /// Close the browser session. Must run on every exit path.
    pub async fn close(self) -> Result<()> {
        self.client.close().await.context("Failed to close browser session")?;
        Ok(())
    }

    async fn goto(&self, url: &str) -> Result<()> {
        info!("Navigating to {}", url);
        self.client.goto(url).await?;

        // Wait for the document to settle so early lookups don't race the
        // initial render.
        let wait_script = "return document.readyState === 'complete';";
        for _ in 0..20 {
            match self.client.execute(wait_script, vec![]).await {
                Ok(val) if val.as_bool().unwrap_or(false) => break,
                _ => sleep(Duration::from_millis(100)).await,
            }
        }
        Ok(())
    }

    /// Poll until at least one element matches, up to the wait budget.
    async fn wait_for_present(&self, locator: Locator<'_>) -> Result<Element> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            if let Ok(element) = self.client.find(locator).await {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                anyhow::bail!("Timed out waiting for element: {:?}", locator);
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Poll until a match exists and reports itself displayed.
    async fn wait_for_visible(&self, xpath: &str) -> Result<()> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            if let Ok(element) = self.client.find(Locator::XPath(xpath)).await
                && element.is_displayed().await.unwrap_or(false)
            {
                return Ok(());
            }
            if Instant::now() >= deadline {
                anyhow::bail!("Timed out waiting for element to become visible: {}", xpath);
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn read_cell(&self, row_xpath: &str, column: usize) -> Result<String> {
        let cell = self
            .client
            .find(Locator::XPath(&format!("{row_xpath}/td[{column}]")))
            .await?;
        Ok(cell.text().await?)
    }
}

#[async_trait]
impl GridSession for Portal {
    async fn await_page(&self) -> PageSignal {
        // Race two mutually exclusive signals: the grid body appearing or
        // the "no results" banner becoming visible. The banner wins ties
        // since a present-but-empty grid still means no data.
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            if let Ok(banners) = self.client.find_all(Locator::XPath(NO_RESULTS_BANNER)).await
                && !banners.is_empty()
            {
                return PageSignal::NoResults;
            }
            if let Ok(bodies) = self.client.find_all(Locator::XPath(GRID_BODY)).await
                && !bodies.is_empty()
            {
                return PageSignal::Results;
            }
            if Instant::now() >= deadline {
                return PageSignal::TimedOut;
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn party_rows(&self) -> Result<Vec<PartyHandle>> {
        let rows = self
            .client
            .find_all(Locator::XPath(&party_rows_xpath()))
            .await
            .context("Failed to query party rows")?;

        let mut handles = Vec::with_capacity(rows.len());
        for row in &rows {
            match row.attr("data-uid").await {
                Ok(Some(uid)) => handles.push(PartyHandle::new(uid)),
                // Rows without an identity token are grid chrome, not data.
                Ok(None) => debug!("Skipping party row without data-uid"),
                Err(e) => debug!("Skipping unreadable party row: {}", e),
            }
        }
        Ok(handles)
    }

    async fn party_name(&self, party: &PartyHandle) -> Result<String> {
        let link = self
            .client
            .find(Locator::XPath(&party_name_xpath(&party.uid)))
            .await
            .context("Party name link not found in main grid")?;
        Ok(link.text().await?)
    }

    async fn expand_state(&self, party: &PartyHandle) -> Result<ExpandState> {
        let control = self
            .client
            .find(Locator::XPath(&expand_control_xpath(&party.uid)))
            .await
            .context("Expand control not found")?;
        let class = control
            .attr("class")
            .await?
            .unwrap_or_default();
        if class.contains("k-plus") {
            Ok(ExpandState::Collapsed)
        } else if class.contains("k-minus") {
            Ok(ExpandState::Expanded)
        } else {
            anyhow::bail!("Unrecognized expand control state: {class:?}")
        }
    }

    async fn expand(&self, party: &PartyHandle) -> Result<()> {
        let control = self
            .client
            .find(Locator::XPath(&expand_control_xpath(&party.uid)))
            .await
            .context("Expand control not found")?;
        control.click().await.context("Expand click failed")?;
        // The nested table animates in; give it a moment before the
        // visibility wait starts polling.
        sleep(self.expand_settle).await;
        Ok(())
    }

    async fn await_case_table(&self, party: &PartyHandle) -> Result<()> {
        self.wait_for_visible(&nested_tbody_xpath(&party.uid)).await
    }

    async fn case_rows(&self, party: &PartyHandle) -> Result<Vec<CaseHandle>> {
        let rows = self
            .client
            .find_all(Locator::XPath(&case_rows_xpath(&party.uid)))
            .await
            .context("Failed to query nested case rows")?;
        Ok((1..=rows.len())
            .map(|row| CaseHandle {
                party_uid: party.uid.clone(),
                row,
            })
            .collect())
    }

    async fn read_case(&self, case: &CaseHandle) -> Result<CaseRecord> {
        let base = case_row_xpath(case);

        let number_link = self
            .client
            .find(Locator::XPath(&format!("{base}/td[2]/a")))
            .await
            .context("Case number link not found")?;
        let case_number = number_link.text().await.context("Case number unreadable")?;
        let case_link = number_link
            .attr("href")
            .await
            .context("Case link unreadable")?
            .context("Case link missing href attribute")?;

        let case_type = self.read_cell(&base, 3).await.context("Case type unreadable")?;
        let location = self.read_cell(&base, 4).await.context("Location unreadable")?;
        let party_name = self.read_cell(&base, 5).await.context("Party name unreadable")?;

        Ok(CaseRecord {
            case_number,
            case_link,
            case_type,
            location,
            party_name,
        })
    }

    async fn advance_page(&self) -> Result<PagerAdvance> {
        // An enabled next control can lag the grid render, so poll for it
        // within the wait budget. A missed deadline means the control is
        // absent or stuck disabled: the last page.
        let xpath = next_button_xpath();
        let button = match self.wait_for_present(Locator::XPath(&xpath)).await {
            Ok(button) => button,
            Err(e) => {
                debug!("Next-page control never appeared: {e:#}");
                return Ok(PagerAdvance::Exhausted);
            }
        };
        button.click().await.context("Next-page click failed")?;
        sleep(self.page_settle).await;
        Ok(PagerAdvance::Advanced)
    }
}
