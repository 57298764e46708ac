//! # courtgrid
#![allow(clippy::uninlined_format_args)]
//!
//! CLI scraper for Odyssey court-records portals.
//!
//! Searches a portal by person name, walks the paginated party grid,
//! expands each party row's nested case table, and saves every extracted
//! case to a plain-text file.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Prompted for the name interactively
//! courtgrid
//!
//! # Or pass the name directly
//! courtgrid "Jane Doe"
//!
//! # Use Chrome instead of Firefox (default)
//! courtgrid "Jane Doe" --browser chrome
//!
//! # Point at a different Odyssey portal and raise the wait budget
//! courtgrid "Jane Doe" --portal-url "https://portal.example.gov/odysseyportal/" --wait-timeout 40
//!
//! # Save the results file somewhere other than the current directory
//! courtgrid "Jane Doe" --output-dir ~/court-results
//! ```
//!
//! The run pauses after the search name is typed: solve the CAPTCHA in the
//! browser window, then press Enter in the terminal to continue. Results
//! land in `<name>_results.txt` with one labeled block per case; no file is
//! written when the search finds nothing.
//!
//! ## Library Usage
//!
//! The traversal engine is decoupled from WebDriver behind the
//! [`GridSession`] trait, so it can be driven against any page source,
//! including mocks:
//!
//! ```no_run
//! use courtgrid::{Portal, BrowserType, traverse};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let portal = Portal::open(
//!     BrowserType::Firefox,
//!     false, // visible window; the CAPTCHA needs an operator
//!     std::time::Duration::from_secs(20),
//! ).await?;
//!
//! portal.begin_search(courtgrid::DEFAULT_PORTAL_URL, "Jane Doe").await?;
//! // ... CAPTCHA gate ...
//! portal.submit_search().await?;
//!
//! let report = traverse(&portal).await;
//! println!("{} records over {} pages", report.records.len(), report.pages_visited);
//! portal.close().await?;
//! # Ok(())
//! # }
//! ```

/// WebDriver process management (geckodriver, chromedriver)
pub mod driver;

/// The pagination + nested-expansion traversal algorithm
pub mod engine;

/// CLI error taxonomy with exit codes
pub mod errors;

/// Human-in-the-loop CAPTCHA checkpoint
pub mod gate;

/// Fantoccini-backed portal session and grid locators
pub mod portal;

/// The DOM operations the engine needs from a results page
pub mod session;

/// Flat-file record sink
pub mod sink;

/// Core data model
pub mod types;

pub use engine::{TraversalReport, traverse};
pub use errors::CourtgridError;
pub use portal::{BrowserType, DEFAULT_PORTAL_URL, Portal};
pub use session::GridSession;
pub use sink::TextSink;
pub use types::{CaseHandle, CaseRecord, ExpandState, PageSignal, PagerAdvance, PartyHandle};
