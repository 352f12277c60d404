//! pagewait - Wait-then-act browser automation
//!
//! Scraping code spends most of its effort waiting: for a URL to change,
//! an element to appear, a tab to open, a page to stop growing. This crate
//! turns "wait for a condition, then act" into single operations that either
//! succeed or report `false` after a bounded time, instead of hand-rolled
//! polling loops.
//!
//! # Architecture
//!
//! ```text
//! LivePage / LiveElement ──▶ task ──▶ wait ──▶ probe ──▶ Session
//!         │                                               │
//!         ▼                                               ▼
//! SnapshotPage / SnapshotElement               ChromiumSession (CDP)
//!   (scraper, never waits)
//! ```
//!
//! - [`wait`]: the condition-wait engine and its built-in conditions
//! - [`task`]: mutate the session, then confirm through the engine
//! - [`facade`]: element and page wrappers, live and snapshot
//! - [`browser`]: the chromiumoxide session backend
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pagewait::browser::ChromiumSession;
//! use pagewait::facade::{Element, LivePage, Page, PageOptions};
//! use pagewait::task::UrlMatch;
//! use pagewait::Locator;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = ChromiumSession::launch_default()?;
//!
//!     let page = LivePage::from_url(
//!         &session,
//!         "https://example.com",
//!         &UrlMatch::Exact,
//!         PageOptions::default(),
//!     );
//!     let heading = page.find(&Locator::tag_name("h1"));
//!     println!("{:?}", heading.text());
//!
//!     session.close()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod browser;
pub mod config;
pub mod error;
pub mod facade;
pub mod logging;
pub mod navigation;
pub mod probe;
pub mod script;
pub mod session;
pub mod task;
pub mod wait;

// Re-exports for convenience
pub use browser::{BrowserConfig, ChromiumSession};
pub use config::{Delay, UserAgent, UserAgents, WaitConfig};
pub use error::{Error, Result};
pub use logging::{Level, Logger};
pub use session::{By, ElementRect, Handle, Locator, Session};
pub use wait::{wait_until, Condition, FnPredicate, Predicate, WaitOptions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
