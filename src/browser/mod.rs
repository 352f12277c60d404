//! Browser automation module
//!
//! A chromiumoxide-backed [`Session`](crate::Session): launch and shutdown,
//! tab bookkeeping, script execution and screenshots.

pub mod capture;
pub mod controller;
mod session;

pub use capture::{CaptureFormat, CaptureOptions};
pub use controller::{BrowserConfig, BrowserConfigBuilder, ChromiumSession};
