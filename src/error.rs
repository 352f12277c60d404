//! Error types for pagewait
//!
//! Driver-facing operations return [`Result`]. The wait engine and the task
//! layer turn expected failures (timeouts, transient absence) into `bool`
//! outcomes, so these errors mostly travel between the session backend and
//! the probes.

use thiserror::Error;

/// The main error type for pagewait operations
#[derive(Error, Debug)]
pub enum Error {
    /// Browser lifecycle errors
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Injected script errors
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    /// Element lookup and element reference errors
    #[error("Element error: {0}")]
    Element(#[from] ElementError),

    /// Navigation errors
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// Screenshot errors
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP errors while fetching static snapshots
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// ChromiumOxide errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Browser lifecycle and control errors
#[derive(Error, Debug)]
pub enum BrowserError {
    /// Failed to launch browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Browser configuration error
    #[error("Invalid browser configuration: {0}")]
    ConfigError(String),

    /// Browser connection lost
    #[error("Browser connection lost")]
    ConnectionLost,

    /// Failed to create new page/tab
    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    /// No tab with the given handle
    #[error("No such window handle: {0}")]
    NoSuchHandle(String),

    /// Browser has no open tab left to drive
    #[error("No active tab")]
    NoActiveTab,
}

/// Injected script errors
#[derive(Error, Debug)]
pub enum ScriptError {
    /// The script threw or could not be evaluated
    #[error("JavaScript execution failed: {0}")]
    ExecutionFailed(String),

    /// The script returned a value of an unexpected type
    #[error("Unexpected script result: expected {expected}, got {actual}")]
    UnexpectedResult {
        /// What the caller expected
        expected: &'static str,
        /// What the script returned
        actual: String,
    },
}

/// Element lookup errors
#[derive(Error, Debug)]
pub enum ElementError {
    /// Element not found
    #[error("Element not found: {0}")]
    NotFound(String),

    /// The element reference no longer maps to a live node
    #[error("Stale element reference: {0}")]
    Stale(String),

    /// Invalid selector
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Locator strategy not supported in this scope
    #[error("Unsupported locator: {0}")]
    UnsupportedLocator(String),
}

/// Navigation errors
#[derive(Error, Debug)]
pub enum NavigationError {
    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Page load failed
    #[error("Page load failed: {0}")]
    LoadFailed(String),
}

/// Screenshot errors
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Screenshot failed
    #[error("Screenshot capture failed: {0}")]
    ScreenshotFailed(String),

    /// Writing the screenshot to disk failed
    #[error("Failed to save screenshot to {path}: {reason}")]
    SaveFailed {
        /// Target path
        path: String,
        /// Underlying cause
        reason: String,
    },
}

/// Result type alias for pagewait operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }

    /// Create a CDP error from a string
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Create a stale element error
    pub fn stale<S: Into<String>>(msg: S) -> Self {
        Error::Element(ElementError::Stale(msg.into()))
    }

    /// Whether this error means an element reference went stale
    pub fn is_stale(&self) -> bool {
        matches!(self, Error::Element(ElementError::Stale(_)))
    }
}

/// CDP messages that mean the remote object behind an element is gone
const STALE_MARKERS: &[&str] = &[
    "Could not find node with given id",
    "No node with given id found",
    "Cannot find context with specified id",
    "Could not find object with given id",
    "Node is detached from document",
];

/// Convert chromiumoxide errors
impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        let message = err.to_string();
        if STALE_MARKERS.iter().any(|m| message.contains(m)) {
            Error::stale(message)
        } else {
            Error::Cdp(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Browser(BrowserError::LaunchFailed("no chrome".to_string()));
        assert!(err.to_string().contains("Failed to launch browser"));
        assert!(err.to_string().contains("no chrome"));
    }

    #[test]
    fn test_connection_lost() {
        let err = Error::from(BrowserError::ConnectionLost);
        assert_eq!(err.to_string(), "Browser error: Browser connection lost");
        assert!(!err.is_stale());
    }

    #[test]
    fn test_element_error() {
        let err = ElementError::NotFound("#missing".to_string());
        assert_eq!(err.to_string(), "Element not found: #missing");
    }

    #[test]
    fn test_stale_classification() {
        assert!(Error::stale("node gone").is_stale());
        assert!(!Error::generic("something else").is_stale());
        assert!(!Error::Element(ElementError::NotFound("x".into())).is_stale());
    }

    #[test]
    fn test_script_error() {
        let err = ScriptError::UnexpectedResult {
            expected: "number",
            actual: "\"abc\"".to_string(),
        };
        assert!(err.to_string().contains("expected number"));
    }

    #[test]
    fn test_generic_error() {
        let err = Error::generic("something went wrong");
        assert_eq!(err.to_string(), "something went wrong");
    }
}
