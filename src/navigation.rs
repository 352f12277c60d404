//! URL utilities
//!
//! Validation applied before a session navigates, and the domain a page
//! facade reports for its URL.

use crate::error::NavigationError;
use regex::Regex;
use std::sync::OnceLock;

/// Longest URL accepted for navigation
pub const MAX_URL_LENGTH: usize = 2048;

const WEB_URL_PATTERN: &str = r"((http|https)://)(www.)?[a-zA-Z0-9@:%._\+~#?&//=]{2,256}\.[a-z]{2,6}\b([-a-zA-Z0-9@:%._\+~#?&//=]*)";

static WEB_URL: OnceLock<Option<Regex>> = OnceLock::new();

/// URL validation utilities
pub struct UrlValidator;

impl UrlValidator {
    /// Validate a URL for navigation
    pub fn validate(url: &str) -> Result<(), NavigationError> {
        if url.is_empty() {
            return Err(NavigationError::InvalidUrl("URL cannot be empty".to_string()));
        }

        if !url.starts_with("http://")
            && !url.starts_with("https://")
            && !url.starts_with("file://")
            && url != "about:blank"
        {
            return Err(NavigationError::InvalidUrl(format!(
                "URL must start with http://, https://, or file://: {url}"
            )));
        }

        if url.len() > MAX_URL_LENGTH {
            return Err(NavigationError::InvalidUrl(format!(
                "URL exceeds maximum length of {MAX_URL_LENGTH} characters"
            )));
        }

        Ok(())
    }

    /// Whether `url` looks like a public web address (scheme, host and TLD)
    pub fn is_web_url(url: &str) -> bool {
        WEB_URL
            .get_or_init(|| Regex::new(WEB_URL_PATTERN).ok())
            .as_ref()
            .is_some_and(|re| re.is_match(url))
    }

    /// Host of `url`, with the port when one is given
    pub fn domain(url: &str) -> Option<String> {
        let parsed = url::Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        Some(match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }
}
