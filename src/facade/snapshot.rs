//! Snapshot facades over parsed HTML

use super::{blank_attrs, with_href, Attrs, Element, Page};
use crate::config::UserAgents;
use crate::error::{ElementError, Result};
use crate::logging::{self, Level, Logger};
use crate::navigation::UrlValidator;
use crate::session::Locator;
use reqwest::header::{ACCEPT, USER_AGENT};
use scraper::{ElementRef, Html, Selector};
use std::fmt;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";

/// Compile a locator into a CSS selector for the parser
fn compile(locator: &Locator) -> Result<Selector> {
    let css = locator
        .to_css()
        .ok_or_else(|| ElementError::UnsupportedLocator(locator.to_string()))?;
    Selector::parse(&css)
        .map_err(|e| ElementError::InvalidSelector(format!("{css}: {e}")).into())
}

/// Node of a parsed document, or the blank form.
#[derive(Clone)]
pub struct SnapshotElement<'a> {
    node: Option<ElementRef<'a>>,
    text: Option<String>,
    logger: Option<Logger>,
}

impl<'a> SnapshotElement<'a> {
    fn new(node: ElementRef<'a>, logger: Option<Logger>) -> Self {
        Self {
            text: Some(node.text().collect()),
            node: Some(node),
            logger,
        }
    }

    /// The "nothing found" element
    pub fn blank() -> Self {
        Self {
            node: None,
            text: None,
            logger: None,
        }
    }

    /// Tag name, `None` for a blank
    pub fn tag(&self) -> Option<&str> {
        self.node.map(|n| n.value().name())
    }

    /// Inner HTML, `None` for a blank
    pub fn inner_html(&self) -> Option<String> {
        self.node.map(|n| n.inner_html())
    }

    fn selector(&self, locator: &Locator) -> Option<Selector> {
        match compile(locator) {
            Ok(selector) => Some(selector),
            Err(e) => {
                self.log(Level::Warning, &e.to_string());
                None
            }
        }
    }
}

impl fmt::Debug for SnapshotElement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotElement")
            .field("tag", &self.tag())
            .field("text", &self.text)
            .finish()
    }
}

impl<'a> Element for SnapshotElement<'a> {
    fn find(&self, locator: &Locator) -> Self {
        let Some(node) = self.node else {
            return Self::blank();
        };
        self.log(Level::Debug, &format!("find: {locator}"));
        self.selector(locator)
            .and_then(|selector| node.select(&selector).next())
            .map_or_else(Self::blank, |el| Self::new(el, self.logger.clone()))
    }

    fn find_all(&self, locator: &Locator) -> Vec<Self> {
        let Some(node) = self.node else {
            return Vec::new();
        };
        self.log(Level::Debug, &format!("find_all: {locator}"));
        match self.selector(locator) {
            Some(selector) => node
                .select(&selector)
                .map(|el| Self::new(el, self.logger.clone()))
                .collect(),
            None => Vec::new(),
        }
    }

    fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.node.is_some_and(|n| n.value().attr(name).is_some())
    }

    fn get(&self, name: &str) -> Option<String> {
        self.node
            .and_then(|n| n.value().attr(name))
            .map(str::to_string)
    }

    fn attrs(&self) -> Attrs {
        match self.node {
            Some(n) => with_href(
                n.value()
                    .attrs()
                    .map(|(k, v)| (k.to_string(), v.to_string())),
            ),
            None => blank_attrs(),
        }
    }

    fn is_blank(&self) -> bool {
        self.node.is_none()
    }

    fn log(&self, level: Level, message: &str) {
        logging::log(self.logger.as_ref(), level, message);
    }
}

/// Parsed, immutable copy of a page's HTML.
pub struct SnapshotPage {
    url: String,
    html: Html,
    logger: Option<Logger>,
}

impl SnapshotPage {
    /// Parse a full document
    pub fn from_html(url: impl Into<String>, html: &str, logger: Option<Logger>) -> Self {
        Self {
            url: url.into(),
            html: Html::parse_document(html),
            logger,
        }
    }

    /// Parse an HTML fragment, such as an element's inner HTML
    pub fn from_fragment(url: impl Into<String>, html: &str, logger: Option<Logger>) -> Self {
        Self {
            url: url.into(),
            html: Html::parse_fragment(html),
            logger,
        }
    }

    /// Fetch `url` with a random user agent from `agents` and parse the body.
    ///
    /// Fails on a URL that cannot be navigated to. Addresses without a public
    /// host, and non-success statuses, are logged and fetched anyway.
    pub fn from_request(url: &str, agents: &UserAgents, logger: Option<Logger>) -> Result<Self> {
        logging::log(logger.as_ref(), Level::Debug, &format!("from_request: {url}"));
        UrlValidator::validate(url)?;
        if !UrlValidator::is_web_url(url) {
            logging::log(
                logger.as_ref(),
                Level::Warning,
                &format!("from_request: {url} is not a public web address"),
            );
        }
        let mut request = reqwest::blocking::Client::new()
            .get(url)
            .header(ACCEPT, ACCEPT_HTML);
        if let Some(agent) = agents.random() {
            request = request.header(USER_AGENT, agent);
        }
        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            logging::log(
                logger.as_ref(),
                Level::Warning,
                &format!("from_request: {url} answered {status}"),
            );
        }
        let body = response.text()?;
        Ok(Self::from_html(url, &body, logger))
    }

    /// Root element of the document
    pub fn root(&self) -> SnapshotElement<'_> {
        SnapshotElement::new(self.html.root_element(), self.logger.clone())
    }

    /// Parsed document
    pub fn html(&self) -> &Html {
        &self.html
    }

    fn selector(&self, locator: &Locator) -> Option<Selector> {
        match compile(locator) {
            Ok(selector) => Some(selector),
            Err(e) => {
                self.log(Level::Warning, &e.to_string());
                None
            }
        }
    }
}

impl fmt::Debug for SnapshotPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotPage")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl Page for SnapshotPage {
    type Element<'p> = SnapshotElement<'p>;

    fn url(&self) -> &str {
        &self.url
    }

    fn find(&self, locator: &Locator) -> SnapshotElement<'_> {
        self.log(Level::Debug, &format!("find: {locator}"));
        self.selector(locator)
            .and_then(|selector| self.html.select(&selector).next())
            .map_or_else(SnapshotElement::blank, |el| {
                SnapshotElement::new(el, self.logger.clone())
            })
    }

    fn find_all(&self, locator: &Locator) -> Vec<SnapshotElement<'_>> {
        self.log(Level::Debug, &format!("find_all: {locator}"));
        match self.selector(locator) {
            Some(selector) => self
                .html
                .select(&selector)
                .map(|el| SnapshotElement::new(el, self.logger.clone()))
                .collect(),
            None => Vec::new(),
        }
    }

    fn log(&self, level: Level, message: &str) {
        logging::log(self.logger.as_ref(), level, message);
    }
}
