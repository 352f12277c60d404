//! Live facades over a browser session

use super::{blank_attrs, with_href, Attrs, Element, Page, SnapshotElement, SnapshotPage};
use crate::config::{Delay, WaitConfig};
use crate::error::Result;
use crate::logging::{self, Level, Logger};
use crate::probe;
use crate::script;
use crate::session::{ElementRect, Handle, Locator, Session};
use crate::task::{self, UrlMatch};
use crate::wait::{self, WaitOptions};
use serde_json::Value;
use std::cell::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How many times a lookup is repeated after its result went stale
const STALE_RETRIES: usize = 1;

/// Attribute used to tag a parent node so it can be looked up
const PARENT_MARKER: &str = "data-pagewait-parent";

fn report(logger: Option<&Logger>, operation: &str, err: &crate::Error) {
    logging::log(logger, Level::Exception, &format!("{operation}: {err}"));
}

/// `(attempt + 1) × big`, saturating instead of overflowing
fn backoff(big: Duration, attempt: usize) -> Duration {
    let factor = u32::try_from(attempt.saturating_add(1)).unwrap_or(u32::MAX);
    big.saturating_mul(factor)
}

/// Find below `within` and wrap the result, repeating once on a stale reference
///
/// Wrapped elements run their own lookups with the `lookup` budget.
fn find_wrapped<'s, S: Session>(
    session: &'s S,
    within: Option<&S::Element>,
    locator: &Locator,
    options: &WaitOptions,
    lookup: Duration,
) -> LiveElement<'s, S> {
    let logger = options.logger.as_ref();
    for attempt in 0..=STALE_RETRIES {
        let Some(found) = task::find(session, within, locator, options) else {
            break;
        };
        match LiveElement::wrap(session, found, options.clone()) {
            Ok(element) => return element.with_lookup_wait(lookup),
            Err(e) if e.is_stale() && attempt < STALE_RETRIES => report(logger, "find", &e),
            Err(e) => {
                report(logger, "find", &e);
                break;
            }
        }
    }
    LiveElement::blank(session, options.clone()).with_lookup_wait(lookup)
}

/// Find all below `within` and wrap them, repeating once on a stale reference
fn find_all_wrapped<'s, S: Session>(
    session: &'s S,
    within: Option<&S::Element>,
    locator: &Locator,
    options: &WaitOptions,
    lookup: Duration,
) -> Vec<LiveElement<'s, S>> {
    let logger = options.logger.as_ref();
    for attempt in 0..=STALE_RETRIES {
        let wrapped: Result<Vec<_>> = task::find_all(session, within, locator, options)
            .into_iter()
            .map(|found| {
                LiveElement::wrap(session, found, options.clone())
                    .map(|element| element.with_lookup_wait(lookup))
            })
            .collect();
        match wrapped {
            Ok(elements) => return elements,
            Err(e) if e.is_stale() && attempt < STALE_RETRIES => report(logger, "find_all", &e),
            Err(e) => {
                report(logger, "find_all", &e);
                break;
            }
        }
    }
    Vec::new()
}

/// Session element with the text and geometry read when it was found.
pub struct LiveElement<'s, S: Session> {
    session: &'s S,
    element: Option<S::Element>,
    text: Option<String>,
    rect: ElementRect,
    options: WaitOptions,
    lookup: Duration,
}

impl<'s, S: Session> LiveElement<'s, S> {
    /// Wrap a session element, reading its text and geometry.
    ///
    /// Scoped lookups below it wait the default normal budget until
    /// [`with_lookup_wait`](Self::with_lookup_wait) says otherwise. Fails
    /// when the reference is already stale.
    pub fn wrap(session: &'s S, element: S::Element, options: WaitOptions) -> Result<Self> {
        let text = session.text(&element)?;
        let rect = session.rect(&element)?;
        Ok(Self {
            session,
            element: Some(element),
            text: Some(text),
            rect,
            options,
            lookup: WaitConfig::default().normal(),
        })
    }

    /// The "nothing found" element
    pub fn blank(session: &'s S, options: WaitOptions) -> Self {
        Self {
            session,
            element: None,
            text: None,
            rect: ElementRect::default(),
            options,
            lookup: WaitConfig::default().normal(),
        }
    }

    /// Budget for [`Element::find`] and [`Element::find_all`] below this element
    pub fn with_lookup_wait(mut self, lookup: Duration) -> Self {
        self.lookup = lookup;
        self
    }

    /// Underlying session element, `None` for a blank
    pub fn element(&self) -> Option<&S::Element> {
        self.element.as_ref()
    }

    /// Location and size read at construction
    pub fn rect(&self) -> ElementRect {
        self.rect
    }

    fn logger(&self) -> Option<&Logger> {
        self.options.logger.as_ref()
    }

    /// [`Element::find`] with an explicit wait
    pub fn find_wait(&self, locator: &Locator, wait: Duration) -> Self {
        match &self.element {
            Some(scope) => {
                let options = self.options.with_timeout(wait);
                find_wrapped(self.session, Some(scope), locator, &options, self.lookup)
            }
            None => self.blank_like(),
        }
    }

    /// [`Element::find_all`] with an explicit wait
    pub fn find_all_wait(&self, locator: &Locator, wait: Duration) -> Vec<Self> {
        match &self.element {
            Some(scope) => {
                let options = self.options.with_timeout(wait);
                find_all_wrapped(self.session, Some(scope), locator, &options, self.lookup)
            }
            None => Vec::new(),
        }
    }

    /// Click through script
    pub fn click(&self) -> bool {
        match &self.element {
            Some(el) => task::click_element(self.session, el, self.logger()),
            None => false,
        }
    }

    /// Parent element; blank at the document root
    pub fn parent(&self) -> Self {
        let Some(el) = &self.element else {
            return self.blank_like();
        };
        match self.locate_parent(el) {
            Ok(Some(parent)) => parent,
            Ok(None) => self.blank_like(),
            Err(e) => {
                report(self.logger(), "parent", &e);
                self.blank_like()
            }
        }
    }

    fn locate_parent(&self, el: &S::Element) -> Result<Option<Self>> {
        let mark = rand::random::<u64>().to_string();
        let args = [Value::from(PARENT_MARKER), Value::from(mark.as_str())];
        if !probe::as_bool(self.session.run_script_on(el, script::MARK_PARENT, &args)?)? {
            return Ok(None);
        }
        let locator = Locator::css(format!("[{PARENT_MARKER}=\"{mark}\"]"));
        let Some(parent) = self.session.find(None, &locator)? else {
            return Ok(None);
        };
        self.session
            .run_script_on(&parent, script::UNMARK, &[Value::from(PARENT_MARKER)])?;
        Self::wrap(self.session, parent, self.options.clone())
            .map(|parent| Some(parent.with_lookup_wait(self.lookup)))
    }

    fn blank_like(&self) -> Self {
        Self::blank(self.session, self.options.clone()).with_lookup_wait(self.lookup)
    }

    /// Scroll down by half the viewport, clamped to the scroll height
    pub fn scroll_down(&self, wait: Duration) -> bool {
        self.scroll("scroll_down", wait, |session, el, position| {
            let viewport = probe::viewport_height(session)?;
            let height = probe::scroll_height(session, Some(el))?;
            Ok((position + viewport / 2).min(height))
        })
    }

    /// Scroll to `position`
    pub fn scroll_to(&self, position: i64, wait: Duration) -> bool {
        self.scroll("scroll_to", wait, |_, _, _| Ok(position))
    }

    /// Scroll to the bottom and wait for the scroll height to grow
    pub fn scroll_to_bottom(&self, wait: Duration) -> bool {
        self.log(Level::Debug, "scroll_to_bottom");
        let Some(el) = &self.element else {
            return false;
        };
        let moved = probe::scroll_height(self.session, Some(el))
            .and_then(|height| probe::scroll_element_to(self.session, el, height).map(|()| height));
        match moved {
            Ok(height) => wait::scroll_height_changed(
                self.session,
                Some(el),
                height,
                &self.options.with_timeout(wait),
            ),
            Err(e) => {
                report(self.logger(), "scroll_to_bottom", &e);
                false
            }
        }
    }

    fn scroll<F>(&self, name: &str, wait: Duration, target: F) -> bool
    where
        F: FnOnce(&S, &S::Element, i64) -> Result<i64>,
    {
        self.log(Level::Debug, name);
        let Some(el) = &self.element else {
            return false;
        };
        let moved = probe::scroll_position(self.session, el).and_then(|position| {
            let next = target(self.session, el, position)?;
            probe::scroll_element_to(self.session, el, next)?;
            Ok(position)
        });
        match moved {
            Ok(previous) => wait::scroll_position_changed(
                self.session,
                el,
                previous,
                &self.options.with_timeout(wait),
            ),
            Err(e) => {
                report(self.logger(), name, &e);
                false
            }
        }
    }

    /// Inner HTML, `None` for a blank or on driver failure
    pub fn inner_html(&self) -> Option<String> {
        let el = self.element.as_ref()?;
        probe::inner_html(self.session, el)
            .map_err(|e| report(self.logger(), "inner_html", &e))
            .ok()
    }

    /// Parse the element's inner HTML into a snapshot
    pub fn to_snapshot(&self) -> SnapshotPage {
        let url = self.session.current_url().unwrap_or_default();
        let html = self.inner_html().unwrap_or_default();
        SnapshotPage::from_fragment(url, &html, self.options.logger.clone())
    }
}

impl<S: Session> Clone for LiveElement<'_, S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session,
            element: self.element.clone(),
            text: self.text.clone(),
            rect: self.rect,
            options: self.options.clone(),
            lookup: self.lookup,
        }
    }
}

impl<S: Session> fmt::Debug for LiveElement<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveElement")
            .field("element", &self.element)
            .field("text", &self.text)
            .field("rect", &self.rect)
            .finish_non_exhaustive()
    }
}

impl<S: Session> Element for LiveElement<'_, S> {
    fn find(&self, locator: &Locator) -> Self {
        self.find_wait(locator, self.lookup)
    }

    fn find_all(&self, locator: &Locator) -> Vec<Self> {
        self.find_all_wait(locator, self.lookup)
    }

    fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn get(&self, name: &str) -> Option<String> {
        let el = self.element.as_ref()?;
        self.session
            .attribute(el, name)
            .map_err(|e| report(self.logger(), "get", &e))
            .ok()
            .flatten()
    }

    fn attrs(&self) -> Attrs {
        let Some(el) = &self.element else {
            return blank_attrs();
        };
        match self.session.run_script_on(el, script::ATTRIBUTES, &[]) {
            Ok(Value::Object(map)) => with_href(map.into_iter().map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })),
            Ok(other) => {
                self.log(Level::Warning, &format!("attrs: unexpected result {other}"));
                with_href(std::iter::empty())
            }
            Err(e) => {
                report(self.logger(), "attrs", &e);
                with_href(std::iter::empty())
            }
        }
    }

    fn is_blank(&self) -> bool {
        self.element.is_none()
    }

    fn log(&self, level: Level, message: &str) {
        logging::log(self.logger(), level, message);
    }
}

/// Settings shared by a live page and the elements it finds.
#[derive(Debug, Clone, Default)]
pub struct PageOptions {
    /// Where page and element operations log
    pub logger: Option<Logger>,
    /// Wait budgets and polling interval
    pub waits: WaitConfig,
    /// Random pause before navigation, lookups and clicks
    pub delay: Option<Delay>,
    /// Where [`LivePage::refresh_until`] and [`LivePage::save_screenshot`] write
    pub screenshot_dir: Option<PathBuf>,
}

impl PageOptions {
    /// Set the logger
    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Set the wait budgets
    #[must_use]
    pub fn with_waits(mut self, waits: WaitConfig) -> Self {
        self.waits = waits;
        self
    }

    /// Set the random pre-operation delay
    #[must_use]
    pub fn with_delay(mut self, delay: Delay) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set the screenshot directory
    #[must_use]
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }
}

/// A page open in a browser session.
///
/// Static queries go through a snapshot of the page source that is parsed on
/// first use and kept until the page navigates or refreshes.
pub struct LivePage<'s, S: Session> {
    session: &'s S,
    url: String,
    options: PageOptions,
    loaded: bool,
    snapshot: OnceCell<SnapshotPage>,
}

impl<'s, S: Session> LivePage<'s, S> {
    /// Facade for whatever the active tab shows; does not navigate
    pub fn new(session: &'s S, url: impl Into<String>, options: PageOptions) -> Self {
        Self {
            session,
            url: url.into(),
            options,
            loaded: false,
            snapshot: OnceCell::new(),
        }
    }

    /// Navigate the active tab to `url`
    pub fn from_url(session: &'s S, url: &str, expect: &UrlMatch, options: PageOptions) -> Self {
        let mut page = Self::new(session, url, options);
        page.log(Level::Debug, &format!("navigate to: {url}"));
        page.pause();
        page.loaded = task::navigate_to_url(
            session,
            url,
            expect,
            &page.wait_options(page.options.waits.normal()),
            &page.options.waits,
        );
        if !page.loaded {
            page.log(Level::Exception, &format!("could not load {url}"));
        }
        page
    }

    /// Open `url` in a new tab and switch to it
    pub fn new_tab(session: &'s S, url: &str, expect: &UrlMatch, options: PageOptions) -> Self {
        let mut page = Self::new(session, url, options);
        page.log(Level::Debug, &format!("navigate to: {url} in new tab"));
        page.pause();
        page.loaded = task::open_in_new_tab(
            session,
            url,
            expect,
            &page.wait_options(page.options.waits.normal()),
            &page.options.waits,
        );
        if !page.loaded {
            page.log(Level::Exception, &format!("could not open {url} in new tab"));
        }
        page
    }

    /// Whether the last navigation was confirmed
    pub fn loaded(&self) -> bool {
        self.loaded
    }

    /// The session this page drives
    pub fn session(&self) -> &'s S {
        self.session
    }

    /// Page settings
    pub fn options(&self) -> &PageOptions {
        &self.options
    }

    /// Engine options for `timeout` with this page's polling interval and logger
    pub fn wait_options(&self, timeout: Duration) -> WaitOptions {
        WaitOptions::new(timeout)
            .with_poll_interval(self.options.waits.poll_interval())
            .with_logger(self.options.logger.clone())
    }

    fn logger(&self) -> Option<&Logger> {
        self.options.logger.as_ref()
    }

    fn pause(&self) {
        if let Some(delay) = &self.options.delay {
            let paused = delay.pause();
            self.log(Level::Debug, &format!("waited {paused:?}"));
        }
    }

    /// Navigate to `url`; on success the page takes that URL
    pub fn navigate_to_url(&mut self, url: &str, expect: &UrlMatch, wait: Duration) -> bool {
        self.log(Level::Debug, &format!("navigate_to_url: {url}"));
        self.pause();
        self.loaded = task::navigate_to_url(
            self.session,
            url,
            expect,
            &self.wait_options(wait),
            &self.options.waits,
        );
        if self.loaded {
            self.url = url.to_string();
            self.snapshot = OnceCell::new();
        }
        self.loaded
    }

    /// Reload, pause for `wait`, then confirm the page URL again
    pub fn refresh(&mut self, wait: Duration) -> bool {
        self.log(Level::Debug, &format!("refreshing: {}", self.url));
        self.snapshot = OnceCell::new();
        if let Err(e) = self.session.refresh() {
            report(self.logger(), "refresh", &e);
            return false;
        }
        if !wait.is_zero() {
            self.log(Level::Debug, &format!("waiting {wait:?}"));
            std::thread::sleep(wait);
        }
        let url = self.url.clone();
        self.navigate_to_url(&url, &UrlMatch::Exact, self.options.waits.normal())
    }

    /// Run `operation` up to `attempts` times, refreshing between failures.
    ///
    /// After a failure the page logs `message`, saves a screenshot when a
    /// screenshot directory is set and, unless it was the last attempt,
    /// refreshes after `(attempt + 1) × big` of back-off.
    pub fn refresh_until<F>(&mut self, message: &str, attempts: usize, mut operation: F) -> bool
    where
        F: FnMut(&Self) -> bool,
    {
        for attempt in 0..attempts {
            if operation(self) {
                self.log(Level::Debug, "refresh_until: operation succeeded");
                return true;
            }
            self.log(Level::Exception, &format!("{message}: {}", self.url));
            if self.options.screenshot_dir.is_some() {
                self.save_screenshot("refresh_until");
            }
            if attempt + 1 < attempts {
                self.log(Level::Debug, &format!("attempting refresh: attempts: {}", attempt + 1));
                self.refresh(backoff(self.options.waits.big(), attempt));
            }
        }
        self.log(Level::Exception, "refresh_until: operation failed on every attempt");
        false
    }

    /// Parsed copy of the current page source, fetched on first use
    pub fn snapshot(&self) -> Option<&SnapshotPage> {
        if let Some(snapshot) = self.snapshot.get() {
            return Some(snapshot);
        }
        match self.session.page_source() {
            Ok(html) => Some(self.snapshot.get_or_init(|| {
                SnapshotPage::from_html(self.url.clone(), &html, self.options.logger.clone())
            })),
            Err(e) => {
                report(self.logger(), "snapshot", &e);
                None
            }
        }
    }

    /// Drop the cached snapshot so the next static query re-reads the source
    pub fn clear_snapshot(&mut self) {
        self.snapshot = OnceCell::new();
    }

    /// First snapshot match, blank when there is none
    pub fn find_snapshot(&self, locator: &Locator) -> SnapshotElement<'_> {
        self.snapshot()
            .map_or_else(SnapshotElement::blank, |snapshot| snapshot.find(locator))
    }

    /// Every snapshot match
    pub fn find_all_snapshot(&self, locator: &Locator) -> Vec<SnapshotElement<'_>> {
        self.snapshot()
            .map(|snapshot| snapshot.find_all(locator))
            .unwrap_or_default()
    }

    /// [`Page::find`] with an explicit wait
    pub fn find_wait(&self, locator: &Locator, wait: Duration) -> LiveElement<'s, S> {
        self.pause();
        let lookup = self.options.waits.normal();
        find_wrapped(self.session, None, locator, &self.wait_options(wait), lookup)
    }

    /// [`Page::find_all`] with an explicit wait
    pub fn find_all_wait(&self, locator: &Locator, wait: Duration) -> Vec<LiveElement<'s, S>> {
        self.pause();
        let lookup = self.options.waits.normal();
        find_all_wrapped(self.session, None, locator, &self.wait_options(wait), lookup)
    }

    /// Wait until `locator` is clickable and click it
    pub fn click(&self, locator: &Locator, wait: Duration) -> bool {
        self.pause();
        task::click(self.session, locator, &self.wait_options(wait))
    }

    /// Scroll down by half the viewport, clamped to the scroll height
    pub fn scroll_down(&self, wait: Duration) -> bool {
        self.scroll("scroll_down", wait, |session, position| {
            let viewport = probe::viewport_height(session)?;
            let height = probe::scroll_height(session, None)?;
            Ok((position + viewport / 2).min(height))
        })
    }

    /// Scroll to `position`
    pub fn scroll_to(&self, position: i64, wait: Duration) -> bool {
        self.scroll("scroll_to", wait, |_, _| Ok(position))
    }

    /// Scroll to the current scroll height
    pub fn scroll_to_bottom(&self, wait: Duration) -> bool {
        self.scroll("scroll_to_bottom", wait, |session, _| probe::scroll_height(session, None))
    }

    fn scroll<F>(&self, name: &str, wait: Duration, target: F) -> bool
    where
        F: FnOnce(&S, i64) -> Result<i64>,
    {
        self.log(Level::Debug, name);
        let moved = probe::page_y_offset(self.session).and_then(|position| {
            let next = target(self.session, position)?;
            probe::scroll_page_to(self.session, next)?;
            Ok(position)
        });
        match moved {
            Ok(previous) => wait::yoffset_changed(self.session, previous, &self.wait_options(wait)),
            Err(e) => {
                report(self.logger(), name, &e);
                false
            }
        }
    }

    /// Keep scrolling to the bottom while the page grows.
    ///
    /// Stops the first time the height does not change within `wait`.
    /// Returns how many times the page grew.
    pub fn expand_scroll_height(&self, wait: Duration) -> usize {
        self.log(Level::Debug, "expand_scroll_height");
        let options = self.wait_options(wait);
        let mut grown = 0;
        loop {
            let moved = probe::scroll_height(self.session, None)
                .and_then(|height| probe::scroll_page_to(self.session, height).map(|()| height));
            let height = match moved {
                Ok(height) => height,
                Err(e) => {
                    report(self.logger(), "expand_scroll_height", &e);
                    return grown;
                }
            };
            if !wait::scroll_height_changed(self.session, None, height, &options) {
                return grown;
            }
            grown += 1;
        }
    }

    /// Save a screenshot into the configured screenshot directory
    pub fn save_screenshot(&self, filestem: &str) -> Option<PathBuf> {
        match &self.options.screenshot_dir {
            Some(dir) => self.save_screenshot_to(dir, filestem),
            None => {
                self.log(Level::Warning, "save_screenshot: no screenshot directory set");
                None
            }
        }
    }

    /// Save a screenshot into `dir`
    pub fn save_screenshot_to(&self, dir: &Path, filestem: &str) -> Option<PathBuf> {
        task::save_screenshot(self.session, dir, filestem, self.logger())
    }

    /// Close every tab except `keep`
    pub fn close_all_tabs_except(&self, keep: &Handle, attempts: usize) -> bool {
        task::close_all_tabs_except(self.session, keep, attempts, self.logger())
    }
}

impl<S: Session> fmt::Debug for LivePage<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LivePage")
            .field("url", &self.url)
            .field("loaded", &self.loaded)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'s, S: Session> Page for LivePage<'s, S> {
    type Element<'p> = LiveElement<'s, S> where Self: 'p;

    fn url(&self) -> &str {
        &self.url
    }

    fn find(&self, locator: &Locator) -> LiveElement<'s, S> {
        self.find_wait(locator, self.options.waits.normal())
    }

    fn find_all(&self, locator: &Locator) -> Vec<LiveElement<'s, S>> {
        self.find_all_wait(locator, self.options.waits.normal())
    }

    fn log(&self, level: Level, message: &str) {
        logging::log(self.logger(), level, message);
    }
}
