//! Task layer
//!
//! Each task applies one mutation to the session and then confirms through
//! the wait engine that the mutation became observable. Tasks never return
//! errors: driver faults are logged at EXCEPTION level and reported as
//! `false`, `None` or an empty list.

use crate::config::WaitConfig;
use crate::error::Result;
use crate::logging::{self, Level, Logger};
use crate::probe;
use crate::script;
use crate::session::{Handle, Locator, Session};
use crate::wait::{self, WaitOptions};
use chrono::Local;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// How the URL reached by a navigation is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UrlMatch {
    /// The URL must equal the requested one
    #[default]
    Exact,
    /// The URL must contain this substring
    Contains(String),
}

impl UrlMatch {
    /// `Contains(needle)`, or `Exact` when `needle` is empty
    pub fn from_substring(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        if needle.is_empty() {
            Self::Exact
        } else {
            Self::Contains(needle)
        }
    }
}

/// How [`expand_all_by_class`] decides that a dropdown is still collapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollapseCheck {
    /// Collapsed while the class token is missing
    ClassToken(String),
    /// Collapsed while the trimmed text differs from this value
    Text(String),
    /// Always treated as collapsed
    Exists,
    /// Collapsed while the attribute is missing or has a different value
    Attribute {
        /// Attribute name
        name: String,
        /// Value of an expanded dropdown
        value: String,
    },
}

impl CollapseCheck {
    fn script_args(&self) -> (&str, &str) {
        match self {
            Self::ClassToken(token) => ("class", token),
            Self::Text(text) => ("text", text),
            Self::Exists => ("exists", ""),
            Self::Attribute { name, value } => (name, value),
        }
    }
}

fn report(logger: Option<&Logger>, task: &str, err: &crate::Error) {
    logging::log(logger, Level::Exception, &format!("{task}: {err}"));
}

fn confirm_url<S: Session>(
    session: &S,
    url: &str,
    expect: &UrlMatch,
    options: &WaitOptions,
) -> bool {
    match expect {
        UrlMatch::Exact => wait::url_expected(session, url, options),
        UrlMatch::Contains(needle) => wait::url_contains(session, needle, options),
    }
}

/// Navigate the active tab to `url` and confirm the URL.
///
/// Returns `true` straight away when the session is already at `url`.
pub fn navigate_to_url<S: Session>(
    session: &S,
    url: &str,
    expect: &UrlMatch,
    options: &WaitOptions,
    config: &WaitConfig,
) -> bool {
    let logger = options.logger.as_ref();
    logging::log(logger, Level::Debug, &format!("navigate_to_url: {url}"));

    let previous = match probe::current_url(session) {
        Ok(previous) => previous,
        Err(e) => {
            report(logger, "navigate_to_url", &e);
            return false;
        }
    };
    if !wait::url_unexpected(session, url, &options.with_timeout(config.tiny())) {
        return true;
    }
    if let Err(e) = session.navigate(url) {
        report(logger, "navigate_to_url", &e);
        return false;
    }
    if !wait::url_changed(session, &previous, options) {
        return false;
    }
    confirm_url(session, url, expect, options)
}

/// Open `url` in a new tab, switch to it and confirm the URL.
pub fn open_in_new_tab<S: Session>(
    session: &S,
    url: &str,
    expect: &UrlMatch,
    options: &WaitOptions,
    config: &WaitConfig,
) -> bool {
    let logger = options.logger.as_ref();
    logging::log(logger, Level::Debug, &format!("open_in_new_tab: {url}"));
    let small = options.with_timeout(config.small());

    let before = match probe::window_handles(session) {
        Ok(handles) => handles,
        Err(e) => {
            report(logger, "open_in_new_tab", &e);
            return false;
        }
    };
    if let Err(e) = session.run_script(script::OPEN_TAB, &[Value::from(url)]) {
        report(logger, "open_in_new_tab", &e);
        return false;
    }
    if !wait::new_handle_opened(session, before.len(), &small) {
        return false;
    }
    let opened = match probe::window_handles(session) {
        Ok(after) => after.into_iter().find(|h| !before.contains(h)),
        Err(e) => {
            report(logger, "open_in_new_tab", &e);
            return false;
        }
    };
    let Some(opened) = opened else {
        logging::log(logger, Level::Exception, "open_in_new_tab: no new handle");
        return false;
    };
    if let Err(e) = session.switch_to(&opened) {
        report(logger, "open_in_new_tab", &e);
        return false;
    }
    if !wait::correct_handle_active(session, &opened, &small) {
        return false;
    }
    confirm_url(session, url, expect, options)
}

/// Close the active tab, return to `handle` and confirm it shows `url`.
pub fn close_tab_and_return<S: Session>(
    session: &S,
    url: &str,
    handle: &Handle,
    expect: &UrlMatch,
    options: &WaitOptions,
    config: &WaitConfig,
) -> bool {
    let logger = options.logger.as_ref();
    logging::log(logger, Level::Debug, &format!("close_tab_and_return: {url}"));

    if let Err(e) = session.run_script(script::CLOSE_TAB, &[]) {
        report(logger, "close_tab_and_return", &e);
        return false;
    }
    if let Err(e) = session.switch_to(handle) {
        report(logger, "close_tab_and_return", &e);
        return false;
    }
    if !wait::correct_handle_active(session, handle, &options.with_timeout(config.small())) {
        return false;
    }
    confirm_url(session, url, expect, options)
}

/// Wait for an element matching `locator` below `within`, then return the first.
pub fn find<S: Session>(
    session: &S,
    within: Option<&S::Element>,
    locator: &Locator,
    options: &WaitOptions,
) -> Option<S::Element> {
    let logger = options.logger.as_ref();
    logging::log(logger, Level::Debug, &format!("find: {locator}"));
    if !wait::element_present(session, within, locator, options) {
        return None;
    }
    match session.find(within, locator) {
        Ok(found) => found,
        Err(e) => {
            report(logger, "find", &e);
            None
        }
    }
}

/// Wait for an element matching `locator` below `within`, then return all matches.
pub fn find_all<S: Session>(
    session: &S,
    within: Option<&S::Element>,
    locator: &Locator,
    options: &WaitOptions,
) -> Vec<S::Element> {
    let logger = options.logger.as_ref();
    logging::log(logger, Level::Debug, &format!("find_all: {locator}"));
    if !wait::element_present(session, within, locator, options) {
        return Vec::new();
    }
    match session.find_all(within, locator) {
        Ok(found) => found,
        Err(e) => {
            report(logger, "find_all", &e);
            Vec::new()
        }
    }
}

/// Wait until `locator` is clickable, then click it through script.
pub fn click<S: Session>(session: &S, locator: &Locator, options: &WaitOptions) -> bool {
    let logger = options.logger.as_ref();
    logging::log(logger, Level::Debug, &format!("click: {locator}"));
    if !wait::element_clickable(session, locator, options) {
        return false;
    }
    let Some(element) = find(session, None, locator, options) else {
        return false;
    };
    click_element(session, &element, logger)
}

/// Click an already located element through script
pub fn click_element<S: Session>(
    session: &S,
    element: &S::Element,
    logger: Option<&Logger>,
) -> bool {
    match probe::click(session, element) {
        Ok(clicked) => clicked,
        Err(e) => {
            report(logger, "click", &e);
            false
        }
    }
}

/// Close every tab except `keep`, retrying up to `attempts` times.
///
/// Returns `false` when `keep` is not open or tabs survive every attempt.
pub fn close_all_tabs_except<S: Session>(
    session: &S,
    keep: &Handle,
    attempts: usize,
    logger: Option<&Logger>,
) -> bool {
    for attempt in 0..attempts {
        match close_others(session, keep) {
            Ok(Some(true)) => return true,
            Ok(Some(false)) => logging::log(
                logger,
                Level::Warning,
                &format!("close_all_tabs_except: tabs left after attempt {}", attempt + 1),
            ),
            Ok(None) => {
                logging::log(
                    logger,
                    Level::Exception,
                    &format!("close_all_tabs_except: {keep} is not open"),
                );
                return false;
            }
            Err(e) => report(logger, "close_all_tabs_except", &e),
        }
    }
    false
}

/// One closing pass; `None` when `keep` is gone, otherwise whether only `keep` is left
fn close_others<S: Session>(session: &S, keep: &Handle) -> Result<Option<bool>> {
    let handles = session.window_handles()?;
    if !handles.contains(keep) {
        return Ok(None);
    }
    for handle in handles.iter().filter(|h| *h != keep) {
        session.switch_to(handle)?;
        session.close_current()?;
        session.switch_to(keep)?;
    }
    let remaining = session.window_handles()?;
    Ok(Some(remaining.len() == 1 && session.current_handle()? == *keep))
}

/// File name used for a screenshot taken now
pub fn screenshot_file_name(filestem: &str) -> String {
    format!("{}_{filestem}.png", Local::now().format("%Y%m%d%H%M%S%6f"))
}

/// Save a PNG of the active tab to `dir/<timestamp>_<filestem>.png`.
///
/// Creates `dir` if needed. Returns the written path.
pub fn save_screenshot<S: Session>(
    session: &S,
    dir: &Path,
    filestem: &str,
    logger: Option<&Logger>,
) -> Option<PathBuf> {
    logging::log(
        logger,
        Level::Debug,
        &format!("save_screenshot: {}; {filestem}", dir.display()),
    );
    match write_screenshot(session, dir, filestem) {
        Ok(path) => Some(path),
        Err(e) => {
            report(logger, "save_screenshot", &e);
            None
        }
    }
}

#[instrument(level = "debug", skip(session))]
fn write_screenshot<S: Session>(session: &S, dir: &Path, filestem: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(screenshot_file_name(filestem));
    let png = session.screenshot()?;
    std::fs::write(&path, png).map_err(|e| crate::error::CaptureError::SaveFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(path)
}

/// Click every collapsed dropdown with class `identifier`.
///
/// When `clickable` is set, the element clicked is the first descendant with
/// that class. Returns the number of clicks; driver faults count as none.
pub fn expand_all_by_class<S: Session>(
    session: &S,
    identifier: &str,
    check: &CollapseCheck,
    clickable: Option<&str>,
    logger: Option<&Logger>,
) -> usize {
    logging::log(logger, Level::Debug, &format!("expand_all_by_class: {identifier}"));
    let (attribute, indicator) = check.script_args();
    let args = [
        Value::from(identifier),
        Value::from(attribute),
        Value::from(indicator),
        clickable.map_or(Value::Null, Value::from),
    ];
    match session
        .run_script(script::EXPAND_ALL_BY_CLASS, &args)
        .and_then(probe::as_i64)
    {
        Ok(clicked) => usize::try_from(clicked).unwrap_or(0),
        Err(e) => {
            report(logger, "expand_all_by_class", &e);
            0
        }
    }
}
