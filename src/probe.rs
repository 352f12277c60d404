//! Remote probe functions
//!
//! Each probe reads one observable fact from the session. Probes hold no
//! state; they surface driver faults as errors and leave it to the wait
//! engine to treat those as "not yet".

use crate::error::{Result, ScriptError};
use crate::script;
use crate::session::{Handle, Locator, Session};
use serde_json::Value;

/// URL of the active tab
pub fn current_url<S: Session>(session: &S) -> Result<String> {
    session.current_url()
}

/// Vertical scroll offset of the page
pub fn page_y_offset<S: Session>(session: &S) -> Result<i64> {
    as_i64(session.run_script(script::PAGE_Y_OFFSET, &[])?)
}

/// `scrollTop` of a scrollable element
pub fn scroll_position<S: Session>(session: &S, element: &S::Element) -> Result<i64> {
    as_i64(session.run_script_on(element, script::ELEMENT_SCROLL_TOP, &[])?)
}

/// Scroll height of the page, or of `element` when given
pub fn scroll_height<S: Session>(session: &S, element: Option<&S::Element>) -> Result<i64> {
    let value = match element {
        Some(el) => session.run_script_on(el, script::ELEMENT_SCROLL_HEIGHT, &[])?,
        None => session.run_script(script::PAGE_SCROLL_HEIGHT, &[])?,
    };
    as_i64(value)
}

/// Viewport height of the active tab
pub fn viewport_height<S: Session>(session: &S) -> Result<i64> {
    as_i64(session.run_script(script::VIEWPORT_HEIGHT, &[])?)
}

/// `class` attribute of an element, empty when absent
pub fn element_class<S: Session>(session: &S, element: &S::Element) -> Result<String> {
    Ok(session.attribute(element, "class")?.unwrap_or_default())
}

/// Rendered text of an element
pub fn element_text<S: Session>(session: &S, element: &S::Element) -> Result<String> {
    session.text(element)
}

/// Whether an element is rendered
pub fn is_displayed<S: Session>(session: &S, element: &S::Element) -> Result<bool> {
    as_bool(session.run_script_on(element, script::IS_DISPLAYED, &[])?)
}

/// Whether an element accepts interaction
pub fn is_enabled<S: Session>(session: &S, element: &S::Element) -> Result<bool> {
    as_bool(session.run_script_on(element, script::IS_ENABLED, &[])?)
}

/// First element matching `locator` in the whole document
pub fn locate<S: Session>(session: &S, locator: &Locator) -> Result<Option<S::Element>> {
    session.find(None, locator)
}

/// Handles of every open tab
pub fn window_handles<S: Session>(session: &S) -> Result<Vec<Handle>> {
    session.window_handles()
}

/// Number of open tabs
pub fn handle_count<S: Session>(session: &S) -> Result<usize> {
    Ok(session.window_handles()?.len())
}

/// Handle of the active tab
pub fn active_handle<S: Session>(session: &S) -> Result<Handle> {
    session.current_handle()
}

/// Scroll the page to `position`
pub fn scroll_page_to<S: Session>(session: &S, position: i64) -> Result<()> {
    session.run_script(script::PAGE_SCROLL_TO, &[Value::from(position)])?;
    Ok(())
}

/// Scroll `element` to `position`
pub fn scroll_element_to<S: Session>(
    session: &S,
    element: &S::Element,
    position: i64,
) -> Result<()> {
    session.run_script_on(element, script::ELEMENT_SCROLL_TO, &[Value::from(position)])?;
    Ok(())
}

/// Click `element` through script
pub fn click<S: Session>(session: &S, element: &S::Element) -> Result<bool> {
    as_bool(session.run_script_on(element, script::CLICK, &[])?)
}

/// Inner HTML of `element`
pub fn inner_html<S: Session>(session: &S, element: &S::Element) -> Result<String> {
    match session.run_script_on(element, script::INNER_HTML, &[])? {
        Value::String(html) => Ok(html),
        other => Err(unexpected("string", &other)),
    }
}

/// Interpret a script result as an integer pixel value.
///
/// Browsers report fractional offsets on zoomed pages; those are truncated.
pub fn as_i64(value: Value) -> Result<i64> {
    match &value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| unexpected("number", &value)),
        _ => Err(unexpected("number", &value)),
    }
}

/// Interpret a script result as a boolean
pub fn as_bool(value: Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(unexpected("boolean", &other)),
    }
}

fn unexpected(expected: &'static str, actual: &Value) -> crate::Error {
    ScriptError::UnexpectedResult {
        expected,
        actual: actual.to_string(),
    }
    .into()
}
