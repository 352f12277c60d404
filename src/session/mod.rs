//! Driver collaborator interface
//!
//! Everything above this module talks to the browser through the
//! [`Session`] trait. The trait is synchronous: the wait engine is a blocking
//! poll loop and every call is parameterized by an explicit session, so a
//! session is driven by one thread at a time.

mod locator;

pub use locator::{By, Locator};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque identifier of one browser tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(String);

impl Handle {
    /// Wrap a backend-specific tab id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position and size of an element in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementRect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

/// A live browser session.
///
/// `Element` is the backend's reference to a DOM node. It is only meaningful
/// together with the session that produced it and may go stale when the page
/// changes; operations on a stale reference return an error for which
/// [`Error::is_stale`](crate::Error::is_stale) is true.
///
/// Scripts follow the WebDriver convention: `code` is a function body that
/// reads its inputs from `arguments` and returns with `return`.
pub trait Session {
    /// Backend reference to a DOM node
    type Element: Clone + fmt::Debug;

    /// Load `url` in the active tab
    fn navigate(&self, url: &str) -> Result<()>;

    /// Reload the active tab
    fn refresh(&self) -> Result<()>;

    /// URL of the active tab
    fn current_url(&self) -> Result<String>;

    /// Serialized DOM of the active tab
    fn page_source(&self) -> Result<String>;

    /// Run `code` in the active tab with `args` bound to `arguments`
    fn run_script(&self, code: &str, args: &[Value]) -> Result<Value>;

    /// Run `code` with `element` bound to `arguments[0]` and `args` following it
    fn run_script_on(&self, element: &Self::Element, code: &str, args: &[Value])
        -> Result<Value>;

    /// Handles of every open tab
    fn window_handles(&self) -> Result<Vec<Handle>>;

    /// Handle of the tab commands are sent to
    fn current_handle(&self) -> Result<Handle>;

    /// Send subsequent commands to `handle`
    fn switch_to(&self, handle: &Handle) -> Result<()>;

    /// Close the active tab
    fn close_current(&self) -> Result<()>;

    /// First element matching `locator`, searched below `within` or the whole document
    fn find(&self, within: Option<&Self::Element>, locator: &Locator)
        -> Result<Option<Self::Element>>;

    /// Every element matching `locator`, in document order
    fn find_all(&self, within: Option<&Self::Element>, locator: &Locator)
        -> Result<Vec<Self::Element>>;

    /// Attribute value, `None` when the attribute is absent
    fn attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    /// Rendered text of the element
    fn text(&self, element: &Self::Element) -> Result<String>;

    /// Location and size of the element
    fn rect(&self, element: &Self::Element) -> Result<ElementRect>;

    /// PNG screenshot of the active tab's viewport
    fn screenshot(&self) -> Result<Vec<u8>>;
}

impl<S: Session + ?Sized> Session for &S {
    type Element = S::Element;

    fn navigate(&self, url: &str) -> Result<()> {
        (**self).navigate(url)
    }

    fn refresh(&self) -> Result<()> {
        (**self).refresh()
    }

    fn current_url(&self) -> Result<String> {
        (**self).current_url()
    }

    fn page_source(&self) -> Result<String> {
        (**self).page_source()
    }

    fn run_script(&self, code: &str, args: &[Value]) -> Result<Value> {
        (**self).run_script(code, args)
    }

    fn run_script_on(
        &self,
        element: &Self::Element,
        code: &str,
        args: &[Value],
    ) -> Result<Value> {
        (**self).run_script_on(element, code, args)
    }

    fn window_handles(&self) -> Result<Vec<Handle>> {
        (**self).window_handles()
    }

    fn current_handle(&self) -> Result<Handle> {
        (**self).current_handle()
    }

    fn switch_to(&self, handle: &Handle) -> Result<()> {
        (**self).switch_to(handle)
    }

    fn close_current(&self) -> Result<()> {
        (**self).close_current()
    }

    fn find(
        &self,
        within: Option<&Self::Element>,
        locator: &Locator,
    ) -> Result<Option<Self::Element>> {
        (**self).find(within, locator)
    }

    fn find_all(
        &self,
        within: Option<&Self::Element>,
        locator: &Locator,
    ) -> Result<Vec<Self::Element>> {
        (**self).find_all(within, locator)
    }

    fn attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>> {
        (**self).attribute(element, name)
    }

    fn text(&self, element: &Self::Element) -> Result<String> {
        (**self).text(element)
    }

    fn rect(&self, element: &Self::Element) -> Result<ElementRect> {
        (**self).rect(element)
    }

    fn screenshot(&self) -> Result<Vec<u8>> {
        (**self).screenshot()
    }
}
