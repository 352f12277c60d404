//! Element and page facades
//!
//! One query interface over two kinds of document:
//!
//! - **live** facades ([`LiveElement`], [`LivePage`]) drive a [`Session`]
//!   and wait for elements through the task layer
//! - **snapshot** facades ([`SnapshotElement`], [`SnapshotPage`]) query a
//!   parsed copy of HTML source and never wait
//!
//! Lookups that find nothing return the **blank** form of the element type.
//! A blank element answers every query with "nothing": `find` returns another
//! blank, `find_all` is empty, `text` and `get` are `None`.
//!
//! [`Session`]: crate::Session

mod live;
mod snapshot;

pub use live::{LiveElement, LivePage, PageOptions};
pub use snapshot::{SnapshotElement, SnapshotPage};

use crate::logging::Level;
use crate::session::Locator;
use std::collections::BTreeMap;

/// Attribute map returned by [`Element::attrs`]; always has an `href` key
pub type Attrs = BTreeMap<String, Option<String>>;

/// Capabilities shared by every element facade.
pub trait Element: Sized {
    /// First match below this element, blank when there is none
    fn find(&self, locator: &Locator) -> Self;

    /// Every match below this element, in document order
    fn find_all(&self, locator: &Locator) -> Vec<Self>;

    /// Text captured when the facade was built; `None` for a blank
    fn text(&self) -> Option<&str>;

    /// Whether the attribute is present
    fn has_attribute(&self, name: &str) -> bool;

    /// Attribute value
    fn get(&self, name: &str) -> Option<String>;

    /// Every attribute
    fn attrs(&self) -> Attrs;

    /// Whether this is the "nothing found" form
    fn is_blank(&self) -> bool;

    /// Log through the facade's logger, if any
    fn log(&self, level: Level, message: &str);
}

/// Capabilities shared by every page facade.
pub trait Page {
    /// Element facade produced by lookups
    type Element<'p>: Element
    where
        Self: 'p;

    /// URL the page was created for
    fn url(&self) -> &str;

    /// Host of [`Page::url`]
    fn domain(&self) -> Option<String> {
        crate::navigation::UrlValidator::domain(self.url())
    }

    /// First match on the page, blank when there is none
    fn find(&self, locator: &Locator) -> Self::Element<'_>;

    /// Every match on the page
    fn find_all(&self, locator: &Locator) -> Vec<Self::Element<'_>>;

    /// Log through the page's logger, if any
    fn log(&self, level: Level, message: &str);
}

/// Attribute map of a blank element
pub(crate) fn blank_attrs() -> Attrs {
    ["href", "id", "aria-label"]
        .into_iter()
        .map(|name| (name.to_string(), None))
        .collect()
}

/// Wrap raw attributes and make sure `href` is present
pub(crate) fn with_href<I>(attrs: I) -> Attrs
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut map: Attrs = attrs.into_iter().map(|(k, v)| (k, Some(v))).collect();
    map.entry("href".to_string()).or_insert(None);
    map
}
