//! Built-in wait conditions
//!
//! Each [`Condition`] variant is a point-in-time check built from the probes
//! in [`crate::probe`]; each helper function plugs one variant into
//! [`wait_until`].
//!
//! Substring and token conditions with an empty argument are never
//! satisfied, whatever the session state.

use super::{wait_until, Predicate, WaitOptions};
use crate::error::Result;
use crate::probe;
use crate::session::{Handle, Locator, Session};

/// A predicate over session state, closed over its comparison values.
#[derive(Debug, Clone)]
pub enum Condition<'a, E> {
    /// Current URL differs from `previous`
    UrlChanged {
        /// URL captured before the mutation
        previous: &'a str,
    },
    /// Current URL equals `url` exactly
    UrlExpected {
        /// Target URL
        url: &'a str,
    },
    /// Current URL differs from `url`; the first read that differs satisfies it
    UrlUnexpected {
        /// URL the session should not be at
        url: &'a str,
    },
    /// Current URL contains `needle`
    UrlContains {
        /// Substring
        needle: &'a str,
    },
    /// Current URL does not contain `needle`
    UrlDoesNotContain {
        /// Substring
        needle: &'a str,
    },
    /// An element matches `locator` and is rendered
    ElementVisible {
        /// Locator
        locator: &'a Locator,
    },
    /// No element matches `locator`, or the match is not rendered
    ElementInvisible {
        /// Locator
        locator: &'a Locator,
    },
    /// An element matches `locator` and is rendered and enabled
    ElementClickable {
        /// Locator
        locator: &'a Locator,
    },
    /// At least one element matches `locator` below `within` (or the document)
    ElementPresent {
        /// Search root
        within: Option<&'a E>,
        /// Locator
        locator: &'a Locator,
    },
    /// Page vertical scroll offset differs from `previous`
    YOffsetChanged {
        /// Offset captured before scrolling
        previous: i64,
    },
    /// `scrollTop` of `element` differs from `previous`
    ScrollPositionChanged {
        /// Scrollable element
        element: &'a E,
        /// Position captured before scrolling
        previous: i64,
    },
    /// Scroll height of `element` (or the page) differs from `previous`
    ScrollHeightChanged {
        /// Scrollable element, `None` for the page
        element: Option<&'a E>,
        /// Height captured before scrolling
        previous: i64,
    },
    /// `token` is one of the element's classes
    ElementClassContains {
        /// Element
        element: &'a E,
        /// Class token
        token: &'a str,
    },
    /// `token` is not one of the element's classes
    ElementClassDoesNotContain {
        /// Element
        element: &'a E,
        /// Class token
        token: &'a str,
    },
    /// Element text contains `needle`
    ElementTextContains {
        /// Element
        element: &'a E,
        /// Substring
        needle: &'a str,
    },
    /// Element text does not contain `needle`
    ElementTextDoesNotContain {
        /// Element
        element: &'a E,
        /// Substring
        needle: &'a str,
    },
    /// Exactly one more tab is open than `previous_count`
    NewHandleOpened {
        /// Tab count captured before opening
        previous_count: usize,
    },
    /// The active tab is `handle`
    CorrectHandleActive {
        /// Expected handle
        handle: &'a Handle,
    },
}

impl<E> Condition<'_, E> {
    /// Condition name as used in logs
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UrlChanged { .. } => "url_changed",
            Self::UrlExpected { .. } => "url_expected",
            Self::UrlUnexpected { .. } => "url_unexpected",
            Self::UrlContains { .. } => "url_contains",
            Self::UrlDoesNotContain { .. } => "url_does_not_contain",
            Self::ElementVisible { .. } => "element_visible",
            Self::ElementInvisible { .. } => "element_invisible",
            Self::ElementClickable { .. } => "element_clickable",
            Self::ElementPresent { .. } => "element_present",
            Self::YOffsetChanged { .. } => "yoffset_changed",
            Self::ScrollPositionChanged { .. } => "scroll_position_changed",
            Self::ScrollHeightChanged { .. } => "scroll_height_changed",
            Self::ElementClassContains { .. } => "element_class_contains",
            Self::ElementClassDoesNotContain { .. } => "element_class_does_not_contain",
            Self::ElementTextContains { .. } => "element_text_contains",
            Self::ElementTextDoesNotContain { .. } => "element_text_does_not_contain",
            Self::NewHandleOpened { .. } => "new_handle_opened",
            Self::CorrectHandleActive { .. } => "correct_handle_active",
        }
    }

    /// Whether the argument makes the condition unsatisfiable (empty substring or token)
    pub fn is_degenerate(&self) -> bool {
        match self {
            Self::UrlContains { needle }
            | Self::UrlDoesNotContain { needle }
            | Self::ElementTextContains { needle, .. }
            | Self::ElementTextDoesNotContain { needle, .. } => needle.is_empty(),
            Self::ElementClassContains { token, .. }
            | Self::ElementClassDoesNotContain { token, .. } => token.is_empty(),
            _ => false,
        }
    }

    fn argument(&self) -> String {
        match self {
            Self::UrlChanged { previous } => previous.to_string(),
            Self::UrlExpected { url } | Self::UrlUnexpected { url } => url.to_string(),
            Self::UrlContains { needle }
            | Self::UrlDoesNotContain { needle }
            | Self::ElementTextContains { needle, .. }
            | Self::ElementTextDoesNotContain { needle, .. } => needle.to_string(),
            Self::ElementVisible { locator }
            | Self::ElementInvisible { locator }
            | Self::ElementClickable { locator }
            | Self::ElementPresent { locator, .. } => locator.to_string(),
            Self::YOffsetChanged { previous }
            | Self::ScrollPositionChanged { previous, .. }
            | Self::ScrollHeightChanged { previous, .. } => previous.to_string(),
            Self::ElementClassContains { token, .. }
            | Self::ElementClassDoesNotContain { token, .. } => token.to_string(),
            Self::NewHandleOpened { previous_count } => previous_count.to_string(),
            Self::CorrectHandleActive { handle } => handle.to_string(),
        }
    }
}

impl<S: Session> Predicate<S> for Condition<'_, S::Element> {
    fn evaluate(&self, session: &S) -> Result<bool> {
        if self.is_degenerate() {
            return Ok(false);
        }
        let satisfied = match *self {
            Self::UrlChanged { previous } => probe::current_url(session)? != previous,
            Self::UrlExpected { url } => probe::current_url(session)? == url,
            Self::UrlUnexpected { url } => probe::current_url(session)? != url,
            Self::UrlContains { needle } => probe::current_url(session)?.contains(needle),
            Self::UrlDoesNotContain { needle } => !probe::current_url(session)?.contains(needle),
            Self::ElementVisible { locator } => match probe::locate(session, locator)? {
                Some(el) => probe::is_displayed(session, &el)?,
                None => false,
            },
            Self::ElementInvisible { locator } => match probe::locate(session, locator)? {
                Some(el) => match probe::is_displayed(session, &el) {
                    Ok(displayed) => !displayed,
                    Err(e) if e.is_stale() => true,
                    Err(e) => return Err(e),
                },
                None => true,
            },
            Self::ElementClickable { locator } => match probe::locate(session, locator)? {
                Some(el) => {
                    probe::is_displayed(session, &el)? && probe::is_enabled(session, &el)?
                }
                None => false,
            },
            Self::ElementPresent { within, locator } => {
                session.find(within, locator)?.is_some()
            }
            Self::YOffsetChanged { previous } => probe::page_y_offset(session)? != previous,
            Self::ScrollPositionChanged { element, previous } => {
                probe::scroll_position(session, element)? != previous
            }
            Self::ScrollHeightChanged { element, previous } => {
                probe::scroll_height(session, element)? != previous
            }
            Self::ElementClassContains { element, token } => {
                has_class(&probe::element_class(session, element)?, token)
            }
            Self::ElementClassDoesNotContain { element, token } => {
                !has_class(&probe::element_class(session, element)?, token)
            }
            Self::ElementTextContains { element, needle } => {
                probe::element_text(session, element)?.contains(needle)
            }
            Self::ElementTextDoesNotContain { element, needle } => {
                !probe::element_text(session, element)?.contains(needle)
            }
            Self::NewHandleOpened { previous_count } => {
                probe::handle_count(session)? == previous_count + 1
            }
            Self::CorrectHandleActive { handle } => probe::active_handle(session)? == *handle,
        };
        Ok(satisfied)
    }

    fn describe(&self) -> String {
        format!("{}: {}", self.name(), self.argument())
    }
}

fn has_class(class_attr: &str, token: &str) -> bool {
    class_attr.split_whitespace().any(|c| c == token)
}

/// Run `condition` through the engine, skipping the wait when it can never hold
fn run<S: Session>(
    session: &S,
    condition: Condition<'_, S::Element>,
    options: &WaitOptions,
) -> bool {
    if condition.is_degenerate() {
        crate::logging::log(
            options.logger.as_ref(),
            crate::logging::Level::Debug,
            &format!("{}: empty argument, never satisfied", condition.name()),
        );
        return false;
    }
    wait_until(session, &condition, options)
}

/// Wait until the URL differs from `previous`
pub fn url_changed<S: Session>(session: &S, previous: &str, options: &WaitOptions) -> bool {
    run(session, Condition::UrlChanged { previous }, options)
}

/// Wait until the URL equals `url`
pub fn url_expected<S: Session>(session: &S, url: &str, options: &WaitOptions) -> bool {
    run(session, Condition::UrlExpected { url }, options)
}

/// Wait until a read of the URL differs from `url`
pub fn url_unexpected<S: Session>(session: &S, url: &str, options: &WaitOptions) -> bool {
    run(session, Condition::UrlUnexpected { url }, options)
}

/// Wait until the URL contains `needle`; never true for an empty `needle`
pub fn url_contains<S: Session>(session: &S, needle: &str, options: &WaitOptions) -> bool {
    run(session, Condition::UrlContains { needle }, options)
}

/// Wait until the URL lacks `needle`; never true for an empty `needle`
pub fn url_does_not_contain<S: Session>(session: &S, needle: &str, options: &WaitOptions) -> bool {
    run(session, Condition::UrlDoesNotContain { needle }, options)
}

/// Wait until an element matching `locator` is rendered
pub fn element_visible<S: Session>(session: &S, locator: &Locator, options: &WaitOptions) -> bool {
    run(session, Condition::ElementVisible { locator }, options)
}

/// Wait until no element matching `locator` is rendered
pub fn element_invisible<S: Session>(
    session: &S,
    locator: &Locator,
    options: &WaitOptions,
) -> bool {
    run(session, Condition::ElementInvisible { locator }, options)
}

/// Wait until an element matching `locator` can be clicked
pub fn element_clickable<S: Session>(
    session: &S,
    locator: &Locator,
    options: &WaitOptions,
) -> bool {
    run(session, Condition::ElementClickable { locator }, options)
}

/// Wait until an element matching `locator` exists below `within`
pub fn element_present<S: Session>(
    session: &S,
    within: Option<&S::Element>,
    locator: &Locator,
    options: &WaitOptions,
) -> bool {
    run(session, Condition::ElementPresent { within, locator }, options)
}

/// Wait until the page's vertical scroll offset differs from `previous`
pub fn yoffset_changed<S: Session>(session: &S, previous: i64, options: &WaitOptions) -> bool {
    run(session, Condition::YOffsetChanged { previous }, options)
}

/// Wait until `element`'s scroll position differs from `previous`
pub fn scroll_position_changed<S: Session>(
    session: &S,
    element: &S::Element,
    previous: i64,
    options: &WaitOptions,
) -> bool {
    run(session, Condition::ScrollPositionChanged { element, previous }, options)
}

/// Wait until the scroll height of `element` (or the page) differs from `previous`
pub fn scroll_height_changed<S: Session>(
    session: &S,
    element: Option<&S::Element>,
    previous: i64,
    options: &WaitOptions,
) -> bool {
    run(session, Condition::ScrollHeightChanged { element, previous }, options)
}

/// Wait until `token` is one of `element`'s classes
pub fn element_class_contains<S: Session>(
    session: &S,
    element: &S::Element,
    token: &str,
    options: &WaitOptions,
) -> bool {
    run(session, Condition::ElementClassContains { element, token }, options)
}

/// Wait until `token` is not one of `element`'s classes
pub fn element_class_does_not_contain<S: Session>(
    session: &S,
    element: &S::Element,
    token: &str,
    options: &WaitOptions,
) -> bool {
    run(session, Condition::ElementClassDoesNotContain { element, token }, options)
}

/// Wait until `element`'s text contains `needle`
pub fn element_text_contains<S: Session>(
    session: &S,
    element: &S::Element,
    needle: &str,
    options: &WaitOptions,
) -> bool {
    run(session, Condition::ElementTextContains { element, needle }, options)
}

/// Wait until `element`'s text lacks `needle`
pub fn element_text_does_not_contain<S: Session>(
    session: &S,
    element: &S::Element,
    needle: &str,
    options: &WaitOptions,
) -> bool {
    run(session, Condition::ElementTextDoesNotContain { element, needle }, options)
}

/// Wait until exactly one more tab is open than `previous_count`
pub fn new_handle_opened<S: Session>(
    session: &S,
    previous_count: usize,
    options: &WaitOptions,
) -> bool {
    run(session, Condition::NewHandleOpened { previous_count }, options)
}

/// Wait until `handle` is the active tab
pub fn correct_handle_active<S: Session>(
    session: &S,
    handle: &Handle,
    options: &WaitOptions,
) -> bool {
    run(session, Condition::CorrectHandleActive { handle }, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_class_matches_tokens() {
        assert!(has_class("btn btn-primary expanded", "expanded"));
        assert!(!has_class("btn btn-primary", "btn-prim"));
        assert!(!has_class("", "btn"));
    }

    #[test]
    fn test_degenerate_arguments() {
        let c: Condition<'_, ()> = Condition::UrlContains { needle: "" };
        assert!(c.is_degenerate());
        let c: Condition<'_, ()> = Condition::UrlDoesNotContain { needle: "" };
        assert!(c.is_degenerate());
        let c: Condition<'_, ()> = Condition::UrlContains { needle: "a" };
        assert!(!c.is_degenerate());
        let c: Condition<'_, ()> = Condition::ElementTextContains {
            element: &(),
            needle: "",
        };
        assert!(c.is_degenerate());
        let c: Condition<'_, ()> = Condition::UrlExpected { url: "" };
        assert!(!c.is_degenerate());
    }

    #[test]
    fn test_describe_names_condition_and_argument() {
        let locator = Locator::class_name("table");
        let c: Condition<'_, ()> = Condition::ElementClickable { locator: &locator };
        assert_eq!(c.name(), "element_clickable");
        assert_eq!(c.argument(), "class name=table");
        let c: Condition<'_, ()> = Condition::NewHandleOpened { previous_count: 2 };
        assert_eq!(c.argument(), "2");
    }
}
