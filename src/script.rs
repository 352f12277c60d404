//! Injected JavaScript
//!
//! Function bodies passed to [`Session::run_script`](crate::Session::run_script)
//! and [`Session::run_script_on`](crate::Session::run_script_on). Element
//! scripts receive the element as `arguments[0]`.

/// Vertical scroll offset of the page
pub const PAGE_Y_OFFSET: &str = "return window.pageYOffset;";

/// Scroll height of the page
pub const PAGE_SCROLL_HEIGHT: &str = "return document.body.scrollHeight;";

/// Scroll the page to `arguments[0]`
pub const PAGE_SCROLL_TO: &str = "window.scrollTo(0, arguments[0]); return true;";

/// Viewport height
pub const VIEWPORT_HEIGHT: &str = "return window.innerHeight;";

/// `scrollTop` of `arguments[0]`
pub const ELEMENT_SCROLL_TOP: &str = "return arguments[0].scrollTop;";

/// `scrollHeight` of `arguments[0]`
pub const ELEMENT_SCROLL_HEIGHT: &str = "return arguments[0].scrollHeight;";

/// Scroll `arguments[0]` to `arguments[1]`
pub const ELEMENT_SCROLL_TO: &str = "arguments[0].scrollTo(0, arguments[1]); return true;";

/// Click `arguments[0]`
pub const CLICK: &str = "arguments[0].click(); return true;";

/// Mark the parent of `arguments[0]` with the attribute named `arguments[1]`
/// (value `arguments[2]`); returns false at the document root.
pub const MARK_PARENT: &str = "\
const parent = arguments[0].parentElement;
if (!parent) { return false; }
parent.setAttribute(arguments[1], arguments[2]);
return true;";

/// Remove the attribute named `arguments[1]` from `arguments[0]`
pub const UNMARK: &str = "arguments[0].removeAttribute(arguments[1]); return true;";

/// Inner HTML of `arguments[0]`
pub const INNER_HTML: &str = "return arguments[0].innerHTML;";

/// Attributes of `arguments[0]` as a name to value object
pub const ATTRIBUTES: &str = "\
const out = {};
for (const attr of arguments[0].attributes) { out[attr.name] = attr.value; }
return out;";

/// Whether `arguments[0]` is rendered: attached, not hidden by style, with a box
pub const IS_DISPLAYED: &str = "\
const el = arguments[0];
if (!el.isConnected) { return false; }
const style = window.getComputedStyle(el);
if (style.display === 'none' || style.visibility === 'hidden' || style.visibility === 'collapse') {
    return false;
}
if (parseFloat(style.opacity) === 0) { return false; }
const rect = el.getBoundingClientRect();
return rect.width > 0 && rect.height > 0;";

/// Whether `arguments[0]` accepts interaction
pub const IS_ENABLED: &str = "\
const el = arguments[0];
return el.disabled !== true && !el.closest('fieldset[disabled]');";

/// Open `arguments[0]` in a new tab
pub const OPEN_TAB: &str = "window.open(arguments[0]); return true;";

/// Close the current tab
pub const CLOSE_TAB: &str = "window.close(); return true;";

/// Click every collapsed dropdown with class `arguments[0]`.
///
/// `arguments[1]` selects the check: `class` (token `arguments[2]` absent),
/// `text` (trimmed text differs from `arguments[2]`), `exists` (always
/// click), or any other attribute name (attribute missing or different from
/// `arguments[2]`). When `arguments[3]` is set, the element clicked is the
/// first descendant with that class.
pub const EXPAND_ALL_BY_CLASS: &str = "\
const [identifier, attribute, indicator, clickable] = arguments;
const target = (el) => clickable ? el.getElementsByClassName(clickable)[0] : el;
const collapsed = (el) => {
    if (attribute === 'class') { return !el.classList.contains(indicator); }
    if (attribute === 'text') { return el.textContent.trim() !== indicator; }
    if (attribute === 'exists') { return true; }
    return !el.hasAttribute(attribute) || el.getAttribute(attribute) !== indicator;
};
let clicked = 0;
for (const el of Array.from(document.getElementsByClassName(identifier))) {
    if (!collapsed(el)) { continue; }
    const t = target(el);
    if (t) { t.click(); clicked += 1; }
}
return clicked;";
