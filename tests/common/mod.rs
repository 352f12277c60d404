//! In-memory session for integration tests
//!
//! `FakeSession` keeps a tiny DOM and a list of tabs behind a mutex and
//! answers the scripts in `pagewait::script` the way a browser would.

#![allow(dead_code)]

use pagewait::error::{BrowserError, ElementError, ScriptError};
use pagewait::script;
use pagewait::session::{By, ElementRect, Handle, Locator, Session};
use pagewait::{Error, Result};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

/// Node id in the fake DOM
pub type NodeId = usize;

#[derive(Debug, Default)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    inner_html: String,
    displayed: bool,
    enabled: bool,
    scroll_top: i64,
    scroll_height: i64,
    parent: Option<NodeId>,
    attached: bool,
    appears_at: Option<Instant>,
    stale: bool,
    stale_reads: usize,
    clicks: usize,
}

impl Node {
    fn classes(&self) -> impl Iterator<Item = &str> {
        self.attrs
            .get("class")
            .map(String::as_str)
            .unwrap_or("")
            .split_whitespace()
    }
}

#[derive(Debug)]
struct Tab {
    handle: Handle,
    url: String,
    pending: Option<(String, Instant)>,
}

#[derive(Debug)]
struct State {
    tabs: Vec<Tab>,
    active: Option<Handle>,
    next_tab: usize,
    nodes: Vec<Node>,
    y_offset: i64,
    page_height: i64,
    viewport_height: i64,
    growth: VecDeque<i64>,
    source: String,
    navigate_delay: Duration,
    fail_navigation: bool,
    url_read_errors: usize,
    refreshes: usize,
    navigations: usize,
    closes_ignored: usize,
}

/// Scriptable stand-in for a browser.
#[derive(Debug)]
pub struct FakeSession {
    state: Mutex<State>,
}

fn stale(id: NodeId) -> Error {
    Error::stale(format!("node {id} is detached"))
}

fn arg_str(args: &[Value], index: usize) -> String {
    args.get(index)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn arg_i64(args: &[Value], index: usize) -> i64 {
    args.get(index).and_then(Value::as_i64).unwrap_or_default()
}

impl FakeSession {
    /// One tab showing `url`, a 1000px page and an 800px viewport
    pub fn new(url: &str) -> Self {
        Self {
            state: Mutex::new(State {
                tabs: vec![Tab {
                    handle: Handle::new("tab-1"),
                    url: url.to_string(),
                    pending: None,
                }],
                active: Some(Handle::new("tab-1")),
                next_tab: 2,
                nodes: Vec::new(),
                y_offset: 0,
                page_height: 1000,
                viewport_height: 800,
                growth: VecDeque::new(),
                source: String::new(),
                navigate_delay: Duration::ZERO,
                fail_navigation: false,
                url_read_errors: 0,
                refreshes: 0,
                navigations: 0,
                closes_ignored: 0,
            }),
        }
    }

    // ------------------------------------------------------------------
    // DOM setup
    // ------------------------------------------------------------------

    /// Add a displayed, enabled node
    pub fn add_node(&self, parent: Option<NodeId>, tag: &str) -> NodeId {
        let mut state = self.state.lock();
        state.nodes.push(Node {
            tag: tag.to_string(),
            displayed: true,
            enabled: true,
            parent,
            attached: true,
            ..Node::default()
        });
        state.nodes.len() - 1
    }

    /// Set an attribute
    pub fn set_attr(&self, id: NodeId, name: &str, value: &str) {
        self.state.lock().nodes[id]
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    /// Remove an attribute
    pub fn remove_attr(&self, id: NodeId, name: &str) {
        self.state.lock().nodes[id].attrs.remove(name);
    }

    /// Set rendered text
    pub fn set_text(&self, id: NodeId, text: &str) {
        self.state.lock().nodes[id].text = text.to_string();
    }

    /// Set inner HTML
    pub fn set_inner_html(&self, id: NodeId, html: &str) {
        self.state.lock().nodes[id].inner_html = html.to_string();
    }

    /// Show or hide
    pub fn set_displayed(&self, id: NodeId, displayed: bool) {
        self.state.lock().nodes[id].displayed = displayed;
    }

    /// Enable or disable
    pub fn set_enabled(&self, id: NodeId, enabled: bool) {
        self.state.lock().nodes[id].enabled = enabled;
    }

    /// Make a node scrollable
    pub fn set_scroll(&self, id: NodeId, top: i64, height: i64) {
        let mut state = self.state.lock();
        state.nodes[id].scroll_top = top;
        state.nodes[id].scroll_height = height;
    }

    /// Keep the node out of lookups until `delay` has passed
    pub fn appear_after(&self, id: NodeId, delay: Duration) {
        self.state.lock().nodes[id].appears_at = Some(Instant::now() + delay);
    }

    /// Remove a node from the document; references to it go stale
    pub fn detach(&self, id: NodeId) {
        let mut state = self.state.lock();
        state.nodes[id].attached = false;
        state.nodes[id].stale = true;
    }

    /// Make the next `reads` text reads of a node fail as stale
    pub fn stale_reads(&self, id: NodeId, reads: usize) {
        self.state.lock().nodes[id].stale_reads = reads;
    }

    /// Times a node was clicked
    pub fn clicks(&self, id: NodeId) -> usize {
        self.state.lock().nodes[id].clicks
    }

    /// Current attribute value
    pub fn attr(&self, id: NodeId, name: &str) -> Option<String> {
        self.state.lock().nodes[id].attrs.get(name).cloned()
    }

    /// Current `scrollTop`
    pub fn scroll_top(&self, id: NodeId) -> i64 {
        self.state.lock().nodes[id].scroll_top
    }

    // ------------------------------------------------------------------
    // Page and tab setup
    // ------------------------------------------------------------------

    /// Set the page scroll height
    pub fn set_page_height(&self, height: i64) {
        self.state.lock().page_height = height;
    }

    /// Page height increments applied each time the page is scrolled to the bottom
    pub fn push_growth(&self, steps: &[i64]) {
        self.state.lock().growth.extend(steps.iter().copied());
    }

    /// Current page scroll offset
    pub fn y_offset(&self) -> i64 {
        self.state.lock().y_offset
    }

    /// Current page height
    pub fn page_height(&self) -> i64 {
        self.state.lock().page_height
    }

    /// HTML returned as page source
    pub fn set_source(&self, html: &str) {
        self.state.lock().source = html.to_string();
    }

    /// Make `navigate` fail
    pub fn fail_navigation(&self, fail: bool) {
        self.state.lock().fail_navigation = fail;
    }

    /// Delay before a navigation shows up in the URL
    pub fn set_navigate_delay(&self, delay: Duration) {
        self.state.lock().navigate_delay = delay;
    }

    /// Make the next `reads` URL reads fail
    pub fn url_read_errors(&self, reads: usize) {
        self.state.lock().url_read_errors = reads;
    }

    /// Change the active tab's URL directly
    pub fn set_url(&self, url: &str) {
        let mut state = self.state.lock();
        if let Some(tab) = active_tab(&mut state) {
            tab.url = url.to_string();
            tab.pending = None;
        }
    }

    /// Open a tab without switching to it
    pub fn open_tab(&self, url: &str) -> Handle {
        let mut state = self.state.lock();
        open_tab(&mut state, url)
    }

    /// Ignore the next `count` tab close requests
    pub fn ignore_closes(&self, count: usize) {
        self.state.lock().closes_ignored = count;
    }

    /// Number of open tabs
    pub fn tab_count(&self) -> usize {
        self.state.lock().tabs.len()
    }

    /// Number of reloads
    pub fn refreshes(&self) -> usize {
        self.state.lock().refreshes
    }

    /// Number of navigations
    pub fn navigations(&self) -> usize {
        self.state.lock().navigations
    }
}

fn active_tab(state: &mut State) -> Option<&mut Tab> {
    let active = state.active.clone()?;
    state.tabs.iter_mut().find(|t| t.handle == active)
}

fn open_tab(state: &mut State, url: &str) -> Handle {
    let handle = Handle::new(format!("tab-{}", state.next_tab));
    state.next_tab += 1;
    state.tabs.push(Tab {
        handle: handle.clone(),
        url: url.to_string(),
        pending: None,
    });
    handle
}

fn close_active(state: &mut State) -> Result<()> {
    if state.closes_ignored > 0 {
        state.closes_ignored -= 1;
        return Ok(());
    }
    let active = state.active.take().ok_or(BrowserError::NoActiveTab)?;
    state.tabs.retain(|t| t.handle != active);
    Ok(())
}

fn live(state: &State, id: NodeId) -> Result<&Node> {
    let node = state.nodes.get(id).ok_or_else(|| stale(id))?;
    if node.stale {
        return Err(stale(id));
    }
    Ok(node)
}

fn is_present(node: &Node) -> bool {
    node.attached && node.appears_at.map_or(true, |t| Instant::now() >= t)
}

fn is_below(state: &State, id: NodeId, ancestor: NodeId) -> bool {
    let mut current = state.nodes[id].parent;
    while let Some(p) = current {
        if p == ancestor {
            return true;
        }
        current = state.nodes[p].parent;
    }
    false
}

/// Match the handful of CSS forms the crate produces
fn css_matches(node: &Node, css: &str) -> bool {
    if let Some(inner) = css.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        if let Some((name, value)) = inner.split_once("~=") {
            let value = value.trim_matches('"');
            return node
                .attrs
                .get(name)
                .is_some_and(|v| v.split_whitespace().any(|t| t == value));
        }
        if let Some((name, value)) = inner.split_once('=') {
            return node.attrs.get(name).map(String::as_str) == Some(value.trim_matches('"'));
        }
        return node.attrs.contains_key(inner);
    }
    if let Some(id) = css.strip_prefix('#') {
        return node.attrs.get("id").map(String::as_str) == Some(id);
    }
    if let Some(class) = css.strip_prefix('.') {
        return node.classes().any(|c| c == class);
    }
    node.tag == css
}

fn locator_matches(node: &Node, locator: &Locator) -> Result<bool> {
    let value = locator.value.as_str();
    Ok(match locator.by {
        By::Id => node.attrs.get("id").map(String::as_str) == Some(value),
        By::ClassName => node.classes().any(|c| c == value),
        By::TagName => node.tag == value,
        By::Name => node.attrs.get("name").map(String::as_str) == Some(value),
        By::Css => css_matches(node, value),
        By::XPath => return Err(ElementError::UnsupportedLocator(locator.to_string()).into()),
    })
}

fn expand_all(state: &mut State, args: &[Value]) -> Value {
    let identifier = arg_str(args, 0);
    let attribute = arg_str(args, 1);
    let indicator = arg_str(args, 2);
    let mut clicked = 0;
    for node in state.nodes.iter_mut().filter(|n| is_present(n)) {
        if !node.classes().any(|c| c == identifier) {
            continue;
        }
        let collapsed = match attribute.as_str() {
            "class" => !node.classes().any(|c| c == indicator),
            "exists" => true,
            "text" => node.text.trim() != indicator,
            _ => node.attrs.get(&attribute) != Some(&indicator),
        };
        if collapsed {
            node.clicks += 1;
            clicked += 1;
            if attribute == "class" {
                let current = node.attrs.get("class").cloned().unwrap_or_default();
                let class = format!("{current} {indicator}");
                node.attrs.insert("class".to_string(), class.trim().to_string());
            }
        }
    }
    json!(clicked)
}

impl Session for FakeSession {
    type Element = NodeId;

    fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_navigation {
            return Err(Error::generic("net::ERR_NAME_NOT_RESOLVED"));
        }
        state.navigations += 1;
        let ready = Instant::now() + state.navigate_delay;
        let tab = active_tab(&mut state).ok_or(BrowserError::NoActiveTab)?;
        tab.pending = Some((url.to_string(), ready));
        Ok(())
    }

    fn refresh(&self) -> Result<()> {
        self.state.lock().refreshes += 1;
        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        let mut state = self.state.lock();
        if state.url_read_errors > 0 {
            state.url_read_errors -= 1;
            return Err(Error::generic("url read failed"));
        }
        let tab = active_tab(&mut state).ok_or(BrowserError::NoActiveTab)?;
        if let Some((url, ready)) = tab.pending.take() {
            if Instant::now() >= ready {
                tab.url = url;
            } else {
                tab.pending = Some((url, ready));
            }
        }
        Ok(tab.url.clone())
    }

    fn page_source(&self) -> Result<String> {
        Ok(self.state.lock().source.clone())
    }

    fn run_script(&self, code: &str, args: &[Value]) -> Result<Value> {
        let mut state = self.state.lock();
        let value = match code {
            c if c == script::PAGE_Y_OFFSET => json!(state.y_offset),
            c if c == script::PAGE_SCROLL_HEIGHT => json!(state.page_height),
            c if c == script::VIEWPORT_HEIGHT => json!(state.viewport_height),
            c if c == script::PAGE_SCROLL_TO => {
                let target = arg_i64(args, 0);
                state.y_offset = target.clamp(0, state.page_height);
                if target >= state.page_height {
                    if let Some(step) = state.growth.pop_front() {
                        state.page_height += step;
                    }
                }
                json!(true)
            }
            c if c == script::OPEN_TAB => {
                open_tab(&mut state, &arg_str(args, 0));
                json!(true)
            }
            c if c == script::CLOSE_TAB => {
                close_active(&mut state)?;
                json!(true)
            }
            c if c == script::EXPAND_ALL_BY_CLASS => expand_all(&mut state, args),
            other => {
                let message = format!("unknown script: {other}");
                return Err(ScriptError::ExecutionFailed(message).into());
            }
        };
        Ok(value)
    }

    fn run_script_on(&self, element: &NodeId, code: &str, args: &[Value]) -> Result<Value> {
        let mut state = self.state.lock();
        let id = *element;
        live(&state, id)?;
        let value = match code {
            c if c == script::ELEMENT_SCROLL_TOP => json!(state.nodes[id].scroll_top),
            c if c == script::ELEMENT_SCROLL_HEIGHT => json!(state.nodes[id].scroll_height),
            c if c == script::ELEMENT_SCROLL_TO => {
                let node = &mut state.nodes[id];
                node.scroll_top = arg_i64(args, 0).clamp(0, node.scroll_height);
                json!(true)
            }
            c if c == script::CLICK => {
                state.nodes[id].clicks += 1;
                json!(true)
            }
            c if c == script::IS_DISPLAYED => json!(state.nodes[id].displayed),
            c if c == script::IS_ENABLED => json!(state.nodes[id].enabled),
            c if c == script::INNER_HTML => json!(state.nodes[id].inner_html),
            c if c == script::ATTRIBUTES => {
                let map: Map<String, Value> = state.nodes[id]
                    .attrs
                    .iter()
                    .map(|(k, v)| (k.clone(), json!(v)))
                    .collect();
                Value::Object(map)
            }
            c if c == script::MARK_PARENT => match state.nodes[id].parent {
                Some(parent) => {
                    state.nodes[parent]
                        .attrs
                        .insert(arg_str(args, 0), arg_str(args, 1));
                    json!(true)
                }
                None => json!(false),
            },
            c if c == script::UNMARK => {
                state.nodes[id].attrs.remove(&arg_str(args, 0));
                json!(true)
            }
            other => {
                let message = format!("unknown script: {other}");
                return Err(ScriptError::ExecutionFailed(message).into());
            }
        };
        Ok(value)
    }

    fn window_handles(&self) -> Result<Vec<Handle>> {
        Ok(self.state.lock().tabs.iter().map(|t| t.handle.clone()).collect())
    }

    fn current_handle(&self) -> Result<Handle> {
        self.state
            .lock()
            .active
            .clone()
            .ok_or_else(|| BrowserError::NoActiveTab.into())
    }

    fn switch_to(&self, handle: &Handle) -> Result<()> {
        let mut state = self.state.lock();
        if !state.tabs.iter().any(|t| t.handle == *handle) {
            return Err(BrowserError::NoSuchHandle(handle.to_string()).into());
        }
        state.active = Some(handle.clone());
        Ok(())
    }

    fn close_current(&self) -> Result<()> {
        close_active(&mut self.state.lock())
    }

    fn find(&self, within: Option<&NodeId>, locator: &Locator) -> Result<Option<NodeId>> {
        Ok(self.find_all(within, locator)?.into_iter().next())
    }

    fn find_all(&self, within: Option<&NodeId>, locator: &Locator) -> Result<Vec<NodeId>> {
        let state = self.state.lock();
        if let Some(scope) = within {
            live(&state, *scope)?;
        }
        let mut found = Vec::new();
        for (id, node) in state.nodes.iter().enumerate() {
            if !is_present(node) {
                continue;
            }
            if let Some(scope) = within {
                if !is_below(&state, id, *scope) {
                    continue;
                }
            }
            if locator_matches(node, locator)? {
                found.push(id);
            }
        }
        Ok(found)
    }

    fn attribute(&self, element: &NodeId, name: &str) -> Result<Option<String>> {
        let state = self.state.lock();
        Ok(live(&state, *element)?.attrs.get(name).cloned())
    }

    fn text(&self, element: &NodeId) -> Result<String> {
        let mut state = self.state.lock();
        live(&state, *element)?;
        let node = &mut state.nodes[*element];
        if node.stale_reads > 0 {
            node.stale_reads -= 1;
            return Err(stale(*element));
        }
        Ok(node.text.clone())
    }

    fn rect(&self, element: &NodeId) -> Result<ElementRect> {
        let state = self.state.lock();
        let node = live(&state, *element)?;
        let size = if node.displayed { 10.0 } else { 0.0 };
        Ok(ElementRect {
            x: 0.0,
            y: 0.0,
            width: size,
            height: size,
        })
    }

    fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(b"\x89PNG\r\n\x1a\nfake".to_vec())
    }
}
