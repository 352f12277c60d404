//! [`Session`] over chromiumoxide
//!
//! Scripts are wrapped so their result comes back JSON-encoded: CDP only
//! returns primitives by value, and this keeps objects and arrays intact.

use super::capture::{self, CaptureOptions};
use super::ChromiumSession;
use crate::error::{BrowserError, ElementError, Error, NavigationError, Result, ScriptError};
use crate::navigation::UrlValidator;
use crate::session::{By, ElementRect, Handle, Locator, Session};
use chromiumoxide::error::CdpError;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Turn the JSON text a wrapped script returned back into a value
fn decode(raw: Option<&Value>) -> Result<Value> {
    match raw {
        Some(Value::String(json)) => Ok(serde_json::from_str(json)?),
        Some(other) => Err(ScriptError::UnexpectedResult {
            expected: "JSON text",
            actual: other.to_string(),
        }
        .into()),
        None => Ok(Value::Null),
    }
}

/// Script failures stay stale errors when the node is gone
fn script_error(err: CdpError) -> Error {
    let message = err.to_string();
    let err = Error::from(err);
    if err.is_stale() {
        err
    } else {
        ScriptError::ExecutionFailed(message).into()
    }
}

fn page_expression(code: &str, args: &[Value]) -> Result<String> {
    let args = serde_json::to_string(args)?;
    Ok(format!(
        "JSON.stringify((function() {{ {code} }}).apply(null, {args}))"
    ))
}

fn element_function(code: &str, args: &[Value]) -> Result<String> {
    let args = serde_json::to_string(args)?;
    Ok(format!(
        "function() {{ return JSON.stringify((function() {{ {code} }}).apply(this, [this, ...{args}])); }}"
    ))
}

fn css_for(locator: &Locator) -> Result<String> {
    locator
        .to_css()
        .ok_or_else(|| ElementError::UnsupportedLocator(locator.to_string()).into())
}

impl Session for ChromiumSession {
    type Element = Arc<chromiumoxide::Element>;

    #[instrument(skip(self))]
    fn navigate(&self, url: &str) -> Result<()> {
        UrlValidator::validate(url)?;
        let page = self.page()?;
        self.block_on(page.goto(url))
            .map_err(|e| NavigationError::LoadFailed(e.to_string()))?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn refresh(&self) -> Result<()> {
        let page = self.page()?;
        self.block_on(page.reload())
            .map_err(|e| NavigationError::LoadFailed(e.to_string()))?;
        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        let page = self.page()?;
        Ok(self.block_on(page.url())?.unwrap_or_default())
    }

    fn page_source(&self) -> Result<String> {
        let page = self.page()?;
        Ok(self.block_on(page.content())?)
    }

    fn run_script(&self, code: &str, args: &[Value]) -> Result<Value> {
        let expression = page_expression(code, args)?;
        let page = self.page()?;
        let result = self
            .block_on(page.evaluate(expression))
            .map_err(script_error)?;
        decode(result.value())
    }

    fn run_script_on(&self, element: &Self::Element, code: &str, args: &[Value]) -> Result<Value> {
        let function = element_function(code, args)?;
        let returns = self
            .block_on(element.call_js_fn(function, false))
            .map_err(script_error)?;
        decode(returns.result.value.as_ref())
    }

    fn window_handles(&self) -> Result<Vec<Handle>> {
        let pages = self.block_on(self.pages())?;
        Ok(pages.iter().map(Self::handle_of).collect())
    }

    fn current_handle(&self) -> Result<Handle> {
        Ok(Self::handle_of(&self.active.lock()))
    }

    #[instrument(skip(self))]
    fn switch_to(&self, handle: &Handle) -> Result<()> {
        let target = self.block_on(async {
            let pages = self.pages().await?;
            let page = pages
                .into_iter()
                .find(|p| Self::handle_of(p) == *handle)
                .ok_or_else(|| BrowserError::NoSuchHandle(handle.to_string()))?;
            page.bring_to_front().await?;
            Ok::<_, Error>(page)
        })?;
        *self.active.lock() = target;
        debug!(%handle, "Switched tab");
        Ok(())
    }

    #[instrument(skip(self))]
    fn close_current(&self) -> Result<()> {
        let page = self.page()?;
        self.block_on(page.close())?;
        Ok(())
    }

    fn find(
        &self,
        within: Option<&Self::Element>,
        locator: &Locator,
    ) -> Result<Option<Self::Element>> {
        Ok(self.find_all(within, locator)?.into_iter().next())
    }

    fn find_all(
        &self,
        within: Option<&Self::Element>,
        locator: &Locator,
    ) -> Result<Vec<Self::Element>> {
        let found = match (locator.by, within) {
            (By::XPath, Some(_)) => {
                return Err(ElementError::UnsupportedLocator(format!(
                    "{locator} below an element"
                ))
                .into())
            }
            (By::XPath, None) => {
                let page = self.page()?;
                self.block_on(page.find_xpaths(locator.value.as_str()))?
            }
            (_, Some(scope)) => {
                let css = css_for(locator)?;
                self.block_on(scope.find_elements(css))?
            }
            (_, None) => {
                let css = css_for(locator)?;
                let page = self.page()?;
                self.block_on(page.find_elements(css))?
            }
        };
        Ok(found.into_iter().map(Arc::new).collect())
    }

    fn attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>> {
        Ok(self.block_on(element.attribute(name))?)
    }

    fn text(&self, element: &Self::Element) -> Result<String> {
        Ok(self.block_on(element.inner_text())?.unwrap_or_default())
    }

    fn rect(&self, element: &Self::Element) -> Result<ElementRect> {
        match self.block_on(element.bounding_box()) {
            Ok(b) => Ok(ElementRect {
                x: b.x,
                y: b.y,
                width: b.width,
                height: b.height,
            }),
            Err(e) => {
                let err = Error::from(e);
                if err.is_stale() {
                    Err(err)
                } else {
                    // Unrendered nodes have no box model
                    Ok(ElementRect::default())
                }
            }
        }
    }

    fn screenshot(&self) -> Result<Vec<u8>> {
        let page = self.page()?;
        self.block_on(capture::screenshot(&page, &CaptureOptions::default()))
    }
}
