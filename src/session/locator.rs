//! Element locators

use serde::{Deserialize, Serialize};
use std::fmt;

/// Locator strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum By {
    /// CSS selector
    Css,
    /// XPath expression
    XPath,
    /// `id` attribute
    Id,
    /// A single class name
    ClassName,
    /// Tag name
    TagName,
    /// `name` attribute
    Name,
}

impl By {
    /// Strategy name as used in log messages
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Css => "css selector",
            Self::XPath => "xpath",
            Self::Id => "id",
            Self::ClassName => "class name",
            Self::TagName => "tag name",
            Self::Name => "name",
        }
    }
}

/// A locator strategy paired with its value, e.g. `(By::ClassName, "table")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    /// Strategy
    pub by: By,
    /// Strategy-specific value
    pub value: String,
}

impl Locator {
    /// Create a locator
    pub fn new(by: By, value: impl Into<String>) -> Self {
        Self {
            by,
            value: value.into(),
        }
    }

    /// CSS selector locator
    pub fn css(value: impl Into<String>) -> Self {
        Self::new(By::Css, value)
    }

    /// XPath locator
    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(By::XPath, value)
    }

    /// `id` locator
    pub fn id(value: impl Into<String>) -> Self {
        Self::new(By::Id, value)
    }

    /// Class name locator
    pub fn class_name(value: impl Into<String>) -> Self {
        Self::new(By::ClassName, value)
    }

    /// Tag name locator
    pub fn tag_name(value: impl Into<String>) -> Self {
        Self::new(By::TagName, value)
    }

    /// `name` attribute locator
    pub fn name(value: impl Into<String>) -> Self {
        Self::new(By::Name, value)
    }

    /// Equivalent CSS selector. `None` for XPath.
    pub fn to_css(&self) -> Option<String> {
        match self.by {
            By::Css => Some(self.value.clone()),
            By::XPath => None,
            By::Id => Some(format!("[id=\"{}\"]", escape_attr(&self.value))),
            By::ClassName => Some(format!("[class~=\"{}\"]", escape_attr(&self.value))),
            By::TagName => Some(self.value.clone()),
            By::Name => Some(format!("[name=\"{}\"]", escape_attr(&self.value))),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.by.as_str(), self.value)
    }
}

fn escape_attr(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
