//! Timing and identity configuration
//!
//! Named wait budgets shared by tasks and facades, the optional random delay
//! applied before page operations, and the user agent table handed to a
//! session at launch.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default polling interval for condition waits (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Named wait budgets, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Quick sanity checks, e.g. "are we already on this URL" (default: 1000)
    pub tiny_ms: u64,
    /// Tab bookkeeping and scroll growth checks (default: 3000)
    pub small_ms: u64,
    /// Page loads and element lookups (default: 10000)
    pub normal_ms: u64,
    /// Back-off between refresh attempts (default: 30000)
    pub big_ms: u64,
    /// Polling interval (default: 500)
    pub poll_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            tiny_ms: 1_000,
            small_ms: 3_000,
            normal_ms: 10_000,
            big_ms: 30_000,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitConfig {
    /// Create a config builder
    pub fn builder() -> WaitConfigBuilder {
        WaitConfigBuilder::default()
    }

    /// Tiny budget
    pub const fn tiny(&self) -> Duration {
        Duration::from_millis(self.tiny_ms)
    }

    /// Small budget
    pub const fn small(&self) -> Duration {
        Duration::from_millis(self.small_ms)
    }

    /// Normal budget
    pub const fn normal(&self) -> Duration {
        Duration::from_millis(self.normal_ms)
    }

    /// Big budget
    pub const fn big(&self) -> Duration {
        Duration::from_millis(self.big_ms)
    }

    /// Polling interval
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Builder for WaitConfig
#[derive(Default)]
pub struct WaitConfigBuilder {
    config: WaitConfig,
}

impl WaitConfigBuilder {
    /// Set the tiny budget
    pub fn tiny_ms(mut self, ms: u64) -> Self {
        self.config.tiny_ms = ms;
        self
    }

    /// Set the small budget
    pub fn small_ms(mut self, ms: u64) -> Self {
        self.config.small_ms = ms;
        self
    }

    /// Set the normal budget
    pub fn normal_ms(mut self, ms: u64) -> Self {
        self.config.normal_ms = ms;
        self
    }

    /// Set the big budget
    pub fn big_ms(mut self, ms: u64) -> Self {
        self.config.big_ms = ms;
        self
    }

    /// Set the polling interval
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Build the config
    pub fn build(self) -> WaitConfig {
        self.config
    }
}

/// Random pause taken before a page operation.
///
/// Spacing requests out helps when a site throttles bursts. The pause is
/// explicit: an operation only sleeps when its facade carries a `Delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delay {
    /// Lower bound in milliseconds
    pub min_ms: u64,
    /// Upper bound in milliseconds (inclusive)
    pub max_ms: u64,
}

impl Delay {
    /// Create a delay range; bounds are swapped if given in the wrong order
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: min_ms.max(max_ms),
        }
    }

    /// Draw a pause from the range
    pub fn sample(&self) -> Duration {
        let ms = rand::rng().random_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }

    /// Sleep for a sampled pause and return it
    pub fn pause(&self) -> Duration {
        let pause = self.sample();
        if !pause.is_zero() {
            std::thread::sleep(pause);
        }
        pause
    }
}

/// User agent string used when [`UserAgent::Default`] is selected
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const BUILTIN_USER_AGENTS: &[&str] = &[
    DEFAULT_USER_AGENT,
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

/// Immutable table of user agent strings to choose from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAgents(Vec<String>);

impl Default for UserAgents {
    fn default() -> Self {
        Self(BUILTIN_USER_AGENTS.iter().map(|s| s.to_string()).collect())
    }
}

impl UserAgents {
    /// Table from explicit entries
    pub fn new<I, S>(agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(agents.into_iter().map(Into::into).collect())
    }

    /// Entry at `index`
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// A uniformly chosen entry, `None` for an empty table
    pub fn random(&self) -> Option<&str> {
        self.0.choose(&mut rand::rng()).map(String::as_str)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Which user agent a session presents.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAgent {
    /// Keep the browser's own user agent
    None,
    /// [`DEFAULT_USER_AGENT`]
    #[default]
    Default,
    /// A random entry from the session's [`UserAgents`] table
    Random,
    /// An explicit string
    Custom(String),
}

impl UserAgent {
    /// Resolve to a concrete string against `table`
    pub fn resolve(&self, table: &UserAgents) -> Option<String> {
        match self {
            Self::None => None,
            Self::Default => Some(DEFAULT_USER_AGENT.to_string()),
            Self::Random => table.random().map(str::to_string),
            Self::Custom(ua) => Some(ua.clone()),
        }
    }
}
