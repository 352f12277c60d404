//! Condition-wait engine
//!
//! [`wait_until`] turns a point-in-time predicate into a bounded blocking
//! wait. It evaluates the predicate at a fixed polling interval until it
//! holds or the timeout runs out, and reports the outcome as a plain `bool`:
//!
//! - an already-true predicate returns after one evaluation
//! - a zero timeout evaluates exactly once
//! - predicate errors count as "not yet satisfied", including on the last
//!   evaluation, so the engine never returns an error
//! - sleeps are clipped to the deadline, so a never-true predicate returns
//!   `false` within one polling interval after the timeout
//! - a timeout too large to add to the start instant means no deadline, the
//!   wait then polls until the predicate holds
//!
//! The predicates the rest of the crate needs are variants of [`Condition`]
//! with a thin helper each (see [`condition`]); anything else can be wrapped
//! in a [`FnPredicate`].

pub mod condition;

pub use condition::{
    correct_handle_active, element_class_contains, element_class_does_not_contain,
    element_clickable, element_invisible, element_present, element_text_contains,
    element_text_does_not_contain, element_visible, new_handle_opened, scroll_height_changed,
    scroll_position_changed, url_changed, url_contains, url_does_not_contain, url_expected,
    url_unexpected, yoffset_changed, Condition,
};

use crate::config::{WaitConfig, DEFAULT_POLL_INTERVAL_MS};
use crate::error::Result;
use crate::logging::{self, Level, Logger};
use crate::session::Session;
use std::fmt;
use std::time::{Duration, Instant};

/// Lower bound on the polling interval, keeps a zero interval from spinning
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Timeout, polling interval and logger for one wait.
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Total budget; zero evaluates once
    pub timeout: Duration,
    /// Pause between evaluations
    pub poll_interval: Duration,
    /// Where attempts and failures are reported
    pub logger: Option<Logger>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::new(WaitConfig::default().normal())
    }
}

impl WaitOptions {
    /// Options with the default polling interval and no logger
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            logger: None,
        }
    }

    /// Options with a timeout in milliseconds
    pub fn from_millis(timeout_ms: u64) -> Self {
        Self::new(Duration::from_millis(timeout_ms))
    }

    /// Set the polling interval
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the logger
    #[must_use]
    pub fn with_logger(mut self, logger: Option<Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Same polling interval and logger, different timeout
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }
}

/// A check evaluated repeatedly by [`wait_until`].
pub trait Predicate<S: Session> {
    /// Evaluate against the current session state
    fn evaluate(&self, session: &S) -> Result<bool>;

    /// Name and arguments for log messages
    fn describe(&self) -> String;
}

/// A closure-backed predicate.
pub struct FnPredicate<F> {
    func: F,
    description: String,
}

impl<F> FnPredicate<F> {
    /// Wrap `func` with a description used in logs
    pub fn new(description: impl Into<String>, func: F) -> Self {
        Self {
            func,
            description: description.into(),
        }
    }
}

impl<F> fmt::Debug for FnPredicate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPredicate")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<S, F> Predicate<S> for FnPredicate<F>
where
    S: Session,
    F: Fn(&S) -> Result<bool>,
{
    fn evaluate(&self, session: &S) -> Result<bool> {
        (self.func)(session)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Block until `predicate` holds or `options.timeout` elapses.
///
/// Returns `true` as soon as an evaluation succeeds with `true`, `false`
/// otherwise. Never panics and never returns an error.
pub fn wait_until<S, P>(session: &S, predicate: &P, options: &WaitOptions) -> bool
where
    S: Session,
    P: Predicate<S> + ?Sized,
{
    let description = predicate.describe();
    let logger = options.logger.as_ref();
    logging::log(logger, Level::Debug, &format!("wait_until: {description}"));

    let poll_interval = options.poll_interval.max(MIN_POLL_INTERVAL);
    let start = Instant::now();
    let deadline = start.checked_add(options.timeout);
    let mut attempts = 0u32;
    let mut last_error = None;

    loop {
        attempts = attempts.saturating_add(1);
        match predicate.evaluate(session) {
            Ok(true) => {
                tracing::trace!(
                    %description,
                    attempts,
                    elapsed = ?start.elapsed(),
                    "condition satisfied"
                );
                return true;
            }
            Ok(false) => last_error = None,
            Err(e) => {
                tracing::trace!(
                    %description,
                    attempts,
                    error = %e,
                    "condition evaluation failed"
                );
                last_error = Some(e);
            }
        }

        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                poll_interval.min(deadline - now)
            }
            None => poll_interval,
        };
        std::thread::sleep(pause);
    }

    let cause = match last_error {
        Some(e) => format!("last evaluation failed: {e}"),
        None => "timed out".to_string(),
    };
    logging::log(
        logger,
        Level::Exception,
        &format!(
            "{description}: not satisfied after {:?} ({attempts} attempts, {cause})",
            options.timeout
        ),
    );
    false
}
