//! Browser lifecycle management
//!
//! Launch and shutdown of a chromiumoxide-driven browser, exposed as a
//! blocking [`ChromiumSession`].

use crate::config::{UserAgent, UserAgents};
use crate::error::{BrowserError, Error, Result};
use crate::session::Handle;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Configuration for browser launch
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true)
    pub headless: bool,
    /// Browser window width (default: 2560)
    pub width: u32,
    /// Browser window height (default: 1440)
    pub height: u32,
    /// Enable sandbox (default: true)
    pub sandbox: bool,
    /// Start in an incognito context (default: true)
    pub incognito: bool,
    /// Disable GPU acceleration (default: true)
    pub disable_gpu: bool,
    /// Path to Chrome/Chromium executable (None = auto-detect)
    pub chrome_path: Option<String>,
    /// Additional Chrome arguments
    pub extra_args: Vec<String>,
    /// Which user agent to present (default: [`UserAgent::Default`])
    pub user_agent: UserAgent,
    /// Table used by [`UserAgent::Random`]
    pub user_agents: UserAgents,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            width: 2560,
            height: 1440,
            sandbox: true,
            incognito: true,
            disable_gpu: true,
            chrome_path: None,
            extra_args: Vec::new(),
            user_agent: UserAgent::Default,
            user_agents: UserAgents::default(),
        }
    }
}

impl BrowserConfig {
    /// Create a new config builder
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::default()
    }

    /// Command-line arguments derived from the config
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if !self.sandbox {
            args.push("--no-sandbox".to_string());
        }
        if self.disable_gpu {
            args.push("--disable-gpu".to_string());
        }
        if let Some(agent) = self.user_agent.resolve(&self.user_agents) {
            args.push(format!("--user-agent={agent}"));
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Builder for BrowserConfig
#[derive(Default)]
pub struct BrowserConfigBuilder {
    config: BrowserConfig,
}

impl BrowserConfigBuilder {
    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set window dimensions
    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Enable/disable sandbox
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    /// Enable/disable incognito
    pub fn incognito(mut self, incognito: bool) -> Self {
        self.config.incognito = incognito;
        self
    }

    /// Enable/disable GPU acceleration
    pub fn disable_gpu(mut self, disable_gpu: bool) -> Self {
        self.config.disable_gpu = disable_gpu;
        self
    }

    /// Set Chrome path
    pub fn chrome_path<S: Into<String>>(mut self, path: S) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Add extra Chrome argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.config.extra_args.push(arg.into());
        self
    }

    /// Choose the user agent
    pub fn user_agent(mut self, agent: UserAgent) -> Self {
        self.config.user_agent = agent;
        self
    }

    /// Replace the user agent table
    pub fn user_agents(mut self, agents: UserAgents) -> Self {
        self.config.user_agents = agents;
        self
    }

    /// Build the config
    pub fn build(self) -> BrowserConfig {
        self.config
    }
}

/// A launched browser driven through blocking calls.
///
/// Owns a private tokio runtime; every [`Session`](crate::Session) call
/// blocks on it. Commands go to the active tab, which starts as the tab
/// opened at launch and changes with [`switch_to`](crate::Session::switch_to).
pub struct ChromiumSession {
    pub(super) runtime: Runtime,
    pub(super) browser: Browser,
    handler: JoinHandle<()>,
    pub(super) active: Mutex<Page>,
    config: BrowserConfig,
}

impl ChromiumSession {
    /// Launch a browser with default config
    pub fn launch_default() -> Result<Self> {
        Self::launch(BrowserConfig::default())
    }

    /// Launch a browser and open one blank tab
    #[instrument(skip(config))]
    pub fn launch(config: BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser with config: headless={}",
            config.headless
        );

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        let mut builder = CdpBrowserConfig::builder()
            .window_size(config.width, config.height)
            .viewport(chromiumoxide::handler::viewport::Viewport {
                width: config.width,
                height: config.height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            });
        if !config.headless {
            builder = builder.with_head();
        }
        if config.incognito {
            builder = builder.incognito();
        }
        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        for arg in config.args() {
            builder = builder.arg(arg);
        }

        let cdp_config = builder
            .build()
            .map_err(|e| BrowserError::ConfigError(e.to_string()))?;

        let (browser, handler, page) = runtime.block_on(async {
            let (browser, mut handler) = Browser::launch(cdp_config)
                .await
                .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

            let handler_task = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        warn!("Browser handler event error");
                        break;
                    }
                }
                debug!("Browser handler finished");
            });

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;

            Ok::<_, Error>((browser, handler_task, page))
        })?;

        info!("Browser launched successfully");

        Ok(Self {
            runtime,
            browser,
            handler,
            active: Mutex::new(page),
            config,
        })
    }

    /// Get the browser configuration
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Run a future on the session's runtime
    pub(super) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Whether the CDP event loop is still running
    pub fn is_connected(&self) -> bool {
        !self.handler.is_finished()
    }

    /// The active tab; fails once the browser connection is gone
    pub(super) fn page(&self) -> Result<Page> {
        if !self.is_connected() {
            return Err(BrowserError::ConnectionLost.into());
        }
        Ok(self.active.lock().clone())
    }

    /// Every open tab
    pub(super) async fn pages(&self) -> Result<Vec<Page>> {
        Ok(self.browser.pages().await?)
    }

    /// Tab handle of a page
    pub(super) fn handle_of(page: &Page) -> Handle {
        Handle::new(page.target_id().inner().clone())
    }

    /// Open a blank tab and make it active
    #[instrument(skip(self))]
    pub fn new_tab(&self) -> Result<Handle> {
        let page = self
            .block_on(self.browser.new_page("about:blank"))
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;
        let handle = Self::handle_of(&page);
        *self.active.lock() = page;
        debug!(%handle, "Created new tab");
        Ok(handle)
    }

    /// Close the browser
    #[instrument(skip(self))]
    pub fn close(self) -> Result<()> {
        info!("Closing browser");

        let Self {
            runtime,
            mut browser,
            handler,
            ..
        } = self;
        runtime.block_on(async {
            browser
                .close()
                .await
                .map_err(|e| Error::cdp(e.to_string()))?;
            let _ = tokio::time::timeout(Duration::from_secs(5), handler).await;
            Ok::<_, Error>(())
        })?;

        info!("Browser closed");
        Ok(())
    }

    /// Close the browser, wait `wait`, and launch a fresh one with the same config.
    ///
    /// A failed shutdown is logged and does not stop the relaunch.
    #[instrument(skip(self))]
    pub fn restart(self, wait: Duration) -> Result<Self> {
        info!("Restarting browser");
        let config = self.config.clone();
        if let Err(e) = self.close() {
            warn!(error = %e, "Browser did not close cleanly");
        }
        if !wait.is_zero() {
            debug!(?wait, "Waiting before relaunch");
            std::thread::sleep(wait);
        }
        Self::launch(config)
    }
}
