//! pagewait CLI
//!
//! Opens a page in a browser, confirms the navigation and optionally
//! expands lazy-loaded content, counts elements and saves a screenshot.
//! A browser that drops its connection is restarted once.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use pagewait::browser::{BrowserConfig, CaptureOptions, ChromiumSession};
use pagewait::facade::{LivePage, PageOptions};
use pagewait::logging::{self, Level, LogConfig};
use pagewait::navigation::UrlValidator;
use pagewait::task::{self, UrlMatch};
use pagewait::{Locator, Logger, UserAgent, WaitConfig};
use std::path::{Path, PathBuf};

/// User agent choice on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum AgentChoice {
    /// Keep the browser's own
    Browser,
    /// Built-in default
    Default,
    /// Random pick from the built-in table
    Random,
}

/// Wait-then-act page loader
#[derive(Parser, Debug)]
#[command(name = "pagewait")]
#[command(version)]
#[command(about = "Load a page, wait until it is ready, and inspect it")]
struct Args {
    /// URL to open
    url: String,

    /// Accept any final URL containing this string instead of an exact match
    #[arg(long)]
    contains: Option<String>,

    /// Keep scrolling to the bottom until the page stops growing
    #[arg(long)]
    expand: bool,

    /// Count elements matching this CSS selector
    #[arg(long, value_name = "SELECTOR")]
    count: Option<String>,

    /// Save a screenshot into this directory
    #[arg(long, value_name = "DIR")]
    screenshot_dir: Option<PathBuf>,

    /// Capture the whole page instead of the viewport
    #[arg(long, requires = "screenshot_dir")]
    full_page: bool,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Disable the Chrome sandbox
    #[arg(long)]
    no_sandbox: bool,

    /// Path to Chrome/Chromium executable
    #[arg(long)]
    chrome_path: Option<String>,

    /// User agent to present
    #[arg(long, value_enum, default_value_t = AgentChoice::Default)]
    user_agent: AgentChoice,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logging::init(&LogConfig {
        level: if args.verbose { Level::Debug } else { Level::Info },
        to_console: true,
        file: args.log_file.clone(),
        overwrite: false,
    })?;

    let mut config = BrowserConfig::builder()
        .headless(!args.headed)
        .sandbox(!args.no_sandbox)
        .user_agent(match args.user_agent {
            AgentChoice::Browser => UserAgent::None,
            AgentChoice::Default => UserAgent::Default,
            AgentChoice::Random => UserAgent::Random,
        });
    if let Some(path) = &args.chrome_path {
        config = config.chrome_path(path);
    }

    if !UrlValidator::is_web_url(&args.url) {
        tracing::warn!(url = %args.url, "not a public web address");
    }

    let mut session = ChromiumSession::launch(config.build()).context("launching browser")?;
    let outcome = match inspect(&session, &args) {
        Err(e) if !session.is_connected() => {
            tracing::warn!(error = %e, "browser connection lost, restarting");
            let wait = WaitConfig::default().big();
            session = session.restart(wait).context("restarting browser")?;
            inspect(&session, &args)
        }
        outcome => outcome,
    };
    session.close().context("closing browser")?;
    outcome
}

fn inspect(session: &ChromiumSession, args: &Args) -> anyhow::Result<()> {
    let mut options = PageOptions::default().with_logger(Logger::worker(1));
    if let Some(dir) = &args.screenshot_dir {
        options = options.with_screenshot_dir(dir);
    }
    let waits = options.waits.clone();

    let expect = UrlMatch::from_substring(args.contains.clone().unwrap_or_default());
    let page = LivePage::from_url(session, &args.url, &expect, options);
    if !page.loaded() {
        page.save_screenshot("load_failed");
        bail!("could not confirm navigation to {}", args.url);
    }
    tracing::info!(url = %args.url, "page loaded");

    if args.expand {
        let grown = page.expand_scroll_height(waits.small());
        tracing::info!(grown, "scroll height expanded");
    }

    if let Some(selector) = &args.count {
        let matches = page.find_all_snapshot(&Locator::css(selector.as_str()));
        println!("{selector}: {}", matches.len());
    }

    match &args.screenshot_dir {
        Some(dir) if args.full_page => {
            let path = save_full_page(session, dir).context("saving full-page screenshot")?;
            println!("screenshot: {}", path.display());
        }
        Some(_) => {
            if let Some(path) = page.save_screenshot("pagewait") {
                println!("screenshot: {}", path.display());
            }
        }
        None => {}
    }
    Ok(())
}

fn save_full_page(session: &ChromiumSession, dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let png = session.screenshot_with(&CaptureOptions::full_page())?;
    let path = dir.join(task::screenshot_file_name("pagewait_full"));
    std::fs::write(&path, png)?;
    Ok(path)
}
