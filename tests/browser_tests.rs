//! Browser module tests
//!
//! These tests cover launch configuration and capture options.
//! Driving a real tab requires a running Chrome/Chromium instance.

use pagewait::browser::{BrowserConfig, CaptureFormat, CaptureOptions, ChromiumSession};
use pagewait::config::{UserAgents, DEFAULT_USER_AGENT};
use pagewait::{Session, UserAgent};
use pretty_assertions::assert_eq;
use std::time::Duration;

#[test]
fn test_browser_config_default() {
    let config = BrowserConfig::default();
    assert!(config.headless);
    assert_eq!(config.width, 2560);
    assert_eq!(config.height, 1440);
    assert!(config.sandbox);
    assert!(config.incognito);
    assert!(config.disable_gpu);
    assert_eq!(config.user_agent, UserAgent::Default);
    assert!(config.chrome_path.is_none());
    assert!(config.extra_args.is_empty());
}

#[test]
fn test_browser_config_builder() {
    let config = BrowserConfig::builder()
        .headless(false)
        .window_size(1280, 720)
        .sandbox(false)
        .incognito(false)
        .user_agent(UserAgent::Custom("TestBot/1.0".to_string()))
        .arg("--no-first-run")
        .build();

    assert!(!config.headless);
    assert_eq!(config.width, 1280);
    assert_eq!(config.height, 720);
    assert!(!config.sandbox);
    assert!(!config.incognito);
    assert_eq!(
        config.args(),
        vec![
            "--no-sandbox".to_string(),
            "--disable-gpu".to_string(),
            "--user-agent=TestBot/1.0".to_string(),
            "--no-first-run".to_string(),
        ]
    );
}

#[test]
fn test_default_user_agent_argument() {
    let args = BrowserConfig::default().args();
    assert!(args.contains(&format!("--user-agent={DEFAULT_USER_AGENT}")));
    assert!(!args.iter().any(|a| a == "--no-sandbox"));
}

#[test]
fn test_browser_user_agent_adds_no_argument() {
    let config = BrowserConfig::builder()
        .user_agent(UserAgent::None)
        .disable_gpu(false)
        .build();
    assert!(config.args().is_empty());
}

#[test]
fn test_random_user_agent_comes_from_table() {
    let config = BrowserConfig::builder()
        .user_agent(UserAgent::Random)
        .user_agents(UserAgents::new(["OnlyAgent/1.0"]))
        .disable_gpu(false)
        .build();
    assert_eq!(config.args(), vec!["--user-agent=OnlyAgent/1.0".to_string()]);
}

#[test]
fn test_capture_format_serialization() {
    let formats = [
        (CaptureFormat::Png, "\"png\""),
        (CaptureFormat::Jpeg, "\"jpeg\""),
        (CaptureFormat::Webp, "\"webp\""),
    ];

    for (format, expected) in formats {
        let json = serde_json::to_string(&format).unwrap();
        assert_eq!(json, expected);
    }
}

#[test]
fn test_capture_options_factories() {
    let full = CaptureOptions::full_page();
    assert!(full.full_page);
    assert_eq!(full.format, CaptureFormat::Png);

    let jpeg = CaptureOptions::jpeg(70);
    assert_eq!(jpeg.format, CaptureFormat::Jpeg);
    assert_eq!(jpeg.quality, 70);
    assert!(!jpeg.full_page);
}

#[test]
fn test_capture_format_extensions() {
    assert_eq!(CaptureFormat::Png.extension(), "png");
    assert_eq!(CaptureFormat::Jpeg.extension(), "jpg");
    assert_eq!(CaptureFormat::Webp.extension(), "webp");
}

// ============================================================================
// Live browser
// ============================================================================

fn launch() -> ChromiumSession {
    let config = BrowserConfig::builder().sandbox(false).build();
    ChromiumSession::launch(config).expect("Failed to launch browser")
}

#[test]
#[ignore = "requires Chrome"]
fn test_restart_relaunches_with_same_config() {
    let session = launch();
    assert!(session.is_connected());
    session.navigate("about:blank").expect("Failed to navigate");

    let session = session
        .restart(Duration::from_millis(100))
        .expect("Failed to restart browser");
    assert!(session.is_connected());
    assert!(!session.config().sandbox);
    assert_eq!(session.current_url().expect("url"), "about:blank");
    session.close().expect("Failed to close browser");
}

#[test]
#[ignore = "requires Chrome"]
fn test_full_page_capture_is_png() {
    let session = launch();
    let png = session
        .screenshot_with(&CaptureOptions::full_page())
        .expect("Failed to capture");
    assert!(png.starts_with(b"\x89PNG"));
    session.close().expect("Failed to close browser");
}
