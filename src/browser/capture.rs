//! Screenshot capture

use super::ChromiumSession;
use crate::error::{CaptureError, Result};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Image format for screenshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    /// PNG screenshot
    #[default]
    Png,
    /// JPEG screenshot
    Jpeg,
    /// WebP screenshot
    Webp,
}

impl CaptureFormat {
    /// File extension
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

/// Options for screenshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureOptions {
    /// Image format
    #[serde(default)]
    pub format: CaptureFormat,
    /// JPEG/WebP quality (0-100)
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// Capture the full page instead of the viewport
    #[serde(default)]
    pub full_page: bool,
}

fn default_quality() -> u8 {
    85
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            format: CaptureFormat::Png,
            quality: default_quality(),
            full_page: false,
        }
    }
}

impl CaptureOptions {
    /// Full-page PNG
    pub fn full_page() -> Self {
        Self {
            full_page: true,
            ..Default::default()
        }
    }

    /// JPEG at the given quality
    pub fn jpeg(quality: u8) -> Self {
        Self {
            format: CaptureFormat::Jpeg,
            quality,
            ..Default::default()
        }
    }
}

/// Capture a screenshot of `page`
#[instrument(skip(page))]
pub(super) async fn screenshot(page: &Page, options: &CaptureOptions) -> Result<Vec<u8>> {
    let format = match options.format {
        CaptureFormat::Png => CaptureScreenshotFormat::Png,
        CaptureFormat::Jpeg => CaptureScreenshotFormat::Jpeg,
        CaptureFormat::Webp => CaptureScreenshotFormat::Webp,
    };

    let mut params_builder = ScreenshotParams::builder()
        .format(format)
        .from_surface(true)
        .capture_beyond_viewport(options.full_page)
        .full_page(options.full_page);

    if matches!(options.format, CaptureFormat::Jpeg | CaptureFormat::Webp) {
        params_builder = params_builder.quality(i64::from(options.quality));
    }

    let data = page
        .screenshot(params_builder.build())
        .await
        .map_err(|e| CaptureError::ScreenshotFailed(e.to_string()))?;

    debug!("Screenshot captured: {} bytes", data.len());
    Ok(data)
}

impl ChromiumSession {
    /// Screenshot of the active tab with explicit options
    pub fn screenshot_with(&self, options: &CaptureOptions) -> Result<Vec<u8>> {
        let page = self.page()?;
        self.block_on(screenshot(&page, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_options_default() {
        let options = CaptureOptions::default();
        assert_eq!(options.format, CaptureFormat::Png);
        assert_eq!(options.quality, 85);
        assert!(!options.full_page);
    }

    #[test]
    fn test_capture_options_presets() {
        assert!(CaptureOptions::full_page().full_page);
        let jpeg = CaptureOptions::jpeg(60);
        assert_eq!(jpeg.format, CaptureFormat::Jpeg);
        assert_eq!(jpeg.quality, 60);
        assert_eq!(jpeg.format.extension(), "jpg");
    }

    #[test]
    fn test_capture_options_serde_defaults() {
        let options: CaptureOptions = serde_json::from_str(r#"{"format":"webp"}"#).unwrap();
        assert_eq!(options.format, CaptureFormat::Webp);
        assert_eq!(options.quality, 85);
        assert!(!options.full_page);
    }
}
