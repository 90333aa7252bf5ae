//! Chrome DevTools Protocol adapter implementation

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use base64::Engine as _;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page::{self, CaptureScreenshotFormatOption};
use headless_chrome::protocol::cdp::Runtime::RemoteObjectSubtype;
use headless_chrome::types::Bounds;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};

use crate::{EngineConfig, Error, LoadNotifier, LoadStatus, PageEngine, Result, ScriptResult, Viewport};

const JPEG_QUALITY: u32 = 90;

// Keeps the browser alive through long loads and readiness probes
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(600);

const PAGE_SIZE_SCRIPT: &str = r#"
(function() {
    const root = document.documentElement;
    const body = document.body;
    const width = Math.max(window.innerWidth, root ? root.scrollWidth : 0, body ? body.scrollWidth : 0);
    const height = Math.max(window.innerHeight, root ? root.scrollHeight : 0, body ? body.scrollHeight : 0);
    return JSON.stringify({ width: width, height: height });
})()
"#;

/// Wrap `script` so that anything it throws comes back as an `Error` object.
///
/// CDP only tags thrown `Error` instances with the error subtype; `throw "x"`
/// would otherwise evaluate to a plain string. The try statement keeps the
/// script's completion value, so statements and expressions both work. The
/// newline keeps a trailing line comment from swallowing the closing brace.
pub fn guard_script(script: &str) -> String {
    format!(
        "try {{\n{}\n}} catch (e) {{ e instanceof Error ? e : new Error(String(e)) }}",
        script
    )
}

/// `Page.captureScreenshot` request for one capture.
///
/// `captureBeyondViewport` is always set: without it Chrome leaves the part
/// of a full-page clip outside the viewport unpainted.
pub fn screenshot_request(
    format: CaptureScreenshotFormatOption,
    quality: Option<u32>,
    clip: Option<Page::Viewport>,
) -> Page::CaptureScreenshot {
    Page::CaptureScreenshot {
        format: Some(format),
        quality,
        clip,
        from_surface: Some(true),
        capture_beyond_viewport: Some(true),
        optimize_for_speed: None,
    }
}

/// CDP-based page engine (uses the `headless_chrome` crate)
///
/// Launches a headless Chrome instance and drives a single tab. Navigation
/// runs on a helper thread so the orchestrator can keep its own timers
/// running while Chrome loads the page.
pub struct CdpEngine {
    browser: Option<Browser>,
    tab: Arc<Tab>,
    config: EngineConfig,
}

impl CdpEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(config.sandbox)
            .path(config.chrome_path.clone())
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .args(vec![OsStr::new("--hide-scrollbars")])
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;

        if let Some(user_agent) = &config.user_agent {
            tab.set_user_agent(user_agent, None, None)
                .map_err(|e| Error::InitializationError(format!("Failed to set user agent: {}", e)))?;
        }

        Ok(Self {
            browser: Some(browser),
            tab,
            config,
        })
    }

    /// Clip covering the whole scrollable document
    fn page_clip(&self) -> Result<Page::Viewport> {
        let eval = self.tab.evaluate(PAGE_SIZE_SCRIPT, false)?;

        let raw = eval
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| Error::RenderError("Page size script returned no value".into()))?;

        let size: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| Error::RenderError(format!("Unexpected page size {:?}: {}", raw, e)))?;

        let dimension = |key: &str| {
            size.get(key)
                .and_then(serde_json::Value::as_f64)
                .ok_or_else(|| Error::RenderError(format!("Page size is missing {}", key)))
        };

        Ok(Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: dimension("width")?,
            height: dimension("height")?,
            scale: 1.0,
        })
    }
}

/// Screenshot encoding implied by the output file extension
pub fn format_for(path: &Path) -> (CaptureScreenshotFormatOption, Option<u32>) {
    let ext = path
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => (CaptureScreenshotFormatOption::Jpeg, Some(JPEG_QUALITY)),
        Some("webp") => (CaptureScreenshotFormatOption::Webp, None),
        _ => (CaptureScreenshotFormatOption::Png, None),
    }
}

impl PageEngine for CdpEngine {
    fn open(&mut self, url: &str, notifier: LoadNotifier) {
        let tab = Arc::clone(&self.tab);
        let url = url.to_string();

        thread::spawn(move || {
            let status = match tab.navigate_to(&url).and_then(|t| t.wait_until_navigated()) {
                Ok(_) => LoadStatus::Success,
                Err(e) => {
                    warn!("Navigation to {} failed: {}", url, e);
                    LoadStatus::Failed(format!("Navigation to {} failed: {}", url, e))
                }
            };
            notifier.complete(status);
        });
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.tab
            .set_bounds(Bounds::Normal {
                left: None,
                top: None,
                width: Some(f64::from(viewport.width)),
                height: Some(f64::from(viewport.height)),
            })
            .map_err(|e| Error::ViewportError(format!("Failed to resize window to {}: {}", viewport, e)))?;
        Ok(())
    }

    fn evaluate(&mut self, script: &str) -> Result<ScriptResult> {
        let result = self
            .tab
            .evaluate(&guard_script(script), false)
            .map_err(|e| Error::ScriptError(format!("Evaluation failed: {}", e)))?;

        if matches!(result.subtype, Some(RemoteObjectSubtype::Error)) {
            let value = result.description.unwrap_or_else(|| "unknown error".to_string());
            return Ok(ScriptResult { value, is_error: true });
        }

        let value = result
            .value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "null".to_string());

        Ok(ScriptResult { value, is_error: false })
    }

    fn render(&mut self, path: &Path) -> Result<()> {
        let (format, quality) = format_for(path);
        let clip = if self.config.full_page {
            Some(self.page_clip()?)
        } else {
            None
        };

        let shot = self
            .tab
            .call_method(screenshot_request(format, quality, clip))
            .map_err(|e| Error::RenderError(format!("Screenshot failed: {}", e)))?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(|e| Error::RenderError(format!("Screenshot data is not base64: {}", e)))?;

        std::fs::write(path, &data)
            .map_err(|e| Error::RenderError(format!("Failed to write {}: {}", path.display(), e)))?;

        debug!("Wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    fn exit(&mut self, code: i32) {
        // process::exit skips destructors; drop the browser so the Chrome child is reaped
        drop(self.browser.take());
        std::process::exit(code);
    }
}
