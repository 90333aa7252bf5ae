//! pageshot
//!
//! Loads a single web page in a headless browser engine and captures it to an
//! image file, normalizing the viewport size and the page background first.
//! Intended to be invoked once per page by a build or CI pipeline.
//!
//! # Features
//!
//! - **CDP Backend** (default): drives headless Chrome through the Chrome DevTools Protocol
//! - **Pluggable engine**: the orchestration only talks to the [`PageEngine`] trait
//! - **Pluggable settle wait**: fixed delay or an in-page readiness probe
//!
//! # Example
//!
//! ```no_run
//! use pageshot::{Invocation, RenderOrchestrator, RunConfig};
//!
//! # #[cfg(not(feature = "cdp"))]
//! # fn main() {}
//! # #[cfg(feature = "cdp")]
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let invocation = Invocation::from_args(["pageshot", "https://example.com", "out.png", "desktop"])?;
//! let config = RunConfig::default();
//!
//! let engine = pageshot::new_engine(config.engine.clone())?;
//! let outcome = RenderOrchestrator::new(config).run(engine, &invocation).await;
//! println!("exit code: {}", outcome.exit_code());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use tokio::sync::oneshot;

pub mod args;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod session;
pub mod settle;

#[cfg(feature = "cdp")]
pub mod cdp;

pub use args::{Invocation, Mode};
pub use config::RunConfig;
pub use error::{Error, Result};
pub use orchestrator::{Outcome, RenderOrchestrator};
pub use session::{Phase, RenderSession};
pub use settle::SettlePolicy;

/// Launch configuration for a page engine
///
/// The defaults match what a CI pipeline needs: headless, sandboxed, the
/// mobile viewport and whole-page captures.
///
/// # Examples
///
/// ```
/// let cfg = pageshot::EngineConfig::default();
/// assert_eq!(cfg.viewport, pageshot::Viewport::MOBILE);
/// assert!(cfg.full_page);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// User agent override; `None` keeps the browser's own
    pub user_agent: Option<String>,
    /// Initial window size before the run selects its profile
    pub viewport: Viewport,
    /// Explicit browser binary; `None` lets the backend find one
    pub chrome_path: Option<PathBuf>,
    /// Whether the browser sandbox stays enabled
    pub sandbox: bool,
    /// Capture the whole scrollable document instead of the visible viewport
    pub full_page: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            viewport: Viewport::default(),
            chrome_path: None,
            sandbox: true,
            full_page: true,
        }
    }
}

/// Viewport dimensions in device-independent pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Default profile, a large phone in portrait
    pub const MOBILE: Viewport = Viewport { width: 414, height: 736 };

    /// Profile used for the `desktop` mode
    pub const DESKTOP: Viewport = Viewport { width: 1024, height: 768 };
}

impl Default for Viewport {
    fn default() -> Self {
        Self::MOBILE
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Result of JavaScript execution
///
/// `value` is the JSON serialization of the evaluation result. `is_error`
/// indicates whether the script threw an exception.
#[derive(Debug, Clone)]
pub struct ScriptResult {
    /// Serialized result value
    pub value: String,
    /// Whether the script threw an error
    pub is_error: bool,
}

/// How a navigation finished, as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Success,
    Failed(String),
}

/// One-shot completion handle passed to [`PageEngine::open`].
///
/// `complete` consumes the notifier, so an engine can report a navigation
/// at most once. Dropping it without completing counts as a failed load.
#[derive(Debug)]
pub struct LoadNotifier {
    tx: oneshot::Sender<LoadStatus>,
}

impl LoadNotifier {
    /// Create a notifier and the receiver that observes it
    pub fn channel() -> (Self, oneshot::Receiver<LoadStatus>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Report the end of the navigation
    pub fn complete(self, status: LoadStatus) {
        // the waiter may already have given up (load timeout)
        let _ = self.tx.send(status);
    }
}

/// The headless browser the orchestration drives.
///
/// Implementations own the page; the orchestrator only issues calls in a
/// fixed order and never touches the page concurrently.
pub trait PageEngine {
    /// Begin navigating to `url` and return immediately.
    ///
    /// The engine must call [`LoadNotifier::complete`] once loading finishes.
    fn open(&mut self, url: &str, notifier: LoadNotifier);

    /// Resize the page viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Evaluate JavaScript in the page's global context
    fn evaluate(&mut self, script: &str) -> Result<ScriptResult>;

    /// Capture the current page state to `path`.
    ///
    /// Returns once the image has been written.
    fn render(&mut self, path: &Path) -> Result<()>;

    /// Terminate the hosting process with `code`.
    ///
    /// Real engines do not return from this call.
    fn exit(&mut self, code: i32);
}

/// Create the default page engine (headless Chrome over CDP)
#[cfg(feature = "cdp")]
pub fn new_engine(config: EngineConfig) -> Result<impl PageEngine> {
    cdp::CdpEngine::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.viewport.width, 414);
        assert_eq!(config.viewport.height, 736);
        assert!(config.sandbox);
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn test_viewport_profiles() {
        assert_eq!(Viewport::MOBILE, Viewport { width: 414, height: 736 });
        assert_eq!(Viewport::DESKTOP, Viewport { width: 1024, height: 768 });
        assert_eq!(Viewport::DESKTOP.to_string(), "1024x768");
    }

    #[tokio::test]
    async fn notifier_delivers_status_once() {
        let (notifier, rx) = LoadNotifier::channel();
        notifier.complete(LoadStatus::Failed("dns".into()));
        assert_eq!(rx.await.unwrap(), LoadStatus::Failed("dns".into()));
    }

    #[tokio::test]
    async fn dropped_notifier_closes_channel() {
        let (notifier, rx) = LoadNotifier::channel();
        drop(notifier);
        assert!(rx.await.is_err());
    }
}
