//! Error types for a render run

use thiserror::Error;

/// Result type alias for engine and orchestration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can end a render run
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to launch or attach to the page engine
    #[error("Engine initialization failed: {0}")]
    InitializationError(String),

    /// The target page could not be loaded
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// The capture could not be produced or written
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// In-page script evaluation failed or threw
    #[error("Script execution failed: {0}")]
    ScriptError(String),

    /// The viewport could not be applied
    #[error("Failed to set viewport: {0}")]
    ViewportError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Invalid command-line arguments
    #[error("{0}")]
    UsageError(#[from] clap::Error),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}
