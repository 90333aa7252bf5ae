//! Positional command-line arguments
//!
//! `pageshot <url> <output> [mode]`. Only `mode == "desktop"` (exact,
//! case-sensitive) switches to the desktop viewport.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::Parser;
use url::{ParseError, Url};

use crate::{Error, Result, Viewport};

/// Selector value that switches to the desktop profile
pub const DESKTOP_SELECTOR: &str = "desktop";

/// The arguments of one invocation
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "pageshot",
    version,
    about = "Load a page in headless Chrome and capture it to an image file"
)]
pub struct Invocation {
    /// Page to render: an absolute URL or a path to a local HTML file
    pub url: String,

    /// Destination image file (format follows the extension, PNG otherwise)
    pub output: PathBuf,

    /// `desktop` for a 1024x768 viewport; anything else keeps 414x736
    pub mode: Option<String>,

    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    extra: Vec<String>,
}

/// Viewport profile selected by the optional mode argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Mobile,
    Desktop,
}

impl Mode {
    pub fn from_selector(selector: Option<&str>) -> Self {
        match selector {
            Some(DESKTOP_SELECTOR) => Mode::Desktop,
            _ => Mode::Mobile,
        }
    }

    pub fn viewport(self) -> Viewport {
        match self {
            Mode::Mobile => Viewport::MOBILE,
            Mode::Desktop => Viewport::DESKTOP,
        }
    }
}

impl Invocation {
    /// Parse a full argument vector, program name first
    pub fn from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::try_parse_from(args)?)
    }

    pub fn mode(&self) -> Mode {
        Mode::from_selector(self.mode.as_deref())
    }

    pub fn viewport(&self) -> Viewport {
        self.mode().viewport()
    }

    /// The URL to navigate to, resolving bare paths against the working directory
    pub fn target_url(&self) -> Result<String> {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::LoadError(format!("Cannot read working directory: {}", e)))?;
        resolve_target(&self.url, &cwd)
    }
}

/// Absolute URLs pass through untouched; anything without a scheme is a file path.
pub fn resolve_target(raw: &str, cwd: &Path) -> Result<String> {
    match Url::parse(raw) {
        Ok(_) => Ok(raw.to_string()),
        Err(ParseError::RelativeUrlWithoutBase) => {
            let path = cwd.join(raw);
            Url::from_file_path(&path)
                .map(String::from)
                .map_err(|()| Error::LoadError(format!("Cannot convert {} to a file URL", path.display())))
        }
        Err(e) => Err(Error::LoadError(format!("Invalid URL '{}': {}", raw, e))),
    }
}
