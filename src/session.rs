//! The single transient render run
//!
//! A [`RenderSession`] owns the engine handle for its whole lifetime together
//! with what the run was asked to do and how far it has got. Phases only move
//! forward, one step at a time, or drop into [`Phase::Failed`].

use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;

use crate::{Error, PageEngine, Result, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Arguments captured, nothing issued yet
    Idle,
    /// Navigation issued, waiting for the engine to report completion
    Loading,
    /// Load finished, settle wait running
    Settling,
    /// Applying the viewport profile
    Configuring,
    /// Forcing the page background to white
    Normalizing,
    /// Writing the capture
    Capturing,
    /// Capture written, process exit issued
    Terminated,
    /// A step failed; nothing further was issued
    Failed,
}

impl Phase {
    /// The next phase on the success path
    pub fn successor(self) -> Option<Phase> {
        match self {
            Phase::Idle => Some(Phase::Loading),
            Phase::Loading => Some(Phase::Settling),
            Phase::Settling => Some(Phase::Configuring),
            Phase::Configuring => Some(Phase::Normalizing),
            Phase::Normalizing => Some(Phase::Capturing),
            Phase::Capturing => Some(Phase::Terminated),
            Phase::Terminated | Phase::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Terminated | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::Settling => "settling",
            Phase::Configuring => "configuring",
            Phase::Normalizing => "normalizing",
            Phase::Capturing => "capturing",
            Phase::Terminated => "terminated",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

pub struct RenderSession<E: PageEngine> {
    engine: E,
    url: String,
    output: PathBuf,
    viewport: Viewport,
    phase: Phase,
    history: Vec<Phase>,
}

impl<E: PageEngine> RenderSession<E> {
    pub fn new(engine: E, url: impl Into<String>, output: impl Into<PathBuf>, viewport: Viewport) -> Self {
        Self {
            engine,
            url: url.into(),
            output: output.into(),
            viewport,
            phase: Phase::Idle,
            history: vec![Phase::Idle],
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Every phase entered so far, oldest first
    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Move to `next`, which must be the success-path successor or `Failed`
    pub fn advance(&mut self, next: Phase) -> Result<()> {
        let allowed = !self.phase.is_terminal() && (next == Phase::Failed || self.phase.successor() == Some(next));
        if !allowed {
            return Err(Error::Other(format!(
                "Invalid session transition {} -> {}",
                self.phase, next
            )));
        }
        debug!("Session phase {} -> {}", self.phase, next);
        self.phase = next;
        self.history.push(next);
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (E, Vec<Phase>) {
        (self.engine, self.history)
    }
}
