//! Render orchestration: open, settle, size, normalize, capture, exit
//!
//! The whole run is one forward pass over a [`RenderSession`]. There are two
//! suspension points (load completion and the settle wait); every other engine
//! call is issued back to back. Any failing step ends the run in
//! [`Phase::Failed`] and the process exits with [`EXIT_FAILURE`].

use log::{debug, error, info};
use tokio::time::timeout;

use crate::session::{Phase, RenderSession};
use crate::{Error, Invocation, LoadNotifier, LoadStatus, PageEngine, Result, RunConfig, Viewport};

/// Forces a white page background before capture
pub const BACKGROUND_SCRIPT: &str = "if (document.body) { document.body.bgColor = 'white'; }";

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// What a finished run reports back
#[derive(Debug)]
pub struct Outcome {
    /// Terminal phase: `Terminated` or `Failed`
    pub phase: Phase,
    /// Viewport profile the run selected
    pub viewport: Viewport,
    /// Every phase the session entered, oldest first
    pub history: Vec<Phase>,
    /// Why the run failed, if it did
    pub error: Option<Error>,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURE
        }
    }
}

pub struct RenderOrchestrator {
    config: RunConfig,
}

impl RenderOrchestrator {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Render the page named by `invocation` with `engine`, then exit through it.
    ///
    /// Only returns when the engine's `exit` returns, which real engines never do.
    pub async fn run<E: PageEngine>(&self, engine: E, invocation: &Invocation) -> Outcome {
        let viewport = invocation.viewport();
        let output = invocation.output.clone();
        match invocation.target_url() {
            Ok(url) => self.execute(RenderSession::new(engine, url, output, viewport)).await,
            Err(e) => self.finish(RenderSession::new(engine, invocation.url.clone(), output, viewport), Err(e)),
        }
    }

    /// Drive an already built session to its terminal phase
    pub async fn execute<E: PageEngine>(&self, mut session: RenderSession<E>) -> Outcome {
        let result = self.drive(&mut session).await;
        self.finish(session, result)
    }

    async fn drive<E: PageEngine>(&self, session: &mut RenderSession<E>) -> Result<()> {
        session.advance(Phase::Loading)?;
        info!("Loading {}", session.url());
        let url = session.url().to_string();
        let (notifier, loaded) = LoadNotifier::channel();
        session.engine_mut().open(&url, notifier);

        let status = match self.config.load_timeout {
            Some(limit) => timeout(limit, loaded)
                .await
                .map_err(|_| Error::Timeout(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX)))?,
            None => loaded.await,
        };
        match status {
            Ok(LoadStatus::Success) => {}
            Ok(LoadStatus::Failed(reason)) => return Err(Error::LoadError(reason)),
            Err(_) => return Err(Error::LoadError("Engine dropped the load notification".into())),
        }

        session.advance(Phase::Settling)?;
        self.config.settle.wait(session.engine_mut()).await;

        session.advance(Phase::Configuring)?;
        let viewport = session.viewport();
        debug!("Applying viewport {}", viewport);
        session.engine_mut().set_viewport(viewport)?;

        session.advance(Phase::Normalizing)?;
        let res = session.engine_mut().evaluate(BACKGROUND_SCRIPT)?;
        if res.is_error {
            return Err(Error::ScriptError(res.value));
        }

        session.advance(Phase::Capturing)?;
        let output = session.output().to_path_buf();
        session.engine_mut().render(&output)?;

        session.advance(Phase::Terminated)
    }

    fn finish<E: PageEngine>(&self, mut session: RenderSession<E>, result: Result<()>) -> Outcome {
        let error = result.err();
        match &error {
            None => info!("Captured {} to {}", session.url(), session.output().display()),
            Some(e) => {
                error!("Render of {} failed while {}: {}", session.url(), session.phase(), e);
                // only errors if already terminal, which `drive` never leaves us in on failure
                let _ = session.advance(Phase::Failed);
            }
        }

        let phase = session.phase();
        let viewport = session.viewport();
        let (mut engine, history) = session.into_parts();
        let outcome = Outcome {
            phase,
            viewport,
            history,
            error,
        };
        engine.exit(outcome.exit_code());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_follows_error() {
        let ok = Outcome {
            phase: Phase::Terminated,
            viewport: Viewport::MOBILE,
            history: vec![],
            error: None,
        };
        assert_eq!(ok.exit_code(), EXIT_SUCCESS);

        let failed = Outcome {
            phase: Phase::Failed,
            viewport: Viewport::MOBILE,
            history: vec![],
            error: Some(Error::RenderError("disk full".into())),
        };
        assert!(!failed.is_success());
        assert_eq!(failed.exit_code(), EXIT_FAILURE);
    }

    #[test]
    fn background_script_targets_body_color() {
        assert!(BACKGROUND_SCRIPT.contains("document.body.bgColor = 'white'"));
    }
}
