//! Settle wait applied after the page reports it has loaded
//!
//! Load completion does not mean late scripts, fonts or XHR-driven content
//! have painted. The policy decides how long to hold off before the viewport
//! is configured and the page captured.

use std::time::Duration;

use log::{debug, warn};
use tokio::time::{sleep, Instant};

use crate::PageEngine;

/// Heuristic wait used when nothing else is configured
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlePolicy {
    /// Sleep for a fixed duration
    FixedDelay(Duration),

    /// Poll `expression` in the page until it evaluates to `true`.
    ///
    /// Gives up after `max_wait` and lets the run continue.
    ReadinessProbe {
        expression: String,
        poll_interval: Duration,
        max_wait: Duration,
    },
}

impl Default for SettlePolicy {
    fn default() -> Self {
        SettlePolicy::FixedDelay(DEFAULT_SETTLE_DELAY)
    }
}

impl SettlePolicy {
    /// Wait according to the policy. Never fails: settling is best effort.
    pub async fn wait<E: PageEngine + ?Sized>(&self, engine: &mut E) {
        match self {
            SettlePolicy::FixedDelay(delay) => {
                debug!("Settling for {}ms", delay.as_millis());
                sleep(*delay).await;
            }
            SettlePolicy::ReadinessProbe {
                expression,
                poll_interval,
                max_wait,
            } => {
                let deadline = Instant::now() + *max_wait;
                loop {
                    match engine.evaluate(expression) {
                        Ok(res) if !res.is_error && res.value == "true" => {
                            debug!("Readiness probe satisfied");
                            return;
                        }
                        Ok(res) => debug!("Page not ready yet ({})", res.value),
                        Err(e) => debug!("Readiness probe failed: {}", e),
                    }

                    let now = Instant::now();
                    if now >= deadline {
                        warn!(
                            "Page did not report ready within {}ms; capturing anyway",
                            max_wait.as_millis()
                        );
                        return;
                    }
                    sleep((*poll_interval).min(deadline - now)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, LoadNotifier, Result, ScriptResult, Viewport};
    use std::path::Path;

    /// Answers the probe with `false` until `ready_after` evaluations have happened
    struct ProbeEngine {
        evaluations: usize,
        ready_after: usize,
    }

    impl PageEngine for ProbeEngine {
        fn open(&mut self, _url: &str, _notifier: LoadNotifier) {}

        fn set_viewport(&mut self, _viewport: Viewport) -> Result<()> {
            Ok(())
        }

        fn evaluate(&mut self, _script: &str) -> Result<ScriptResult> {
            self.evaluations += 1;
            if self.evaluations == 1 {
                return Err(Error::ScriptError("document not ready".into()));
            }
            let ready = self.evaluations >= self.ready_after;
            Ok(ScriptResult { value: ready.to_string(), is_error: false })
        }

        fn render(&mut self, _path: &Path) -> Result<()> {
            Ok(())
        }

        fn exit(&mut self, _code: i32) {}
    }

    fn probe(max_wait_ms: u64) -> SettlePolicy {
        SettlePolicy::ReadinessProbe {
            expression: "window.ready".into(),
            poll_interval: Duration::from_millis(50),
            max_wait: Duration::from_millis(max_wait_ms),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_delay_sleeps_for_the_full_duration() {
        let mut engine = ProbeEngine { evaluations: 0, ready_after: 0 };
        let start = Instant::now();
        SettlePolicy::default().wait(&mut engine).await;
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert_eq!(engine.evaluations, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_returns_once_page_is_ready() {
        let mut engine = ProbeEngine { evaluations: 0, ready_after: 4 };
        let start = Instant::now();
        probe(10_000).wait(&mut engine).await;
        assert_eq!(engine.evaluations, 4);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(150) && elapsed < Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn probe_gives_up_at_max_wait() {
        let mut engine = ProbeEngine { evaluations: 0, ready_after: usize::MAX };
        let start = Instant::now();
        probe(120).wait(&mut engine).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(120) && elapsed < Duration::from_millis(170));
        // t=0, 50, 100, 120
        assert_eq!(engine.evaluations, 4);
    }
}
