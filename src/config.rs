//! Run configuration read from the environment
//!
//! The command line stays positional, so tuning knobs come from `PAGESHOT_*`
//! variables. Unset variables keep the defaults, which reproduce the plain
//! behaviour: a 200ms settle delay and no navigation timeout.

use std::path::PathBuf;
use std::time::Duration;

use crate::settle::{SettlePolicy, DEFAULT_SETTLE_DELAY};
use crate::{EngineConfig, Error, Result};

pub const ENV_SETTLE_MS: &str = "PAGESHOT_SETTLE_MS";
pub const ENV_READY_EXPR: &str = "PAGESHOT_READY_EXPR";
pub const ENV_READY_POLL_MS: &str = "PAGESHOT_READY_POLL_MS";
pub const ENV_READY_MAX_MS: &str = "PAGESHOT_READY_MAX_MS";
pub const ENV_LOAD_TIMEOUT_MS: &str = "PAGESHOT_LOAD_TIMEOUT_MS";
pub const ENV_CHROME: &str = "PAGESHOT_CHROME";
pub const ENV_NO_SANDBOX: &str = "PAGESHOT_NO_SANDBOX";
pub const ENV_USER_AGENT: &str = "PAGESHOT_USER_AGENT";
pub const ENV_FULL_PAGE: &str = "PAGESHOT_FULL_PAGE";

const DEFAULT_READY_POLL_MS: u64 = 50;
const DEFAULT_READY_MAX_MS: u64 = 10_000;

/// Everything a run needs besides its positional arguments
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Wait applied between load completion and viewport configuration
    pub settle: SettlePolicy,
    /// Upper bound on navigation; `None` waits for the engine indefinitely
    pub load_timeout: Option<Duration>,
    /// Engine launch settings
    pub engine: EngineConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            settle: SettlePolicy::default(),
            load_timeout: None,
            engine: EngineConfig::default(),
        }
    }
}

impl RunConfig {
    /// Build from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let settle = match get(ENV_READY_EXPR) {
            Some(expression) => SettlePolicy::ReadinessProbe {
                expression,
                poll_interval: millis(ENV_READY_POLL_MS, get(ENV_READY_POLL_MS))?
                    .unwrap_or(Duration::from_millis(DEFAULT_READY_POLL_MS)),
                max_wait: millis(ENV_READY_MAX_MS, get(ENV_READY_MAX_MS))?
                    .unwrap_or(Duration::from_millis(DEFAULT_READY_MAX_MS)),
            },
            None => SettlePolicy::FixedDelay(
                millis(ENV_SETTLE_MS, get(ENV_SETTLE_MS))?.unwrap_or(DEFAULT_SETTLE_DELAY),
            ),
        };

        if let SettlePolicy::ReadinessProbe { poll_interval, .. } = &settle {
            if poll_interval.is_zero() {
                return Err(Error::ConfigError(format!("{} must be greater than zero", ENV_READY_POLL_MS)));
            }
        }

        let load_timeout = millis(ENV_LOAD_TIMEOUT_MS, get(ENV_LOAD_TIMEOUT_MS))?;
        if load_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::ConfigError(format!("{} must be greater than zero", ENV_LOAD_TIMEOUT_MS)));
        }

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            user_agent: get(ENV_USER_AGENT),
            chrome_path: get(ENV_CHROME).map(PathBuf::from),
            sandbox: !flag(ENV_NO_SANDBOX, get(ENV_NO_SANDBOX))?.unwrap_or(false),
            full_page: flag(ENV_FULL_PAGE, get(ENV_FULL_PAGE))?.unwrap_or(defaults.full_page),
            ..defaults
        };

        Ok(Self {
            settle,
            load_timeout,
            engine,
        })
    }
}

fn millis(key: &str, value: Option<String>) -> Result<Option<Duration>> {
    value
        .map(|v| {
            v.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| Error::ConfigError(format!("{}={:?} is not a number of milliseconds: {}", key, v, e)))
        })
        .transpose()
}

fn flag(key: &str, value: Option<String>) -> Result<Option<bool>> {
    value
        .map(|v| match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(Error::ConfigError(format!("{}={:?} is not a boolean", key, v))),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<RunConfig> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        RunConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.settle, SettlePolicy::FixedDelay(Duration::from_millis(200)));
        assert!(cfg.load_timeout.is_none());
        assert!(cfg.engine.sandbox);
        assert!(cfg.engine.full_page);
        assert!(cfg.engine.chrome_path.is_none());
    }

    #[test]
    fn settle_and_timeout_are_read() {
        let cfg = config(&[(ENV_SETTLE_MS, "750"), (ENV_LOAD_TIMEOUT_MS, "30000")]).unwrap();
        assert_eq!(cfg.settle, SettlePolicy::FixedDelay(Duration::from_millis(750)));
        assert_eq!(cfg.load_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn ready_expression_switches_to_probe() {
        let cfg = config(&[(ENV_READY_EXPR, "window.renderDone === true"), (ENV_READY_POLL_MS, "20")]).unwrap();
        match cfg.settle {
            SettlePolicy::ReadinessProbe { expression, poll_interval, max_wait } => {
                assert_eq!(expression, "window.renderDone === true");
                assert_eq!(poll_interval, Duration::from_millis(20));
                assert_eq!(max_wait, Duration::from_millis(DEFAULT_READY_MAX_MS));
            }
            other => panic!("unexpected policy {:?}", other),
        }
    }

    #[test]
    fn engine_settings_are_read() {
        let cfg = config(&[
            (ENV_CHROME, "/usr/bin/chromium"),
            (ENV_NO_SANDBOX, "TRUE"),
            (ENV_FULL_PAGE, "off"),
            (ENV_USER_AGENT, "pageshot-ci"),
        ])
        .unwrap();
        assert_eq!(cfg.engine.chrome_path, Some(PathBuf::from("/usr/bin/chromium")));
        assert!(!cfg.engine.sandbox);
        assert!(!cfg.engine.full_page);
        assert_eq!(cfg.engine.user_agent.as_deref(), Some("pageshot-ci"));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = config(&[(ENV_SETTLE_MS, "  "), (ENV_READY_EXPR, "")]).unwrap();
        assert_eq!(cfg.settle, SettlePolicy::default());
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(matches!(config(&[(ENV_SETTLE_MS, "fast")]), Err(Error::ConfigError(_))));
        assert!(matches!(config(&[(ENV_NO_SANDBOX, "maybe")]), Err(Error::ConfigError(_))));
        assert!(matches!(
            config(&[(ENV_READY_EXPR, "ready"), (ENV_READY_POLL_MS, "0")]),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn zero_load_timeout_is_rejected() {
        let err = config(&[(ENV_LOAD_TIMEOUT_MS, "0")]).unwrap_err();
        assert!(matches!(&err, Error::ConfigError(msg) if msg.contains(ENV_LOAD_TIMEOUT_MS)));
        assert_eq!(
            config(&[(ENV_LOAD_TIMEOUT_MS, "1")]).unwrap().load_timeout,
            Some(Duration::from_millis(1))
        );
    }
}
