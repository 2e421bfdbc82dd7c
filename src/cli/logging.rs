//! Log level selection and subscriber setup
//!
//! Logs go to stderr so that stdout only carries the package list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a full filter directive, e.g. `changed_pkgs=trace`
pub const LOG_ENV: &str = "CHANGED_PKGS_LOG";

const LEVEL_NAMES: [&str; 4] = ["debug", "info", "warn", "error"];

#[derive(Debug, Error, PartialEq)]
#[error("invalid level {0}: must be one of: debug, info, warn, error")]
pub struct LevelParseError(String);

/// Level to log at; defaults to `warn`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn to_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }

    /// Help text listing the accepted names
    pub fn usage() -> String {
        format!(
            "The level to log at. Valid values are: {}",
            LEVEL_NAMES.join(", ")
        )
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, LevelParseError> {
        match s {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(LevelParseError(other.to_string())),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = LevelParseError;

    fn try_from(s: String) -> Result<Self, LevelParseError> {
        s.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_string()
    }
}

/// Installs the global subscriber
///
/// [`LOG_ENV`] takes precedence over `level` when set. Calling this more
/// than once keeps the first subscriber.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.to_filter().into()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
