//! # Command-Line Interface
//!
//! The `changed-go-packages` binary prints the Go packages changed between
//! two revisions, one per line:
//!
//! ```bash
//! changed-go-packages --from-ref origin/main --to-ref HEAD --mod-dir ./service
//! ```
//!
//! ## Options
//!
//! | Flag | Env | Config key | Default |
//! |------|-----|------------|---------|
//! | `--from-ref` | `CHANGED_PKGS_FROM_REF` | | required |
//! | `--to-ref` | `CHANGED_PKGS_TO_REF` | | required |
//! | `--repo-dir` | `CHANGED_PKGS_REPO_DIR` | `repo_dir` | `.` |
//! | `--mod-dir` | `CHANGED_PKGS_MOD_DIR` | `mod_dir` | `.` |
//! | `--log-level` | `CHANGED_PKGS_LOG_LEVEL` | `log_level` | `warn` |
//! | `--format` | `CHANGED_PKGS_FORMAT` | `format` | `text` |
//! | `--config` | `CHANGED_PKGS_CONFIG` | | `<repo-dir>/.changed-pkgs.toml` |
//!
//! ## Exit Codes
//!
//! - `0` - success
//! - `1` - any failure; the error chain is printed to stderr
//! - `130` - interrupted with Ctrl+C
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute.

mod app;
mod config;
mod logging;
mod output;
mod signal;

pub use app::{execute, exit_status, run, Cli, Settings, EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_SUCCESS};
pub use config::{Config, ConfigError, CONFIG_FILE_NAME};
pub use logging::{LevelParseError, LogLevel, LOG_ENV};
pub use output::{Output, OutputFormat};
