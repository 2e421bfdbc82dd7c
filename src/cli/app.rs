//! Main CLI application structure

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use super::config::Config;
use super::logging::{self, LogLevel};
use super::output::{Output, OutputFormat};
use super::signal;
use crate::detect::{ChangeDetector, DetectError};
use crate::source::{CancelToken, GitRepo, GoListLoader};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
// https://tldp.org/LDP/abs/html/exitcodes.html
const SIGNAL_EXIT_BASE: u8 = 128;
const SIGINT_VALUE: u8 = 2;
pub const EXIT_INTERRUPTED: u8 = SIGNAL_EXIT_BASE + SIGINT_VALUE;

#[derive(Debug, Parser)]
#[command(name = "changed-go-packages")]
#[command(author, version, about = "Get the changed Go packages between two commits")]
pub struct Cli {
    /// Revision to compare from
    #[arg(long, env = "CHANGED_PKGS_FROM_REF")]
    pub from_ref: String,

    /// Revision to compare to
    #[arg(long, env = "CHANGED_PKGS_TO_REF")]
    pub to_ref: String,

    /// The Git repo to inspect [default: .]
    #[arg(long, env = "CHANGED_PKGS_REPO_DIR")]
    pub repo_dir: Option<PathBuf>,

    /// Path to the directory containing go.mod. Used to find local packages [default: .]
    #[arg(long, env = "CHANGED_PKGS_MOD_DIR")]
    pub mod_dir: Option<PathBuf>,

    #[arg(long, env = "CHANGED_PKGS_LOG_LEVEL", help = LogLevel::usage())]
    pub log_level: Option<LogLevel>,

    /// Output format [default: text]
    #[arg(long, short = 'f', env = "CHANGED_PKGS_FORMAT")]
    pub format: Option<OutputFormat>,

    /// Configuration file [default: <repo-dir>/.changed-pkgs.toml]
    #[arg(long, env = "CHANGED_PKGS_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Options after merging the command line over the configuration file
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub from_ref: String,
    pub to_ref: String,
    pub repo_dir: PathBuf,
    pub mod_dir: PathBuf,
    pub log_level: LogLevel,
    pub format: OutputFormat,
    pub manifest_name: String,
    pub git_binary: PathBuf,
    pub go_binary: PathBuf,
}

impl Cli {
    /// Merges options: command line and environment, then the config file,
    /// then defaults
    pub fn settings(self) -> Result<Settings> {
        let config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::discover(self.repo_dir.as_deref().unwrap_or(Path::new(".")))?,
        };

        Ok(Settings {
            from_ref: self.from_ref,
            to_ref: self.to_ref,
            repo_dir: self.repo_dir.or(config.repo_dir).unwrap_or_else(|| PathBuf::from(".")),
            mod_dir: self.mod_dir.or(config.mod_dir).unwrap_or_else(|| PathBuf::from(".")),
            log_level: self.log_level.or(config.log_level).unwrap_or_default(),
            format: self.format.or(config.format).unwrap_or_default(),
            manifest_name: config.manifest_name,
            git_binary: config.git_binary,
            go_binary: config.go_binary,
        })
    }
}

fn absolute(dir: &Path) -> Result<PathBuf> {
    fs::canonicalize(dir)
        .with_context(|| format!("failed building absolute path for {}", dir.display()))
}

/// Runs the command, writing the report to `out`
pub fn execute(cli: Cli, cancel: &CancelToken, out: &mut dyn Write) -> Result<()> {
    let settings = cli.settings()?;
    logging::init(settings.log_level);
    tracing::debug!(?settings, "resolved settings");

    // go and git report absolute paths with symlinks resolved
    let mod_dir = absolute(&settings.mod_dir)?;
    let repo_dir = absolute(&settings.repo_dir)?;

    let loader = GoListLoader::new(cancel.clone()).with_binary(&settings.go_binary);
    let repo = GitRepo::new(&repo_dir, cancel.clone()).with_binary(&settings.git_binary);
    let detector =
        ChangeDetector::new(loader, repo, &repo_dir).with_manifest_name(&settings.manifest_name);

    let report = detector
        .detect(&mod_dir, &settings.from_ref, &settings.to_ref)
        .context("getting changed packages")?;

    Output::new(settings.format)
        .report(out, &report)
        .context("writing report")
}

/// Maps a failed run to its exit code and the error to print
pub fn exit_status(cancel: &CancelToken, err: anyhow::Error) -> (u8, anyhow::Error) {
    let cancelled = cancel.is_cancelled()
        || err
            .downcast_ref::<DetectError>()
            .is_some_and(DetectError::is_cancelled);

    if cancelled {
        return (EXIT_INTERRUPTED, anyhow!("interrupted (^C)"));
    }
    (EXIT_FAILURE, err)
}

/// Main entry point for the CLI
pub fn run() -> ExitCode {
    let cancel = CancelToken::new();
    if let Err(e) = signal::notify_on_interrupt(&cancel) {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(EXIT_FAILURE);
    }

    let cli = Cli::parse();
    let stdout = io::stdout();
    let code = match execute(cli, &cancel, &mut stdout.lock()) {
        Ok(()) => EXIT_SUCCESS,
        Err(err) => {
            let (code, err) = exit_status(&cancel, err);
            eprintln!("Error: {:#}", err);
            code
        }
    };

    ExitCode::from(code)
}
