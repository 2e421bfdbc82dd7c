//! Cancellable subprocess execution
//!
//! Commands are spawned and polled rather than waited on, so an interrupt can
//! kill the child and surface as [`CommandError::Cancelled`].

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("running command: `{command}`")]
    Spawn {
        command: String,
        #[source]
        err: std::io::Error,
    },

    #[error("running command: `{command}`: {status}\nstderr: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("interrupted")]
    Cancelled,
}

/// Shared flag used to abort in-flight work
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Renders a command the way it would be typed in a shell
fn describe(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

fn read_all(pipe: Option<impl Read>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        // A read error only truncates the captured output
        let _ = pipe.read_to_end(&mut buf);
    }
    buf
}

/// Runs a command to completion, returning its stdout
///
/// A non-zero exit status becomes [`CommandError::Failed`] carrying the
/// command's stderr.
pub fn run_command(mut cmd: Command, cancel: &CancelToken) -> Result<String, CommandError> {
    let command = describe(&cmd);
    if cancel.is_cancelled() {
        return Err(CommandError::Cancelled);
    }
    debug!(command = %command, "running command");

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|err| CommandError::Spawn {
        command: command.clone(),
        err,
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_reader = thread::spawn(move || read_all(stdout));
    let stderr_reader = thread::spawn(move || read_all(stderr));

    let status = loop {
        let polled = child.try_wait().map_err(|err| CommandError::Spawn {
            command: command.clone(),
            err,
        })?;
        if let Some(status) = polled {
            break status;
        }
        if cancel.is_cancelled() {
            debug!(command = %command, "killing cancelled command");
            let _ = child.kill();
            let _ = child.wait();
            return Err(CommandError::Cancelled);
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    if !status.success() {
        return Err(CommandError::Failed {
            command,
            status: status.to_string(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&stdout).into_owned())
}
