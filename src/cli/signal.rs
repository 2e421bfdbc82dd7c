//! Interrupt handling
//!
//! SIGINT is blocked on the calling thread and picked up synchronously by a
//! dedicated thread, which cancels the shared token. This must run before any
//! other thread is spawned so they all inherit the blocked mask.

use anyhow::Result;

use crate::source::CancelToken;

#[cfg(unix)]
pub fn notify_on_interrupt(cancel: &CancelToken) -> Result<()> {
    use anyhow::Context;
    use nix::sys::signal::{SigSet, Signal};
    use tracing::debug;

    let mut mask = SigSet::empty();
    mask.add(Signal::SIGINT);
    mask.thread_block().context("Failed to block SIGINT")?;

    let cancel = cancel.clone();
    std::thread::Builder::new()
        .name("sigint".to_string())
        .spawn(move || {
            while let Ok(signal) = mask.wait() {
                debug!(?signal, "received signal");
                cancel.cancel();
            }
        })
        .context("Failed to spawn signal thread")?;

    Ok(())
}

#[cfg(not(unix))]
pub fn notify_on_interrupt(_cancel: &CancelToken) -> Result<()> {
    Ok(())
}
