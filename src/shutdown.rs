//! Termination signal handling
//!
//! SIGTERM, SIGINT, SIGQUIT and SIGHUP request a graceful shutdown. SIGKILL
//! cannot be caught and is not part of the set.

use std::io;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancels `token` when the first termination signal arrives.
///
/// Signal handlers are registered before this returns, so a signal sent
/// right after startup is not missed.
pub fn spawn_signal_listener(token: CancellationToken) -> io::Result<JoinHandle<()>> {
    let signals = TerminationSignals::register()?;

    Ok(tokio::spawn(async move {
        tokio::select! {
            name = signals.recv() => {
                tracing::info!(signal = name, "termination signal received");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    }))
}

#[cfg(unix)]
struct TerminationSignals {
    terminate: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            terminate: signal(SignalKind::terminate())?,
            interrupt: signal(SignalKind::interrupt())?,
            quit: signal(SignalKind::quit())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.quit.recv() => "SIGQUIT",
            _ = self.hangup.recv() => "SIGHUP",
        }
    }
}

#[cfg(not(unix))]
struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    fn register() -> io::Result<Self> {
        Ok(Self)
    }

    async fn recv(self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "ctrl-c",
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending().await
            }
        }
    }
}
