//! Interrupt handling for interactive runs.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancellation scope for one pipeline run.
///
/// While the scope is alive a Ctrl-C cancels its token; dropping the scope
/// deregisters the signal listener. The token is a child of the token handed
/// to the orchestrator, so callers can cancel programmatically as well.
#[derive(Debug)]
pub struct CancelScope {
    token: CancellationToken,
    listener: Option<JoinHandle<()>>,
}

impl CancelScope {
    /// Scope that listens for Ctrl-C
    pub fn with_signal(parent: &CancellationToken) -> Self {
        let token = parent.child_token();
        let watched = token.clone();
        let listener = tokio::spawn(async move {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    if signal.is_ok() {
                        log::warn!("interrupt received, cancelling release");
                        watched.cancel();
                    }
                }
                _ = watched.cancelled() => {}
            }
        });
        Self {
            token,
            listener: Some(listener),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for CancelScope {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}
