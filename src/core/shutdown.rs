use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// One-shot, broadcast cancellation shared by every task of a session.
///
/// The first `trigger` closes it; later calls are no-ops. Clones observe the
/// same token.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Closes the token. Returns `true` only for the call that actually closed it.
    pub fn trigger(&self) -> bool {
        let closed_now = self.tx.send_if_modified(|closed| !std::mem::replace(closed, true));
        if closed_now {
            debug!("shutdown signalled");
        }
        closed_now
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the token is closed, immediately if it already is.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|closed| *closed).await;
    }
}
