use crate::error::PlanError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cancellation scope of one plan run.
///
/// A child of the caller's token, optionally armed with a deadline. The
/// deadline timer cancels the token itself, so hooks see one signal for
/// both conditions; `timed_out` records which one fired.
#[derive(Debug, Clone)]
pub(crate) struct Scope {
    token: CancellationToken,
    timed_out: Arc<AtomicBool>,
}

impl Scope {
    /// Must be called inside a tokio runtime when `limit` is set.
    pub(crate) fn derive(parent: &CancellationToken, limit: Option<Duration>) -> Self {
        let scope = Self {
            token: parent.child_token(),
            timed_out: Arc::new(AtomicBool::new(false)),
        };

        if let Some(limit) = limit.filter(|limit| !limit.is_zero()) {
            let token = scope.token.clone();
            let timed_out = Arc::clone(&scope.timed_out);
            tokio::spawn(async move {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(limit) => {
                        debug!("Plan deadline of {:?} reached", limit);
                        timed_out.store(true, Ordering::SeqCst);
                        token.cancel();
                    }
                }
            });
        }

        scope
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns the sentinel error once the scope is cancelled or expired.
    pub(crate) fn check(&self) -> Result<(), PlanError> {
        if !self.token.is_cancelled() {
            return Ok(());
        }
        if self.timed_out.load(Ordering::SeqCst) {
            Err(PlanError::Timeout)
        } else {
            Err(PlanError::Cancelled)
        }
    }

    pub(crate) async fn cancelled(&self) {
        self.token.cancelled().await
    }
}
