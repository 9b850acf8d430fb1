use crate::state::State;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// What a step hook receives on every invocation.
///
/// Carries the run's cancellation token (cancelled on parent cancellation,
/// on deadline, and once the run has finished), the shared [`State`], and
/// the index of the current attempt. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    state: Arc<State>,
    attempt: u32,
    start_time: Instant,
}

impl Context {
    pub fn new(token: CancellationToken, state: Arc<State>) -> Self {
        Self {
            token,
            state,
            attempt: 0,
            start_time: Instant::now(),
        }
    }

    pub(crate) fn with_attempt(&self, attempt: u32) -> Self {
        Self {
            attempt,
            ..self.clone()
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Shared handle to the state, for hooks that hand it to other tasks.
    pub fn shared_state(&self) -> Arc<State> {
        Arc::clone(&self.state)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the run is cancelled or runs out of time.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Zero-based attempt index of the step being run.
    ///
    /// Always 0 during rollback.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Time since the plan run started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}
