use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// Stop signal for the current collection run.
///
/// Capture work takes a token when it is submitted and checks it between
/// large steps. Stopping the service cancels the token (in-flight results
/// are discarded, nothing is force-terminated) and installs a fresh one for
/// the next run.
#[derive(Debug, Default)]
pub struct RunCancellation {
    current: Mutex<CancellationToken>,
}

impl RunCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Cancels everything handed out so far and starts a new generation.
    pub fn cancel_and_renew(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.cancel();
        *current = CancellationToken::new();
    }
}
