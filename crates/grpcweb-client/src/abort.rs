//! Caller-side cancellation.

use tokio_util::sync::CancellationToken;

/// Aborts an in-flight call.
///
/// Handles are cheap to clone and may be moved to other tasks. Aborting
/// wakes a suspended `wait` or `next` promptly; the call then resolves with
/// an aborted transport error and its transport is torn down. Aborting a
/// call that already resolved has no effect.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    token: CancellationToken,
}

impl AbortHandle {
    /// Create a handle that has not been triggered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the call to stop.
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// Whether [`AbortHandle::abort`] has been called.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) async fn aborted(&self) {
        self.token.cancelled().await;
    }
}
