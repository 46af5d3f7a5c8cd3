//! Poll monitoring
//!
//! One task per active poll waits out the voting window and then triggers
//! resolution. Tasks are fire-and-forget but individually cancellable, and
//! the whole set can be restored from the store after a restart.

use crate::platform::ChatApi;
use crate::poll::{FilePollStore, Poll, PollResolver, PollResult};
use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Owns the per-poll deadline timers.
///
/// Each monitored poll gets its own task and its own child cancellation
/// token, keyed by poll id. Cancelling a waiting task leaves the poll in
/// the store so the next [`restore_all`](Self::restore_all) picks it up;
/// a resolution that has already started always runs to completion.
pub struct PollMonitor<A: ChatApi + ?Sized> {
    resolver: Arc<PollResolver<A>>,
    shutdown: CancellationToken,
    store: Arc<FilePollStore>,
    tasks: Arc<DashMap<String, CancellationToken>>,
}

impl<A: ChatApi + ?Sized + 'static> PollMonitor<A> {
    pub fn new(resolver: Arc<PollResolver<A>>, store: Arc<FilePollStore>) -> Self {
        Self {
            resolver,
            shutdown: CancellationToken::new(),
            store,
            tasks: Arc::new(DashMap::new()),
        }
    }

    /// Read every persisted poll and begin monitoring each concurrently.
    /// Polls already past their deadline resolve immediately inside their
    /// own task; restoration itself never waits on a resolution.
    ///
    /// # Errors
    /// Returns an error if the store cannot be listed.
    pub async fn restore_all(&self) -> PollResult<usize> {
        let polls = self.store.list().await?;
        let count = polls.len();
        info!(count, "restoring active polls");

        for poll in polls {
            self.start_monitoring(poll);
        }
        Ok(count)
    }

    /// Begin monitoring one poll, fire-and-forget.
    pub fn start_monitoring(&self, poll: Poll) {
        let token = self.shutdown.child_token();
        self.tasks.insert(poll.id.clone(), token.clone());

        let resolver = Arc::clone(&self.resolver);
        let tasks = Arc::clone(&self.tasks);
        tokio::spawn(async move {
            let id = poll.id.clone();
            monitor_poll(resolver, poll, token).await;
            tasks.remove(&id);
        });
    }

    /// Cancel the monitoring task for one poll id, if any. The poll stays
    /// persisted and will be re-discovered on the next restore.
    pub fn cancel(&self, id: &str) {
        if let Some((_, token)) = self.tasks.remove(id) {
            token.cancel();
        }
    }

    /// Signal every waiting monitor to exit without resolving.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Number of polls currently being monitored.
    #[must_use]
    pub fn monitored_count(&self) -> usize {
        self.tasks.len()
    }
}

async fn monitor_poll<A: ChatApi + ?Sized>(
    resolver: Arc<PollResolver<A>>,
    poll: Poll,
    token: CancellationToken,
) {
    info!(
        poll_id = %poll.id,
        kind = %poll.kind,
        expires_at = %poll.expires_at,
        "starting poll monitoring"
    );

    let remaining = poll.remaining();
    if remaining > chrono::Duration::zero() {
        let wait = remaining
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(0));
        info!(poll_id = %poll.id, wait_secs = wait.as_secs(), "waiting for poll to expire");

        tokio::select! {
            () = token.cancelled() => {
                info!(poll_id = %poll.id, "poll monitoring cancelled");
                return;
            }
            () = tokio::time::sleep(wait) => {}
        }
    } else {
        info!(poll_id = %poll.id, "poll already expired, resolving immediately");
    }

    // Past this point resolution runs to completion; shutdown no longer
    // interrupts it.
    if let Err(err) = resolver.resolve(&poll).await {
        error!(
            target: crate::ERROR_TARGET,
            poll_id = %poll.id,
            error = %err,
            "failed to resolve poll"
        );
    }
}
