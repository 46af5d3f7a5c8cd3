//! Poll resolution
//!
//! Closes an expired vote, tallies it, maps the decision to a moderation
//! action, applies it, and removes the poll from the store. Resolution is
//! idempotent per poll id: duplicate monitors never double-apply.

use crate::platform::ChatApi;
use crate::poll::{ActionApplier, FilePollStore, Poll, PollError, PollResult};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Resolves expired polls exactly once each.
pub struct PollResolver<A: ChatApi + ?Sized> {
    api: Arc<A>,
    store: Arc<FilePollStore>,
    applier: ActionApplier<A>,
    /// Polls currently mid-resolution; the claim makes duplicates no-ops
    in_flight: DashMap<String, ()>,
}

impl<A: ChatApi + ?Sized> PollResolver<A> {
    pub fn new(api: Arc<A>, store: Arc<FilePollStore>) -> Self {
        Self {
            applier: ActionApplier::new(Arc::clone(&api)),
            api,
            store,
            in_flight: DashMap::new(),
        }
    }

    /// Resolve one expired poll.
    ///
    /// Ordering within a poll is fixed: vote close, then decision, then
    /// action, then store delete. Only a vote-close failure keeps the poll
    /// in the store for a retry after restart; an action failure is reported
    /// but the poll is still deleted, since the vote itself cannot reopen.
    ///
    /// # Errors
    /// Returns an error when the vote cannot be closed, the snapshot is
    /// corrupt, or the store cannot be updated.
    pub async fn resolve(&self, poll: &Poll) -> PollResult<()> {
        if self.in_flight.insert(poll.id.clone(), ()).is_some() {
            info!(poll_id = %poll.id, "resolution already in flight, skipping duplicate");
            return Ok(());
        }

        let result = self.resolve_claimed(poll).await;
        self.in_flight.remove(&poll.id);
        result
    }

    async fn resolve_claimed(&self, poll: &Poll) -> PollResult<()> {
        // A poll gone from the store was already resolved, likely by a
        // monitor from a previous process lifetime.
        if !self.store.contains(&poll.id).await? {
            info!(poll_id = %poll.id, "poll no longer persisted, skipping");
            return Ok(());
        }

        let member = poll.member().inspect_err(|err| {
            error!(poll_id = %poll.id, error = %err, "failed to restore member snapshot");
        })?;

        let counts = match self.api.stop_poll(poll.chat_id, poll.message_id).await {
            Ok(counts) => counts,
            Err(err) => {
                // The poll stays persisted so a restart can retry.
                error!(
                    poll_id = %poll.id,
                    chat_id = %poll.chat_id,
                    message_id = %poll.message_id,
                    error = %err,
                    "failed to stop poll"
                );
                return Err(PollError::Platform(err));
            }
        };

        let first_wins = counts.first_wins();
        let action = poll.kind.outcome(first_wins);
        info!(
            poll_id = %poll.id,
            kind = %poll.kind,
            first = counts.first,
            second = counts.second,
            ?action,
            "poll tallied"
        );

        if let Err(err) = self
            .applier
            .apply(poll.chat_id, poll.message_id, &member, action)
            .await
        {
            // Best-effort only; deletion still happens below.
            warn!(
                poll_id = %poll.id,
                user_id = %poll.target_user_id,
                error = %err,
                "failed to apply poll action"
            );
        }

        self.store.delete(&poll.id).await?;
        info!(target: crate::POLL_TARGET, poll_id = %poll.id, "poll resolved and removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ChatId, ChatMember, MessageId, MockChatApi, PlatformError, UserId, VoteCounts};
    use crate::poll::PollType;
    use chrono::Duration;
    use mockall::predicate::eq;

    fn sample_poll(kind: PollType) -> Poll {
        Poll::new(
            kind,
            ChatId(10),
            MessageId(99),
            &ChatMember::unrestricted(UserId(42)),
            Duration::seconds(3600),
        )
        .unwrap()
    }

    async fn store_with(poll: &Poll) -> (tempfile::TempDir, Arc<FilePollStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            FilePollStore::new(dir.path().join("polls.yaml"))
                .await
                .unwrap(),
        );
        store.save(poll).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_ban_poll_majority_first_bans() {
        let poll = sample_poll(PollType::Ban);
        let (_dir, store) = store_with(&poll).await;

        let mut api = MockChatApi::new();
        api.expect_stop_poll()
            .with(eq(ChatId(10)), eq(MessageId(99)))
            .once()
            .returning(|_, _| Ok(VoteCounts::new(5, 3)));
        api.expect_ban()
            .with(eq(ChatId(10)), eq(UserId(42)))
            .once()
            .returning(|_, _| Ok(()));
        api.expect_reply().returning(|_, _, _| Ok(()));

        let resolver = PollResolver::new(Arc::new(api), Arc::clone(&store));
        resolver.resolve(&poll).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ban_poll_majority_second_unbans() {
        let poll = sample_poll(PollType::Ban);
        let (_dir, store) = store_with(&poll).await;

        let mut api = MockChatApi::new();
        api.expect_stop_poll()
            .once()
            .returning(|_, _| Ok(VoteCounts::new(3, 5)));
        api.expect_unban()
            .with(eq(ChatId(10)), eq(UserId(42)), eq(true))
            .once()
            .returning(|_, _, _| Ok(()));
        api.expect_reply().returning(|_, _, _| Ok(()));

        let resolver = PollResolver::new(Arc::new(api), Arc::clone(&store));
        resolver.resolve(&poll).await.unwrap();
    }

    #[tokio::test]
    async fn test_ban_poll_tie_unbans() {
        let poll = sample_poll(PollType::Ban);
        let (_dir, store) = store_with(&poll).await;

        let mut api = MockChatApi::new();
        api.expect_stop_poll()
            .once()
            .returning(|_, _| Ok(VoteCounts::new(4, 4)));
        api.expect_unban().once().returning(|_, _, _| Ok(()));
        api.expect_reply().returning(|_, _, _| Ok(()));

        let resolver = PollResolver::new(Arc::new(api), Arc::clone(&store));
        resolver.resolve(&poll).await.unwrap();
    }

    #[tokio::test]
    async fn test_restrict_media_majority_disables_media_once() {
        let poll = sample_poll(PollType::RestrictMedia);
        let (_dir, store) = store_with(&poll).await;

        let mut api = MockChatApi::new();
        api.expect_stop_poll()
            .once()
            .returning(|_, _| Ok(VoteCounts::new(2, 1)));
        api.expect_chat_member_of()
            .once()
            .returning(|_, user| Ok(ChatMember::unrestricted(user)));
        api.expect_restrict()
            .withf(|chat, member| {
                *chat == ChatId(10)
                    && member.user_id == UserId(42)
                    && !member.can_send_photos
                    && !member.can_send_video_notes
            })
            .once()
            .returning(|_, _| Ok(()));
        api.expect_reply().returning(|_, _, _| Ok(()));

        let resolver = PollResolver::new(Arc::new(api), Arc::clone(&store));
        resolver.resolve(&poll).await.unwrap();
        assert!(!store.contains(&poll.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_double_resolution_applies_once() {
        let poll = sample_poll(PollType::Ban);
        let (_dir, store) = store_with(&poll).await;

        let mut api = MockChatApi::new();
        // Exactly one stop and one ban across both attempts
        api.expect_stop_poll()
            .once()
            .returning(|_, _| Ok(VoteCounts::new(5, 3)));
        api.expect_ban().once().returning(|_, _| Ok(()));
        api.expect_reply().returning(|_, _, _| Ok(()));

        let resolver = Arc::new(PollResolver::new(Arc::new(api), Arc::clone(&store)));
        resolver.resolve(&poll).await.unwrap();
        // Second call simulates a duplicate monitor
        resolver.resolve(&poll).await.unwrap();

        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stop_poll_failure_keeps_poll_persisted() {
        let poll = sample_poll(PollType::Ban);
        let (_dir, store) = store_with(&poll).await;

        let mut api = MockChatApi::new();
        api.expect_stop_poll()
            .once()
            .returning(|_, message| Err(PlatformError::MessageNotFound(message)));

        let resolver = PollResolver::new(Arc::new(api), Arc::clone(&store));
        assert!(resolver.resolve(&poll).await.is_err());
        // Still there for a retry after the next restart
        assert!(store.contains(&poll.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_apply_failure_still_deletes_poll() {
        let poll = sample_poll(PollType::Ban);
        let (_dir, store) = store_with(&poll).await;

        let mut api = MockChatApi::new();
        api.expect_stop_poll()
            .once()
            .returning(|_, _| Ok(VoteCounts::new(5, 3)));
        api.expect_ban()
            .once()
            .returning(|_, _| Err(PlatformError::Api("missing rights".into())));
        api.expect_reply().returning(|_, _, _| Ok(()));

        let resolver = PollResolver::new(Arc::new(api), Arc::clone(&store));
        resolver.resolve(&poll).await.unwrap();
        assert!(!store.contains(&poll.id).await.unwrap());
    }
}
