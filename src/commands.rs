//! Command-surface glue
//!
//! The command parser (an external collaborator) turns chat commands into
//! [`VoteRequest`]s; this module validates them and hands a fully-populated
//! poll record to the core. Nothing is persisted for a rejected request.

use crate::config::Config;
use crate::platform::{ChatApi, ChatId, ChatMember, MessageId, PlatformError, UserId};
use crate::poll::{FilePollStore, Poll, PollMonitor, PollType};
use thiserror::Error;
use tracing::info;

/// A vote command as handed over by the command parser.
#[derive(Debug, Clone)]
pub struct VoteRequest {
    pub chat: ChatId,
    /// Votes only make sense in group chats
    pub is_group: bool,
    /// Message the command replied to; the poll is posted as a reply to it
    pub reply_to: MessageId,
    /// The member the vote concerns
    pub target: UserId,
    pub initiated_by: UserId,
}

/// Rejections reported to the caller as plain messages.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("команда работает только в группах")]
    NotAGroup,

    #[error("нельзя голосовать против администраторов")]
    TargetIsAdmin,

    #[error("бот должен быть администратором")]
    BotCannotRestrict,

    #[error("команда доступна только администраторам")]
    AdminsOnly,

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Poll(#[from] crate::poll::PollError),
}

/// Whether `user` is among the chat admins.
#[must_use]
pub fn is_admin(user: UserId, admins: &[ChatMember]) -> bool {
    admins.iter().any(|admin| admin.user_id == user)
}

/// Whether the bot is an admin allowed to restrict members.
#[must_use]
pub fn bot_can_restrict(bot: UserId, admins: &[ChatMember]) -> bool {
    admins
        .iter()
        .any(|admin| admin.user_id == bot && admin.can_restrict_members)
}

/// Validate a vote request and capture the target member's state.
///
/// # Errors
/// Returns a [`CommandError`] when the chat is not a group, the target is
/// an admin, the bot lacks restrict rights, or a platform call fails.
pub async fn validate<A: ChatApi + ?Sized>(
    api: &A,
    bot: UserId,
    config: &Config,
    request: &VoteRequest,
) -> Result<ChatMember, CommandError> {
    if !request.is_group {
        return Err(CommandError::NotAGroup);
    }

    let admins = api.admins_of(request.chat).await?;

    if config.admins_only && !is_admin(request.initiated_by, &admins) {
        return Err(CommandError::AdminsOnly);
    }
    if is_admin(request.target, &admins) {
        return Err(CommandError::TargetIsAdmin);
    }
    if !bot_can_restrict(bot, &admins) {
        return Err(CommandError::BotCannotRestrict);
    }

    Ok(api.chat_member_of(request.chat, request.target).await?)
}

/// Validate, post the vote, persist the poll and begin monitoring it.
///
/// # Errors
/// Returns a [`CommandError`] for a rejected request or a failed platform
/// or store operation. On a store failure nothing is monitored.
pub async fn start_vote<A: ChatApi + ?Sized + 'static>(
    api: &A,
    store: &FilePollStore,
    monitor: &PollMonitor<A>,
    config: &Config,
    bot: UserId,
    request: VoteRequest,
    kind: PollType,
) -> Result<Poll, CommandError> {
    let member = validate(api, bot, config, &request).await?;

    let message_id = api
        .send_poll(
            request.chat,
            Some(request.reply_to),
            kind.question(),
            &kind.options(),
        )
        .await?;

    let poll = Poll::new(
        kind,
        request.chat,
        message_id,
        &member,
        config.poll_duration(),
    )?;

    store.save(&poll).await?;
    monitor.start_monitoring(poll.clone());

    info!(
        target: crate::COMMAND_TARGET,
        poll_id = %poll.id,
        kind = %kind,
        chat_id = %request.chat,
        target_user_id = %request.target,
        initiated_by = %request.initiated_by,
        "vote started"
    );
    Ok(poll)
}

/// Immediate ban without a poll, for admins cleaning up spam.
///
/// # Errors
/// Returns a [`CommandError`] for a rejected request or a failed ban call.
pub async fn instant_ban<A: ChatApi + ?Sized>(
    api: &A,
    bot: UserId,
    request: &VoteRequest,
) -> Result<(), CommandError> {
    if !request.is_group {
        return Err(CommandError::NotAGroup);
    }

    let admins = api.admins_of(request.chat).await?;
    if !is_admin(request.initiated_by, &admins) {
        return Err(CommandError::AdminsOnly);
    }
    if is_admin(request.target, &admins) {
        return Err(CommandError::TargetIsAdmin);
    }
    if !bot_can_restrict(bot, &admins) {
        return Err(CommandError::BotCannotRestrict);
    }

    api.ban(request.chat, request.target).await?;
    info!(
        target: crate::COMMAND_TARGET,
        chat_id = %request.chat,
        user_id = %request.target,
        admin_id = %request.initiated_by,
        "user banned instantly"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MockChatApi;
    use crate::poll::PollResolver;
    use std::sync::Arc;

    const BOT: UserId = UserId(1);

    fn request() -> VoteRequest {
        VoteRequest {
            chat: ChatId(10),
            is_group: true,
            reply_to: MessageId(7),
            target: UserId(42),
            initiated_by: UserId(5),
        }
    }

    fn admin(user: i64, can_restrict: bool) -> ChatMember {
        ChatMember {
            user_id: UserId(user),
            can_restrict_members: can_restrict,
            ..ChatMember::default()
        }
    }

    #[tokio::test]
    async fn test_rejects_non_group() {
        let api = MockChatApi::new();
        let req = VoteRequest {
            is_group: false,
            ..request()
        };
        let result = validate(&api, BOT, &Config::default(), &req).await;
        assert!(matches!(result, Err(CommandError::NotAGroup)));
    }

    #[tokio::test]
    async fn test_rejects_admin_target() {
        let mut api = MockChatApi::new();
        api.expect_admins_of()
            .returning(|_| Ok(vec![admin(42, false), admin(1, true)]));

        let result = validate(&api, BOT, &Config::default(), &request()).await;
        assert!(matches!(result, Err(CommandError::TargetIsAdmin)));
    }

    #[tokio::test]
    async fn test_rejects_powerless_bot() {
        let mut api = MockChatApi::new();
        api.expect_admins_of()
            .returning(|_| Ok(vec![admin(1, false)]));

        let result = validate(&api, BOT, &Config::default(), &request()).await;
        assert!(matches!(result, Err(CommandError::BotCannotRestrict)));
    }

    #[tokio::test]
    async fn test_admins_only_gates_initiator() {
        let mut api = MockChatApi::new();
        api.expect_admins_of().returning(|_| Ok(vec![admin(1, true)]));

        let config = Config {
            admins_only: true,
            ..Config::default()
        };
        let result = validate(&api, BOT, &config, &request()).await;
        assert!(matches!(result, Err(CommandError::AdminsOnly)));
    }

    #[tokio::test]
    async fn test_start_vote_persists_and_monitors() {
        let mut api = MockChatApi::new();
        api.expect_admins_of().returning(|_| Ok(vec![admin(1, true)]));
        api.expect_chat_member_of()
            .returning(|_, user| Ok(ChatMember::unrestricted(user)));
        api.expect_send_poll()
            .withf(|chat, reply_to, question, options| {
                *chat == ChatId(10)
                    && *reply_to == Some(MessageId(7))
                    && question == "Банить?"
                    && options[0] == "Да"
            })
            .once()
            .returning(|_, _, _, _| Ok(MessageId(99)));

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            FilePollStore::new(dir.path().join("polls.yaml"))
                .await
                .unwrap(),
        );
        let api = Arc::new(api);
        let resolver = Arc::new(PollResolver::new(Arc::clone(&api), Arc::clone(&store)));
        let monitor = PollMonitor::new(resolver, Arc::clone(&store));

        let poll = start_vote(
            api.as_ref(),
            &store,
            &monitor,
            &Config::default(),
            BOT,
            request(),
            PollType::Ban,
        )
        .await
        .unwrap();

        assert_eq!(poll.message_id, MessageId(99));
        assert_eq!(poll.target_user_id, UserId(42));
        assert!(store.contains(&poll.id).await.unwrap());
        assert_eq!(monitor.monitored_count(), 1);

        monitor.shutdown();
    }

    #[tokio::test]
    async fn test_instant_ban_requires_admin_initiator() {
        let mut api = MockChatApi::new();
        api.expect_admins_of().returning(|_| Ok(vec![admin(1, true)]));

        let result = instant_ban(&api, BOT, &request()).await;
        assert!(matches!(result, Err(CommandError::AdminsOnly)));
    }

    #[tokio::test]
    async fn test_instant_ban_bans() {
        let mut api = MockChatApi::new();
        api.expect_admins_of()
            .returning(|_| Ok(vec![admin(1, true), admin(5, true)]));
        api.expect_ban()
            .withf(|chat, user| *chat == ChatId(10) && *user == UserId(42))
            .once()
            .returning(|_, _| Ok(()));

        instant_ban(&api, BOT, &request()).await.unwrap();
    }
}
