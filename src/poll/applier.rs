//! Moderation action applier
//!
//! Applies the action a resolved poll decided on. Every platform call is a
//! single best-effort attempt: failures are logged, a reply notification is
//! attempted, and the error is returned to the resolution flow without any
//! retry or queueing.

use crate::platform::{ChatApi, ChatId, ChatMember, MessageId, PlatformError};
use crate::poll::{ModAction, Permission, PollResult};
use std::sync::Arc;
use tracing::{error, info};

/// Applies ban/unban and permission changes through the platform surface.
pub struct ActionApplier<A: ChatApi + ?Sized> {
    api: Arc<A>,
}

impl<A: ChatApi + ?Sized> ActionApplier<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Apply one moderation action against the poll's target member,
    /// replying to the poll message with the result.
    ///
    /// # Errors
    /// Returns the platform error when the action call fails; the failure
    /// notification has already been attempted by then.
    pub async fn apply(
        &self,
        chat: ChatId,
        message: MessageId,
        member: &ChatMember,
        action: ModAction,
    ) -> PollResult<()> {
        match action {
            ModAction::Ban => self.ban(chat, message, member).await,
            ModAction::Unban => self.unban(chat, message, member).await,
            ModAction::SetPermission {
                permission,
                enabled,
            } => {
                self.set_permission(chat, message, member, permission, enabled)
                    .await
            }
        }
    }

    async fn ban(&self, chat: ChatId, message: MessageId, member: &ChatMember) -> PollResult<()> {
        if let Err(err) = self.api.ban(chat, member.user_id).await {
            error!(chat_id = %chat, user_id = %member.user_id, error = %err, "cannot ban user");
            self.notify(chat, message, "Чота не могу забанить").await;
            return Err(err.into());
        }

        info!(chat_id = %chat, user_id = %member.user_id, "user banned by vote");
        self.notify(chat, message, "Забанен").await;
        Ok(())
    }

    async fn unban(&self, chat: ChatId, message: MessageId, member: &ChatMember) -> PollResult<()> {
        if let Err(err) = self.api.unban(chat, member.user_id, true).await {
            error!(chat_id = %chat, user_id = %member.user_id, error = %err, "cannot unban user");
            self.notify(chat, message, "Чота не могу разбанить").await;
            return Err(err.into());
        }

        info!(chat_id = %chat, user_id = %member.user_id, "user unbanned by vote");
        self.notify(chat, message, "Разбанен").await;
        Ok(())
    }

    /// Flip a permission group on the member. The member is re-fetched for a
    /// current baseline and every sub-flag of a composite group goes out in
    /// one `restrict` call.
    async fn set_permission(
        &self,
        chat: ChatId,
        message: MessageId,
        member: &ChatMember,
        permission: Permission,
        enabled: bool,
    ) -> PollResult<()> {
        let mut current = match self.api.chat_member_of(chat, member.user_id).await {
            Ok(current) => current,
            Err(err) => {
                error!(
                    chat_id = %chat,
                    user_id = %member.user_id,
                    error = %err,
                    "cannot get current member data"
                );
                self.notify(chat, message, "Чота не могу получить данные пользователя")
                    .await;
                return Err(err.into());
            }
        };

        current.independent = true;
        permission.set_on(&mut current, enabled);

        info!(
            chat_id = %chat,
            user_id = %current.user_id,
            permission = %permission,
            enabled,
            "updating member permissions"
        );

        if let Err(err) = self.api.restrict(chat, &current).await {
            error!(
                chat_id = %chat,
                user_id = %current.user_id,
                permission = %permission,
                enabled,
                error = %err,
                "cannot update permission"
            );
            self.notify(chat, message, failure_text(permission, enabled))
                .await;
            return Err(err.into());
        }

        self.notify(chat, message, success_text(permission, enabled))
            .await;
        Ok(())
    }

    /// Best-effort reply; a failed notification is only logged.
    async fn notify(&self, chat: ChatId, message: MessageId, text: &str) {
        if let Err(err) = self.api.reply(chat, message, text).await {
            error!(chat_id = %chat, error = %err, "failed to send notification");
        }
    }
}

fn failure_text(permission: Permission, enabled: bool) -> &'static str {
    match (permission, enabled) {
        (Permission::Media, false) => "Чота не могу отключить медиа",
        (Permission::Media, true) => "Чота не могу включить медиа",
        (Permission::Other, false) => "Чота не могу отключить стикеры",
        (Permission::Other, true) => "Чота не могу включить стикеры",
    }
}

fn success_text(permission: Permission, enabled: bool) -> &'static str {
    match (permission, enabled) {
        (Permission::Media, false) => "Медиа заблокированы",
        (Permission::Media, true) => "Медиа снова доступны",
        (Permission::Other, false) => "Стикеры/гифки заблокированы",
        (Permission::Other, true) => "Стикеры/гифки снова доступны",
    }
}
