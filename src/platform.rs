//! Abstract moderation-platform surface
//!
//! The engine never talks to a chat platform directly; everything goes
//! through the [`ChatApi`] trait so the transport layer stays outside the
//! crate and tests can run against a mock.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a chat (group) on the platform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize, Default,
)]
pub struct ChatId(pub i64);

/// Identifier of a platform user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize, Default,
)]
pub struct UserId(pub i64);

/// Identifier of a message within a chat.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize, Default,
)]
pub struct MessageId(pub i32);

/// Errors surfaced by the platform client.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform rejected or failed the API call
    #[error("platform API error: {0}")]
    Api(String),

    /// The referenced message (usually the poll message) no longer exists
    #[error("message {0} not found")]
    MessageNotFound(MessageId),

    /// The referenced member could not be fetched
    #[error("member {user} not found in chat {chat}")]
    MemberNotFound { chat: ChatId, user: UserId },
}

/// A member's permission and membership state within one chat.
///
/// Captured as a snapshot at poll-creation time so the eventual action is
/// applied against a consistent baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChatMember {
    pub user_id: UserId,
    /// Admin-side capability; relevant only when checking the bot itself
    pub can_restrict_members: bool,
    /// When set, the member's own flags override the chat defaults
    pub independent: bool,
    pub can_send_other: bool,
    pub can_send_photos: bool,
    pub can_send_videos: bool,
    pub can_send_documents: bool,
    pub can_send_audios: bool,
    pub can_send_voice_notes: bool,
    pub can_send_video_notes: bool,
}

impl ChatMember {
    /// Member with every sendable permission granted.
    #[must_use]
    pub fn unrestricted(user_id: UserId) -> Self {
        Self {
            user_id,
            can_restrict_members: false,
            independent: false,
            can_send_other: true,
            can_send_photos: true,
            can_send_videos: true,
            can_send_documents: true,
            can_send_audios: true,
            can_send_voice_notes: true,
            can_send_video_notes: true,
        }
    }

    /// Serialize into the opaque snapshot form stored inside a poll record.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_snapshot(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Restore a member from a stored snapshot.
    ///
    /// # Errors
    /// Returns an error if the snapshot cannot be parsed.
    pub fn from_snapshot(snapshot: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(snapshot)
    }
}

/// Final tallies of a closed two-option poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VoteCounts {
    pub first: u32,
    pub second: u32,
}

impl VoteCounts {
    #[must_use]
    pub fn new(first: u32, second: u32) -> Self {
        Self { first, second }
    }

    /// The decision rule: the first option wins only on a strict majority.
    /// A tie resolves to the second option.
    #[must_use]
    pub fn first_wins(&self) -> bool {
        self.first > self.second
    }
}

/// Capability set the engine requires from the moderation platform.
///
/// Concurrent calls for different users/polls must be safe to issue in
/// parallel; the engine does not serialize access to this surface.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChatApi: Send + Sync {
    /// Fetch a member's current state in a chat.
    async fn chat_member_of(&self, chat: ChatId, user: UserId)
    -> Result<ChatMember, PlatformError>;

    /// List the administrators of a chat.
    async fn admins_of(&self, chat: ChatId) -> Result<Vec<ChatMember>, PlatformError>;

    /// Post a two-option vote, optionally as a reply, returning its message id.
    async fn send_poll(
        &self,
        chat: ChatId,
        reply_to: Option<MessageId>,
        question: &str,
        options: &[String; 2],
    ) -> Result<MessageId, PlatformError>;

    /// Close a vote and return the final option counts.
    async fn stop_poll(&self, chat: ChatId, message: MessageId)
    -> Result<VoteCounts, PlatformError>;

    /// Ban a member from a chat.
    async fn ban(&self, chat: ChatId, user: UserId) -> Result<(), PlatformError>;

    /// Lift a ban; `remove_from_group` also drops the member from the chat.
    async fn unban(
        &self,
        chat: ChatId,
        user: UserId,
        remove_from_group: bool,
    ) -> Result<(), PlatformError>;

    /// Apply a member's permission flags as a single atomic update.
    async fn restrict(&self, chat: ChatId, member: &ChatMember) -> Result<(), PlatformError>;

    /// Post a plain reply to a message, used for best-effort notifications.
    async fn reply(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
    ) -> Result<(), PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_wins_strict_majority() {
        assert!(VoteCounts::new(5, 3).first_wins());
        assert!(!VoteCounts::new(3, 5).first_wins());
        // Ties go to the second option, not to "no action"
        assert!(!VoteCounts::new(4, 4).first_wins());
        assert!(!VoteCounts::new(0, 0).first_wins());
    }

    #[test]
    fn test_member_snapshot_round_trip() {
        let member = ChatMember {
            user_id: UserId(42),
            can_send_photos: true,
            can_send_other: true,
            ..ChatMember::default()
        };

        let snapshot = member.to_snapshot().unwrap();
        let restored = ChatMember::from_snapshot(&snapshot).unwrap();
        assert_eq!(restored, member);
    }

    #[test]
    fn test_snapshot_rejects_garbage() {
        assert!(ChatMember::from_snapshot(": not a member [").is_err());
    }
}
