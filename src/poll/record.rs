//! Poll record and decision mapping
//!
//! Defines the persisted poll entity, its type-specific decision polarity,
//! and the duration clamping applied at creation.

use crate::platform::{ChatId, ChatMember, MessageId, UserId};
use crate::poll::{PollError, PollResult};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shortest voting window a poll may have, in seconds.
pub const MIN_DURATION_SECS: i64 = 30;
/// Longest voting window a poll may have, in seconds.
pub const MAX_DURATION_SECS: i64 = 24 * 60 * 60;

/// Shortest voting window as a [`Duration`].
#[must_use]
pub fn min_duration() -> Duration {
    Duration::seconds(MIN_DURATION_SECS)
}

/// Longest voting window as a [`Duration`].
#[must_use]
pub fn max_duration() -> Duration {
    Duration::seconds(MAX_DURATION_SECS)
}

/// A permission group managed through votes.
///
/// `Media` is a composite: every media send-flag is set together in one
/// platform update so a partially-applied state is never visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Photos, videos, documents, audio, voice and video notes
    Media,
    /// Stickers, GIFs and other non-media attachments
    Other,
}

impl Permission {
    /// Set every sub-flag of this permission group on a member.
    pub fn set_on(self, member: &mut ChatMember, enabled: bool) {
        match self {
            Self::Media => {
                member.can_send_photos = enabled;
                member.can_send_videos = enabled;
                member.can_send_documents = enabled;
                member.can_send_audios = enabled;
                member.can_send_voice_notes = enabled;
                member.can_send_video_notes = enabled;
            }
            Self::Other => member.can_send_other = enabled,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Media => write!(f, "media"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// The moderation action a resolved poll maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModAction {
    Ban,
    Unban,
    SetPermission { permission: Permission, enabled: bool },
}

/// Kind of moderation vote. Determines the question asked, the decision
/// polarity and which action pair applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PollType {
    Ban,
    Unban,
    RestrictMedia,
    RestrictOther,
}

impl PollType {
    /// Map the tally decision to a moderation action.
    ///
    /// Each type owns its own polarity; a losing first option always maps
    /// to the opposite action, including on ties.
    #[must_use]
    pub fn outcome(self, first_wins: bool) -> ModAction {
        match self {
            Self::Ban => {
                if first_wins {
                    ModAction::Ban
                } else {
                    ModAction::Unban
                }
            }
            Self::Unban => {
                if first_wins {
                    ModAction::Unban
                } else {
                    ModAction::Ban
                }
            }
            Self::RestrictMedia => ModAction::SetPermission {
                permission: Permission::Media,
                enabled: !first_wins,
            },
            Self::RestrictOther => ModAction::SetPermission {
                permission: Permission::Other,
                enabled: !first_wins,
            },
        }
    }

    /// Question text posted with the vote.
    #[must_use]
    pub fn question(self) -> &'static str {
        match self {
            Self::Ban => "Банить?",
            Self::Unban => "Разбанить?",
            Self::RestrictMedia => "Медиа этому челу:",
            Self::RestrictOther => "Стикеры/гифки этому челу:",
        }
    }

    /// The two vote options, in decision order.
    #[must_use]
    pub fn options(self) -> [String; 2] {
        match self {
            Self::Ban | Self::Unban => ["Да".to_string(), "Нет".to_string()],
            Self::RestrictMedia | Self::RestrictOther => {
                ["Запретить".to_string(), "Разрешить".to_string()]
            }
        }
    }
}

impl fmt::Display for PollType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ban => write!(f, "ban"),
            Self::Unban => write!(f, "unban"),
            Self::RestrictMedia => write!(f, "restrict_media"),
            Self::RestrictOther => write!(f, "restrict_other"),
        }
    }
}

/// An active moderation vote tracked from creation until resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    /// Unique token, 8 random bytes hex-encoded
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PollType,
    pub chat_id: ChatId,
    /// Message holding the vote, used to re-locate it after a restart
    pub message_id: MessageId,
    pub target_user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Target member state captured at creation, kept opaque in storage
    pub member_snapshot: String,
}

impl Poll {
    /// Create a poll record with a freshly generated id and a voting window
    /// clamped into `[MIN_DURATION, MAX_DURATION]`.
    ///
    /// # Errors
    /// Returns an error if the member snapshot cannot be serialized.
    pub fn new(
        kind: PollType,
        chat_id: ChatId,
        message_id: MessageId,
        member: &ChatMember,
        duration: Duration,
    ) -> PollResult<Self> {
        let created_at = Utc::now();
        Ok(Self {
            id: generate_poll_id(),
            kind,
            chat_id,
            message_id,
            target_user_id: member.user_id,
            created_at,
            expires_at: created_at + clamp_duration(duration),
            member_snapshot: member.to_snapshot()?,
        })
    }

    /// Restore the target member captured when the poll was created.
    ///
    /// # Errors
    /// Returns [`PollError::CorruptSnapshot`] if the stored snapshot cannot
    /// be parsed.
    pub fn member(&self) -> PollResult<ChatMember> {
        ChatMember::from_snapshot(&self.member_snapshot).map_err(|source| {
            PollError::CorruptSnapshot {
                poll_id: self.id.clone(),
                source,
            }
        })
    }

    /// Time left until the deadline; zero or negative means overdue.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.expires_at - Utc::now()
    }
}

/// Clamp a requested voting window into the allowed range, logging when the
/// configured value is out of bounds.
#[must_use]
pub fn clamp_duration(duration: Duration) -> Duration {
    if duration < min_duration() {
        tracing::warn!(
            requested = %duration,
            minimum_secs = MIN_DURATION_SECS,
            "poll duration too short, using minimum"
        );
        min_duration()
    } else if duration > max_duration() {
        tracing::warn!(
            requested = %duration,
            maximum_secs = MAX_DURATION_SECS,
            "poll duration too long, using maximum"
        );
        max_duration()
    } else {
        duration
    }
}

/// Generate an opaque poll id: 8 random bytes, hex-encoded.
#[must_use]
pub fn generate_poll_id() -> String {
    let mut bytes = [0u8; 8];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
