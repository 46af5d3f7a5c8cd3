//! Votekeeper: a poll-driven group-moderation engine.
//!
//! A moderator opens a vote targeting a member; after the voting window the
//! poll is closed, tallied, and the resulting ban/unban or permission
//! change is applied. The engine owns the poll lifecycle (durable storage,
//! deadline timers, crash recovery and resolution) while the chat
//! platform client and command parser remain external collaborators behind
//! [`platform::ChatApi`] and [`commands::VoteRequest`].

pub mod commands;
pub mod config;
pub mod logging;
pub mod platform;
pub mod poll;

pub const ENGINE_NAME: &str = "votekeeper";
pub const POLL_TARGET: &str = "votekeeper::poll";
pub const COMMAND_TARGET: &str = "votekeeper::command";
pub const ERROR_TARGET: &str = "votekeeper::error";

pub use commands::{CommandError, VoteRequest};
pub use config::Config;
pub use platform::{ChatApi, ChatId, ChatMember, MessageId, PlatformError, UserId, VoteCounts};
pub use poll::{FilePollStore, Poll, PollError, PollMonitor, PollResolver, PollResult, PollType};
