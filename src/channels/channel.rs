//! Channel trait and the inbound event shapes delivered to the relay.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::compose::OutboundVoice;
use crate::error::ChannelError;
use crate::questions::ChatKind;

/// Stream of inbound events produced by a started channel.
pub type EventStream = Pin<Box<dyn Stream<Item = InboundEvent> + Send>>;

/// A plain text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEvent {
    pub message_id: i64,
    pub chat_id: i64,
    pub chat_kind: ChatKind,
    /// True when the message replies to another message.
    pub is_reply: bool,
    /// Sender's handle, or their display name when they have none.
    pub sender: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A voice message, possibly replying to an earlier message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceEvent {
    pub message_id: i64,
    pub chat_id: i64,
    pub replied_to_message_id: Option<i64>,
    /// Transport reference to the uploaded voice file.
    pub media_ref: String,
}

/// A bot command such as `/start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEvent {
    pub message_id: i64,
    pub chat_id: i64,
    /// Command name without the leading slash or `@botname` suffix.
    pub command: String,
}

/// Everything a channel can hand to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Text(TextEvent),
    Voice(VoiceEvent),
    Command(CommandEvent),
}

impl InboundEvent {
    pub fn chat_id(&self) -> i64 {
        match self {
            Self::Text(e) => e.chat_id,
            Self::Voice(e) => e.chat_id,
            Self::Command(e) => e.chat_id,
        }
    }

    pub fn message_id(&self) -> i64 {
        match self {
            Self::Text(e) => e.message_id,
            Self::Voice(e) => e.message_id,
            Self::Command(e) => e.message_id,
        }
    }
}

/// A messaging transport the relay reads events from and publishes to.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Start receiving events.
    async fn start(&self) -> Result<EventStream, ChannelError>;

    /// Publish an already-uploaded voice message with a caption.
    async fn publish_voice(&self, voice: &OutboundVoice) -> Result<(), ChannelError>;

    /// Send a text message, optionally as a reply.
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError>;
}
