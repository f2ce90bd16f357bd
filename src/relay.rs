//! Relay — owns the question store and routes inbound events.
//!
//! Text questions go into the [`PendingQuestionStore`]; voice replies are
//! matched against it by the id of the message they reply to and, on a hit,
//! republished with a composed caption.

use std::sync::Arc;

use futures::StreamExt;

use crate::channels::{Channel, CommandEvent, InboundEvent, TextEvent, VoiceEvent};
use crate::compose::{self, OutboundVoice};
use crate::config::{RelayConfig, START_GREETING};
use crate::error::{ChannelError, Error};
use crate::questions::{PendingQuestionStore, Question, qualifies};

/// Why an event produced no action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Text that is not a fresh question in a group chat.
    NotAQuestion,
    /// Question from a chat other than the configured group.
    OtherChat,
    /// Voice message that does not reply to anything.
    NotAReply,
    /// Voice reply to a message that is not (or no longer) stored.
    UnknownQuestion,
    /// A command the bot does not handle.
    UnknownCommand,
}

/// What the relay did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A question was stored under this message id.
    Stored { message_id: i64 },
    /// An answer was matched and handed to the channel.
    Answered(OutboundVoice),
    /// `/start` was answered.
    Greeted,
    Ignored(IgnoreReason),
}

pub struct Relay {
    config: RelayConfig,
    store: Arc<PendingQuestionStore>,
    channel: Arc<dyn Channel>,
}

impl Relay {
    pub fn new(config: RelayConfig, channel: Arc<dyn Channel>) -> Self {
        let store = Arc::new(PendingQuestionStore::new(config.max_questions));
        Self::with_store(config, store, channel)
    }

    /// Build a relay around an existing store.
    pub fn with_store(
        config: RelayConfig,
        store: Arc<PendingQuestionStore>,
        channel: Arc<dyn Channel>,
    ) -> Self {
        Self {
            config,
            store,
            channel,
        }
    }

    pub fn store(&self) -> &Arc<PendingQuestionStore> {
        &self.store
    }

    // ── Main loop ───────────────────────────────────────────────────

    /// Consume the channel's events until Ctrl+C or the stream ends.
    pub async fn run(&self) -> Result<(), Error> {
        let mut events = self.channel.start().await?;

        tracing::info!(
            channel = self.channel.name(),
            capacity = self.store.capacity(),
            "Relay ready and listening"
        );

        loop {
            let event = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                event = events.next() => {
                    match event {
                        Some(e) => e,
                        None => {
                            tracing::info!("Channel stream ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            let (chat_id, message_id) = (event.chat_id(), event.message_id());
            if let Err(e) = self.handle_event(event).await {
                // Store state is already final; only the send failed.
                tracing::warn!(chat_id, message_id, "Error handling event: {}", e);
            }
        }

        tracing::info!("Relay shutting down...");
        self.channel.shutdown().await?;

        Ok(())
    }

    // ── Event dispatch ──────────────────────────────────────────────

    /// Handle one inbound event.
    ///
    /// Store mutations complete before anything is sent, so a channel error
    /// never leaves the store half-updated.
    pub async fn handle_event(&self, event: InboundEvent) -> Result<Outcome, ChannelError> {
        match event {
            InboundEvent::Text(text) => Ok(self.handle_text(text).await),
            InboundEvent::Voice(voice) => self.handle_voice(voice).await,
            InboundEvent::Command(command) => self.handle_command(command).await,
        }
    }

    async fn handle_text(&self, event: TextEvent) -> Outcome {
        if !qualifies(event.chat_kind, !event.is_reply, &event.text) {
            return Outcome::Ignored(IgnoreReason::NotAQuestion);
        }

        if self.config.group_id.is_some_and(|id| id != event.chat_id) {
            tracing::debug!(chat_id = event.chat_id, "Question from unconfigured chat ignored");
            return Outcome::Ignored(IgnoreReason::OtherChat);
        }

        let question = Question::new(
            event.message_id,
            event.chat_id,
            event.sender,
            &event.text,
            event.timestamp.with_timezone(&self.config.utc_offset),
        );

        tracing::info!(
            asker = %question.asker_label,
            message_id = question.source_message_id,
            body = %question.body,
            "❓ Question stored"
        );

        self.store.insert(question).await;
        Outcome::Stored {
            message_id: event.message_id,
        }
    }

    async fn handle_voice(&self, event: VoiceEvent) -> Result<Outcome, ChannelError> {
        let Some(target) = event.replied_to_message_id else {
            return Ok(Outcome::Ignored(IgnoreReason::NotAReply));
        };

        let Some(question) = self.store.find_by_message_id(target).await else {
            tracing::debug!(
                reply_to = target,
                chat_id = event.chat_id,
                "Voice reply does not match a pending question"
            );
            return Ok(Outcome::Ignored(IgnoreReason::UnknownQuestion));
        };

        // The question stays in the store; a second reply republishes again.
        let payload = compose::build_outbound_payload(&question, &event.media_ref);
        tracing::debug!(
            message_id = question.source_message_id,
            caption_chars = payload.caption.chars().count(),
            "Publishing answer"
        );
        self.channel.publish_voice(&payload).await?;

        tracing::info!(
            message_id = question.source_message_id,
            chat_id = payload.chat_id,
            "🎧 Answer published"
        );

        Ok(Outcome::Answered(payload))
    }

    async fn handle_command(&self, event: CommandEvent) -> Result<Outcome, ChannelError> {
        match event.command.as_str() {
            "start" => {
                self.channel
                    .send_text(event.chat_id, START_GREETING, Some(event.message_id))
                    .await?;
                Ok(Outcome::Greeted)
            }
            other => {
                tracing::debug!(command = other, "Ignoring unknown command");
                Ok(Outcome::Ignored(IgnoreReason::UnknownCommand))
            }
        }
    }
}
