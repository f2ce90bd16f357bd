//! Question data model and the qualification rule for incoming text.

use chrono::{DateTime, FixedOffset};

/// Kind of chat a message was posted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// Parse the Bot API `chat.type` string.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "private" => Some(Self::Private),
            "group" => Some(Self::Group),
            "supergroup" => Some(Self::Supergroup),
            "channel" => Some(Self::Channel),
            _ => None,
        }
    }

    pub fn is_group(self) -> bool {
        matches!(self, Self::Group | Self::Supergroup)
    }
}

/// An asked question waiting for a voice answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Id of the text message that carried the question. Replies point here.
    pub source_message_id: i64,
    /// Chat the question was asked in; the answer is republished there.
    pub origin_chat_id: i64,
    /// Asker's handle, or their display name when they have none.
    pub asker_label: String,
    /// Trimmed question text, never empty.
    pub body: String,
    /// When the question was received, in the community's local offset.
    pub asked_at: DateTime<FixedOffset>,
}

impl Question {
    pub fn new(
        source_message_id: i64,
        origin_chat_id: i64,
        asker_label: impl Into<String>,
        body: &str,
        asked_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            source_message_id,
            origin_chat_id,
            asker_label: asker_label.into(),
            body: body.trim().to_string(),
            asked_at,
        }
    }
}

/// Whether a text message should be stored as a question.
///
/// Only top-level messages in group-type chats with a non-blank body
/// qualify. Replies are answers or follow-ups, never fresh questions.
pub fn qualifies(chat_kind: ChatKind, is_top_level_message: bool, body: &str) -> bool {
    chat_kind.is_group() && is_top_level_message && !body.trim().is_empty()
}
