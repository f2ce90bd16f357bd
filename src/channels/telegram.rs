//! Telegram channel — long-polls the Bot API for updates.
//!
//! Native Rust Telegram Bot API client over `reqwest`. Text, voice and
//! command messages are turned into [`InboundEvent`]s; answers go back out
//! through `sendVoice` using the voice's `file_id`, so nothing is downloaded.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::channels::{
    Channel, CommandEvent, EventStream, InboundEvent, TextEvent, VoiceEvent,
};
use crate::compose::OutboundVoice;
use crate::config::{BotConfig, DEFAULT_POLL_TIMEOUT_SECS};
use crate::error::ChannelError;
use crate::questions::ChatKind;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Maximum caption length accepted by `sendVoice`.
const TELEGRAM_MAX_CAPTION_CHARS: usize = 1024;

/// Pause after a failed poll before trying again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Telegram channel — connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    api_base: String,
    poll_timeout_secs: u64,
    drop_pending_updates: bool,
    client: reqwest::Client,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            api_base: DEFAULT_API_BASE.to_string(),
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            drop_pending_updates: true,
            client: reqwest::Client::new(),
            poller: Mutex::new(None),
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            poll_timeout_secs: config.poll_timeout_secs,
            drop_pending_updates: config.drop_pending_updates,
            ..Self::new(config.bot_token.clone())
        }
    }

    /// Point the client at a different Bot API server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        api_url(&self.api_base, &self.bot_token, method)
    }

    /// POST a JSON body to a Bot API method and check the `ok` flag.
    async fn call(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ChannelError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        let parsed: ApiResponse<serde_json::Value> =
            serde_json::from_str(&text).map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("{method} returned {status} with unreadable body: {e}"),
            })?;

        if !status.is_success() || !parsed.ok {
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!(
                    "{method} failed ({status}): {}",
                    parsed.description.unwrap_or_default()
                ),
            });
        }

        Ok(parsed.result.unwrap_or(serde_json::Value::Null))
    }

    /// Remove any webhook so `getUpdates` is allowed.
    async fn delete_webhook(&self) -> Result<(), ChannelError> {
        self.call(
            "deleteWebhook",
            &serde_json::json!({ "drop_pending_updates": self.drop_pending_updates }),
        )
        .await
        .map(|_| ())
        .map_err(|e| ChannelError::StartupFailed {
            name: "telegram".into(),
            reason: e.to_string(),
        })
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        self.delete_webhook().await?;

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let client = self.client.clone();
        let poll_timeout = self.poll_timeout_secs;

        let handle = tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": poll_timeout,
                    "allowed_updates": ["message"]
                });

                let resp = match client
                    .post(&url)
                    .timeout(Duration::from_secs(poll_timeout + 10))
                    .json(&body)
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                let data: ApiResponse<Vec<serde_json::Value>> = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                if !data.ok {
                    tracing::warn!(
                        description = data.description.as_deref().unwrap_or(""),
                        "Telegram getUpdates rejected"
                    );
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }

                for raw in data.result.unwrap_or_default() {
                    // Advance offset past this update, even if we cannot read it
                    if let Some(uid) = raw.get("update_id").and_then(serde_json::Value::as_i64) {
                        offset = offset.max(uid + 1);
                    }

                    let Some(event) = parse_update(raw) else {
                        continue;
                    };

                    if tx.send(event).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        if let Ok(mut poller) = self.poller.lock() {
            if let Some(old) = poller.replace(handle) {
                old.abort();
            }
        }

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn publish_voice(&self, voice: &OutboundVoice) -> Result<(), ChannelError> {
        if caption_too_long(&voice.caption) {
            tracing::warn!(
                chat_id = voice.chat_id,
                caption_chars = voice.caption.chars().count(),
                limit = TELEGRAM_MAX_CAPTION_CHARS,
                "Caption exceeds Telegram limit; sendVoice will likely be rejected"
            );
        }

        self.call(
            "sendVoice",
            &serde_json::json!({
                "chat_id": voice.chat_id,
                "voice": voice.media_ref,
                "caption": voice.caption,
            }),
        )
        .await?;

        tracing::info!(chat_id = voice.chat_id, "Telegram voice answer published");
        Ok(())
    }

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(message_id) = reply_to {
            body["reply_to_message_id"] = serde_json::Value::from(message_id);
        }

        self.call("sendMessage", &body).await.map(|_| ())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        if let Ok(mut poller) = self.poller.lock() {
            if let Some(handle) = poller.take() {
                handle.abort();
            }
        }
        Ok(())
    }
}

// ── Bot API wire types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    #[serde(default)]
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    date: i64,
    chat: TgChat,
    #[serde(default)]
    from: Option<TgUser>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    voice: Option<TgVoice>,
    #[serde(default)]
    reply_to_message: Option<TgMessageRef>,
    #[serde(default)]
    entities: Vec<TgEntity>,
}

#[derive(Debug, Deserialize)]
struct TgEntity {
    #[serde(rename = "type")]
    kind: String,
    offset: i64,
}

#[derive(Debug, Deserialize)]
struct TgMessageRef {
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: Option<String>,
}

impl TgUser {
    /// Handle if the user has one, otherwise their full name.
    fn label(&self) -> String {
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            return username.to_string();
        }
        match self.last_name.as_deref() {
            Some(last) => format!("{} {}", self.first_name, last).trim().to_string(),
            None => self.first_name.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TgVoice {
    file_id: String,
}

// ── Helpers ─────────────────────────────────────────────────────────

fn caption_too_long(caption: &str) -> bool {
    caption.chars().count() > TELEGRAM_MAX_CAPTION_CHARS
}

fn api_url(api_base: &str, bot_token: &SecretString, method: &str) -> String {
    format!("{api_base}/bot{}/{method}", bot_token.expose_secret())
}

/// Turn one raw update into an inbound event, if it is one we handle.
fn parse_update(raw: serde_json::Value) -> Option<InboundEvent> {
    let update: Update = match serde_json::from_value(raw) {
        Ok(u) => u,
        Err(e) => {
            tracing::debug!("Telegram: skipping unreadable update: {e}");
            return None;
        }
    };
    classify_message(update.message?)
}

fn classify_message(message: TgMessage) -> Option<InboundEvent> {
    let chat_id = message.chat.id;

    if let Some(voice) = message.voice {
        return Some(InboundEvent::Voice(VoiceEvent {
            message_id: message.message_id,
            chat_id,
            replied_to_message_id: message.reply_to_message.map(|r| r.message_id),
            media_ref: voice.file_id,
        }));
    }

    let text = message.text?;

    if let Some(command) = starts_with_bot_command(&message.entities)
        .then(|| parse_command(&text))
        .flatten()
    {
        return Some(InboundEvent::Command(CommandEvent {
            message_id: message.message_id,
            chat_id,
            command,
        }));
    }

    let Some(chat_kind) = ChatKind::parse(&message.chat.kind) else {
        tracing::debug!(chat_type = %message.chat.kind, "Telegram: unknown chat type");
        return None;
    };

    Some(InboundEvent::Text(TextEvent {
        message_id: message.message_id,
        chat_id,
        chat_kind,
        is_reply: message.reply_to_message.is_some(),
        sender: message.from.as_ref().map(TgUser::label).unwrap_or_default(),
        text,
        timestamp: DateTime::<Utc>::from_timestamp(message.date, 0).unwrap_or_else(Utc::now),
    }))
}

/// Telegram marks a leading `/name` as a command only when `name` is made of
/// ASCII letters, digits and underscores; other slash-prefixed text is plain.
fn starts_with_bot_command(entities: &[TgEntity]) -> bool {
    entities
        .first()
        .is_some_and(|e| e.kind == "bot_command" && e.offset == 0)
}

/// `/start@my_bot arg` → `start`. Returns `None` for non-command text.
fn parse_command(text: &str) -> Option<String> {
    let head = text.split_whitespace().next()?.strip_prefix('/')?;
    let name = head.split('@').next().unwrap_or(head);
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

// ── Tests ───────────────────────────────────────────────────────────
