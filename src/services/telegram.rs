//! Outbound chat transport.
//!
//! [`Transport`] is the seam the notifier talks through: send, edit, and the
//! fire-and-forget location push, all returning the platform's stable message
//! ids. `TelegramClient` is the production implementation over the Bot API;
//! `RecordingTransport` is the in-memory double the test suites assert
//! against.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

use crate::models::keyboard::ReplyMarkup;

/// Bound on every outbound API call
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Stable handle of a sent message within its chat
pub type MessageId = i64;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("could not encode payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("platform rejected the call: {0}")]
    Api(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<MessageId, TransportError>;
    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: MessageId,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<(), TransportError>;
    async fn send_location(
        &self,
        chat_id: i64,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), TransportError>;
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(bot_token: &str) -> TelegramClient {
        TelegramClient {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap(),
            base_url: format!("https://api.telegram.org/bot{}", bot_token),
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        payload: &serde_json::Value,
    ) -> Result<T, TransportError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self.client.post(&url).json(payload).send().await?;
        let body: ApiResponse<T> = response.json().await?;
        if !body.ok {
            return Err(TransportError::Api(
                body.description
                    .unwrap_or_else(|| "no description".to_string()),
            ));
        }
        body.result
            .ok_or_else(|| TransportError::Api("missing result".to_string()))
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<MessageId, TransportError> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        if let Some(markup) = markup {
            payload["reply_markup"] = serde_json::to_value(markup)?;
        }
        let sent: SentMessage = self.call("sendMessage", &payload).await?;
        Ok(sent.message_id)
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: MessageId,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<(), TransportError> {
        let mut payload = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        if let Some(markup) = markup {
            payload["reply_markup"] = serde_json::to_value(markup)?;
        }
        let _edited: SentMessage = self.call("editMessageText", &payload).await?;
        Ok(())
    }

    async fn send_location(
        &self,
        chat_id: i64,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), TransportError> {
        let payload = json!({
            "chat_id": chat_id,
            "latitude": latitude,
            "longitude": longitude,
        });
        let _sent: SentMessage = self.call("sendLocation", &payload).await?;
        Ok(())
    }
}

/// One recorded outbound call
#[derive(Debug, Clone, PartialEq)]
pub enum SentItem {
    Message {
        chat_id: i64,
        message_id: MessageId,
        text: String,
        markup: Option<ReplyMarkup>,
    },
    Edit {
        chat_id: i64,
        message_id: MessageId,
        text: String,
        markup: Option<ReplyMarkup>,
    },
    Location {
        chat_id: i64,
        latitude: f64,
        longitude: f64,
    },
}

/// In-memory [`Transport`] that logs every call and can be told to fail
/// individual chats
#[derive(Default)]
pub struct RecordingTransport {
    log: Mutex<Vec<SentItem>>,
    failing_chats: Mutex<HashSet<i64>>,
    next_message_id: Mutex<MessageId>,
}

impl RecordingTransport {
    pub fn new() -> RecordingTransport {
        RecordingTransport::default()
    }

    /// Every call targeting this chat will fail from now on
    pub fn fail_chat(&self, chat_id: i64) {
        self.failing_chats.lock().insert(chat_id);
    }

    pub fn sent(&self) -> Vec<SentItem> {
        self.log.lock().clone()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<SentItem> {
        self.log
            .lock()
            .iter()
            .filter(|item| match item {
                SentItem::Message { chat_id: c, .. }
                | SentItem::Edit { chat_id: c, .. }
                | SentItem::Location { chat_id: c, .. } => *c == chat_id,
            })
            .cloned()
            .collect()
    }

    fn check(&self, chat_id: i64) -> Result<(), TransportError> {
        if self.failing_chats.lock().contains(&chat_id) {
            return Err(TransportError::Api(format!("chat {chat_id} unreachable")));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<MessageId, TransportError> {
        self.check(chat_id)?;
        let message_id = {
            let mut next = self.next_message_id.lock();
            *next += 1;
            *next
        };
        self.log.lock().push(SentItem::Message {
            chat_id,
            message_id,
            text: text.to_string(),
            markup: markup.cloned(),
        });
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: MessageId,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<(), TransportError> {
        self.check(chat_id)?;
        self.log.lock().push(SentItem::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
            markup: markup.cloned(),
        });
        Ok(())
    }

    async fn send_location(
        &self,
        chat_id: i64,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), TransportError> {
        self.check(chat_id)?;
        self.log.lock().push(SentItem::Location {
            chat_id,
            latitude,
            longitude,
        });
        Ok(())
    }
}
