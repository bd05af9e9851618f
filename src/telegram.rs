//! Telegram client and webhook payload types
//!
//! Outbound side: `sendMessage` over the Bot API, behind the `Messenger`
//! trait. Inbound side: the slice of the Update payload the relay cares
//! about, plus bot-command extraction.

use crate::config::TelegramConfig;
use crate::delivery::Messenger;
use crate::error::{delivery_error, RelayError, RelayResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Telegram Bot API client
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> RelayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> RelayResult<()> {
        self.http
            .post(self.method_url("sendMessage"))
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| delivery_error(format!("sendMessage to chat {} failed: {}", chat_id, e)))?;
        Ok(())
    }
}

// =============================================================================
// WEBHOOK PAYLOAD TYPES
// =============================================================================

/// An incoming update from the Bot API webhook
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Chat {
    pub fn is_private(&self) -> bool {
        self.kind == "private"
    }
}

/// Bot commands the relay reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Subscribe the sender to activation notifications
    Start,
    /// List proposals active in the current epoch
    Proposals,
}

/// Extract a command from message text.
///
/// Only the first token counts, and a `@botname` suffix (group-chat syntax)
/// is ignored. Anything else is not a command and is dropped silently.
pub fn parse_command(text: &str) -> Option<Command> {
    let first = text.trim().split_whitespace().next()?;
    let command = first.split('@').next().unwrap_or(first);
    match command {
        "/start" => Some(Command::Start),
        "/proposals" => Some(Command::Proposals),
        _ => None,
    }
}
