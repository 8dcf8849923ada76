use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::TELEGRAM_API_BASE;
use crate::types::{Listing, RunSummary, TickReport};

/// Notification delivery failures. Non-fatal: logged, counted, never
/// retried — the same listing is never sent twice in one process lifetime.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("notification transport failed")]
    Transport(#[from] reqwest::Error),
    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// One-way notification target: send text, learn whether it arrived.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), SinkError>;
}

/// Render a listing the way it is delivered to the user.
pub fn format_listing(listing: &Listing) -> String {
    format!(
        "{}\n{} m²  -  {} rooms  -  {} € warm\n{}",
        listing.title,
        listing.living_space,
        listing.number_of_rooms,
        listing.warm_rent.value,
        listing.link
    )
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: serde_json::Value,
}

/// Telegram Bot API sink: one `sendMessage` call per notification.
pub struct TelegramSink {
    client: reqwest::Client,
    token: String,
    chat_id: i64,
}

impl TelegramSink {
    pub fn new(client: reqwest::Client, token: String, chat_id: i64) -> Self {
        Self {
            client,
            token,
            chat_id,
        }
    }
}

#[async_trait]
impl Sink for TelegramSink {
    async fn send(&self, text: &str) -> Result<(), SinkError> {
        let url = format!("{TELEGRAM_API_BASE}/bot{}/sendMessage", self.token);
        let response = self
            .client
            .post(url)
            .json(&json!({ "chat_id": self.chat_id, "text": text }))
            .send()
            .await?;
        let status = response.status();
        let body: TelegramResponse = response.json().await?;
        if !body.ok {
            return Err(SinkError::Rejected(
                body.description
                    .unwrap_or_else(|| format!("status {status}")),
            ));
        }
        Ok(())
    }
}

/// Discover the target chat by reading the bot's pending updates.
///
/// The bot must have received at least one message; without one there is no
/// chat to deliver to and startup cannot proceed.
pub async fn resolve_chat_id(client: &reqwest::Client, token: &str) -> Result<i64> {
    let url = format!("{TELEGRAM_API_BASE}/bot{token}/getUpdates");
    let response: TelegramResponse = client
        .get(url)
        .send()
        .await
        .context("telegram getUpdates request failed")?
        .error_for_status()
        .context("telegram rejected getUpdates — check the bot token")?
        .json()
        .await
        .context("telegram getUpdates returned an unexpected body")?;

    if !response.ok {
        bail!(
            "telegram getUpdates failed: {}",
            response.description.unwrap_or_default()
        );
    }

    match first_update_chat_id(&response.result) {
        Some(id) => Ok(id),
        None => bail!("no Telegram chat found — send a message to the bot first, then restart"),
    }
}

/// Chat id of the first pending update, if any.
fn first_update_chat_id(result: &serde_json::Value) -> Option<i64> {
    result
        .as_array()
        .and_then(|updates| updates.first())
        .and_then(|update| update.pointer("/message/chat/id"))
        .and_then(|id| id.as_i64())
}

/// Prints notifications instead of delivering them; backs `--dry-run`.
pub struct StdoutSink;

#[async_trait]
impl Sink for StdoutSink {
    async fn send(&self, text: &str) -> Result<(), SinkError> {
        println!("{text}\n");
        Ok(())
    }
}

/// Emit a tick report as a single JSON line to stdout.
pub fn report_tick(report: &TickReport) {
    if let Ok(json) = serde_json::to_string(report) {
        println!("{json}");
    }
}

/// Emit the run summary as pretty-printed JSON to stdout.
pub fn report_summary(summary: &RunSummary) {
    if let Ok(json) = serde_json::to_string_pretty(summary) {
        println!("{json}");
    }
}
