//! Telegram notification sink

use super::NotificationSink;
use crate::signal::Signal;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Telegram Bot API base URL
const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Delivers signals as Telegram messages
///
/// Credentials arrive already resolved; this sink never reads secret
/// storage itself.
pub struct TelegramSink {
    token: String,
    chat_id: String,
    base_url: String,
    client: Client,
}

impl TelegramSink {
    /// Create a sink for the given bot token and chat
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            token: token.into(),
            chat_id: chat_id.into(),
            base_url: TELEGRAM_API_URL.to_string(),
            client,
        }
    }

    /// Override the API base URL (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Render the signal as a compact message
    fn format_message(signal: &Signal) -> String {
        let timeframes: Vec<String> = signal
            .composite
            .contributing
            .iter()
            .map(|tf| tf.to_string())
            .collect();
        format!(
            "{} {} @ {}\nconfidence: {}\npoint of control: {}\ntimeframes: {}\n{} UTC",
            signal.kind.to_string().to_uppercase(),
            signal.symbol,
            signal.price,
            signal.confidence,
            signal.profile.point_of_control.price,
            timeframes.join(", "),
            signal.emitted_at.format("%Y-%m-%d %H:%M:%S"),
        )
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn deliver(&self, signal: &Signal) -> anyhow::Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let body = json!({
            "chat_id": self.chat_id,
            "text": Self::format_message(signal),
        });

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API error: {} - {}", status, text);
        }
        Ok(())
    }
}
