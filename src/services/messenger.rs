use crate::models::Subscription;
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;

pub const FIRST_LESSON_TEXT: &str = "Welcome aboard! Your first lesson is on its way. \
New lessons arrive every day while your subscription is active.";

/// Outbound chat notifications triggered by an activation.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn deliver_confirmation(&self, user_id: i64, subscription: &Subscription) -> Result<()>;
    async fn deliver_first_lesson(&self, user_id: i64) -> Result<()>;
}

/// Telegram Bot API `sendMessage` client.
pub struct TelegramMessenger {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl TelegramMessenger {
    pub fn new(api_url: &str, token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
        #[derive(Serialize)]
        struct SendMessage<'a> {
            chat_id: i64,
            text: &'a str,
        }

        let response = self
            .client
            .post(format!("{}/bot{}/sendMessage", self.api_url, self.token))
            .json(&SendMessage { chat_id, text })
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("Telegram rejected message: {}", response.status());
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn deliver_confirmation(&self, user_id: i64, subscription: &Subscription) -> Result<()> {
        let text = format!(
            "Payment received! Your subscription is active until {}.",
            subscription.expires_at.format("%Y-%m-%d %H:%M UTC")
        );
        self.send(user_id, &text).await
    }

    async fn deliver_first_lesson(&self, user_id: i64) -> Result<()> {
        self.send(user_id, FIRST_LESSON_TEXT).await
    }
}

/// Used when no bot token is configured.
pub struct LoggingMessenger;

#[async_trait]
impl Messenger for LoggingMessenger {
    async fn deliver_confirmation(&self, user_id: i64, subscription: &Subscription) -> Result<()> {
        tracing::info!(
            "Confirmation for user {}: active until {}",
            user_id,
            subscription.expires_at
        );
        Ok(())
    }

    async fn deliver_first_lesson(&self, user_id: i64) -> Result<()> {
        tracing::info!("First lesson for user {}", user_id);
        Ok(())
    }
}
