use async_trait::async_trait;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

/// Plain text plus an optional column of inline callback buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    /// `(label, callback data)` pairs, one button per row.
    pub buttons: Vec<(String, String)>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_button(mut self, label: impl Into<String>, data: impl Into<String>) -> Self {
        self.buttons.push((label.into(), data.into()));
        self
    }
}

/// Outbound messaging seam, so reminder and notification logic can run without Telegram.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, chat_id: i64, message: OutgoingMessage) -> Result<(), SendError>;
}

#[async_trait]
impl MessageSender for Bot {
    async fn send(&self, chat_id: i64, message: OutgoingMessage) -> Result<(), SendError> {
        let mut request = self.send_message(ChatId(chat_id), message.text);
        if !message.buttons.is_empty() {
            let rows: Vec<Vec<InlineKeyboardButton>> = message
                .buttons
                .into_iter()
                .map(|(label, data)| vec![InlineKeyboardButton::callback(label, data)])
                .collect();
            request = request.reply_markup(InlineKeyboardMarkup::new(rows));
        }
        request.await?;
        Ok(())
    }
}

/// Fans messages out to every configured administrator.
#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn MessageSender>,
    admin_ids: Vec<i64>,
}

impl Notifier {
    pub fn new(sender: Arc<dyn MessageSender>, admin_ids: Vec<i64>) -> Self {
        Self { sender, admin_ids }
    }

    /// Sends `message` to each admin. Failures are logged per admin; returns how many succeeded.
    pub async fn notify_admins(&self, message: OutgoingMessage) -> usize {
        if self.admin_ids.is_empty() {
            tracing::warn!("No admins configured, dropping notification");
            return 0;
        }

        let mut delivered = 0;
        for admin_id in &self.admin_ids {
            match self.sender.send(*admin_id, message.clone()).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::error!("Failed to notify admin {}: {}", admin_id, e),
            }
        }
        delivered
    }
}
