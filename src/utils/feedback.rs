use teloxide::prelude::*;
use teloxide::types::ParseMode;
use crate::utils::markdown::escape_markdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Warning,
    Error,
    Info,
}

impl Tone {
    fn marker(self) -> &'static str {
        match self {
            Tone::Success => "✅",
            Tone::Warning => "⚠️",
            Tone::Error => "❌",
            Tone::Info => "ℹ️",
        }
    }
}

/// Escapes `message` for MarkdownV2 and puts the tone marker in front.
pub fn format_feedback(tone: Tone, message: &str) -> String {
    format!("{} {}", tone.marker(), escape_markdown(message))
}

/// One-line status replies to a chat, all rendered through [`format_feedback`].
pub struct ChatFeedback {
    bot: Bot,
    chat_id: ChatId,
}

impl ChatFeedback {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }

    pub async fn send(&self, tone: Tone, message: &str) -> ResponseResult<Message> {
        self.bot
            .send_message(self.chat_id, format_feedback(tone, message))
            .parse_mode(ParseMode::MarkdownV2)
            .await
    }

    pub async fn success(&self, message: &str) -> ResponseResult<Message> {
        self.send(Tone::Success, message).await
    }

    pub async fn error(&self, message: &str) -> ResponseResult<Message> {
        self.send(Tone::Error, message).await
    }

    pub async fn warning(&self, message: &str) -> ResponseResult<Message> {
        self.send(Tone::Warning, message).await
    }

    pub async fn info(&self, message: &str) -> ResponseResult<Message> {
        self.send(Tone::Info, message).await
    }

    /// Rejected dialog input: the reason, then what the user should type instead.
    pub async fn invalid_input(&self, reason: &str, hint: &str) -> ResponseResult<Message> {
        self.send(Tone::Error, &format!("{reason}\n\n💡 {hint}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_tone_has_its_own_marker() {
        let tones = [Tone::Success, Tone::Warning, Tone::Error, Tone::Info];
        let mut markers: Vec<&str> = tones.iter().map(|t| t.marker()).collect();
        markers.dedup();
        assert_eq!(markers.len(), tones.len());
        assert!(format_feedback(Tone::Warning, "x").starts_with("⚠️ "));
    }

    #[test]
    fn test_format_feedback_escapes_message() {
        assert_eq!(
            format_feedback(Tone::Success, "Signed up (2 tickets)!"),
            "✅ Signed up \\(2 tickets\\)\\!"
        );
    }
}
