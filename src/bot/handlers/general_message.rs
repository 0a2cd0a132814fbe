use teloxide::prelude::*;

use crate::bot::keyboards;
use crate::bot::state::HandlerResult;
use crate::utils::feedback::ChatFeedback;

/// Messages that arrive outside of any dialog.
pub async fn handle_general_message(bot: Bot, msg: Message) -> HandlerResult {
    let feedback = ChatFeedback::new(bot.clone(), msg.chat.id);

    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            let error_msg = format!(
                "Unknown command: {}",
                text.split_whitespace().next().unwrap_or(text)
            );
            feedback
                .invalid_input(&error_msg, "Use /help to see all available commands.")
                .await?;
            return Ok(());
        }
    }

    bot.send_message(msg.chat.id, "Pick an option from the menu:")
        .reply_markup(keyboards::main_menu())
        .await?;
    Ok(())
}
