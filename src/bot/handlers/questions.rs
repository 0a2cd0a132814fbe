use std::sync::Arc;
use teloxide::prelude::*;

use crate::bot::commands::start::{known_user, show_main_menu};
use crate::bot::context::BotContext;
use crate::bot::state::{BotDialogue, CallbackAction, HandlerResult, State};
use crate::services::notifier::OutgoingMessage;
use crate::utils::feedback::ChatFeedback;
use crate::utils::validation::validate_question;

pub async fn start_question(bot: &Bot, chat_id: ChatId, dialogue: &BotDialogue) -> HandlerResult {
    dialogue.update(State::AskingQuestion).await?;
    bot.send_message(chat_id, "✏️ Write your question and we will get back to you. /cancel to stop.")
        .await?;
    Ok(())
}

pub async fn receive_question(bot: Bot, msg: Message, dialogue: BotDialogue, ctx: Arc<BotContext>) -> HandlerResult {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let feedback = ChatFeedback::new(bot.clone(), msg.chat.id);

    let question = match validate_question(msg.text().unwrap_or_default()) {
        Ok(question) => question,
        Err(e) => {
            feedback
                .invalid_input(&e.to_string(), "Send the question as a text message.")
                .await?;
            return Ok(());
        }
    };

    let user = known_user(&ctx, from).await;
    let message = OutgoingMessage::text(format!(
        "❓ Question from {} ({}):\n\n{}",
        user.display_name(),
        user.phone.as_deref().unwrap_or("no phone"),
        question
    ))
    .with_button("💬 Reply", CallbackAction::Reply(user.id).encode());

    dialogue.reset().await?;
    if ctx.notifier.notify_admins(message).await == 0 {
        feedback
            .error("Sorry, nobody could receive your question right now. Please try again later.")
            .await?;
    } else {
        feedback.success("Your question was sent. We will answer here soon.").await?;
    }
    show_main_menu(&bot, msg.chat.id).await
}

pub async fn start_admin_reply(bot: &Bot, chat_id: ChatId, dialogue: &BotDialogue, user_id: i64) -> HandlerResult {
    dialogue.update(State::AdminReplying { user_id }).await?;
    bot.send_message(chat_id, "Type your answer. It will be delivered as is.")
        .await?;
    Ok(())
}

pub async fn receive_admin_reply(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    ctx: Arc<BotContext>,
    user_id: i64,
) -> HandlerResult {
    let is_admin = msg.from().is_some_and(|u| ctx.is_admin(u.id.0 as i64));
    let Some(text) = msg.text().filter(|_| is_admin) else {
        dialogue.reset().await?;
        return show_main_menu(&bot, msg.chat.id).await;
    };

    let feedback = ChatFeedback::new(bot.clone(), msg.chat.id);
    dialogue.reset().await?;
    match bot
        .send_message(ChatId(user_id), format!("💬 Answer from the studio:\n\n{text}"))
        .await
    {
        Ok(_) => {
            feedback.success("Answer delivered.").await?;
        }
        Err(e) => {
            tracing::warn!("Could not deliver answer to user {}: {}", user_id, e);
            feedback.error("Could not deliver the answer, the user may have blocked the bot.").await?;
        }
    }
    Ok(())
}
