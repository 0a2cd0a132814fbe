use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::KeyboardRemove;

use crate::bot::commands::start::{known_user, show_main_menu};
use crate::bot::context::BotContext;
use crate::bot::keyboards;
use crate::bot::state::{BotDialogue, HandlerResult, State};
use crate::services::notifier::OutgoingMessage;
use crate::utils::feedback::ChatFeedback;
use crate::utils::logging::log_validation_error;
use crate::utils::validation::{normalize_phone, validate_name};

fn sender_id(msg: &Message) -> i64 {
    msg.from().map(|u| u.id.0 as i64).unwrap_or_default()
}

pub async fn receive_first_name(bot: Bot, msg: Message, dialogue: BotDialogue) -> HandlerResult {
    let text = msg.text().unwrap_or_default();
    match validate_name(text) {
        Ok(first_name) => {
            dialogue.update(State::RegLastName { first_name }).await?;
            bot.send_message(msg.chat.id, "And your last name?").await?;
        }
        Err(e) => {
            log_validation_error("first_name", text, &e.to_string(), sender_id(&msg));
            ChatFeedback::new(bot, msg.chat.id)
                .invalid_input(&e.to_string(), "Send your first name as plain text, e.g. Anna.")
                .await?;
        }
    }
    Ok(())
}

pub async fn receive_last_name(bot: Bot, msg: Message, dialogue: BotDialogue, first_name: String) -> HandlerResult {
    let text = msg.text().unwrap_or_default();
    match validate_name(text) {
        Ok(last_name) => {
            dialogue
                .update(State::RegPhone {
                    first_name,
                    last_name,
                })
                .await?;
            bot.send_message(
                msg.chat.id,
                "Last step: share your phone number with the button below or type it in.",
            )
            .reply_markup(keyboards::share_contact())
            .await?;
        }
        Err(e) => {
            log_validation_error("last_name", text, &e.to_string(), sender_id(&msg));
            ChatFeedback::new(bot, msg.chat.id)
                .invalid_input(&e.to_string(), "Send your last name as plain text, e.g. Ivanova.")
                .await?;
        }
    }
    Ok(())
}

pub async fn receive_phone(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    ctx: Arc<BotContext>,
    first_name: String,
    last_name: String,
) -> HandlerResult {
    let Some(from) = msg.from() else {
        return Ok(());
    };

    // Only the sender's own contact card counts.
    let raw = match msg.contact() {
        Some(contact) if contact.user_id == Some(from.id) => contact.phone_number.clone(),
        Some(_) => String::new(),
        None => msg.text().unwrap_or_default().to_string(),
    };

    let phone = match normalize_phone(&raw) {
        Ok(phone) => phone,
        Err(e) => {
            log_validation_error("phone", &raw, &e.to_string(), from.id.0 as i64);
            ChatFeedback::new(bot, msg.chat.id)
                .invalid_input(&e.to_string(), "Use the button or type a number like +7 999 123-45-67.")
                .await?;
            return Ok(());
        }
    };

    let mut user = known_user(&ctx, from).await;
    user.first_name = Some(first_name);
    user.last_name = Some(last_name);
    user.phone = Some(phone);
    if !ctx.users.update_user(user.clone()).await {
        ctx.users.add_user(user.clone()).await;
    }
    tracing::info!("User {} completed registration", user.id);

    dialogue.reset().await?;
    bot.send_message(msg.chat.id, format!("🎉 Thank you, {}! You are registered.", user.display_name()))
        .reply_markup(KeyboardRemove::new())
        .await?;

    ctx.notifier
        .notify_admins(OutgoingMessage::text(format!(
            "👤 New registration: {} ({})",
            user.display_name(),
            user.phone.as_deref().unwrap_or_default()
        )))
        .await;

    show_main_menu(&bot, msg.chat.id).await
}
