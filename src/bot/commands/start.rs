use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{KeyboardRemove, User};
use teloxide::utils::command::BotCommands;

use crate::bot::commands::{AdminCommand, Command};
use crate::bot::context::BotContext;
use crate::bot::keyboards;
use crate::bot::state::{BotDialogue, HandlerResult, State};
use crate::services::users::UserDTO;
use crate::utils::logging::log_handler_start;

pub async fn show_main_menu(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    bot.send_message(chat_id, "🎨 What would you like to do?")
        .reply_markup(keyboards::main_menu())
        .await?;
    Ok(())
}

pub async fn begin_registration(bot: &Bot, chat_id: ChatId, dialogue: &BotDialogue) -> HandlerResult {
    dialogue.update(State::RegFirstName).await?;
    bot.send_message(
        chat_id,
        "👋 Welcome to the art studio! Let's get you registered.\n\nWhat is your first name?",
    )
    .await?;
    Ok(())
}

/// Loads the user on first contact and keeps their Telegram handle current.
pub async fn known_user(ctx: &BotContext, from: &User) -> UserDTO {
    let id = from.id.0 as i64;
    let mut user = ctx.users.get_or_create(id, from.username.clone()).await;
    if user.nickname != from.username {
        user.nickname = from.username.clone();
        ctx.users.update_user(user.clone()).await;
    }
    user
}

pub async fn handle_start(bot: Bot, msg: Message, dialogue: BotDialogue, ctx: Arc<BotContext>) -> HandlerResult {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let username = from.username.as_deref().unwrap_or("unknown");
    log_handler_start("/start", username, from.id.0 as i64, None);

    let user = known_user(&ctx, from).await;
    if !user.is_registered() {
        return begin_registration(&bot, msg.chat.id, &dialogue).await;
    }

    dialogue.reset().await?;
    bot.send_message(
        msg.chat.id,
        format!("Welcome back, {}!", user.first_name.as_deref().unwrap_or("friend")),
    )
    .reply_markup(KeyboardRemove::new())
    .await?;
    show_main_menu(&bot, msg.chat.id).await
}

pub async fn handle_menu(bot: Bot, msg: Message, dialogue: BotDialogue, ctx: Arc<BotContext>) -> HandlerResult {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let user = known_user(&ctx, from).await;
    if !user.is_registered() {
        return begin_registration(&bot, msg.chat.id, &dialogue).await;
    }
    dialogue.reset().await?;
    show_main_menu(&bot, msg.chat.id).await
}

pub async fn handle_help(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> HandlerResult {
    let mut text = Command::descriptions().to_string();
    let is_admin = msg.from().is_some_and(|u| ctx.is_admin(u.id.0 as i64));
    if is_admin {
        text.push_str("\n\n");
        text.push_str(&AdminCommand::descriptions().to_string());
    }
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub async fn handle_cancel(bot: Bot, msg: Message, dialogue: BotDialogue) -> HandlerResult {
    dialogue.reset().await?;
    bot.send_message(msg.chat.id, "Okay, cancelled.")
        .reply_markup(KeyboardRemove::new())
        .await?;
    show_main_menu(&bot, msg.chat.id).await
}
