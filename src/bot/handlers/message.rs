use std::sync::Arc;
use teloxide::prelude::*;

use crate::bot::commands::{admin, start, AdminCommand, Command};
use crate::bot::context::BotContext;
use crate::bot::state::{BotDialogue, HandlerResult};
use crate::utils::logging::log_handler_error;

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    dialogue: BotDialogue,
    ctx: Arc<BotContext>,
) -> HandlerResult {
    let user_id = msg.from().map(|u| u.id.0 as i64).unwrap_or_default();
    let result = match cmd {
        Command::Start => start::handle_start(bot, msg, dialogue, ctx).await,
        Command::Menu => start::handle_menu(bot, msg, dialogue, ctx).await,
        Command::Help => start::handle_help(bot, msg, ctx).await,
        Command::Cancel => start::handle_cancel(bot, msg, dialogue).await,
    };
    if let Err(e) = &result {
        log_handler_error(&format!("{cmd:?}"), user_id, &e.to_string());
    }
    result
}

pub async fn admin_command_handler(
    bot: Bot,
    msg: Message,
    cmd: AdminCommand,
    dialogue: BotDialogue,
    ctx: Arc<BotContext>,
) -> HandlerResult {
    let admin_id = msg.from().map(|u| u.id.0 as i64).unwrap_or_default();
    tracing::info!("HANDLER_START: admin command {:?} by {}", cmd, admin_id);

    let result = match cmd.clone() {
        AdminCommand::Activities => admin::handle_activities(bot, msg, ctx).await,
        AdminCommand::NewActivity => admin::handle_new_activity(bot, msg, dialogue).await,
        AdminCommand::Edit { id } => admin::handle_edit(bot, msg, dialogue, ctx, id).await,
        AdminCommand::Remove { id } => admin::handle_remove(bot, msg, ctx, id).await,
        AdminCommand::Users => admin::handle_users(bot, msg, ctx).await,
    };
    if let Err(e) = &result {
        log_handler_error(&format!("{cmd:?}"), admin_id, &e.to_string());
    }
    result
}
