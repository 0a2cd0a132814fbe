use std::sync::Arc;
use teloxide::prelude::*;

use crate::bot::commands::start::show_main_menu;
use crate::bot::context::BotContext;
use crate::bot::handlers::{admin, general_message, questions, registration};
use crate::bot::state::{BotDialogue, HandlerResult, State};

/// Routes a plain message according to where the user is in a dialog.
pub async fn dialogue_handler(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    state: State,
    ctx: Arc<BotContext>,
) -> HandlerResult {
    match state {
        State::Idle => general_message::handle_general_message(bot, msg).await,
        State::RegFirstName => registration::receive_first_name(bot, msg, dialogue).await,
        State::RegLastName { first_name } => {
            registration::receive_last_name(bot, msg, dialogue, first_name).await
        }
        State::RegPhone {
            first_name,
            last_name,
        } => registration::receive_phone(bot, msg, dialogue, ctx, first_name, last_name).await,
        State::AskingQuestion => questions::receive_question(bot, msg, dialogue, ctx).await,
        State::AdminReplying { user_id } => {
            questions::receive_admin_reply(bot, msg, dialogue, ctx, user_id).await
        }
        State::AdminNewTheme { activity_type } => {
            admin::receive_theme(bot, msg, dialogue, activity_type).await
        }
        State::AdminNewDescription {
            activity_type,
            theme,
        } => admin::receive_description(bot, msg, dialogue, activity_type, theme).await,
        State::AdminNewImage { draft } => admin::receive_image(bot, msg, dialogue, draft).await,
        State::AdminNewStart { draft } => {
            admin::receive_start(bot, msg, dialogue, ctx, draft).await
        }
        State::AdminEditValue { activity_id, field } => {
            admin::receive_edit_value(bot, msg, dialogue, ctx, activity_id, field).await
        }
        // These steps expect a button press; typed text means the dialog lost its way.
        State::ChoosingOption { .. }
        | State::ChoosingTickets { .. }
        | State::Confirming { .. }
        | State::AdminNewType
        | State::AdminEditField { .. } => {
            dialogue.reset().await?;
            show_main_menu(&bot, msg.chat.id).await
        }
    }
}
