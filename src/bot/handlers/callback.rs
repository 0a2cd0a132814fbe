use std::sync::Arc;
use teloxide::prelude::*;

use crate::bot::commands::start::{begin_registration, known_user, show_main_menu};
use crate::bot::context::BotContext;
use crate::bot::handlers::{admin, questions, signup};
use crate::bot::state::{BotDialogue, CallbackAction, HandlerResult, State};
use crate::utils::logging::{log_handler_error, log_handler_start};

fn is_admin_action(action: &CallbackAction) -> bool {
    matches!(
        action,
        CallbackAction::Reply(_)
            | CallbackAction::AdminType(_)
            | CallbackAction::AdminSkip
            | CallbackAction::AdminField(_)
    )
}

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    dialogue: BotDialogue,
    state: State,
    ctx: Arc<BotContext>,
) -> HandlerResult {
    let user_id = q.from.id.0 as i64;
    let username = q.from.username.as_deref().unwrap_or("unknown");
    let data = q.data.clone().unwrap_or_default();
    log_handler_start("callback", username, user_id, Some(&data));

    bot.answer_callback_query(q.id.clone()).await?;
    let chat_id = dialogue.chat_id();

    let Some(action) = CallbackAction::parse(&data) else {
        tracing::warn!("Unknown callback data '{}' from user {}", data, user_id);
        dialogue.reset().await?;
        return show_main_menu(&bot, chat_id).await;
    };

    if is_admin_action(&action) && !ctx.is_admin(user_id) {
        tracing::warn!("User {} pressed an admin button: {}", user_id, data);
        dialogue.reset().await?;
        return show_main_menu(&bot, chat_id).await;
    }

    let user = known_user(&ctx, &q.from).await;
    if !is_admin_action(&action) && !user.is_registered() {
        return begin_registration(&bot, chat_id, &dialogue).await;
    }

    let result = match (action, state) {
        (CallbackAction::Menu, _) => {
            dialogue.reset().await?;
            show_main_menu(&bot, chat_id).await
        }
        (CallbackAction::Browse(activity_type), _) => {
            signup::show_activities(&bot, chat_id, &ctx, activity_type).await
        }
        (CallbackAction::Show(activity_id), _) => {
            signup::show_activity(&bot, chat_id, &dialogue, &ctx, activity_id).await
        }
        (CallbackAction::SignUp(activity_id), _) => {
            signup::start_signup(&bot, chat_id, &dialogue, &ctx, activity_id).await
        }
        (CallbackAction::ChooseOption(option), State::ChoosingOption { activity_id }) => {
            signup::choose_option(&bot, chat_id, &dialogue, &ctx, activity_id, option).await
        }
        (CallbackAction::Tickets(tickets), State::ChoosingTickets { draft }) => {
            signup::choose_tickets(&bot, chat_id, &dialogue, draft, tickets).await
        }
        (CallbackAction::Confirm, State::Confirming { draft }) => {
            signup::confirm(&bot, chat_id, &dialogue, &ctx, &user, draft).await
        }
        (
            CallbackAction::Cancel,
            State::ChoosingOption { .. } | State::ChoosingTickets { .. } | State::Confirming { .. },
        ) => signup::cancel_dialog(&bot, chat_id, &dialogue).await,
        (CallbackAction::Paid, _) => signup::paid(&bot, chat_id, &ctx, &user).await,
        (CallbackAction::MySignups, _) => signup::my_signups(&bot, chat_id, &ctx, &user).await,
        (CallbackAction::DropSignup(signup_id), _) => {
            signup::drop_signup(&bot, chat_id, &ctx, &user, signup_id).await
        }
        (CallbackAction::Ask, _) => questions::start_question(&bot, chat_id, &dialogue).await,
        (CallbackAction::Reply(target), _) => {
            questions::start_admin_reply(&bot, chat_id, &dialogue, target).await
        }
        (CallbackAction::AdminType(activity_type), State::AdminNewType) => {
            admin::start_theme(&bot, chat_id, &dialogue, activity_type).await
        }
        (CallbackAction::AdminSkip, State::AdminNewImage { draft }) => {
            admin::ask_start(&bot, chat_id, &dialogue, draft).await
        }
        (CallbackAction::AdminSkip, State::AdminNewStart { draft }) => {
            admin::finish_new_activity(&bot, chat_id, &dialogue, &ctx, draft, None).await
        }
        (CallbackAction::AdminField(field), State::AdminEditField { activity_id }) => {
            admin::ask_edit_value(&bot, chat_id, &dialogue, activity_id, field).await
        }
        // A stale button from an earlier dialog step.
        (action, state) => {
            tracing::debug!("Callback {:?} does not fit state {:?}, resetting", action, state);
            dialogue.reset().await?;
            show_main_menu(&bot, chat_id).await
        }
    };

    if let Err(e) = &result {
        log_handler_error("callback", user_id, &e.to_string());
    }
    result
}
