//! Browsing activities and the sign-up dialog: option, ticket count, confirmation, payment.

use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};

use crate::bot::commands::start::show_main_menu;
use crate::bot::context::BotContext;
use crate::bot::keyboards;
use crate::bot::state::{BotDialogue, HandlerResult, State};
use crate::database::models::{Activity, ActivityType, LessonActivity, LessonOption, SignupStatus};
use crate::services::users::UserDTO;
use crate::utils::datetime::format_datetime;
use crate::utils::feedback::ChatFeedback;
use crate::utils::markdown::{bold, escape_markdown};
use crate::utils::validation::validate_ticket_count;

fn activity_card_text(activity: &Activity, ctx: &BotContext) -> String {
    let mut text = format!(
        "{}\n{}\n\n{}",
        bold(&activity.theme),
        escape_markdown(activity.activity_type.title()),
        escape_markdown(&activity.description)
    );
    if let Some(starts_at) = activity.starts_at {
        text.push_str(&format!(
            "\n\n🗓 {}",
            escape_markdown(&format_datetime(&starts_at, ctx.config.timezone))
        ));
    }
    text
}

async fn activity_gone(bot: &Bot, chat_id: ChatId, dialogue: &BotDialogue) -> HandlerResult {
    dialogue.reset().await?;
    ChatFeedback::new(bot.clone(), chat_id)
        .warning("This activity is no longer available.")
        .await?;
    show_main_menu(bot, chat_id).await
}

pub async fn show_activities(bot: &Bot, chat_id: ChatId, ctx: &BotContext, activity_type: ActivityType) -> HandlerResult {
    let activities = ctx.activities.get_activities_by_type(activity_type).await?;
    let text = if activities.is_empty() {
        format!("{}: nothing scheduled yet, check back soon!", activity_type.title())
    } else {
        format!("{}: choose a theme", activity_type.title())
    };
    bot.send_message(chat_id, text)
        .reply_markup(keyboards::activity_list(&activities))
        .await?;
    Ok(())
}

pub async fn show_activity(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    ctx: &BotContext,
    activity_id: i64,
) -> HandlerResult {
    let Some(activity) = ctx.activities.get_activity_by_id(activity_id).await? else {
        return activity_gone(bot, chat_id, dialogue).await;
    };

    let text = activity_card_text(&activity, ctx);
    match &activity.image_ref {
        Some(file_id) => {
            bot.send_photo(chat_id, InputFile::file_id(file_id.clone()))
                .caption(text)
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(keyboards::activity_card(&activity))
                .await?;
        }
        None => {
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(keyboards::activity_card(&activity))
                .await?;
        }
    }
    Ok(())
}

pub async fn start_signup(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    ctx: &BotContext,
    activity_id: i64,
) -> HandlerResult {
    let Some(activity) = ctx.activities.get_activity_by_id(activity_id).await? else {
        return activity_gone(bot, chat_id, dialogue).await;
    };

    dialogue.update(State::ChoosingOption { activity_id }).await?;
    bot.send_message(chat_id, format!("\"{}\": choose an option", activity.theme))
        .reply_markup(keyboards::lesson_options(activity.activity_type))
        .await?;
    Ok(())
}

pub async fn choose_option(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    ctx: &BotContext,
    activity_id: i64,
    option: LessonOption,
) -> HandlerResult {
    let Some(activity) = ctx.activities.get_activity_by_id(activity_id).await? else {
        return activity_gone(bot, chat_id, dialogue).await;
    };
    if !option.is_valid_for(activity.activity_type) {
        dialogue.reset().await?;
        return show_main_menu(bot, chat_id).await;
    }

    let draft = LessonActivity::new(activity.activity_type, activity.id, option, activity.theme);
    if activity.activity_type.allows_multiple_tickets() {
        dialogue.update(State::ChoosingTickets { draft }).await?;
        bot.send_message(chat_id, "How many tickets?")
            .reply_markup(keyboards::ticket_counts())
            .await?;
        return Ok(());
    }
    ask_confirmation(bot, chat_id, dialogue, draft).await
}

pub async fn choose_tickets(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    mut draft: LessonActivity,
    tickets: u8,
) -> HandlerResult {
    match validate_ticket_count(tickets, draft.activity_type.allows_multiple_tickets()) {
        Ok(tickets) => {
            draft.tickets = tickets;
            ask_confirmation(bot, chat_id, dialogue, draft).await
        }
        Err(e) => {
            ChatFeedback::new(bot.clone(), chat_id).error(&e.to_string()).await?;
            Ok(())
        }
    }
}

async fn ask_confirmation(bot: &Bot, chat_id: ChatId, dialogue: &BotDialogue, draft: LessonActivity) -> HandlerResult {
    let summary = format!(
        "Please confirm your sign-up:\n\n{}: \"{}\"\n{} x{}",
        draft.activity_type.title(),
        draft.topic,
        draft.option.title(),
        draft.tickets
    );
    dialogue.update(State::Confirming { draft }).await?;
    bot.send_message(chat_id, summary)
        .reply_markup(keyboards::confirm_signup())
        .await?;
    Ok(())
}

pub async fn confirm(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    ctx: &BotContext,
    user: &UserDTO,
    draft: LessonActivity,
) -> HandlerResult {
    dialogue.reset().await?;
    match ctx.signups.confirm(user, &draft).await? {
        Some(signup) => {
            tracing::info!("User {} signed up (#{}) for activity {}", user.id, signup.id, signup.activity_id);
            bot.send_message(
                chat_id,
                format!(
                    "✅ You are signed up for \"{}\"!\n\n💳 {}\n\nPress the button once you have paid.",
                    signup.topic, ctx.config.payment_details
                ),
            )
            .reply_markup(keyboards::paid_button())
            .await?;
            Ok(())
        }
        None => activity_gone(bot, chat_id, dialogue).await,
    }
}

pub async fn cancel_dialog(bot: &Bot, chat_id: ChatId, dialogue: &BotDialogue) -> HandlerResult {
    dialogue.reset().await?;
    bot.send_message(chat_id, "Sign-up cancelled.").await?;
    show_main_menu(bot, chat_id).await
}

pub async fn paid(bot: &Bot, chat_id: ChatId, ctx: &BotContext, user: &UserDTO) -> HandlerResult {
    let feedback = ChatFeedback::new(bot.clone(), chat_id);
    match ctx.signups.mark_paid(user).await? {
        Some(signup) => {
            feedback
                .success(&format!("Thank you! Payment for \"{}\" noted, the studio will check it.", signup.topic))
                .await?;
        }
        None => {
            feedback.info("You have no sign-ups waiting for payment.").await?;
        }
    }
    Ok(())
}

pub async fn my_signups(bot: &Bot, chat_id: ChatId, ctx: &BotContext, user: &UserDTO) -> HandlerResult {
    let signups = ctx.signups.active(user.id).await?;
    if signups.is_empty() {
        ChatFeedback::new(bot.clone(), chat_id)
            .info("You have no sign-ups yet.")
            .await?;
        return show_main_menu(bot, chat_id).await;
    }

    let lines: Vec<String> = signups
        .iter()
        .map(|s| {
            let status = match s.status {
                SignupStatus::Paid => "✅ paid",
                _ => "⏳ awaiting payment",
            };
            format!("#{} \"{}\", {} x{} ({})", s.id, s.topic, s.option.title(), s.tickets, status)
        })
        .collect();
    let pending: Vec<_> = signups
        .into_iter()
        .filter(|s| s.status == SignupStatus::Pending)
        .collect();

    bot.send_message(chat_id, format!("📋 Your sign-ups:\n\n{}", lines.join("\n")))
        .reply_markup(keyboards::my_signups(&pending))
        .await?;
    Ok(())
}

pub async fn drop_signup(bot: &Bot, chat_id: ChatId, ctx: &BotContext, user: &UserDTO, signup_id: i64) -> HandlerResult {
    let feedback = ChatFeedback::new(bot.clone(), chat_id);
    if ctx.signups.cancel(user, signup_id).await? {
        feedback.success("Your sign-up was cancelled.").await?;
    } else {
        feedback.warning("That sign-up can no longer be cancelled.").await?;
    }
    Ok(())
}
