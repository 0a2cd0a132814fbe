//! Steps of the admin dialogs: `/newactivity` and `/edit`.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use teloxide::prelude::*;

use crate::bot::context::BotContext;
use crate::bot::keyboards;
use crate::bot::state::{ActivityField, BotDialogue, HandlerResult, NewActivityDraft, State};
use crate::database::models::{ActivityType, NewActivity};
use crate::utils::datetime::{format_datetime, parse_local_datetime};
use crate::utils::feedback::ChatFeedback;
use crate::utils::validation::{validate_description, validate_theme};

/// Typed in place of a photo or start time to clear it while editing.
const CLEAR_VALUE: &str = "-";

fn largest_photo(msg: &Message) -> Option<String> {
    msg.photo()
        .and_then(|sizes| sizes.iter().max_by_key(|p| p.width * p.height))
        .map(|p| p.file.id.clone())
}

fn parse_future_start(text: &str, ctx: &BotContext) -> anyhow::Result<DateTime<Utc>> {
    let starts_at = parse_local_datetime(text, ctx.config.timezone)?;
    if starts_at <= Utc::now() {
        anyhow::bail!("The start time is already in the past");
    }
    Ok(starts_at)
}

pub async fn start_theme(bot: &Bot, chat_id: ChatId, dialogue: &BotDialogue, activity_type: ActivityType) -> HandlerResult {
    dialogue.update(State::AdminNewTheme { activity_type }).await?;
    bot.send_message(chat_id, format!("{}: what is the theme?", activity_type.title()))
        .await?;
    Ok(())
}

pub async fn receive_theme(bot: Bot, msg: Message, dialogue: BotDialogue, activity_type: ActivityType) -> HandlerResult {
    match validate_theme(msg.text().unwrap_or_default()) {
        Ok(theme) => {
            dialogue
                .update(State::AdminNewDescription {
                    activity_type,
                    theme,
                })
                .await?;
            bot.send_message(msg.chat.id, "Now the description:").await?;
        }
        Err(e) => {
            ChatFeedback::new(bot, msg.chat.id)
                .invalid_input(&e.to_string(), "One short line, e.g. Sunflowers in oil.")
                .await?;
        }
    }
    Ok(())
}

pub async fn receive_description(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    activity_type: ActivityType,
    theme: String,
) -> HandlerResult {
    match validate_description(msg.text().unwrap_or_default()) {
        Ok(description) => {
            let draft = NewActivityDraft {
                activity_type,
                theme,
                description,
                image_ref: None,
            };
            dialogue.update(State::AdminNewImage { draft }).await?;
            bot.send_message(msg.chat.id, "Send a photo for the card, or skip.")
                .reply_markup(keyboards::admin_skip())
                .await?;
        }
        Err(e) => {
            ChatFeedback::new(bot, msg.chat.id)
                .invalid_input(&e.to_string(), "Describe the activity in a few sentences.")
                .await?;
        }
    }
    Ok(())
}

pub async fn ask_start(bot: &Bot, chat_id: ChatId, dialogue: &BotDialogue, draft: NewActivityDraft) -> HandlerResult {
    dialogue.update(State::AdminNewStart { draft }).await?;
    bot.send_message(
        chat_id,
        "When does it start? Send YYYY-MM-DD HH:MM in studio time, or skip for undated activities.",
    )
    .reply_markup(keyboards::admin_skip())
    .await?;
    Ok(())
}

pub async fn receive_image(bot: Bot, msg: Message, dialogue: BotDialogue, mut draft: NewActivityDraft) -> HandlerResult {
    let Some(file_id) = largest_photo(&msg) else {
        ChatFeedback::new(bot, msg.chat.id)
            .invalid_input("That is not a photo.", "Send an image, or press Skip.")
            .await?;
        return Ok(());
    };
    draft.image_ref = Some(file_id);
    ask_start(&bot, msg.chat.id, &dialogue, draft).await
}

pub async fn receive_start(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    ctx: Arc<BotContext>,
    draft: NewActivityDraft,
) -> HandlerResult {
    match parse_future_start(msg.text().unwrap_or_default(), &ctx) {
        Ok(starts_at) => finish_new_activity(&bot, msg.chat.id, &dialogue, &ctx, draft, Some(starts_at)).await,
        Err(e) => {
            ChatFeedback::new(bot, msg.chat.id)
                .invalid_input(&e.to_string(), "For example 2030-03-04 18:30, or press Skip.")
                .await?;
            Ok(())
        }
    }
}

pub async fn finish_new_activity(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    ctx: &BotContext,
    draft: NewActivityDraft,
    starts_at: Option<DateTime<Utc>>,
) -> HandlerResult {
    dialogue.reset().await?;
    let feedback = ChatFeedback::new(bot.clone(), chat_id);
    let new = NewActivity {
        activity_type: draft.activity_type,
        theme: draft.theme,
        description: draft.description,
        image_ref: draft.image_ref,
        starts_at,
    };

    match ctx.activities.add_activity(new).await? {
        Some(activity) => {
            feedback
                .success(&format!("Created activity #{} \"{}\".", activity.id, activity.theme))
                .await?;
        }
        None => {
            feedback
                .error("An activity with this theme already exists for that type.")
                .await?;
        }
    }
    Ok(())
}

pub async fn ask_edit_value(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    activity_id: i64,
    field: ActivityField,
) -> HandlerResult {
    dialogue
        .update(State::AdminEditValue { activity_id, field })
        .await?;
    let prompt = match field {
        ActivityField::Theme => "Send the new theme.".to_string(),
        ActivityField::Description => "Send the new description.".to_string(),
        ActivityField::Image => format!("Send the new photo, or {CLEAR_VALUE} to remove it."),
        ActivityField::Start => {
            format!("Send the new start as YYYY-MM-DD HH:MM, or {CLEAR_VALUE} to clear it.")
        }
    };
    bot.send_message(chat_id, prompt).await?;
    Ok(())
}

pub async fn receive_edit_value(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    ctx: Arc<BotContext>,
    activity_id: i64,
    field: ActivityField,
) -> HandlerResult {
    let feedback = ChatFeedback::new(bot.clone(), msg.chat.id);
    let text = msg.text().unwrap_or_default().trim();
    let clear = text == CLEAR_VALUE;

    let updated = match field {
        ActivityField::Theme => match validate_theme(text) {
            Ok(theme) => ctx.activities.update_activity_theme(activity_id, &theme).await?,
            Err(e) => {
                feedback.invalid_input(&e.to_string(), "Try another theme.").await?;
                return Ok(());
            }
        },
        ActivityField::Description => match validate_description(text) {
            Ok(description) => {
                ctx.activities
                    .update_activity_description(activity_id, &description)
                    .await?
            }
            Err(e) => {
                feedback.invalid_input(&e.to_string(), "Try again.").await?;
                return Ok(());
            }
        },
        ActivityField::Image => match (largest_photo(&msg), clear) {
            (Some(file_id), _) => ctx.activities.update_activity_image(activity_id, Some(&file_id)).await?,
            (None, true) => ctx.activities.update_activity_image(activity_id, None).await?,
            (None, false) => {
                feedback
                    .invalid_input("That is not a photo.", &format!("Send an image or {CLEAR_VALUE}."))
                    .await?;
                return Ok(());
            }
        },
        ActivityField::Start if clear => ctx.activities.update_activity_start(activity_id, None).await?,
        ActivityField::Start => match parse_future_start(text, &ctx) {
            Ok(starts_at) => {
                let updated = ctx
                    .activities
                    .update_activity_start(activity_id, Some(starts_at))
                    .await?;
                if updated {
                    feedback
                        .info(&format!("New start: {}", format_datetime(&starts_at, ctx.config.timezone)))
                        .await?;
                }
                updated
            }
            Err(e) => {
                feedback
                    .invalid_input(&e.to_string(), "For example 2030-03-04 18:30.")
                    .await?;
                return Ok(());
            }
        },
    };

    dialogue.reset().await?;
    if updated {
        feedback.success(&format!("{} updated.", field.title())).await?;
    } else {
        feedback
            .error("Nothing changed: the activity is gone or the theme is taken.")
            .await?;
    }
    Ok(())
}
