use std::sync::Arc;
use teloxide::prelude::*;

use crate::bot::context::BotContext;
use crate::bot::keyboards;
use crate::bot::state::{BotDialogue, HandlerResult, State};
use crate::database::models::Activity;
use crate::utils::datetime::format_datetime;
use crate::utils::feedback::ChatFeedback;
use crate::utils::logging::log_validation_error;
use crate::utils::validation::parse_activity_id;

fn activity_line(activity: &Activity, ctx: &BotContext) -> String {
    let start = activity
        .starts_at
        .map(|s| format_datetime(&s, ctx.config.timezone))
        .unwrap_or_else(|| "no date".to_string());
    format!(
        "#{} {} \"{}\" ({})",
        activity.id,
        activity.activity_type.title(),
        activity.theme,
        start
    )
}

pub async fn handle_activities(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> HandlerResult {
    let activities = ctx.activities.get_activities().await?;
    if activities.is_empty() {
        ChatFeedback::new(bot, msg.chat.id)
            .info("No activities yet. Use /newactivity to add one.")
            .await?;
        return Ok(());
    }

    let lines: Vec<String> = activities.iter().map(|a| activity_line(a, &ctx)).collect();
    bot.send_message(msg.chat.id, format!("📚 Activities:\n\n{}", lines.join("\n")))
        .await?;
    Ok(())
}

pub async fn handle_new_activity(bot: Bot, msg: Message, dialogue: BotDialogue) -> HandlerResult {
    dialogue.update(State::AdminNewType).await?;
    bot.send_message(msg.chat.id, "Which kind of activity?")
        .reply_markup(keyboards::admin_activity_types())
        .await?;
    Ok(())
}

async fn requested_activity(
    bot: &Bot,
    msg: &Message,
    ctx: &BotContext,
    id: &str,
) -> Result<Option<Activity>, Box<dyn std::error::Error + Send + Sync>> {
    let feedback = ChatFeedback::new(bot.clone(), msg.chat.id);
    let admin_id = msg.from().map(|u| u.id.0 as i64).unwrap_or_default();

    let id = match parse_activity_id(id) {
        Ok(id) => id,
        Err(e) => {
            log_validation_error("activity_id", id, &e.to_string(), admin_id);
            feedback
                .invalid_input(&e.to_string(), "Use /activities to look up the id.")
                .await?;
            return Ok(None);
        }
    };

    let activity = ctx.activities.get_activity_by_id(id).await?;
    if activity.is_none() {
        feedback.error(&format!("Activity #{id} not found.")).await?;
    }
    Ok(activity)
}

pub async fn handle_edit(bot: Bot, msg: Message, dialogue: BotDialogue, ctx: Arc<BotContext>, id: String) -> HandlerResult {
    let Some(activity) = requested_activity(&bot, &msg, &ctx, &id).await? else {
        return Ok(());
    };

    dialogue
        .update(State::AdminEditField {
            activity_id: activity.id,
        })
        .await?;
    bot.send_message(
        msg.chat.id,
        format!("Editing {}\nWhat should change?", activity_line(&activity, &ctx)),
    )
    .reply_markup(keyboards::admin_fields())
    .await?;
    Ok(())
}

pub async fn handle_remove(bot: Bot, msg: Message, ctx: Arc<BotContext>, id: String) -> HandlerResult {
    let Some(activity) = requested_activity(&bot, &msg, &ctx, &id).await? else {
        return Ok(());
    };

    let feedback = ChatFeedback::new(bot, msg.chat.id);
    if ctx.activities.remove_activity(activity.id).await? {
        feedback
            .success(&format!("Removed \"{}\" and its sign-ups.", activity.theme))
            .await?;
    } else {
        feedback.warning("That activity was already gone.").await?;
    }
    Ok(())
}

pub async fn handle_users(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> HandlerResult {
    let users = ctx.users.get_users().await;
    let registered = users.iter().filter(|u| u.is_registered()).count();

    bot.send_message(
        msg.chat.id,
        format!(
            "👥 Users: {}\n✅ Registered: {}\n⏳ Unregistered: {}\n📝 Sheet writes pending: {}",
            users.len(),
            registered,
            users.len() - registered,
            ctx.users.pending_writes()
        ),
    )
    .await?;
    Ok(())
}
