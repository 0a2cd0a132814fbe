use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use crate::bot::state::{ActivityField, CallbackAction};
use crate::database::models::{Activity, ActivityType, LessonOption, Signup};
use crate::utils::validation::MAX_TICKETS;

fn button(label: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.encode())
}

fn back_to_menu() -> Vec<InlineKeyboardButton> {
    vec![button("⬅️ Main menu", CallbackAction::Menu)]
}

pub fn main_menu() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = ActivityType::ALL
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|t| button(t.title(), CallbackAction::Browse(*t)))
                .collect()
        })
        .collect();
    rows.push(vec![button("📋 My sign-ups", CallbackAction::MySignups)]);
    rows.push(vec![button("❓ Ask a question", CallbackAction::Ask)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn activity_list(activities: &[Activity]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = activities
        .iter()
        .map(|a| vec![button(a.theme.clone(), CallbackAction::Show(a.id))])
        .collect();
    rows.push(back_to_menu());
    InlineKeyboardMarkup::new(rows)
}

pub fn activity_card(activity: &Activity) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("✍️ Sign up", CallbackAction::SignUp(activity.id))],
        vec![button("⬅️ Back", CallbackAction::Browse(activity.activity_type))],
    ])
}

pub fn lesson_options(activity_type: ActivityType) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = LessonOption::for_type(activity_type)
        .iter()
        .map(|o| vec![button(o.title(), CallbackAction::ChooseOption(*o))])
        .collect();
    rows.push(vec![button("✖️ Cancel", CallbackAction::Cancel)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn ticket_counts() -> InlineKeyboardMarkup {
    let counts: Vec<InlineKeyboardButton> = (1..=MAX_TICKETS)
        .map(|n| button(n.to_string(), CallbackAction::Tickets(n)))
        .collect();
    InlineKeyboardMarkup::new(vec![counts, vec![button("✖️ Cancel", CallbackAction::Cancel)]])
}

pub fn confirm_signup() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("✅ Confirm", CallbackAction::Confirm),
        button("✖️ Cancel", CallbackAction::Cancel),
    ]])
}

pub fn paid_button() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("✅ I have paid", CallbackAction::Paid)]])
}

pub fn my_signups(signups: &[Signup]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = signups
        .iter()
        .map(|s| vec![button(format!("✖️ Cancel \"{}\"", s.topic), CallbackAction::DropSignup(s.id))])
        .collect();
    rows.push(back_to_menu());
    InlineKeyboardMarkup::new(rows)
}

pub fn admin_activity_types() -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = ActivityType::ALL
        .iter()
        .map(|t| vec![button(t.title(), CallbackAction::AdminType(*t))])
        .collect();
    InlineKeyboardMarkup::new(rows)
}

pub fn admin_skip() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("⏭ Skip", CallbackAction::AdminSkip)]])
}

pub fn admin_fields() -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = ActivityField::ALL
        .iter()
        .map(|f| vec![button(f.title(), CallbackAction::AdminField(*f))])
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Reply keyboard that shares the user's phone number in one tap.
pub fn share_contact() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new("📱 Share phone number").request(
        teloxide::types::ButtonRequest::Contact,
    )]])
    .resize_keyboard(true)
    .one_time_keyboard(true)
}
