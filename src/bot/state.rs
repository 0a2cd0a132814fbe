//! Dialogue state and inline-button callback data.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use teloxide::dispatching::dialogue::{Dialogue, ErasedStorage};

use crate::database::models::{ActivityType, LessonActivity, LessonOption};

pub type BotDialogue = Dialogue<State, ErasedStorage<State>>;
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Activity being assembled by the `/newactivity` dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewActivityDraft {
    pub activity_type: ActivityType,
    pub theme: String,
    pub description: String,
    pub image_ref: Option<String>,
}

/// Editable activity attributes offered by `/edit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityField {
    Theme,
    Description,
    Image,
    Start,
}

impl ActivityField {
    pub const ALL: [ActivityField; 4] = [
        ActivityField::Theme,
        ActivityField::Description,
        ActivityField::Image,
        ActivityField::Start,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityField::Theme => "theme",
            ActivityField::Description => "description",
            ActivityField::Image => "image",
            ActivityField::Start => "start",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ActivityField::Theme => "Theme",
            ActivityField::Description => "Description",
            ActivityField::Image => "Photo",
            ActivityField::Start => "Start time",
        }
    }
}

impl FromStr for ActivityField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityField::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown activity field '{s}'"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum State {
    #[default]
    Idle,
    RegFirstName,
    RegLastName {
        first_name: String,
    },
    RegPhone {
        first_name: String,
        last_name: String,
    },
    ChoosingOption {
        activity_id: i64,
    },
    ChoosingTickets {
        draft: LessonActivity,
    },
    Confirming {
        draft: LessonActivity,
    },
    AskingQuestion,
    AdminReplying {
        user_id: i64,
    },
    AdminNewType,
    AdminNewTheme {
        activity_type: ActivityType,
    },
    AdminNewDescription {
        activity_type: ActivityType,
        theme: String,
    },
    AdminNewImage {
        draft: NewActivityDraft,
    },
    AdminNewStart {
        draft: NewActivityDraft,
    },
    AdminEditField {
        activity_id: i64,
    },
    AdminEditValue {
        activity_id: i64,
        field: ActivityField,
    },
}

/// Everything an inline button can ask for. Encoded into Telegram's 64-byte callback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Menu,
    Browse(ActivityType),
    Show(i64),
    SignUp(i64),
    ChooseOption(LessonOption),
    Tickets(u8),
    Confirm,
    Cancel,
    Paid,
    MySignups,
    DropSignup(i64),
    Ask,
    Reply(i64),
    AdminType(ActivityType),
    AdminSkip,
    AdminField(ActivityField),
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// `None` for anything this bot did not produce.
    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.splitn(3, ':');
        let head = parts.next()?;
        let arg = parts.next();
        let rest = parts.next();

        let action = match (head, arg, rest) {
            ("menu", None, None) => CallbackAction::Menu,
            ("type", Some(t), None) => CallbackAction::Browse(t.parse().ok()?),
            ("act", Some(id), None) => CallbackAction::Show(id.parse().ok()?),
            ("sign", Some(id), None) => CallbackAction::SignUp(id.parse().ok()?),
            ("opt", Some(code), None) => CallbackAction::ChooseOption(code.parse().ok()?),
            ("tix", Some(n), None) => CallbackAction::Tickets(n.parse().ok()?),
            ("confirm", None, None) => CallbackAction::Confirm,
            ("cancel", None, None) => CallbackAction::Cancel,
            ("pay", Some("done"), None) => CallbackAction::Paid,
            ("mine", None, None) => CallbackAction::MySignups,
            ("drop", Some(id), None) => CallbackAction::DropSignup(id.parse().ok()?),
            ("ask", None, None) => CallbackAction::Ask,
            ("reply", Some(uid), None) => CallbackAction::Reply(uid.parse().ok()?),
            ("adm", Some("type"), Some(t)) => CallbackAction::AdminType(t.parse().ok()?),
            ("adm", Some("skip"), None) => CallbackAction::AdminSkip,
            ("adm", Some("field"), Some(f)) => CallbackAction::AdminField(f.parse().ok()?),
            _ => return None,
        };
        Some(action)
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::Menu => write!(f, "menu"),
            CallbackAction::Browse(t) => write!(f, "type:{}", t.as_str()),
            CallbackAction::Show(id) => write!(f, "act:{id}"),
            CallbackAction::SignUp(id) => write!(f, "sign:{id}"),
            CallbackAction::ChooseOption(option) => write!(f, "opt:{}", option.as_str()),
            CallbackAction::Tickets(n) => write!(f, "tix:{n}"),
            CallbackAction::Confirm => write!(f, "confirm"),
            CallbackAction::Cancel => write!(f, "cancel"),
            CallbackAction::Paid => write!(f, "pay:done"),
            CallbackAction::MySignups => write!(f, "mine"),
            CallbackAction::DropSignup(id) => write!(f, "drop:{id}"),
            CallbackAction::Ask => write!(f, "ask"),
            CallbackAction::Reply(uid) => write!(f, "reply:{uid}"),
            CallbackAction::AdminType(t) => write!(f, "adm:type:{}", t.as_str()),
            CallbackAction::AdminSkip => write!(f, "adm:skip"),
            CallbackAction::AdminField(field) => write!(f, "adm:field:{}", field.as_str()),
        }
    }
}
