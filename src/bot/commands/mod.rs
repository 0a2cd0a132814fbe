pub mod admin;
pub mod start;

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Art studio bot commands:")]
pub enum Command {
    #[command(description = "Register or open the main menu")]
    Start,
    #[command(description = "Open the main menu")]
    Menu,
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Stop the current dialog")]
    Cancel,
}

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Administrator commands:")]
pub enum AdminCommand {
    #[command(description = "List all activities")]
    Activities,
    #[command(description = "Create a new activity")]
    NewActivity,
    #[command(description = "Edit an activity: /edit <id>")]
    Edit { id: String },
    #[command(description = "Remove an activity: /remove <id>")]
    Remove { id: String },
    #[command(description = "Show user totals")]
    Users,
}
