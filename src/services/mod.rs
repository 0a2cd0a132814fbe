pub mod activities;
pub mod health;
pub mod notifier;
pub mod reminder;
pub mod signups;
pub mod users;
