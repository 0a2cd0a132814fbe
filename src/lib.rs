//! # Art Studio Bot
//!
//! A Telegram bot for an art studio: user registration, activity browsing and sign-ups, questions
//! for the studio, and payment and pre-activity reminders.
//!
//! ## Features
//! - Registration dialog with phone number, users mirrored to a Google Sheet
//! - Lessons, child studio, evening sketch and master-class catalogue with admin editing
//! - Payment reminders inside studio business hours, up to three attempts
//! - Sign-up reminders the day before and two hours before a dated activity
//! - Reminder state in Redis, restored into the job scheduler on start

/// Telegram commands, dialog state and update handlers
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// Database models, connections, and migrations
pub mod database;
/// Repositories, reminders, notifications and the health endpoint
pub mod services;
/// Utility functions for datetime, validation, and formatting
pub mod utils;
