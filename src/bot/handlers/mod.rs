pub mod admin;
pub mod callback;
pub mod dialogue;
pub mod general_message;
pub mod message;
pub mod questions;
pub mod registration;
pub mod signup;

use std::sync::Arc;
use teloxide::{
    dispatching::{dialogue as tg_dialogue, dialogue::ErasedStorage, UpdateHandler},
    prelude::*,
};

use crate::bot::commands::{AdminCommand, Command};
use crate::bot::context::BotContext;
use crate::bot::state::{BotDialogue, State};

pub struct BotHandler {
    pub ctx: Arc<BotContext>,
}

impl BotHandler {
    pub fn new(ctx: Arc<BotContext>) -> Self {
        Self { ctx }
    }

    pub fn schema(&self) -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
        use teloxide::dispatching::UpdateFilterExt;

        let ctx_cmd = Arc::clone(&self.ctx);
        let ctx_admin_filter = Arc::clone(&self.ctx);
        let ctx_admin = Arc::clone(&self.ctx);
        let ctx_dialogue = Arc::clone(&self.ctx);
        let ctx_callback = Arc::clone(&self.ctx);

        tg_dialogue::enter::<Update, ErasedStorage<State>, State, _>()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command, dialogue: BotDialogue| {
                        let ctx = Arc::clone(&ctx_cmd);
                        async move { message::command_handler(bot, msg, cmd, dialogue, ctx).await }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(move |msg: Message| {
                        msg.from()
                            .is_some_and(|u| ctx_admin_filter.is_admin(u.id.0 as i64))
                    })
                    .filter_command::<AdminCommand>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: AdminCommand, dialogue: BotDialogue| {
                        let ctx = Arc::clone(&ctx_admin);
                        async move { message::admin_command_handler(bot, msg, cmd, dialogue, ctx).await }
                    }),
            )
            .branch(Update::filter_message().endpoint(
                move |bot: Bot, msg: Message, dialogue: BotDialogue, state: State| {
                    let ctx = Arc::clone(&ctx_dialogue);
                    async move { dialogue::dialogue_handler(bot, msg, dialogue, state, ctx).await }
                },
            ))
            .branch(Update::filter_callback_query().endpoint(
                move |bot: Bot, q: CallbackQuery, dialogue: BotDialogue, state: State| {
                    let ctx = Arc::clone(&ctx_callback);
                    async move { callback::callback_handler(bot, q, dialogue, state, ctx).await }
                },
            ))
    }
}
