use crate::config::Config;
use crate::services::activities::ActivityRepository;
use crate::services::notifier::Notifier;
use crate::services::signups::SignupService;
use crate::services::users::UserRepository;

/// Shared services handed to every update handler.
pub struct BotContext {
    pub config: Config,
    pub users: UserRepository,
    pub activities: ActivityRepository,
    pub signups: SignupService,
    pub notifier: Notifier,
}

impl BotContext {
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.config.is_admin(user_id)
    }
}
