use std::sync::Arc;

use crate::auth::{AuthService, JwtKeys};
use crate::config::Config;
use crate::schedule::ScheduleService;
use crate::store::{ScheduleStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub schedules: ScheduleService,
}

impl AppState {
    pub fn new(
        config: &Config,
        users: Arc<dyn UserStore>,
        schedules: Arc<dyn ScheduleStore>,
    ) -> Self {
        let keys = JwtKeys::new(&config.jwt_secret, config.token_ttl_hours);
        Self {
            auth: AuthService::new(users, keys, config.bcrypt_cost),
            schedules: ScheduleService::new(schedules),
        }
    }
}
