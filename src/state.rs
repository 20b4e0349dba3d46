use std::sync::Arc;

use crate::{
    config::AppConfig,
    services::{mailer::Mailer, store::TripStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: TripStore,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(config: AppConfig, store: TripStore, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            config,
            store,
            mailer,
        }
    }
}
