use crate::configuration::Settings;
use crate::db::Database;
use crate::mailer::Mailer;
use crate::uploads::UploadStore;
use chrono::{Datelike, Utc};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub mailer: Arc<dyn Mailer>,
    pub uploads: UploadStore,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn init(db: Database, mailer: Arc<dyn Mailer>, settings: Settings) -> Self {
        Self {
            db: Arc::new(db),
            mailer,
            uploads: UploadStore::new(&settings.uploads),
            settings: Arc::new(settings),
        }
    }

    pub fn current_year(&self) -> i32 {
        Utc::now().year()
    }
}
