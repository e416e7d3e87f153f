use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::lifecycle::EngineContext;
use crate::services::registry::BookingRegistry;

pub struct AppState {
    pub config: AppConfig,
    pub engine: Arc<EngineContext>,
    pub bookings: Arc<BookingRegistry>,
}
