use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::PriceList;
use crate::services::auth::AuthProvider;
use crate::services::lifecycle::BookingLifecycle;
use crate::services::session::SessionKeys;

pub struct AppState {
    pub config: AppConfig,
    pub lifecycle: Arc<BookingLifecycle>,
    pub auth: Box<dyn AuthProvider>,
    pub sessions: SessionKeys,
    pub prices: PriceList,
}
