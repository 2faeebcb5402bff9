use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    /// `sqlite` or `firebase`.
    pub store_backend: String,
    pub firebase_database_url: String,
    pub firebase_database_secret: String,
    pub firebase_api_key: String,
    pub admin_email: String,
    pub admin_password: String,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub poll_interval_secs: u64,
    /// Raw `PACKAGE_PRICES`, e.g. `Package A=2000,Package B=3000`. Empty
    /// means the built-in list.
    pub package_prices: String,
    pub business_name: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "boothdesk.db".to_string()),
            store_backend: env::var("STORE_BACKEND").unwrap_or_else(|_| "sqlite".to_string()),
            firebase_database_url: env::var("FIREBASE_DATABASE_URL").unwrap_or_default(),
            firebase_database_secret: env::var("FIREBASE_DATABASE_SECRET").unwrap_or_default(),
            firebase_api_key: env::var("FIREBASE_API_KEY").unwrap_or_default(),
            admin_email: env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "changeme".to_string()),
            session_secret: env::var("SESSION_SECRET").unwrap_or_default(),
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(12),
            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            package_prices: env::var("PACKAGE_PRICES").unwrap_or_default(),
            business_name: env::var("BUSINESS_NAME").unwrap_or_else(|_| "Photo Booth".to_string()),
        }
    }
}
