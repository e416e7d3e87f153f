use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub autosave_interval_secs: u64,
    pub gateway_timeout_secs: u64,
    pub payment_gateway_url: String,
    pub payment_gateway_key: String,
    pub notification_webhook_url: String,
    pub default_currency: String,
    pub business_name: String,
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: parsed_or("PORT", 3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "bookings.db".to_string()),
            autosave_interval_secs: parsed_or("AUTOSAVE_INTERVAL_SECS", 30),
            gateway_timeout_secs: parsed_or("GATEWAY_TIMEOUT_SECS", 15),
            payment_gateway_url: env::var("PAYMENT_GATEWAY_URL").unwrap_or_default(),
            payment_gateway_key: env::var("PAYMENT_GATEWAY_KEY").unwrap_or_default(),
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL").unwrap_or_default(),
            default_currency: env::var("DEFAULT_CURRENCY")
                .map(|c| c.trim().to_uppercase())
                .unwrap_or_else(|_| "USD".to_string()),
            business_name: env::var("BUSINESS_NAME").unwrap_or_else(|_| "Bookings".to_string()),
        }
    }
}
