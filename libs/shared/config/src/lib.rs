use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: String,
    pub notification_webhook_url: Option<String>,
    pub redis_url: Option<String>,
    pub conversation_ttl_seconds: u64,
    pub patient_id_prefix: String,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_PATH not set, using clinic.db");
                    "clinic.db".to_string()
                }),
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            redis_url: env::var("REDIS_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            conversation_ttl_seconds: parse_or_default("CONVERSATION_TTL_SECONDS", 1800),
            patient_id_prefix: env::var("PATIENT_ID_PREFIX")
                .unwrap_or_else(|_| {
                    warn!("PATIENT_ID_PREFIX not set, using APL");
                    "APL".to_string()
                }),
            server_port: parse_or_default("SERVER_PORT", 3000),
        };

        if !config.is_notification_configured() {
            warn!("NOTIFICATION_WEBHOOK_URL not set - notifications will only be logged");
        }
        if !config.is_redis_configured() {
            warn!("REDIS_URL not set - conversation state will be kept in memory");
        }

        config
    }

    pub fn is_notification_configured(&self) -> bool {
        self.notification_webhook_url.is_some()
    }

    pub fn is_redis_configured(&self) -> bool {
        self.redis_url.is_some()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {}", key, default);
            default
        }
    }
}
