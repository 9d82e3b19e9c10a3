//! Process-wide configuration, loaded once at bootstrap from the
//! environment. No component re-reads `std::env` after `Settings::from_env`
//! runs; bad or missing values degrade to documented defaults rather than
//! aborting startup.

use gridx_domain_credits::SettlementParameters;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Settings {
    pub initial_credits: f64,
    pub settlement: SettlementParameters,
    pub coordinator_owner: String,
    pub queue_cap: usize,
    pub heartbeat_stale_seconds: i64,
    pub offline_threshold_seconds: i64,
    pub watchdog_period_seconds: u64,
    pub ws_port: u16,
    pub http_port: u16,
    pub db_path: String,
    pub db_auth_token: Option<String>,
    pub supported_languages: Vec<String>,
    pub max_code_bytes: usize,
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{key} set but unparsable, falling back to default");
            default
        }),
        Err(_) => default,
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            initial_credits: parse_env_or("GRIDX_INITIAL_CREDITS", 100.0),
            settlement: SettlementParameters {
                rate_per_second: parse_env_or("GRIDX_COST_RATE_PER_SECOND", 0.1),
                base: parse_env_or("GRIDX_COST_BASE", 0.0),
                worker_reward_fraction: parse_env_or("GRIDX_WORKER_REWARD_FRACTION", 0.8),
            },
            coordinator_owner: std::env::var("GRIDX_COORDINATOR_OWNER")
                .unwrap_or_else(|_| "coordinator".to_string()),
            queue_cap: parse_env_or("GRIDX_QUEUE_CAP", 1_000usize),
            heartbeat_stale_seconds: parse_env_or("GRIDX_HEARTBEAT_STALE_SECONDS", 45),
            offline_threshold_seconds: parse_env_or("GRIDX_OFFLINE_THRESHOLD_SECONDS", 120),
            watchdog_period_seconds: parse_env_or("GRIDX_WATCHDOG_PERIOD_SECONDS", 15),
            ws_port: parse_env_or("GRIDX_WS_PORT", 3000),
            http_port: parse_env_or("PORT", 3000),
            db_path: std::env::var("DATABASE_URL").unwrap_or_else(|_| "gridx.db".to_string()),
            db_auth_token: std::env::var("TURSO_AUTH_TOKEN").ok(),
            supported_languages: std::env::var("GRIDX_SUPPORTED_LANGUAGES")
                .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["python".to_string()]),
            max_code_bytes: parse_env_or("GRIDX_MAX_CODE_BYTES", 256 * 1024usize),
        }
    }
}
