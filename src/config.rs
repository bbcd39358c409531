//! Process configuration from the environment (and `.env`, loaded by main).

use crate::auth::DEFAULT_ADMIN_PASSWORD;
use crate::session::SessionConfig;
use crate::types::Role;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BIND: &str = "0.0.0.0:6580";
const DEFAULT_DATA_DIR: &str = ".quizdash";
const DEFAULT_STATIC_DIR: &str = "static";
const DEFAULT_SYNC_INTERVAL_MS: u64 = 500;
const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    /// One tab per listed role
    pub roles: Vec<Role>,
    pub admin_password: String,
    pub sync_interval: Duration,
    pub tick_interval: Duration,
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse an optional variable, warning and falling back when it does not parse
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env_value(key) {
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
                default
            }
        },
        None => default,
    }
}

fn parse_roles(raw: &str) -> Result<Vec<Role>, String> {
    let mut roles = Vec::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let role: Role = part.parse()?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    if roles.is_empty() {
        return Err("no roles listed".to_string());
    }
    Ok(roles)
}

impl AppConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let bind = match env_value("QUIZ_BIND") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring invalid QUIZ_BIND={:?}, using {}", raw, DEFAULT_BIND);
                default_bind()
            }),
            None => default_bind(),
        };

        let roles = match env_value("QUIZ_ROLES") {
            Some(raw) => parse_roles(&raw).unwrap_or_else(|e| {
                tracing::warn!("Ignoring QUIZ_ROLES={:?}: {}", raw, e);
                Role::ALL.to_vec()
            }),
            None => Role::ALL.to_vec(),
        };

        let admin_password = env_value("QUIZ_ADMIN_PASSWORD").unwrap_or_else(|| {
            tracing::warn!("QUIZ_ADMIN_PASSWORD not set, admin panel uses the default password");
            DEFAULT_ADMIN_PASSWORD.to_string()
        });

        let sync_ms: u64 = parse_or("QUIZ_SYNC_INTERVAL_MS", DEFAULT_SYNC_INTERVAL_MS);
        let tick_ms: u64 = parse_or("QUIZ_TICK_INTERVAL_MS", DEFAULT_TICK_INTERVAL_MS);

        Self {
            bind,
            data_dir: env_value("QUIZ_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            static_dir: env_value("QUIZ_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
            roles,
            admin_password,
            // A zero interval would make tokio::time::interval panic
            sync_interval: Duration::from_millis(sync_ms.max(1)),
            tick_interval: Duration::from_millis(tick_ms.max(1)),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            sync_interval: self.sync_interval,
            tick_interval: self.tick_interval,
            admin_password: self.admin_password.clone(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 6580))
}
