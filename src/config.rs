use std::{env, net::SocketAddr};

use chrono::Weekday;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    database_url: String,
    listen_addr: SocketAddr,
    jwt_secret: String,
    seed_demo_data: bool,
    demo_password: String,
    cleanup: CleanupSchedule,
}

/// When the weekly cleanup fires (UTC), and whether it runs at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CleanupSchedule {
    pub enabled: bool,
    pub weekday: Weekday,
    pub hour: u32,
}

impl Default for CleanupSchedule {
    fn default() -> Self {
        Self {
            enabled: false,
            weekday: Weekday::Sun,
            hour: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn default_database_url() -> String {
    "sqlite://conduit.db".into()
}

fn default_listen_addr() -> String {
    "127.0.0.1:3001".into()
}

fn default_demo_password() -> String {
    "123456".into()
}

fn flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| default_database_url());
        let listen_addr = env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| default_listen_addr())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid(format!("LISTEN_ADDR: {e}")))?;
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.is_empty() {
            return Err(ConfigError::Invalid("JWT_SECRET must not be empty".into()));
        }

        let weekday = match env::var("CLEANUP_WEEKDAY") {
            Ok(day) => day
                .parse::<Weekday>()
                .map_err(|_| ConfigError::Invalid(format!("CLEANUP_WEEKDAY: {day}")))?,
            Err(_) => Weekday::Sun,
        };
        let hour = match env::var("CLEANUP_HOUR") {
            Ok(hour) => hour
                .parse::<u32>()
                .ok()
                .filter(|h| *h < 24)
                .ok_or_else(|| ConfigError::Invalid(format!("CLEANUP_HOUR: {hour}")))?,
            Err(_) => 0,
        };

        Ok(Self {
            database_url,
            listen_addr,
            jwt_secret,
            seed_demo_data: flag("SEED_DEMO_DATA"),
            demo_password: env::var("DEMO_PASSWORD").unwrap_or_else(|_| default_demo_password()),
            cleanup: CleanupSchedule {
                enabled: flag("CLEANUP_ENABLED"),
                weekday,
                hour,
            },
        })
    }

    /// Configuration for tests and embedding: in-memory database, no scheduled cleanup.
    pub fn for_database(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: jwt_secret.into(),
            seed_demo_data: false,
            demo_password: default_demo_password(),
            cleanup: CleanupSchedule::default(),
        }
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn seed_demo_data(&self) -> bool {
        self.seed_demo_data
    }

    pub fn demo_password(&self) -> &str {
        &self.demo_password
    }

    pub fn cleanup(&self) -> CleanupSchedule {
        self.cleanup
    }
}
