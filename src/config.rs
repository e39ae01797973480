use crate::model::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_source")]
    pub default_source: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_listing_limit")]
    pub listing_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub engine: String,
    pub path: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub pause_between_submissions_seconds: u64,
    pub max_reply_retries: u32,
    pub fanout_concurrency: usize,
    pub home_store: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            pause_between_submissions_seconds: 2,
            max_reply_retries: 10,
            fanout_concurrency: 1,
            home_store: "095".to_string(),
        }
    }
}

impl BotConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_secs(self.pause_between_submissions_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub max_attempts: u32,
    pub base_delay_seconds: u64,
    pub backoff_factor: u32,
    pub transient_delay_seconds: u64,
    pub transient_failures_per_attempt: u32,
    pub jitter_seconds: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay_seconds: 90,
            backoff_factor: 1,
            transient_delay_seconds: 30,
            transient_failures_per_attempt: 5,
            jitter_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: String,
    pub level: String,
    pub max_message_len: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: "logfile.log".to_string(),
            level: "info".to_string(),
            max_message_len: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub use_database: String,
    pub databases: HashMap<String, DatabaseConfig>,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Resolves the selected database profile to a SQLite file path.
    pub fn database_path(&self) -> Result<&str, ConfigError> {
        let profile = self
            .databases
            .get(&self.use_database)
            .ok_or_else(|| ConfigError::MissingDatabase(self.use_database.clone()))?;

        if !profile.engine.eq_ignore_ascii_case("sqlite") {
            return Err(ConfigError::UnsupportedEngine(profile.engine.clone()));
        }

        profile
            .path
            .as_deref()
            .ok_or_else(|| ConfigError::MissingPath(self.use_database.clone()))
    }
}

fn default_user_agent() -> String {
    format!("deal-sniper/{}", env!("CARGO_PKG_VERSION"))
}

fn default_source() -> String {
    "buildapcsales".to_string()
}

fn default_auth_url() -> String {
    "https://www.reddit.com".to_string()
}

fn default_api_url() -> String {
    "https://oauth.reddit.com".to_string()
}

fn default_poll_interval() -> u64 {
    10
}

fn default_listing_limit() -> u32 {
    100
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    Ok(serde_json::from_str(content)?)
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "feed": {
            "client_id": "id",
            "client_secret": "secret",
            "username": "bot",
            "password": "hunter2"
        },
        "use_database": "local",
        "databases": {
            "local": { "engine": "sqlite", "path": "data.db" },
            "remote": { "engine": "postgresql", "username": "bot", "password": "pw", "host": "db", "port": 5432 }
        }
    }"#;

    #[test]
    fn defaults_fill_optional_sections() {
        let cfg = parse_config(MINIMAL).unwrap();
        assert_eq!(cfg.feed.default_source, "buildapcsales");
        assert_eq!(cfg.feed.api_url, "https://oauth.reddit.com");
        assert_eq!(cfg.bot.max_reply_retries, 10);
        assert_eq!(cfg.bot.home_store, "095");
        assert_eq!(cfg.supervisor.max_attempts, 10);
        assert_eq!(cfg.logging.file, "logfile.log");
        assert_eq!(cfg.database_path().unwrap(), "data.db");
    }

    #[test]
    fn non_sqlite_profile_is_rejected() {
        let mut cfg = parse_config(MINIMAL).unwrap();
        cfg.use_database = "remote".into();
        assert!(matches!(cfg.database_path(), Err(ConfigError::UnsupportedEngine(e)) if e == "postgresql"));
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let mut cfg = parse_config(MINIMAL).unwrap();
        cfg.use_database = "staging".into();
        assert!(matches!(cfg.database_path(), Err(ConfigError::MissingDatabase(_))));
    }

    #[test]
    fn example_config_parses() {
        let cfg = parse_config(include_str!("../config.example.json")).unwrap();
        assert_eq!(cfg.database_path().unwrap(), "observations.db");
        assert_eq!(cfg.supervisor.transient_failures_per_attempt, 5);
    }

    #[test]
    fn load_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, MINIMAL).unwrap();
        let cfg = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.feed.username, "bot");
        assert!(matches!(load_config("does/not/exist.json"), Err(ConfigError::Io(_))));
    }
}
