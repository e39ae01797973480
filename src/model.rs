// Core structs: Submission, ProductDetails, ProductObservation, and the error types
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// One item from the feed. Only `id`, `title`, `url` and `created_at` are read.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: String,
    pub title: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Best-effort extraction result. Both fields are independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDetails {
    pub part_number: Option<String>,
    pub price: Option<i64>,
}

/// What every store adapter hands back: the extracted pair plus an optional comment body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterOutput {
    pub details: ProductDetails,
    pub markdown: Option<String>,
}

/// The persisted record of one submission's extracted product data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductObservation {
    pub submission_id: String,
    pub part_number: Option<String>,
    pub price: Option<i64>,
    /// Processing date (UTC), not the submission's creation date.
    pub observed_date: NaiveDate,
    pub site_name: String,
}

impl ProductObservation {
    pub fn new(submission: &Submission, details: ProductDetails, site_name: &str) -> Self {
        Self {
            submission_id: submission.id.clone(),
            part_number: details.part_number,
            price: details.price,
            observed_date: Utc::now().date_naive(),
            site_name: site_name.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(e) => e.is_connect() || e.is_timeout(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("feed unreachable: {0}")]
    Unreachable(String),
    #[error("rate limited: {message}")]
    RateLimited { message: String },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FeedError {
    pub fn is_transient(&self) -> bool {
        match self {
            FeedError::Network(e) => e.is_connect() || e.is_timeout(),
            FeedError::Unreachable(_) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("observation for submission {0} already exists")]
    Duplicate(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("database profile '{0}' is not defined")]
    MissingDatabase(String),
    #[error("unsupported database engine '{0}'")]
    UnsupportedEngine(String),
    #[error("database profile '{0}' has no path")]
    MissingPath(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("domain key '{0}' is already registered")]
    DuplicateKey(String),
    #[error("domain key '{new}' collides with registered key '{existing}'")]
    Collision { new: String, existing: String },
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("gave up after {0} attempts")]
    AttemptsExhausted(u32),
}

impl BotError {
    /// Connectivity failures get the short restart path in the supervisor.
    pub fn is_transient(&self) -> bool {
        match self {
            BotError::Feed(e) => e.is_transient(),
            BotError::Fetch(e) => e.is_transient(),
            _ => false,
        }
    }
}
