use deal_sniper::bot::Bot;
use deal_sniper::config::{load_config, AppConfig};
use deal_sniper::feed::RedditFeed;
use deal_sniper::fetch::HttpFetcher;
use deal_sniper::logging::init_logging;
use deal_sniper::storage::SqliteStorage;
use deal_sniper::stores::StoreRegistry;
use deal_sniper::supervisor::{supervise, RetryPolicy};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

const CONFIG_PATH: &str = "config.json";

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration from file
    let config: AppConfig = match load_config(CONFIG_PATH) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Config load error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to open log file {}: {}", config.logging.file, e);
        return ExitCode::FAILURE;
    }

    // Log details about any panic before the process dies
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Panic occurred: {}", panic_info);
    }));

    let subreddit = env::args().nth(1).unwrap_or_else(|| config.feed.default_source.clone());

    let db_path = match config.database_path() {
        Ok(path) => path,
        Err(e) => {
            error!("Database config error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let storage = match SqliteStorage::new(db_path) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let fetcher = match HttpFetcher::new() {
        Ok(f) => Arc::new(f),
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let registry = match StoreRegistry::with_default_stores(fetcher, &config.bot) {
        Ok(r) => r,
        Err(e) => {
            error!("Store registration failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Registered stores: {}", registry.domain_keys().collect::<Vec<_>>().join(", "));

    let feed = match RedditFeed::new(config.feed.clone(), &subreddit) {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to initialize feed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("initialized");

    let mut bot = Bot::new(feed, storage, registry, config.bot.clone());
    let policy = RetryPolicy::from(&config.supervisor);

    match supervise(&mut bot, &policy).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting: {}", e);
            ExitCode::FAILURE
        }
    }
}
