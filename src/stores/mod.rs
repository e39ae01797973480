// Store adapters: one fetch + extract (+ optional template) pipeline per retail domain

pub mod amazon;
pub mod bestbuy;
pub mod ebay;
pub mod extract;
pub mod frys;
pub mod microcenter;
pub mod newegg;
pub mod rakuten;
pub mod registry;

use crate::config::BotConfig;
use crate::fetch::{Fetcher, PageRequest};
use crate::fetch::fetcher::DEFAULT_USER_AGENT;
use crate::model::{AdapterOutput, FetchError, RegistryError};
use std::sync::Arc;

pub use registry::StoreRegistry;

/// Full per-store pipeline: `url -> (details, markdown)`.
///
/// Missing fields never fail the call; only fetch errors propagate.
#[async_trait::async_trait]
pub trait StoreAdapter: Send + Sync {
    async fn run(&self, url: &str) -> Result<AdapterOutput, FetchError>;
}

/// The request most stores want: DNT, a desktop user agent and the store's Host.
pub(crate) fn browser_request(url: &str, host: &str) -> PageRequest {
    PageRequest::new(url)
        .header("dnt", "1")
        .header("host", host)
        .header("user-agent", DEFAULT_USER_AGENT)
}

impl StoreRegistry {
    /// Registers every known store, in a fixed order.
    pub fn with_default_stores(
        fetcher: Arc<dyn Fetcher>,
        bot: &BotConfig,
    ) -> Result<Self, RegistryError> {
        let mut registry = StoreRegistry::new();
        registry.register("amazon.com", Arc::new(amazon::Amazon::new(fetcher.clone())))?;
        registry.register("bestbuy.com", Arc::new(bestbuy::BestBuy::new(fetcher.clone())))?;
        registry.register("ebay.com", Arc::new(ebay::Ebay::new(fetcher.clone())))?;
        registry.register("frys.com", Arc::new(frys::Frys::new(fetcher.clone())))?;
        registry.register(
            "microcenter.com",
            Arc::new(microcenter::MicroCenter::new(
                fetcher.clone(),
                &bot.home_store,
                bot.fanout_concurrency,
            )),
        )?;
        registry.register("newegg.com", Arc::new(newegg::Newegg::new(fetcher.clone())))?;
        registry.register("rakuten.com", Arc::new(rakuten::Rakuten::new(fetcher)))?;
        Ok(registry)
    }
}
