use crate::model::RegistryError;
use crate::stores::StoreAdapter;
use std::sync::Arc;
use tracing::{info, warn};

/// Ordered mapping from domain key to adapter. Filled once before the bot
/// starts streaming and only read afterwards.
#[derive(Default)]
pub struct StoreRegistry {
    entries: Vec<(String, Arc<dyn StoreAdapter>)>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one adapter. Rejects a key that equals, contains, or is contained
    /// in an already registered key, since resolution is substring-based.
    pub fn register(
        &mut self,
        domain_key: &str,
        adapter: Arc<dyn StoreAdapter>,
    ) -> Result<(), RegistryError> {
        for (existing, _) in &self.entries {
            if existing == domain_key {
                return Err(RegistryError::DuplicateKey(domain_key.to_string()));
            }
            if existing.contains(domain_key) || domain_key.contains(existing.as_str()) {
                return Err(RegistryError::Collision {
                    new: domain_key.to_string(),
                    existing: existing.clone(),
                });
            }
        }
        self.entries.push((domain_key.to_string(), adapter));
        Ok(())
    }

    /// First registered entry whose key occurs in `url`.
    pub fn resolve(&self, url: &str) -> Option<(&str, Arc<dyn StoreAdapter>)> {
        match self.entries.iter().find(|(key, _)| url.contains(key.as_str())) {
            Some((key, adapter)) => {
                info!("found {}", key);
                Some((key.as_str(), adapter.clone()))
            }
            None => {
                warn!("No adapter mapped to {}", url);
                None
            }
        }
    }

    pub fn domain_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
