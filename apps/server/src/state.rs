use std::sync::Arc;

use anyhow::Result;
use webring::{LinkVerifier, MemberDirectory, MemberStore, MemoryStore, RingMonitor};

use crate::config::Config;
use crate::database::{self, LibsqlStore};

/// Shared state handed to every actix worker
pub struct AppState {
    pub directory: MemberDirectory,
    pub monitor: Arc<RingMonitor>,
    pub api_token: String,
}

impl AppState {
    pub fn new(store: Arc<dyn MemberStore>, verifier: LinkVerifier, config: &Config) -> Self {
        let monitor = RingMonitor::new(store.clone(), Arc::new(verifier), config.checker.concurrency);
        Self {
            directory: MemberDirectory::new(store),
            monitor: Arc::new(monitor),
            api_token: config.admin.api_token.clone(),
        }
    }

    /// Build the production state: configured store and a real HTTP fetcher
    pub async fn from_config(config: &Config, in_memory: bool) -> Result<Self> {
        let store = open_store(config, in_memory).await?;
        let verifier = LinkVerifier::with_http(config.ring.clone(), &config.checker)?;
        Ok(Self::new(store, verifier, config))
    }

    pub fn store(&self) -> &Arc<dyn MemberStore> {
        self.directory.store()
    }
}

async fn open_store(config: &Config, in_memory: bool) -> Result<Arc<dyn MemberStore>> {
    if in_memory {
        tracing::warn!("Using in-memory storage, members are lost on exit");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let pool = database::connect(&config.database).await?;
    Ok(Arc::new(LibsqlStore::new(pool)))
}
