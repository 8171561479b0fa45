use std::sync::Arc;

use tracing::warn;

use crate::config::AppConfig;
use crate::store::{MemoryStore, PgStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match &config.database_url {
            Some(url) => {
                let pg = PgStore::connect(url, config.max_connections).await?;
                pg.migrate().await?;
                Arc::new(pg) as Arc<dyn Store>
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory store, data is lost on restart");
                Arc::new(MemoryStore::new()) as Arc<dyn Store>
            }
        };

        Ok(Self { store, config })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with(AppConfig::for_tests())
    }

    #[cfg(test)]
    pub fn fake_with(config: AppConfig) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            config: Arc::new(config),
        }
    }
}
