use std::{path::PathBuf, sync::Arc};

use crate::auth::repo::{AccountStore, MemoryAccountStore, PgAccountStore};
use crate::config::{AppConfig, DetectionConfig, JwtConfig};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AccountStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match &config.database_url {
            Some(url) => Arc::new(PgAccountStore::connect(url).await?) as Arc<dyn AccountStore>,
            None => {
                tracing::warn!("DATABASE_URL not set; accounts are kept in memory");
                Arc::new(MemoryAccountStore::new()) as Arc<dyn AccountStore>
            }
        };

        Ok(Self { store, config })
    }

    pub fn from_parts(store: Arc<dyn AccountStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// In-memory state with a fixed test secret.
    pub fn fake() -> Self {
        Self::fake_with_store(Arc::new(MemoryAccountStore::new()))
    }

    pub fn fake_with_store(store: Arc<MemoryAccountStore>) -> Self {
        let config = Arc::new(AppConfig {
            database_url: None,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: crate::config::DEFAULT_TTL_MINUTES,
            },
            cookie_secure: false,
            public_dir: PathBuf::from("public"),
            pages_dir: PathBuf::from("pages"),
            detection: DetectionConfig::default(),
        });

        Self {
            store: store as Arc<dyn AccountStore>,
            config,
        }
    }
}
