use anyhow::Result;
use redis::AsyncCommands;
use tracing::warn;
use uuid::Uuid;

use crate::app::pagination::PageRequest;
use crate::infra::cache::RedisCache;

const INDEX_KEY_PREFIX: &str = "page:index";
/// Bumped to drop every cached index page at once; old entries age out by TTL.
const INDEX_GENERATION_KEY: &str = "page:index:generation";

/// Rendered index pages, keyed by everything that changes their output.
#[derive(Clone)]
pub struct PageCache {
    cache: RedisCache,
    ttl_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub key: String,
    pub html: Option<String>,
}

impl PageCache {
    pub fn new(cache: RedisCache, ttl_seconds: u64) -> Self {
        Self { cache, ttl_seconds }
    }

    pub async fn lookup_index(&self, viewer_id: Option<Uuid>, page: PageRequest) -> CacheLookup {
        let mut conn = match self.cache.connection().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(error = ?err, "page cache unavailable");
                return CacheLookup {
                    key: index_key(0, viewer_id, page),
                    html: None,
                };
            }
        };

        let generation = conn
            .get::<_, Option<u64>>(INDEX_GENERATION_KEY)
            .await
            .unwrap_or_else(|err| {
                warn!(error = ?err, "failed to read page cache generation");
                None
            })
            .unwrap_or(0);
        let key = index_key(generation, viewer_id, page);

        let html = match conn.get::<_, Option<String>>(&key).await {
            Ok(html) => html,
            Err(err) => {
                warn!(error = ?err, key = %key, "failed to read page cache");
                None
            }
        };

        CacheLookup { key, html }
    }

    pub async fn store(&self, key: &str, html: &str) {
        if self.ttl_seconds == 0 {
            return;
        }
        match self.cache.connection().await {
            Ok(mut conn) => {
                if let Err(err) = conn.set_ex::<_, _, ()>(key, html, self.ttl_seconds).await {
                    warn!(error = ?err, key = %key, "failed to write page cache");
                }
            }
            Err(err) => warn!(error = ?err, "page cache unavailable"),
        }
    }

    /// Invalidates every cached index page.
    pub async fn clear_index(&self) -> Result<()> {
        let mut conn = self.cache.connection().await?;
        conn.incr::<_, _, u64>(INDEX_GENERATION_KEY, 1).await?;
        Ok(())
    }
}

pub fn index_key(generation: u64, viewer_id: Option<Uuid>, page: PageRequest) -> String {
    let viewer = match viewer_id {
        Some(id) => id.to_string(),
        None => "anonymous".to_string(),
    };
    format!(
        "{}:{}:{}:{}",
        INDEX_KEY_PREFIX,
        generation,
        viewer,
        page.number()
    )
}
