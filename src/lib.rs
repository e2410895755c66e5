pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;
pub mod render;

use crate::infra::{cache::RedisCache, db::Db, storage::ObjectStorage};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub cache: RedisCache,
    pub storage: ObjectStorage,
    pub session_key: [u8; 32],
    pub session_ttl_hours: u64,
    pub index_cache_ttl_seconds: u64,
    pub upload_max_bytes: usize,
    /// Prefix for image URLs in rendered pages.
    pub media_base_url: String,
}
