use serde::Deserialize;

/// Configuration for [`PreviousImagesManager`](crate::manager::PreviousImagesManager).
///
/// Typically deserialized as a section of the embedding application's config
/// file; every field has a default so an empty section is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Soft budget for the total bytes of decoded pixel data held by the
    /// cache. Nothing is evicted when the budget is exceeded; the overrun is
    /// only reported via a `warn!` event. See the crate docs on cache growth.
    #[serde(default = "CacheConfig::default_max_cached_bytes")]
    pub max_cached_bytes: usize,

    /// Name given to the background decode thread.
    #[serde(default = "CacheConfig::default_worker_thread_name")]
    pub worker_thread_name: String,
}

impl CacheConfig {
    fn default_max_cached_bytes() -> usize {
        10 * 1024 * 1024
    }

    fn default_worker_thread_name() -> String {
        "previous-images-loader".to_string()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cached_bytes: Self::default_max_cached_bytes(),
            worker_thread_name: Self::default_worker_thread_name(),
        }
    }
}
