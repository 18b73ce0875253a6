//! Shared state built once per invocation.

use std::sync::Arc;
use std::time::Duration;

use elmenu_cache::{Cache, FileCache, MemoryCache, NullCache};
use elmenu_config::{CacheBackend, Config};
use elmenu_ratelimit::{RateLimitConfig, RateLimitFilter};
use elmenu_store::{FileMenuStore, MenuStore};
use elmenu_tree::{Menus, MenusConfig};

use crate::error::CliError;

/// Cache version; entries written by other releases are discarded.
const CACHE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the cache selected by `[cache] backend`.
pub(crate) fn open_cache(config: &Config) -> Arc<dyn Cache> {
    match config.cache_resolved.backend {
        CacheBackend::File => Arc::new(FileCache::new(
            config.cache_resolved.dir.clone(),
            CACHE_VERSION,
        )),
        CacheBackend::Memory => Arc::new(MemoryCache::new()),
        CacheBackend::None => Arc::new(NullCache),
    }
}

/// Error deduplication configured from `[errors]`, tracking traces in `cache`.
pub(crate) fn rate_limiter(config: &Config, cache: &dyn Cache) -> RateLimitFilter {
    RateLimitFilter::new(RateLimitConfig {
        window: Duration::from_secs(config.errors.rate_limit),
        max_keys: config.errors.key_limit,
        cache_prefix: config.errors.cache_prefix.clone(),
    })
    .with_cache(cache.bucket("errors"))
}

/// Configuration, cache and store for one command.
pub(crate) struct AppContext {
    pub(crate) config: Config,
    cache: Arc<dyn Cache>,
    store: Arc<FileMenuStore>,
}

impl AppContext {
    /// Open the menu store named by the configuration.
    pub(crate) fn open(config: Config, cache: Arc<dyn Cache>) -> Result<Self, CliError> {
        let store = FileMenuStore::open(&config.store_resolved.path)?;
        Ok(Self {
            config,
            cache,
            store: Arc::new(store),
        })
    }

    pub(crate) fn store(&self) -> Arc<dyn MenuStore> {
        Arc::clone(&self.store) as Arc<dyn MenuStore>
    }

    pub(crate) fn menus(&self) -> Menus {
        Menus::new(
            self.store(),
            self.cache.bucket("menus"),
            MenusConfig {
                languages: self.config.site.languages.clone(),
                cache_duration: self.config.menu.cache_duration(),
                cache_prefixes: self.config.menu.cache_prefixes.clone(),
            },
        )
    }

    /// Resolve an optional `--lang` argument against the configured languages.
    pub(crate) fn language(&self, lang: Option<String>) -> Result<String, CliError> {
        let Some(lang) = lang else {
            return Ok(self.config.site.default_language.clone());
        };
        if self.config.site.languages.contains(&lang) {
            Ok(lang)
        } else {
            Err(CliError::Validation(format!(
                "unknown language '{lang}' (configured: {})",
                self.config.site.languages.join(", ")
            )))
        }
    }
}
