//! Cached menu rendering.
//!
//! [`Menus`] memoizes built trees per `(language, category)` in a
//! [`CacheBucket`]. Two callers missing the same key at once both rebuild
//! and both write; the rebuild is pure, so the last write wins harmlessly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use elmenu_cache::{CacheBucket, CacheBucketExt};
use elmenu_store::{Category, MenuItem, MenuStore, MenuTranslation, StoreError, category_name};

use crate::builder::{MenuNode, build_menu};
use crate::observer::MenuObserver;

/// Default lifetime of a cached menu.
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(300);

/// Flat menu entry used for footer-style listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuLink {
    /// Item id.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Link target.
    pub url: String,
    /// Hover title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl From<MenuItem> for MenuLink {
    fn from(item: MenuItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            url: item.url,
            title: item.title,
        }
    }
}

/// Settings for [`Menus`].
#[derive(Clone, Debug)]
pub struct MenusConfig {
    /// Languages whose caches are cleared when a menu changes.
    pub languages: Vec<String>,
    /// Lifetime of cached trees and listings.
    pub cache_duration: Duration,
    /// Key prefixes by `"<CATEGORY>_CACHE_PREFIX"` name.
    pub cache_prefixes: HashMap<String, String>,
}

impl Default for MenusConfig {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_owned()],
            cache_duration: DEFAULT_CACHE_DURATION,
            cache_prefixes: HashMap::new(),
        }
    }
}

/// Menu renderer backed by a record store and a cache bucket.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use elmenu_cache::{Cache, MemoryCache};
/// use elmenu_store::{MemoryMenuStore, MenuItem};
/// use elmenu_tree::{Menus, MenusConfig};
///
/// let store = Arc::new(MemoryMenuStore::new().with_item(MenuItem::new(1, "Home", "/")));
/// let menus = Menus::new(store, MemoryCache::new().bucket("menus"), MenusConfig::default());
///
/// let menu = menus.render("en", None);
/// assert_eq!(menu[0].name, "Home");
/// ```
pub struct Menus {
    store: Arc<dyn MenuStore>,
    bucket: Box<dyn CacheBucket>,
    config: MenusConfig,
}

impl Menus {
    /// Create a renderer.
    #[must_use]
    pub fn new(store: Arc<dyn MenuStore>, bucket: Box<dyn CacheBucket>, config: MenusConfig) -> Self {
        Self {
            store,
            bucket,
            config,
        }
    }

    /// Languages whose caches [`MenuObserver`] events clear.
    #[must_use]
    pub fn languages(&self) -> &[String] {
        &self.config.languages
    }

    /// Cache key for the menu of `category` in `lang`.
    ///
    /// The category name (`"menu"` for the main menu) is upper-cased and
    /// suffixed with `_CACHE_PREFIX` to look up a configured prefix; without
    /// one, the category name itself is the prefix.
    #[must_use]
    pub fn cache_key(&self, lang: &str, category: Option<Category>) -> String {
        let name = category_name(category);
        let setting = format!("{}_CACHE_PREFIX", name.to_uppercase());
        let prefix = self
            .config
            .cache_prefixes
            .get(&setting)
            .map_or(name, String::as_str);
        format!("{prefix}_{lang}")
    }

    /// Menu tree for `lang` and `category`.
    ///
    /// Served from the cache when present; otherwise built from the store and
    /// cached. A store failure is logged and renders as an empty menu, which
    /// is not cached.
    #[must_use]
    pub fn render(&self, lang: &str, category: Option<Category>) -> Vec<MenuNode> {
        let key = self.cache_key(lang, category);
        self.cached(&key, || self.build(lang, category))
    }

    /// Build the tree for `lang` and `category` straight from the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    pub fn build(&self, lang: &str, category: Option<Category>) -> Result<Vec<MenuNode>, StoreError> {
        let items = self.store.items(lang, category)?;
        let translations = self.store.translations(lang, category)?;
        Ok(build_menu(items, translations))
    }

    /// Flat, ordered listing of `category` in `lang`, cached like [`Menus::render`].
    #[must_use]
    pub fn links(&self, lang: &str, category: Option<Category>) -> Vec<MenuLink> {
        let key = self.links_key(lang, category);
        self.cached(&key, || {
            let items = self.store.items(lang, category)?;
            Ok(items.into_iter().map(MenuLink::from).collect())
        })
    }

    /// Drop the cached tree and listing of `category` in `lang`.
    pub fn clear_cache(&self, lang: &str, category: Option<Category>) {
        for key in [self.cache_key(lang, category), self.links_key(lang, category)] {
            if let Err(e) = self.bucket.delete(&key) {
                tracing::warn!(key, error = %e, "Failed to clear cached menu");
            }
        }
    }

    /// Drop the cached menus of `category` in every configured language.
    pub fn clear_category(&self, category: Option<Category>) {
        for lang in &self.config.languages {
            self.clear_cache(lang, category);
        }
        tracing::debug!(category = category_name(category), "Cleared menu caches");
    }

    fn links_key(&self, lang: &str, category: Option<Category>) -> String {
        format!("{}_links", self.cache_key(lang, category))
    }

    fn cached<T>(&self, key: &str, build: impl FnOnce() -> Result<Vec<T>, StoreError>) -> Vec<T>
    where
        T: Serialize + serde::de::DeserializeOwned,
    {
        if let Some(value) = self.bucket.get_json(key) {
            return value;
        }

        match build() {
            Ok(value) => {
                self.bucket.set_json(key, &value, self.config.cache_duration);
                value
            }
            Err(e) => {
                tracing::error!(key, error = %e, "Failed to load menu");
                Vec::new()
            }
        }
    }
}

impl MenuObserver for Menus {
    fn item_saved(&self, item: &MenuItem, previous: Option<&MenuItem>) {
        self.clear_category(item.category);
        if let Some(previous) = previous
            && previous.category != item.category
        {
            self.clear_category(previous.category);
        }
    }

    fn item_deleted(&self, item: &MenuItem) {
        self.clear_category(item.category);
    }

    fn translation_saved(&self, item: &MenuItem, _translation: &MenuTranslation) {
        self.clear_category(item.category);
    }

    fn translation_deleted(&self, item: &MenuItem, _translation: &MenuTranslation) {
        self.clear_category(item.category);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use elmenu_cache::{Cache, CacheError, Clock, ManualClock, MemoryCache, NullCache};
    use elmenu_store::{MemoryMenuStore, TranslatedItem};
    use pretty_assertions::assert_eq;

    use super::*;

    static_assertions::assert_impl_all!(Menus: Send, Sync);

    /// Store that counts reads and can be switched to fail.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryMenuStore,
        reads: AtomicUsize,
        fail: bool,
    }

    impl CountingStore {
        fn check(&self) -> Result<(), StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::new(elmenu_store::StoreErrorKind::Unavailable));
            }
            Ok(())
        }
    }

    impl MenuStore for CountingStore {
        fn items(&self, lang: &str, category: Option<Category>) -> Result<Vec<MenuItem>, StoreError> {
            self.check()?;
            self.inner.items(lang, category)
        }

        fn translations(
            &self,
            lang: &str,
            category: Option<Category>,
        ) -> Result<Vec<TranslatedItem>, StoreError> {
            self.inner.translations(lang, category)
        }

        fn item(&self, id: u64) -> Result<Option<MenuItem>, StoreError> {
            self.inner.item(id)
        }

        fn save_item(&self, item: MenuItem) -> Result<MenuItem, StoreError> {
            self.inner.save_item(item)
        }

        fn delete_item(&self, id: u64) -> Result<MenuItem, StoreError> {
            self.inner.delete_item(id)
        }

        fn save_translation(&self, translation: MenuTranslation) -> Result<(), StoreError> {
            self.inner.save_translation(translation)
        }

        fn delete_translation(
            &self,
            item: u64,
            language: &str,
        ) -> Result<MenuTranslation, StoreError> {
            self.inner.delete_translation(item, language)
        }

        fn upsert_cms_item(&self, item: elmenu_store::CmsItem) -> Result<(u64, bool), StoreError> {
            self.inner.upsert_cms_item(item)
        }

        fn clear(&self) -> Result<(), StoreError> {
            self.inner.clear()
        }
    }

    /// Bucket whose every operation fails.
    struct BrokenBucket;

    impl CacheBucket for BrokenBucket {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::Unavailable("down".to_owned()))
        }

        fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_owned()))
        }

        fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_owned()))
        }
    }

    fn sample_store() -> CountingStore {
        CountingStore {
            inner: MemoryMenuStore::new()
                .with_item(MenuItem::new(1, "About", "/about/"))
                .with_item(MenuItem::new(2, "Team", "/about/team/").with_parent(1))
                .with_item(
                    MenuItem::new(3, "Contact", "/contact/")
                        .with_category(Category::Foot)
                        .with_order(2),
                )
                .with_item(
                    MenuItem::new(4, "License", "/license/")
                        .with_category(Category::Foot)
                        .with_order(1),
                )
                .with_translation(MenuTranslation::new(1, "de").with_name("Über uns")),
            ..CountingStore::default()
        }
    }

    fn config() -> MenusConfig {
        MenusConfig {
            languages: vec!["en".to_owned(), "de".to_owned()],
            ..MenusConfig::default()
        }
    }

    #[test]
    fn test_cache_key_defaults_to_category_name() {
        let menus = Menus::new(
            Arc::new(MemoryMenuStore::new()),
            NullCache.bucket("menus"),
            MenusConfig::default(),
        );

        assert_eq!(menus.cache_key("en", None), "menu_en");
        assert_eq!(menus.cache_key("de", Some(Category::Foot)), "foot_de");
        assert_eq!(menus.cache_key("fr", Some(Category::Tab)), "tab_fr");
    }

    #[test]
    fn test_cache_key_uses_configured_prefix() {
        let mut config = MenusConfig::default();
        config
            .cache_prefixes
            .insert("MENU_CACHE_PREFIX".to_owned(), "mainmenu".to_owned());
        let menus = Menus::new(Arc::new(MemoryMenuStore::new()), NullCache.bucket("menus"), config);

        assert_eq!(menus.cache_key("en", None), "mainmenu_en");
        assert_eq!(menus.cache_key("en", Some(Category::Hidden)), "hidden_en");
    }

    #[test]
    fn test_render_applies_language_overlay() {
        let menus = Menus::new(Arc::new(sample_store()), NullCache.bucket("m"), config());

        let en = menus.render("en", None);
        let de = menus.render("de", None);

        assert_eq!(en[0].name, "About");
        assert_eq!(de[0].name, "Über uns");
        assert_eq!(de[0].submenu[0].name, "Team");
    }

    #[test]
    fn test_render_is_served_from_cache() {
        let store = Arc::new(sample_store());
        let menus = Menus::new(
            Arc::clone(&store) as Arc<dyn MenuStore>,
            MemoryCache::new().bucket("m"),
            config(),
        );

        let first = menus.render("en", None);
        let second = menus.render("en", None);

        assert_eq!(first, second);
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_render_rebuilds_after_expiry() {
        let clock = Arc::new(ManualClock::default());
        let cache = MemoryCache::with_clock(Arc::clone(&clock) as Arc<dyn Clock>);
        let store = Arc::new(sample_store());
        let menus = Menus::new(
            Arc::clone(&store) as Arc<dyn MenuStore>,
            cache.bucket("m"),
            config(),
        );

        let _ = menus.render("en", None);
        clock.advance(Duration::from_secs(299));
        let _ = menus.render("en", None);
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(1));
        let _ = menus.render("en", None);
        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_render_caches_empty_menu() {
        let store = Arc::new(CountingStore::default());
        let menus = Menus::new(
            Arc::clone(&store) as Arc<dyn MenuStore>,
            MemoryCache::new().bucket("m"),
            config(),
        );

        assert!(menus.render("en", Some(Category::Tab)).is_empty());
        assert!(menus.render("en", Some(Category::Tab)).is_empty());
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_render_without_cache_rebuilds_every_call() {
        let store = Arc::new(sample_store());
        let menus = Menus::new(
            Arc::clone(&store) as Arc<dyn MenuStore>,
            Box::new(BrokenBucket),
            config(),
        );

        assert_eq!(menus.render("en", None).len(), 1);
        assert_eq!(menus.render("en", None).len(), 1);
        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_render_store_failure_is_empty_and_uncached() {
        let store = Arc::new(CountingStore {
            fail: true,
            ..CountingStore::default()
        });
        let menus = Menus::new(
            Arc::clone(&store) as Arc<dyn MenuStore>,
            MemoryCache::new().bucket("m"),
            config(),
        );

        assert!(menus.render("en", None).is_empty());
        assert!(menus.render("en", None).is_empty());
        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_links_are_flat_and_ordered() {
        let menus = Menus::new(Arc::new(sample_store()), NullCache.bucket("m"), config());

        let links = menus.links("en", Some(Category::Foot));

        assert_eq!(
            links,
            vec![
                MenuLink {
                    id: 4,
                    name: "License".to_owned(),
                    url: "/license/".to_owned(),
                    title: None,
                },
                MenuLink {
                    id: 3,
                    name: "Contact".to_owned(),
                    url: "/contact/".to_owned(),
                    title: None,
                },
            ]
        );
    }

    #[test]
    fn test_links_and_tree_use_separate_keys() {
        let store = Arc::new(sample_store());
        let menus = Menus::new(
            Arc::clone(&store) as Arc<dyn MenuStore>,
            MemoryCache::new().bucket("m"),
            config(),
        );

        assert_eq!(menus.render("en", Some(Category::Foot)).len(), 2);
        assert_eq!(menus.links("en", Some(Category::Foot)).len(), 2);
        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clear_cache_forces_rebuild() {
        let store = Arc::new(sample_store());
        let menus = Menus::new(
            Arc::clone(&store) as Arc<dyn MenuStore>,
            MemoryCache::new().bucket("m"),
            config(),
        );

        let _ = menus.render("en", None);
        let _ = menus.links("en", None);
        menus.clear_cache("en", None);
        let _ = menus.render("en", None);
        let _ = menus.links("en", None);

        assert_eq!(store.reads.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_item_saved_clears_every_language() {
        let store = Arc::new(sample_store());
        let menus = Menus::new(
            Arc::clone(&store) as Arc<dyn MenuStore>,
            MemoryCache::new().bucket("m"),
            config(),
        );
        let _ = menus.render("en", None);
        let _ = menus.render("de", None);
        let _ = menus.render("de", Some(Category::Foot));

        menus.item_saved(&MenuItem::new(1, "About", "/about/"), None);

        let _ = menus.render("en", None);
        let _ = menus.render("de", None);
        let _ = menus.render("de", Some(Category::Foot));
        // Main menu rebuilt twice, footer still cached
        assert_eq!(store.reads.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_item_saved_clears_previous_category() {
        let store = Arc::new(sample_store());
        let menus = Menus::new(
            Arc::clone(&store) as Arc<dyn MenuStore>,
            MemoryCache::new().bucket("m"),
            config(),
        );
        let _ = menus.render("en", Some(Category::Foot));

        let previous = MenuItem::new(3, "Contact", "/contact/").with_category(Category::Foot);
        let moved = previous.clone().with_category(Category::Tab);
        menus.item_saved(&moved, Some(&previous));

        let _ = menus.render("en", Some(Category::Foot));
        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    }
}
