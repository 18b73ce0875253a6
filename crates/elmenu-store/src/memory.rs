//! In-memory store implementation.
//!
//! [`MemoryMenuStore`] holds a [`StoreData`] behind a lock. The row-level
//! logic lives on [`StoreData`] itself so that [`FileMenuStore`](crate::FileMenuStore)
//! can apply the same operations before persisting.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::model::{
    Category, CmsItem, LangScope, MenuItem, MenuTranslation, StoreData, TranslatedItem,
};
use crate::store::{MenuStore, StoreError};

const BACKEND: &str = "Memory";

impl StoreData {
    pub(crate) fn items(&self, lang: &str, category: Option<Category>) -> Vec<MenuItem> {
        let mut items: Vec<MenuItem> = self
            .items
            .iter()
            .filter(|item| item.category == category && item.lang.matches(lang))
            .cloned()
            .collect();
        items.sort_by_key(|item| item.order);
        items
    }

    pub(crate) fn translations(
        &self,
        lang: &str,
        category: Option<Category>,
    ) -> Vec<TranslatedItem> {
        let mut rows: Vec<TranslatedItem> = self
            .translations
            .iter()
            .filter(|translation| translation.language == lang)
            .filter_map(|translation| {
                let item = self.find_item(translation.item)?;
                (item.category == category).then(|| TranslatedItem {
                    item: item.clone(),
                    translation: translation.clone(),
                })
            })
            .collect();
        rows.sort_by_key(|row| row.item.order);
        rows
    }

    pub(crate) fn find_item(&self, id: u64) -> Option<&MenuItem> {
        self.items.iter().find(|item| item.id == id)
    }

    fn next_id(&self) -> u64 {
        self.items.iter().map(|item| item.id).max().unwrap_or(0) + 1
    }

    pub(crate) fn save_item(&mut self, mut item: MenuItem) -> MenuItem {
        if item.id == 0 {
            item.id = self.next_id();
        }
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => existing.clone_from(&item),
            None => self.items.push(item.clone()),
        }
        item
    }

    pub(crate) fn delete_item(&mut self, id: u64) -> Result<MenuItem, StoreError> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| StoreError::not_found(format!("item {id}")))?;
        self.translations.retain(|translation| translation.item != id);
        Ok(self.items.remove(index))
    }

    pub(crate) fn save_translation(
        &mut self,
        translation: MenuTranslation,
    ) -> Result<(), StoreError> {
        if self.find_item(translation.item).is_none() {
            return Err(StoreError::not_found(format!("item {}", translation.item)));
        }
        match self.translations.iter_mut().find(|existing| {
            existing.item == translation.item && existing.language == translation.language
        }) {
            Some(existing) => *existing = translation,
            None => self.translations.push(translation),
        }
        Ok(())
    }

    pub(crate) fn delete_translation(
        &mut self,
        item: u64,
        language: &str,
    ) -> Result<MenuTranslation, StoreError> {
        let index = self
            .translations
            .iter()
            .position(|t| t.item == item && t.language == language)
            .ok_or_else(|| {
                StoreError::not_found(format!("translation of item {item} into {language}"))
            })?;
        Ok(self.translations.remove(index))
    }

    pub(crate) fn upsert_cms_item(&mut self, cms: CmsItem) -> (u64, bool) {
        let scope = LangScope::Only(cms.lang);
        let existing = self
            .items
            .iter_mut()
            .find(|item| item.cms_id == Some(cms.cms_id) && item.lang == scope);

        if let Some(item) = existing {
            item.parent = cms.parent;
            item.name = cms.name;
            item.url = cms.url;
            item.order = cms.order;
            return (item.id, false);
        }

        let item = MenuItem {
            id: self.next_id(),
            parent: cms.parent,
            name: cms.name,
            url: cms.url,
            title: None,
            order: cms.order,
            lang: scope,
            category: None,
            cms_id: Some(cms.cms_id),
        };
        let id = item.id;
        self.items.push(item);
        (id, true)
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.translations.clear();
    }
}

/// [`MenuStore`] keeping every row in process memory.
///
/// # Example
///
/// ```
/// use elmenu_store::{MemoryMenuStore, MenuItem, MenuStore, MenuTranslation};
///
/// let store = MemoryMenuStore::new()
///     .with_item(MenuItem::new(1, "Home", "/"))
///     .with_translation(MenuTranslation::new(1, "de").with_name("Startseite"));
///
/// assert_eq!(store.translations("de", None).unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryMenuStore {
    data: RwLock<StoreData>,
}

impl MemoryMenuStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `data`.
    #[must_use]
    pub fn from_data(data: StoreData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Add an item, keeping its id.
    #[must_use]
    pub fn with_item(self, item: MenuItem) -> Self {
        self.write().items.push(item);
        self
    }

    /// Add a translation without checking that its item exists.
    #[must_use]
    pub fn with_translation(self, translation: MenuTranslation) -> Self {
        self.write().translations.push(translation);
        self
    }

    /// Copy of every row.
    #[must_use]
    pub fn snapshot(&self) -> StoreData {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MenuStore for MemoryMenuStore {
    fn items(&self, lang: &str, category: Option<Category>) -> Result<Vec<MenuItem>, StoreError> {
        Ok(self.read().items(lang, category))
    }

    fn translations(
        &self,
        lang: &str,
        category: Option<Category>,
    ) -> Result<Vec<TranslatedItem>, StoreError> {
        Ok(self.read().translations(lang, category))
    }

    fn item(&self, id: u64) -> Result<Option<MenuItem>, StoreError> {
        Ok(self.read().find_item(id).cloned())
    }

    fn save_item(&self, item: MenuItem) -> Result<MenuItem, StoreError> {
        Ok(self.write().save_item(item))
    }

    fn delete_item(&self, id: u64) -> Result<MenuItem, StoreError> {
        self.write()
            .delete_item(id)
            .map_err(|e| e.with_backend(BACKEND))
    }

    fn save_translation(&self, translation: MenuTranslation) -> Result<(), StoreError> {
        self.write()
            .save_translation(translation)
            .map_err(|e| e.with_backend(BACKEND))
    }

    fn delete_translation(
        &self,
        item: u64,
        language: &str,
    ) -> Result<MenuTranslation, StoreError> {
        self.write()
            .delete_translation(item, language)
            .map_err(|e| e.with_backend(BACKEND))
    }

    fn upsert_cms_item(&self, item: CmsItem) -> Result<(u64, bool), StoreError> {
        Ok(self.write().upsert_cms_item(item))
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.write().clear();
        Ok(())
    }
}
