//! Change notification for menu edits.
//!
//! Writes that go through [`MenuEditor`] are reported to every registered
//! [`MenuObserver`] after the store accepted them. Observers are called in
//! registration order and cannot veto a change.

use std::sync::Arc;

use elmenu_store::{MenuItem, MenuStore, MenuTranslation, StoreError};

/// Receiver of menu change events.
///
/// All methods default to doing nothing.
pub trait MenuObserver: Send + Sync {
    /// An item was created or updated. `previous` is the stored row it replaced.
    fn item_saved(&self, _item: &MenuItem, _previous: Option<&MenuItem>) {}

    /// An item and its translations were deleted.
    fn item_deleted(&self, _item: &MenuItem) {}

    /// A translation of `item` was created or replaced.
    fn translation_saved(&self, _item: &MenuItem, _translation: &MenuTranslation) {}

    /// A translation of `item` was deleted.
    fn translation_deleted(&self, _item: &MenuItem, _translation: &MenuTranslation) {}
}

/// Store front end for administrative edits.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use elmenu_cache::{Cache, MemoryCache};
/// use elmenu_store::{MemoryMenuStore, MenuItem, MenuStore};
/// use elmenu_tree::{MenuEditor, MenuObserver, Menus, MenusConfig};
///
/// let store: Arc<dyn MenuStore> = Arc::new(MemoryMenuStore::new());
/// let menus = Arc::new(Menus::new(
///     Arc::clone(&store),
///     MemoryCache::new().bucket("menus"),
///     MenusConfig::default(),
/// ));
/// let mut editor = MenuEditor::new(store);
/// editor.register(Arc::clone(&menus) as Arc<dyn MenuObserver>);
///
/// assert!(menus.render("en", None).is_empty());
/// editor.save_item(MenuItem::new(0, "Home", "/")).unwrap();
/// assert_eq!(menus.render("en", None).len(), 1);
/// ```
pub struct MenuEditor {
    store: Arc<dyn MenuStore>,
    observers: Vec<Arc<dyn MenuObserver>>,
}

impl MenuEditor {
    /// Create an editor with no observers.
    #[must_use]
    pub fn new(store: Arc<dyn MenuStore>) -> Self {
        Self {
            store,
            observers: Vec::new(),
        }
    }

    /// Add an observer notified of every successful write.
    pub fn register(&mut self, observer: Arc<dyn MenuObserver>) {
        self.observers.push(observer);
    }

    /// Create or update an item; an id of `0` allocates a new one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store rejects the write.
    pub fn save_item(&self, item: MenuItem) -> Result<MenuItem, StoreError> {
        let previous = if item.id == 0 {
            None
        } else {
            self.store.item(item.id)?
        };
        let saved = self.store.save_item(item)?;
        tracing::debug!(id = saved.id, name = %saved.name, "Saved menu item");
        for observer in &self.observers {
            observer.item_saved(&saved, previous.as_ref());
        }
        Ok(saved)
    }

    /// Delete an item together with its translations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the item does not exist or the store fails.
    pub fn delete_item(&self, id: u64) -> Result<MenuItem, StoreError> {
        let deleted = self.store.delete_item(id)?;
        tracing::debug!(id, name = %deleted.name, "Deleted menu item");
        for observer in &self.observers {
            observer.item_deleted(&deleted);
        }
        Ok(deleted)
    }

    /// Create or replace the translation of an item into one language.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the item does not exist or the store fails.
    pub fn save_translation(&self, translation: MenuTranslation) -> Result<(), StoreError> {
        let item = self.owner(translation.item)?;
        self.store.save_translation(translation.clone())?;
        for observer in &self.observers {
            observer.translation_saved(&item, &translation);
        }
        Ok(())
    }

    /// Delete the translation of `item` into `language`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the translation does not exist or the store fails.
    pub fn delete_translation(&self, item: u64, language: &str) -> Result<(), StoreError> {
        let owner = self.owner(item)?;
        let deleted = self.store.delete_translation(item, language)?;
        for observer in &self.observers {
            observer.translation_deleted(&owner, &deleted);
        }
        Ok(())
    }

    fn owner(&self, id: u64) -> Result<MenuItem, StoreError> {
        self.store
            .item(id)?
            .ok_or_else(|| StoreError::not_found(format!("item {id}")))
    }
}
