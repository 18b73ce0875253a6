//! YAML file store implementation.
//!
//! [`FileMenuStore`] loads every row from a single YAML document when opened
//! and rewrites the document after each write:
//!
//! ```yaml
//! items:
//!   - id: 1
//!     name: About
//!     url: /about/
//!   - id: 2
//!     parent: 1
//!     name: Team
//!     url: /about/team/
//!     lang: en
//! translations:
//!   - item: 1
//!     language: de
//!     name: Über uns
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard};

use crate::model::{Category, CmsItem, MenuItem, MenuTranslation, StoreData, TranslatedItem};
use crate::store::{MenuStore, StoreError, StoreErrorKind};

const BACKEND: &str = "File";

/// [`MenuStore`] persisted as a YAML document.
#[derive(Debug)]
pub struct FileMenuStore {
    path: PathBuf,
    data: RwLock<StoreData>,
    /// Serializes write-then-persist sequences.
    write_lock: Mutex<()>,
}

impl FileMenuStore {
    /// Open the store at `path`.
    ///
    /// A missing file opens as an empty store; the file is created on the
    /// first write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = load(&path)?;
        tracing::debug!(
            path = %path.display(),
            items = data.items.len(),
            translations = data.translations.len(),
            "Opened menu store"
        );
        Ok(Self {
            path,
            data: RwLock::new(data),
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the YAML document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `op` to the rows and persist the result.
    ///
    /// Rows are only replaced once the document has been written.
    fn update<T>(
        &self,
        op: impl FnOnce(&mut StoreData) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = self.read().clone();
        let result = op(&mut next).map_err(|e| e.with_backend(BACKEND))?;
        self.persist(&next)?;

        *self.data.write().unwrap_or_else(PoisonError::into_inner) = next;
        Ok(result)
    }

    fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        let yaml = serde_yaml::to_string(data).map_err(|e| {
            StoreError::new(StoreErrorKind::InvalidData)
                .with_path(&self.path)
                .with_backend(BACKEND)
                .with_source(e)
        })?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::io(e, parent).with_backend(BACKEND))?;
        }

        // Write to a sibling file first so readers never see a torn document
        let tmp = self.path.with_extension("yaml.tmp");
        fs::write(&tmp, yaml).map_err(|e| StoreError::io(e, &tmp).with_backend(BACKEND))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| StoreError::io(e, &self.path).with_backend(BACKEND))
    }
}

fn load(path: &Path) -> Result<StoreData, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StoreData::default()),
        Err(e) => return Err(StoreError::io(e, path).with_backend(BACKEND)),
    };

    if content.trim().is_empty() {
        return Ok(StoreData::default());
    }

    serde_yaml::from_str(&content).map_err(|e| {
        StoreError::new(StoreErrorKind::InvalidData)
            .with_path(path)
            .with_backend(BACKEND)
            .with_source(e)
    })
}

impl MenuStore for FileMenuStore {
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
        self.update(|data| Ok(data.save_item(item)))
    }

    fn delete_item(&self, id: u64) -> Result<MenuItem, StoreError> {
        self.update(|data| data.delete_item(id))
    }

    fn save_translation(&self, translation: MenuTranslation) -> Result<(), StoreError> {
        self.update(|data| data.save_translation(translation))
    }

    fn delete_translation(
        &self,
        item: u64,
        language: &str,
    ) -> Result<MenuTranslation, StoreError> {
        self.update(|data| data.delete_translation(item, language))
    }

    fn upsert_cms_item(&self, item: CmsItem) -> Result<(u64, bool), StoreError> {
        self.update(|data| Ok(data.upsert_cms_item(item)))
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.update(|data| {
            data.clear();
            Ok(())
        })
    }
}
