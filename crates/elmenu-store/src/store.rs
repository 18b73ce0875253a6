//! Store trait and error types.
//!
//! Provides the core [`MenuStore`] trait for reading and writing menu rows,
//! along with [`StoreError`] for unified error handling across backends.

use std::path::PathBuf;

use crate::model::{Category, CmsItem, MenuItem, MenuTranslation, TranslatedItem};

/// Semantic error categories.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreErrorKind {
    /// Record does not exist.
    NotFound,
    /// Backing data could not be decoded.
    InvalidData,
    /// Backend is temporarily unavailable.
    Unavailable,
    /// Other/unknown error category.
    Other,
}

/// Store error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct StoreError {
    /// Semantic error category.
    pub kind: StoreErrorKind,
    /// What was being accessed (e.g., "item 7").
    pub subject: Option<String>,
    /// File path context (if applicable).
    pub path: Option<PathBuf>,
    /// Backend identifier (e.g., "File", "Memory").
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    /// Create a new store error.
    #[must_use]
    pub fn new(kind: StoreErrorKind) -> Self {
        Self {
            kind,
            subject: None,
            path: None,
            backend: None,
            source: None,
        }
    }

    /// Attach a description of the record being accessed.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Attach path context.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Create a not found error for a record.
    #[must_use]
    pub fn not_found(subject: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::NotFound).with_subject(subject)
    }

    /// Create a store error from an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => StoreErrorKind::NotFound,
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                StoreErrorKind::Unavailable
            }
            _ => StoreErrorKind::Other,
        };
        Self::new(kind).with_path(path).with_source(err)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: subject: source (path: /foo/bar)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            StoreErrorKind::NotFound => "Not found",
            StoreErrorKind::InvalidData => "Invalid data",
            StoreErrorKind::Unavailable => "Unavailable",
            StoreErrorKind::Other => "Error",
        };
        write!(f, "{kind_str}")?;

        if let Some(subject) = &self.subject {
            write!(f, ": {subject}")?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }

        Ok(())
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Record store for menu items and their translations.
///
/// Read queries return rows in a stable order so that anything derived from
/// them (the rendered tree in particular) is deterministic.
pub trait MenuStore: Send + Sync {
    /// Items shown for `lang` in `category`.
    ///
    /// Includes items scoped to `lang` and items scoped to all languages,
    /// ordered by their `order` field. Ties keep store order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be read.
    fn items(&self, lang: &str, category: Option<Category>) -> Result<Vec<MenuItem>, StoreError>;

    /// Translations into `lang` whose owning item is in `category`.
    ///
    /// Each row is joined with its owning item. Owning items are not filtered
    /// by language scope. Rows are ordered by the owning item's `order`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be read.
    fn translations(
        &self,
        lang: &str,
        category: Option<Category>,
    ) -> Result<Vec<TranslatedItem>, StoreError>;

    /// Look up a single item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be read.
    fn item(&self, id: u64) -> Result<Option<MenuItem>, StoreError>;

    /// Insert or replace an item by id. An id of `0` allocates a fresh id.
    ///
    /// Returns the stored item with its final id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be written.
    fn save_item(&self, item: MenuItem) -> Result<MenuItem, StoreError>;

    /// Delete an item and its translations, returning the removed item.
    ///
    /// Children keep their parent id and become orphans.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` [`StoreError`] if no item has this id.
    fn delete_item(&self, id: u64) -> Result<MenuItem, StoreError>;

    /// Insert or replace the translation for its `(item, language)` pair.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` [`StoreError`] if the owning item does not exist.
    fn save_translation(&self, translation: MenuTranslation) -> Result<(), StoreError>;

    /// Delete the translation for an `(item, language)` pair.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` [`StoreError`] if no such translation exists.
    fn delete_translation(&self, item: u64, language: &str)
    -> Result<MenuTranslation, StoreError>;

    /// Create or update the generated item keyed by `(cms_id, lang)`.
    ///
    /// Returns the item id and whether it was newly created.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be written.
    fn upsert_cms_item(&self, item: CmsItem) -> Result<(u64, bool), StoreError>;

    /// Remove every item and translation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be written.
    fn clear(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::path::Path;

    use super::*;

    #[test]
    fn test_store_error_new() {
        let err = StoreError::new(StoreErrorKind::NotFound);

        assert_eq!(err.kind, StoreErrorKind::NotFound);
        assert!(err.subject.is_none());
        assert!(err.path.is_none());
        assert!(err.backend.is_none());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_store_error_display_full() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = StoreError::io(io, "/data/menu.yaml").with_backend("File");

        assert_eq!(err.kind, StoreErrorKind::Other);
        assert_eq!(err.path.as_deref(), Some(Path::new("/data/menu.yaml")));
        assert_eq!(
            err.to_string(),
            "[File] Error: denied (path: /data/menu.yaml)"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_store_error_not_found_display() {
        let err = StoreError::not_found("item 7").with_backend("Memory");
        assert_eq!(err.to_string(), "[Memory] Not found: item 7");
    }

    #[test]
    fn test_store_error_io_not_found_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = StoreError::io(io, "menu.yaml");
        assert_eq!(err.kind, StoreErrorKind::NotFound);
    }
}
