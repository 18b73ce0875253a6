//! Menu record store abstraction for elmenu.
//!
//! This crate provides a [`MenuStore`] trait for the relational side of the
//! menu system: bulk, filtered reads of [`MenuItem`] and [`MenuTranslation`]
//! rows plus the handful of writes that administrative edits and the
//! bootstrap generator need. This enables:
//!
//! - **Unit testing** of the tree builder without touching disk
//! - **Backend flexibility** (YAML file today, a database tomorrow)
//! - **Clean separation** between menu assembly and record I/O
//!
//! # Architecture
//!
//! - [`MenuStore`] trait with read queries and write operations
//! - [`MemoryMenuStore`] keeping every row in process memory
//! - [`FileMenuStore`] persisting the same rows as a YAML document
//!
//! # Example
//!
//! ```
//! use elmenu_store::{LangScope, MemoryMenuStore, MenuItem, MenuStore};
//!
//! let store = MemoryMenuStore::new();
//! store.save_item(MenuItem::new(0, "Home", "/")).unwrap();
//! let items = store.items("en", None).unwrap();
//! assert_eq!(items[0].name, "Home");
//! assert_eq!(items[0].lang, LangScope::All);
//! ```

mod file;
mod memory;
mod model;
mod store;

pub use file::FileMenuStore;
pub use memory::MemoryMenuStore;
pub use model::{
    Category, CmsItem, LangScope, MenuItem, MenuTranslation, ParseCategoryError, StoreData,
    TranslatedItem, category_name,
};
pub use store::{MenuStore, StoreError, StoreErrorKind};
