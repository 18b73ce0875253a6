//! Menu tree assembly, caching and bootstrap generation.
//!
//! This crate turns flat menu rows from an [`elmenu_store::MenuStore`] into
//! nested menus:
//!
//! - [`build_menu`]: pure assembly of items and translations into a forest
//! - [`Menus`]: per-language, per-category memoization in an
//!   [`elmenu_cache::CacheBucket`]
//! - [`MenuEditor`] / [`MenuObserver`]: edits that invalidate cached menus
//! - [`Generator`]: one-time import from an upstream navigation tree
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use elmenu_cache::{Cache, NullCache};
//! use elmenu_store::{MemoryMenuStore, MenuItem, MenuTranslation};
//! use elmenu_tree::{Menus, MenusConfig};
//!
//! let store = MemoryMenuStore::new()
//!     .with_item(MenuItem::new(1, "About", "/about/"))
//!     .with_item(MenuItem::new(2, "Team", "/about/team/").with_parent(1))
//!     .with_translation(MenuTranslation::new(2, "de").with_name("Mannschaft"));
//! let menus = Menus::new(Arc::new(store), NullCache.bucket("menus"), MenusConfig::default());
//!
//! let menu = menus.render("de", None);
//! assert_eq!(menu[0].name, "About");
//! assert_eq!(menu[0].submenu[0].name, "Mannschaft");
//! ```

mod builder;
mod generate;
mod menus;
mod observer;

pub use builder::{MenuNode, build_menu};
pub use generate::{
    GenerateError, GenerateReport, Generator, JsonNavigationSource, MalformedNode,
    NavigationSource, UpstreamNode,
};
pub use menus::{DEFAULT_CACHE_DURATION, MenuLink, Menus, MenusConfig};
pub use observer::{MenuEditor, MenuObserver};
