//! Menu records as stored by a [`MenuStore`](crate::MenuStore).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Placement region of a menu. Items without a category form the main menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Footer links.
    Foot,
    /// Tab strip.
    Tab,
    /// Reachable by URL but not shown.
    Hidden,
}

impl Category {
    /// Slug used in records and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Foot => "foot",
            Self::Tab => "tab",
            Self::Hidden => "hidden",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown category slug.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown menu category '{0}' (expected foot, tab or hidden)")]
pub struct ParseCategoryError(String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "foot" => Ok(Self::Foot),
            "tab" => Ok(Self::Tab),
            "hidden" => Ok(Self::Hidden),
            other => Err(ParseCategoryError(other.to_owned())),
        }
    }
}

/// Name of a category as used in cache keys; the main menu is `"menu"`.
#[must_use]
pub fn category_name(category: Option<Category>) -> &'static str {
    category.map_or("menu", Category::as_str)
}

/// Language availability of a menu item.
///
/// Serialized as the language code, or `"all"` for [`LangScope::All`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LangScope {
    /// Shown for every language.
    #[default]
    All,
    /// Shown only for one language code.
    Only(String),
}

impl LangScope {
    const ALL: &'static str = "all";

    /// Whether an item with this scope belongs in the menu for `lang`.
    #[must_use]
    pub fn matches(&self, lang: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(code) => code == lang,
        }
    }
}

impl From<String> for LangScope {
    fn from(value: String) -> Self {
        if value == Self::ALL {
            Self::All
        } else {
            Self::Only(value)
        }
    }
}

impl From<LangScope> for String {
    fn from(value: LangScope) -> Self {
        match value {
            LangScope::All => LangScope::ALL.to_owned(),
            LangScope::Only(code) => code,
        }
    }
}

/// A navigable menu entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Unique identifier.
    pub id: u64,
    /// Parent item, `None` for top-level entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
    /// Display name.
    pub name: String,
    /// Target URL. Local paths are allowed, not only absolute URLs.
    pub url: String,
    /// Hover title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Sort key within the menu.
    #[serde(default)]
    pub order: i32,
    /// Languages the item is shown for. Not a translation mechanism.
    #[serde(default)]
    pub lang: LangScope,
    /// Placement region, `None` for the main menu.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Upstream content id linking the same page across languages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cms_id: Option<u64>,
}

impl MenuItem {
    /// Create a top-level main-menu item shown for all languages.
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            parent: None,
            name: name.into(),
            url: url.into(),
            title: None,
            order: 0,
            lang: LangScope::All,
            category: None,
            cms_id: None,
        }
    }

    /// Set the parent item.
    #[must_use]
    pub fn with_parent(mut self, parent: u64) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set the hover title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the sort key.
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Restrict the item to one language.
    #[must_use]
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = LangScope::Only(lang.into());
        self
    }

    /// Place the item in a category.
    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
}

/// Per-language override of a menu item's display fields.
///
/// At most one translation exists per `(item, language)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuTranslation {
    /// Owning item id.
    pub item: u64,
    /// Language code.
    pub language: String,
    /// Replacement URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Replacement display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Replacement hover title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl MenuTranslation {
    /// Create a translation that overrides nothing yet.
    #[must_use]
    pub fn new(item: u64, language: impl Into<String>) -> Self {
        Self {
            item,
            language: language.into(),
            url: None,
            name: None,
            title: None,
        }
    }

    /// Override the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Override the URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Override the hover title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A translation joined with its owning item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslatedItem {
    /// The owning item, regardless of its language scope.
    pub item: MenuItem,
    /// The translation row.
    pub translation: MenuTranslation,
}

/// Item written by the bootstrap generator, keyed by `(cms_id, lang)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CmsItem {
    /// Upstream content id.
    pub cms_id: u64,
    /// Language the item is generated for.
    pub lang: String,
    /// Parent item id in this store.
    pub parent: Option<u64>,
    /// Display name.
    pub name: String,
    /// Target URL.
    pub url: String,
    /// Position in the upstream tree.
    pub order: i32,
}

/// Every row held by a store, in store order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreData {
    /// Menu items.
    #[serde(default)]
    pub items: Vec<MenuItem>,
    /// Menu translations.
    #[serde(default)]
    pub translations: Vec<MenuTranslation>,
}
