//! Bootstrap menus from an upstream navigation tree.
//!
//! Generation is a one-time import: it deletes every stored item and then
//! mirrors the visible part of the upstream tree for each language. Menus are
//! edited by hand afterwards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use elmenu_store::{CmsItem, MenuStore, StoreError};

/// Error raised while generating menus.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// Navigation source file could not be read.
    #[error("failed to read navigation source {path}: {source}")]
    Io {
        /// Source file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Navigation source is not a JSON object of per-language node lists.
    #[error("invalid navigation source {path}: {source}")]
    Parse {
        /// Source file path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
    /// Store rejected a write.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Node of an upstream navigation tree.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct UpstreamNode {
    /// Upstream content id.
    pub id: u64,
    /// Upstream id of the parent, `None` for top-level nodes.
    #[serde(default)]
    pub parent_id: Option<u64>,
    /// Page title.
    pub title: String,
    /// Page path without language prefix.
    pub url: String,
    /// Explicit link target replacing the page path.
    #[serde(default)]
    pub redirect_url: Option<String>,
    /// Whether the node appears in navigation.
    #[serde(default = "visible_default")]
    pub visible: bool,
}

fn visible_default() -> bool {
    true
}

/// Upstream entry that could not be read as an [`UpstreamNode`].
#[derive(Debug, thiserror::Error)]
#[error("malformed navigation node: {reason}")]
pub struct MalformedNode {
    /// Why the entry was rejected.
    pub reason: String,
}

/// Provider of upstream navigation nodes.
pub trait NavigationSource {
    /// Nodes for `lang` in upstream order, parents before their children.
    ///
    /// Entries that cannot be interpreted are returned as [`MalformedNode`]
    /// in their position so the generator can skip them.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] if the upstream tree cannot be loaded.
    fn nodes(&self, lang: &str)
    -> Result<Vec<Result<UpstreamNode, MalformedNode>>, GenerateError>;
}

/// [`NavigationSource`] read from a JSON document keyed by language:
///
/// ```json
/// {
///   "en": [
///     {"id": 1, "title": "About", "url": "/about/"},
///     {"id": 2, "parent_id": 1, "title": "Team", "url": "/about/team/"}
///   ]
/// }
/// ```
///
/// Each node is decoded on its own, so one malformed entry does not hide the
/// rest of the document.
#[derive(Debug, Default)]
pub struct JsonNavigationSource {
    languages: HashMap<String, Vec<serde_json::Value>>,
}

impl JsonNavigationSource {
    /// Load a navigation document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Io`] or [`GenerateError::Parse`].
    pub fn open(path: &Path) -> Result<Self, GenerateError> {
        let content = std::fs::read_to_string(path).map_err(|e| GenerateError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let languages = serde_json::from_str(&content).map_err(|e| GenerateError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self { languages })
    }
}

impl NavigationSource for JsonNavigationSource {
    fn nodes(
        &self,
        lang: &str,
    ) -> Result<Vec<Result<UpstreamNode, MalformedNode>>, GenerateError> {
        let Some(values) = self.languages.get(lang) else {
            return Ok(Vec::new());
        };
        Ok(values
            .iter()
            .map(|value| {
                UpstreamNode::deserialize(value).map_err(|e| MalformedNode {
                    reason: e.to_string(),
                })
            })
            .collect())
    }
}

/// Counters for one generation run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerateReport {
    /// Items created.
    pub created: usize,
    /// Items updated in place.
    pub updated: usize,
    /// Malformed nodes, and visible nodes whose parent was not placed.
    pub skipped: usize,
}

/// Mirrors an upstream navigation tree into a [`MenuStore`].
pub struct Generator<'a> {
    store: Arc<dyn MenuStore>,
    source: &'a dyn NavigationSource,
    default_language: String,
}

impl<'a> Generator<'a> {
    /// Create a generator.
    ///
    /// URLs of `default_language` pages are used as-is; other languages get a
    /// `/<lang>` prefix.
    #[must_use]
    pub fn new(
        store: Arc<dyn MenuStore>,
        source: &'a dyn NavigationSource,
        default_language: impl Into<String>,
    ) -> Self {
        Self {
            store,
            source,
            default_language: default_language.into(),
        }
    }

    /// Replace all stored items with menus generated for `languages`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] if the source cannot be read or the store
    /// rejects a write. Items written before the failure are kept.
    pub fn run(&self, languages: &[String]) -> Result<GenerateReport, GenerateError> {
        self.store.clear()?;

        let mut report = GenerateReport::default();
        for lang in languages {
            tracing::info!(lang = %lang, "Building menu");
            self.build_language(lang, &mut report)?;
        }

        tracing::info!(
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            "Menu generation finished"
        );
        Ok(report)
    }

    fn build_language(&self, lang: &str, report: &mut GenerateReport) -> Result<(), GenerateError> {
        // Upstream parent id -> stored item id
        let mut placed: HashMap<Option<u64>, Option<u64>> = HashMap::from([(None, None)]);

        for (position, node) in self.source.nodes(lang)?.into_iter().enumerate() {
            let node = match node {
                Ok(node) => node,
                Err(e) => {
                    tracing::warn!(
                        lang = %lang,
                        index = position,
                        error = %e,
                        "Skipping malformed navigation node"
                    );
                    report.skipped += 1;
                    continue;
                }
            };
            if !node.visible {
                continue;
            }
            let Some(&parent) = placed.get(&node.parent_id) else {
                tracing::warn!(
                    lang = %lang,
                    title = %node.title,
                    "Ignoring menu item without placed parent"
                );
                report.skipped += 1;
                continue;
            };

            let url = self.link(lang, &node);
            let (id, created) = self.store.upsert_cms_item(CmsItem {
                cms_id: node.id,
                lang: lang.to_owned(),
                parent,
                name: node.title.clone(),
                url,
                order: i32::try_from(position).unwrap_or(i32::MAX),
            })?;
            placed.insert(Some(node.id), Some(id));

            if created {
                tracing::debug!(lang = %lang, title = %node.title, "Created menu item");
                report.created += 1;
            } else {
                tracing::debug!(lang = %lang, title = %node.title, "Updated menu item");
                report.updated += 1;
            }
        }
        Ok(())
    }

    fn link(&self, lang: &str, node: &UpstreamNode) -> String {
        if let Some(redirect) = node.redirect_url.as_deref()
            && !redirect.is_empty()
        {
            return redirect.to_owned();
        }
        if lang.is_empty() || lang == self.default_language {
            node.url.clone()
        } else {
            format!("/{lang}{}", node.url)
        }
    }
}
