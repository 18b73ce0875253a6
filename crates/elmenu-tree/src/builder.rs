//! Tree assembly from flat menu rows.
//!
//! [`build_menu`] is a pure function: it takes the rows a [`MenuStore`]
//! returned for one language and category and nests them into a forest.
//!
//! [`MenuStore`]: elmenu_store::MenuStore

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use elmenu_store::{MenuItem, MenuTranslation, TranslatedItem};

/// Rendered menu entry with its nested children.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuNode {
    /// Item id.
    pub id: u64,
    /// Parent item id, `None` for top-level entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
    /// Display name.
    pub name: String,
    /// Link target.
    pub url: String,
    /// Hover title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Child entries in source order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submenu: Vec<MenuNode>,
}

impl MenuNode {
    /// Replace display fields with the ones the translation provides.
    ///
    /// Empty strings count as absent.
    fn overlay(&mut self, translation: &MenuTranslation) {
        if let Some(name) = present(translation.name.as_deref()) {
            name.clone_into(&mut self.name);
        }
        if let Some(url) = present(translation.url.as_deref()) {
            url.clone_into(&mut self.url);
        }
        if let Some(title) = present(translation.title.as_deref()) {
            self.title = Some(title.to_owned());
        }
    }
}

fn child_ids(children: &HashMap<Option<u64>, Vec<u64>>, parent: Option<u64>) -> &[u64] {
    children.get(&parent).map_or(&[], Vec::as_slice)
}

impl Drop for MenuNode {
    // Flatten before dropping so deep trees do not recurse
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.submenu);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.submenu);
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl From<MenuItem> for MenuNode {
    fn from(item: MenuItem) -> Self {
        Self {
            id: item.id,
            parent: item.parent,
            name: item.name,
            url: item.url,
            title: item.title,
            submenu: Vec::new(),
        }
    }
}

/// Nest menu rows into an ordered forest.
///
/// `items` are the base rows in display order; `translations` overlay their
/// display fields. A translation whose item is missing from `items` adds a
/// node built from its owning item, appended after the base rows.
///
/// Siblings keep the order in which their rows were seen. Nodes whose parent
/// is not part of the input are dropped together with their descendants, and
/// so are nodes caught in a parent cycle.
///
/// # Example
///
/// ```
/// use elmenu_store::MenuItem;
/// use elmenu_tree::build_menu;
///
/// let items = vec![
///     MenuItem::new(1, "About", "/about/"),
///     MenuItem::new(2, "Team", "/about/team/").with_parent(1),
/// ];
/// let menu = build_menu(items, Vec::new());
///
/// assert_eq!(menu.len(), 1);
/// assert_eq!(menu[0].submenu[0].name, "Team");
/// ```
#[must_use]
pub fn build_menu(items: Vec<MenuItem>, translations: Vec<TranslatedItem>) -> Vec<MenuNode> {
    let mut nodes: IndexMap<u64, MenuNode> = items
        .into_iter()
        .map(|item| (item.id, MenuNode::from(item)))
        .collect();

    for TranslatedItem { item, translation } in translations {
        let node = nodes.entry(item.id).or_insert_with(|| {
            tracing::debug!(
                id = item.id,
                language = %translation.language,
                "Translation adds menu node missing from base items"
            );
            MenuNode::from(item)
        });
        node.overlay(&translation);
    }

    let mut children: HashMap<Option<u64>, Vec<u64>> = HashMap::new();
    for node in nodes.values() {
        children.entry(node.parent).or_default().push(node.id);
    }

    assemble(nodes, &children)
}

/// Move every node reachable from the root into its parent's submenu.
///
/// Runs without recursion so chain depth is bounded only by memory.
fn assemble(
    mut nodes: IndexMap<u64, MenuNode>,
    children: &HashMap<Option<u64>, Vec<u64>>,
) -> Vec<MenuNode> {
    // Pre-order walk from the root; every id has one parent, so each is seen once
    let mut reachable = Vec::with_capacity(nodes.len());
    let mut pending: Vec<u64> = child_ids(children, None).to_vec();
    while let Some(id) = pending.pop() {
        reachable.push(id);
        pending.extend_from_slice(child_ids(children, Some(id)));
    }

    // Children are finished before their parent in reverse pre-order
    let mut finished: HashMap<u64, MenuNode> = HashMap::with_capacity(reachable.len());
    for id in reachable.into_iter().rev() {
        let Some(mut node) = nodes.swap_remove(&id) else {
            continue;
        };
        node.submenu = child_ids(children, Some(id))
            .iter()
            .filter_map(|child| finished.remove(child))
            .collect();
        finished.insert(id, node);
    }

    child_ids(children, None)
        .iter()
        .filter_map(|id| finished.remove(id))
        .collect()
}
