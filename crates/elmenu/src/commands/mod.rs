//! CLI command implementations.

mod clear_cache;
mod generate;
mod render;

use clap::ValueEnum;
use elmenu_store::Category;

pub(crate) use clear_cache::ClearCacheArgs;
pub(crate) use generate::GenerateArgs;
pub(crate) use render::RenderArgs;

/// Menu selector on the command line; `menu` is the main menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum MenuArg {
    Menu,
    Foot,
    Tab,
    Hidden,
}

impl MenuArg {
    const ALL: [Self; 4] = [Self::Menu, Self::Foot, Self::Tab, Self::Hidden];

    fn category(self) -> Option<Category> {
        match self {
            Self::Menu => None,
            Self::Foot => Some(Category::Foot),
            Self::Tab => Some(Category::Tab),
            Self::Hidden => Some(Category::Hidden),
        }
    }
}
