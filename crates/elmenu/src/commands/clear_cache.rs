//! `elmenu clear-cache` command implementation.

use clap::Args;

use super::MenuArg;
use crate::context::AppContext;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the clear-cache command.
#[derive(Args)]
pub(crate) struct ClearCacheArgs {
    /// Only clear this language (default: all configured languages).
    #[arg(short, long)]
    lang: Option<String>,

    /// Only clear this menu (default: all menus).
    #[arg(long, value_enum)]
    category: Option<MenuArg>,
}

impl ClearCacheArgs {
    /// Execute the clear-cache command.
    ///
    /// # Errors
    ///
    /// Returns an error if the language is not configured.
    pub(crate) fn execute(self, context: &AppContext) -> Result<(), CliError> {
        let languages = match self.lang {
            Some(lang) => vec![context.language(Some(lang))?],
            None => context.config.site.languages.clone(),
        };
        let menus_to_clear = self.category.map_or(MenuArg::ALL.to_vec(), |menu| vec![menu]);

        let menus = context.menus();
        for lang in &languages {
            for menu in &menus_to_clear {
                menus.clear_cache(lang, menu.category());
            }
        }

        Output::new().success(&format!(
            "Cleared {} cached menus",
            languages.len() * menus_to_clear.len()
        ));
        Ok(())
    }
}
