//! `elmenu render` command implementation.

use clap::Args;

use super::MenuArg;
use crate::context::AppContext;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Language code (default: site.default_language).
    #[arg(short, long)]
    lang: Option<String>,

    /// Menu to render.
    #[arg(long, value_enum, default_value_t = MenuArg::Menu)]
    category: MenuArg,

    /// Print a flat list of links instead of the tree.
    #[arg(long)]
    links: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if the language is not configured or output fails.
    pub(crate) fn execute(self, context: &AppContext) -> Result<(), CliError> {
        let lang = context.language(self.lang)?;
        let category = self.category.category();
        let menus = context.menus();

        let json = if self.links {
            serde_json::to_string_pretty(&menus.links(&lang, category))?
        } else {
            serde_json::to_string_pretty(&menus.render(&lang, category))?
        };

        Output::new().data(&json)?;
        Ok(())
    }
}
