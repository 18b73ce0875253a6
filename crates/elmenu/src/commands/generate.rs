//! `elmenu generate` command implementation.

use std::path::PathBuf;

use clap::Args;
use elmenu_tree::{Generator, JsonNavigationSource};

use super::MenuArg;
use crate::context::AppContext;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the generate command.
#[derive(Args)]
pub(crate) struct GenerateArgs {
    /// Navigation tree JSON file, keyed by language.
    #[arg(short, long)]
    source: PathBuf,
}

impl GenerateArgs {
    /// Execute the generate command.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or the store rejects a write.
    pub(crate) fn execute(self, context: &AppContext) -> Result<(), CliError> {
        let output = Output::new();
        let source = JsonNavigationSource::open(&self.source)?;
        let site = &context.config.site;

        output.info(&format!(
            "Generating menus for {} from {}",
            site.languages.join(", "),
            self.source.display()
        ));

        let report = Generator::new(context.store(), &source, site.default_language.as_str())
            .run(&site.languages)?;

        let menus = context.menus();
        for menu in MenuArg::ALL {
            menus.clear_category(menu.category());
        }

        output.success(&format!(
            "Generated menus: {} created, {} updated, {} skipped",
            report.created, report.updated, report.skipped
        ));
        Ok(())
    }
}
