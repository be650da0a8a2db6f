//! The `tags` command.
//!
//! Previews what a form would pack into `contact[tags]` when submitted from
//! a given page.

use async_trait::async_trait;
use quadratum_core::{FormsError, Settings};
use quadratum_forms::attribution::{capture_attribution, pack_tags, PageContext};
use quadratum_forms::{FormDefinition, FormModel};

use super::{definition_arg, load_definition};
use crate::command::ManagementCommand;

/// Prints the packed attribution tags for a page URL.
pub struct TagsCommand;

/// Runs attribution capture and tag packing for `definition` on `ctx`.
///
/// Fails when the form has no tags input or has packing turned off.
pub fn preview_tags(
    definition: &FormDefinition,
    ctx: &PageContext,
    settings: &Settings,
) -> Result<String, FormsError> {
    let mut model = FormModel::from_definition(definition);
    capture_attribution(&mut model, ctx);
    pack_tags(&mut model, ctx, settings.tag_max_len).ok_or_else(|| {
        FormsError::ConfigurationError(format!(
            "form '{}' has no contact[tags] input or tag packing is disabled",
            definition.id
        ))
    })
}

#[async_trait]
impl ManagementCommand for TagsCommand {
    fn name(&self) -> &'static str {
        "tags"
    }

    fn about(&self) -> &'static str {
        "Print the contact[tags] value a form would submit from a page"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(definition_arg())
            .arg(
                clap::Arg::new("url")
                    .long("url")
                    .required(true)
                    .value_name("URL")
                    .help("Page URL, including any utm_* parameters"),
            )
            .arg(
                clap::Arg::new("referrer")
                    .long("referrer")
                    .value_name("URL")
                    .help("Referring page"),
            )
            .arg(
                clap::Arg::new("product")
                    .long("product")
                    .value_name("ID")
                    .help("Product id, on product pages"),
            )
            .arg(
                clap::Arg::new("variant")
                    .long("variant")
                    .value_name("ID")
                    .requires("product")
                    .help("Selected variant id"),
            )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), FormsError> {
        let definition = load_definition(matches)?;
        let url = matches
            .get_one::<String>("url")
            .ok_or_else(|| FormsError::ConfigurationError("--url is required".to_string()))?;
        url::Url::parse(url)
            .map_err(|e| FormsError::ConfigurationError(format!("invalid page URL '{url}': {e}")))?;

        let mut ctx = PageContext::from_url(url.as_str());
        if let Some(referrer) = matches.get_one::<String>("referrer") {
            ctx = ctx.with_referrer(referrer.as_str());
        }
        if let Some(product) = matches.get_one::<String>("product") {
            ctx = ctx.with_product(product.as_str(), matches.get_one::<String>("variant").cloned());
        }

        let tags = preview_tags(&definition, &ctx, settings)?;
        tracing::debug!(form = %definition.id, "tags packed");
        println!("{tags}");
        Ok(())
    }
}
