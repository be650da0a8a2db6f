//! The `check` command.
//!
//! Runs the definition checks from [`quadratum_forms::checks`] and fails when
//! any of them reports an error.

use async_trait::async_trait;
use quadratum_core::{FormsError, Settings};
use quadratum_forms::checks::{CheckLevel, CheckMessage, CheckRegistry};
use quadratum_forms::FormDefinition;

use super::{definition_arg, load_definition};
use crate::command::ManagementCommand;

/// Runs the definition checks.
pub struct CheckCommand;

/// Runs the built-in checks over `definition`, optionally filtered by tag.
pub fn run_checks(definition: &FormDefinition, tags: Option<&[&str]>) -> Vec<CheckMessage> {
    CheckRegistry::with_builtins().run_checks(tags, definition)
}

#[async_trait]
impl ManagementCommand for CheckCommand {
    fn name(&self) -> &'static str {
        "check"
    }

    fn about(&self) -> &'static str {
        "Run checks over a form definition"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(definition_arg()).arg(
            clap::Arg::new("tag")
                .long("tag")
                .short('t')
                .action(clap::ArgAction::Append)
                .help("Only run checks with this tag"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        _settings: &Settings,
    ) -> Result<(), FormsError> {
        let definition = load_definition(matches)?;
        let tags: Option<Vec<&str>> = matches
            .get_many::<String>("tag")
            .map(|values| values.map(String::as_str).collect());
        let messages = run_checks(&definition, tags.as_deref());

        if messages.is_empty() {
            println!("Form '{}': check identified no issues.", definition.id);
            return Ok(());
        }

        let errors = messages.iter().filter(|m| m.is_error()).count();
        let warnings = messages
            .iter()
            .filter(|m| m.level == CheckLevel::Warning)
            .count();

        for msg in &messages {
            println!("{msg}");
            if msg.is_error() {
                tracing::error!(id = msg.id, "{}", msg.msg);
            } else {
                tracing::warn!(id = msg.id, "{}", msg.msg);
            }
        }

        println!(
            "Form '{}': check identified {} issue(s) ({} error(s), {} warning(s)).",
            definition.id,
            messages.len(),
            errors,
            warnings
        );

        if errors > 0 {
            return Err(FormsError::ImproperlyConfigured(format!(
                "form '{}' has {errors} check error(s)",
                definition.id
            )));
        }

        Ok(())
    }
}
