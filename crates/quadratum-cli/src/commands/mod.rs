//! Built-in management commands.
//!
//! Each command implements [`ManagementCommand`](crate::command::ManagementCommand)
//! and exposes a plain function with the same behavior for library callers.

pub mod check;
pub mod tags;
pub mod validate;

pub use check::CheckCommand;
pub use tags::TagsCommand;
pub use validate::ValidateCommand;

use std::path::Path;

use quadratum_core::FormsError;
use quadratum_forms::FormDefinition;

use crate::command::CommandRegistry;

/// Registers all built-in management commands into the given registry.
pub fn register_builtin_commands(registry: &mut CommandRegistry) {
    registry.register(Box::new(CheckCommand));
    registry.register(Box::new(ValidateCommand));
    registry.register(Box::new(TagsCommand));
}

/// Adds the positional `definition` argument shared by every command.
pub(crate) fn definition_arg() -> clap::Arg {
    clap::Arg::new("definition")
        .required(true)
        .value_name("DEFINITION")
        .help("Form definition file (TOML or JSON by extension)")
}

/// Loads the definition named by the `definition` argument.
pub(crate) fn load_definition(matches: &clap::ArgMatches) -> Result<FormDefinition, FormsError> {
    let path = matches
        .get_one::<String>("definition")
        .ok_or_else(|| FormsError::ConfigurationError("No definition file given".to_string()))?;
    tracing::debug!(path = %path, "loading form definition");
    FormDefinition::from_path(Path::new(path))
}
