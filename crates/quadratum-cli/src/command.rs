//! Command dispatch for the `quadratum` binary.
//!
//! Each command is a [`ManagementCommand`] with a static name. The
//! [`CommandRegistry`] keeps them in registration order, builds the clap
//! application (with the global `--settings` option) and routes a parsed
//! subcommand to its handler.

use async_trait::async_trait;
use quadratum_core::{settings_loader, FormsError, Settings};

/// A subcommand of the `quadratum` binary.
#[async_trait]
pub trait ManagementCommand: Send + Sync {
    /// Subcommand name.
    fn name(&self) -> &'static str;

    /// One-line description shown in `--help`.
    fn about(&self) -> &'static str;

    /// Adds the command's arguments.
    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd
    }

    /// Runs the command.
    async fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> Result<(), FormsError>;
}

/// The commands known to the binary, in registration order.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Box<dyn ManagementCommand>>,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `command`, replacing any command with the same name.
    pub fn register(&mut self, command: Box<dyn ManagementCommand>) {
        self.commands.retain(|c| c.name() != command.name());
        self.commands.push(command);
    }

    fn find(&self, name: &str) -> Option<&dyn ManagementCommand> {
        self.commands
            .iter()
            .find(|c| c.name() == name)
            .map(AsRef::as_ref)
    }

    /// The clap application: one subcommand per registered command plus the
    /// global `--settings FILE` option.
    pub fn build_cli(&self) -> clap::Command {
        self.commands.iter().fold(
            clap::Command::new("quadratum")
                .about("Check, validate and preview quadratum form definitions")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .arg(
                    clap::Arg::new("settings")
                        .long("settings")
                        .global(true)
                        .value_name("FILE")
                        .help("Settings file (.toml, otherwise JSON)"),
                ),
            |app, cmd| app.subcommand(cmd.add_arguments(clap::Command::new(cmd.name()).about(cmd.about()))),
        )
    }

    /// Runs the subcommand selected in `matches`.
    pub async fn execute(&self, matches: &clap::ArgMatches, settings: &Settings) -> Result<(), FormsError> {
        let (name, sub_matches) = matches
            .subcommand()
            .ok_or_else(|| FormsError::ConfigurationError("No subcommand given".to_string()))?;
        let cmd = self
            .find(name)
            .ok_or_else(|| FormsError::ConfigurationError(format!("Unknown command: {name}")))?;
        tracing::debug!(command = name, "running command");
        cmd.handle(sub_matches, settings).await
    }
}

/// Settings for a parsed command line: the `--settings` file if given,
/// otherwise the defaults, with `QUADRATUM_*` overrides applied either way.
pub fn load_settings(matches: &clap::ArgMatches) -> Result<Settings, FormsError> {
    match matches.get_one::<String>("settings") {
        Some(path) => settings_loader::from_path_with_env(path),
        None => Ok(settings_loader::from_env()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        name: &'static str,
        runs: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl ManagementCommand for Counting {
        fn name(&self) -> &'static str {
            self.name
        }

        fn about(&self) -> &'static str {
            "counts its runs"
        }

        fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
            cmd.arg(clap::Arg::new("loud").long("loud").action(clap::ArgAction::SetTrue))
        }

        async fn handle(&self, matches: &clap::ArgMatches, _settings: &Settings) -> Result<(), FormsError> {
            self.runs.fetch_add(if matches.get_flag("loud") { 10 } else { 1 }, Ordering::SeqCst);
            if self.fail {
                return Err(FormsError::ImproperlyConfigured("command failed".to_string()));
            }
            Ok(())
        }
    }

    fn command(name: &'static str, fail: bool) -> (Box<dyn ManagementCommand>, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Counting {
                name,
                runs: Arc::clone(&runs),
                fail,
            }),
            runs,
        )
    }

    #[test]
    fn test_subcommands_in_registration_order() {
        let mut registry = CommandRegistry::new();
        registry.register(command("validate", false).0);
        registry.register(command("check", false).0);
        let names: Vec<String> = registry
            .build_cli()
            .get_subcommands()
            .map(|c| c.get_name().to_string())
            .collect();
        assert_eq!(names, vec!["validate", "check"]);
    }

    #[tokio::test]
    async fn test_register_replaces_same_name() {
        let mut registry = CommandRegistry::new();
        let (old, old_runs) = command("check", false);
        let (new, new_runs) = command("check", false);
        registry.register(old);
        registry.register(new);

        let matches = registry.build_cli().try_get_matches_from(["quadratum", "check"]).unwrap();
        registry.execute(&matches, &Settings::default()).await.unwrap();
        assert_eq!(old_runs.load(Ordering::SeqCst), 0);
        assert_eq!(new_runs.load(Ordering::SeqCst), 1);
        assert_eq!(registry.build_cli().get_subcommands().count(), 1);
    }

    #[tokio::test]
    async fn test_execute_passes_sub_matches() {
        let mut registry = CommandRegistry::new();
        let (cmd, runs) = command("tags", false);
        registry.register(cmd);

        let matches = registry
            .build_cli()
            .try_get_matches_from(["quadratum", "tags", "--loud"])
            .unwrap();
        registry.execute(&matches, &Settings::default()).await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_execute_propagates_command_error() {
        let mut registry = CommandRegistry::new();
        registry.register(command("check", true).0);

        let matches = registry.build_cli().try_get_matches_from(["quadratum", "check"]).unwrap();
        let err = registry.execute(&matches, &Settings::default()).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_settings_flag_is_global() {
        let mut registry = CommandRegistry::new();
        registry.register(command("check", false).0);

        for args in [
            ["quadratum", "--settings", "site.toml", "check"],
            ["quadratum", "check", "--settings", "site.toml"],
        ] {
            let matches = registry.build_cli().try_get_matches_from(args).unwrap();
            assert_eq!(
                matches.get_one::<String>("settings").map(String::as_str),
                Some("site.toml")
            );
        }
        assert!(registry.build_cli().try_get_matches_from(["quadratum"]).is_err());
    }

    #[test]
    fn test_load_settings_missing_file_is_io_error() {
        let mut registry = CommandRegistry::new();
        registry.register(command("check", false).0);
        let matches = registry
            .build_cli()
            .try_get_matches_from(["quadratum", "--settings", "/nonexistent/quadratum.toml", "check"])
            .unwrap();
        assert_eq!(load_settings(&matches).unwrap_err().exit_code(), 3);

        let matches = registry.build_cli().try_get_matches_from(["quadratum", "check"]).unwrap();
        assert!(load_settings(&matches).is_ok());
    }
}
